mod quiz_results;
mod quiz_state;
