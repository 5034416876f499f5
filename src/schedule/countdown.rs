use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};

/// Fixed countdown shown right before the quiz begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
}

impl Countdown {
    pub fn new(secs: u32) -> Self {
        Self { remaining: secs }
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    /// Returns the seconds left after this tick.
    pub fn tick(&mut self) -> u32 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
    }

    /// Count down once per second, reporting the starting value and every
    /// value after it, down to and including zero.
    pub async fn run(mut self, mut on_second: impl FnMut(u32)) {
        on_second(self.remaining);
        if self.is_finished() {
            return;
        }

        let period = Duration::from_secs(1);
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.is_finished() {
            interval.tick().await;
            on_second(self.tick());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn reports_every_second_down_to_zero() {
        let started = Instant::now();
        let mut seen = Vec::new();
        Countdown::new(3).run(|secs| seen.push(secs)).await;

        assert_eq!(seen, [3, 2, 1, 0]);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_countdown_finishes_immediately() {
        let mut seen = Vec::new();
        Countdown::new(0).run(|secs| seen.push(secs)).await;
        assert_eq!(seen, [0]);
    }
}
