use std::{ops::ControlFlow, sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use tokio::sync::watch;

use crate::quiz::Ticker;

use super::{status_at, ChallengeStatus, ScheduledTime};

const ENABLE_LOGS: bool = false;

use crate::{log_debug, log_info};

pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Watches the clock once per second until a scheduled challenge starts.
/// Scheduling again replaces the previous watch.
pub struct ChallengeScheduler {
    ticker: Ticker,
    clock: Clock,
    pre_countdown_secs: u32,
    scheduled_for: Option<NaiveDateTime>,
}

impl ChallengeScheduler {
    pub fn new(pre_countdown_secs: u32) -> Self {
        Self::with_clock(pre_countdown_secs, Arc::new(|| Local::now().naive_local()))
    }

    pub fn with_clock(pre_countdown_secs: u32, clock: Clock) -> Self {
        Self {
            ticker: Ticker::new(),
            clock,
            pre_countdown_secs,
            scheduled_for: None,
        }
    }

    pub fn scheduled_for(&self) -> Option<NaiveDateTime> {
        self.scheduled_for
    }

    /// Start watching for `time`. The receiver holds the status as of now and
    /// is updated every second; the watch ends once the challenge has started.
    pub async fn schedule(&mut self, time: ScheduledTime) -> Result<watch::Receiver<ChallengeStatus>> {
        let now = (self.clock)();
        let scheduled = time.next_occurrence(now)?;
        let pre_countdown = self.pre_countdown_secs;
        let initial = status_at(scheduled, now, pre_countdown);

        log_info!("Challenge scheduled for {scheduled} ({initial:?})");

        let (status_tx, status_rx) = watch::channel(initial);
        self.scheduled_for = Some(scheduled);

        if initial == ChallengeStatus::Started {
            self.ticker.stop().await?;
            return Ok(status_rx);
        }

        let clock = self.clock.clone();
        self.ticker
            .restart(Duration::from_secs(1), move || {
                let status = status_at(scheduled, clock(), pre_countdown);
                log_debug!("Challenge status {status:?}");
                status_tx.send_replace(status);
                std::future::ready(if status == ChallengeStatus::Started {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                })
            })
            .await?;

        Ok(status_rx)
    }

    pub async fn cancel(&mut self) -> Result<()> {
        self.scheduled_for = None;
        self.ticker.stop().await
    }

    pub fn is_watching(&self) -> bool {
        self.ticker.is_running()
    }
}
