use std::{future::Future, ops::ControlFlow, time::Duration};

use anyhow::{Context, Result};
use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

/// A single repeating background task. Starting a new one cancels the
/// previous task first, so at most one is ever active.
pub struct Ticker {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new()
    }
}

impl Ticker {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Run `on_tick` every `period`, first firing one period from now. The task
    /// ends when `on_tick` breaks or the ticker is stopped. A tick in progress
    /// always runs to completion before cancellation takes effect.
    pub async fn restart<F, Fut>(&mut self, period: Duration, mut on_tick: F) -> Result<()>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        self.stop().await?;

        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if on_tick().await.is_break() {
                            break;
                        }
                    }
                }
            }
        });

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle.await.context("ticker task failed to join")
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    fn counting(counter: Arc<AtomicU32>, limit: u32) -> impl FnMut() -> std::future::Ready<ControlFlow<()>> {
        move || {
            let seen = counter.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(if seen >= limit {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period_until_break() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut ticker = Ticker::new();
        ticker
            .restart(Duration::from_secs(1), counting(counter.clone(), 3))
            .await
            .unwrap();

        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(!ticker.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_the_task() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut ticker = Ticker::new();
        ticker
            .restart(Duration::from_secs(1), counting(counter.clone(), u32::MAX))
            .await
            .unwrap();

        time::sleep(Duration::from_millis(2_500)).await;
        ticker.stop().await.unwrap();
        let after_stop = counter.load(Ordering::SeqCst);
        assert_eq!(after_stop, 2);

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);
        assert!(!ticker.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_the_previous_task() {
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));
        let mut ticker = Ticker::new();

        ticker
            .restart(Duration::from_secs(1), counting(first.clone(), u32::MAX))
            .await
            .unwrap();
        time::sleep(Duration::from_millis(1_500)).await;
        ticker
            .restart(Duration::from_secs(1), counting(second.clone(), u32::MAX))
            .await
            .unwrap();
        time::sleep(Duration::from_millis(3_500)).await;

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 3);
        ticker.stop().await.unwrap();
    }
}
