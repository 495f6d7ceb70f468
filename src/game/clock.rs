//! Beat clock - fixed-tempo ticker feeding the duel loop

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use super::SessionEvent;

/// Owns the beat timer task. Every start bumps the epoch, so ticks still queued
/// from a previous run can be told apart and dropped.
pub struct BeatClock {
    period: Duration,
    epoch: u64,
    task: Option<JoinHandle<()>>,
    events_tx: mpsc::Sender<SessionEvent>,
}

impl BeatClock {
    pub fn new(period: Duration, events_tx: mpsc::Sender<SessionEvent>) -> Self {
        Self {
            period,
            epoch: 0,
            task: None,
            events_tx,
        }
    }

    /// (Re)start ticking. The first tick lands one full period from now.
    pub fn start(&mut self) {
        self.stop();
        self.epoch += 1;

        let epoch = self.epoch;
        let period = self.period;
        let tx = self.events_tx.clone();

        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if tx.send(SessionEvent::Beat { epoch }).await.is_err() {
                    break;
                }
            }
        }));

        debug!(epoch, period_ms = self.period.as_millis() as u64, "Beat clock started");
    }

    /// Cancel the timer task. Returns false when there was nothing to cancel.
    pub fn stop(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                task.abort();
                debug!(epoch = self.epoch, "Beat clock stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Whether a tick belongs to the current run
    pub fn is_current(&self, epoch: u64) -> bool {
        self.is_running() && epoch == self.epoch
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Drop for BeatClock {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_pending;

    const PERIOD: Duration = Duration::from_millis(800);

    async fn next_epoch(rx: &mut mpsc::Receiver<SessionEvent>) -> u64 {
        match rx.recv().await {
            Some(SessionEvent::Beat { epoch }) => epoch,
            other => panic!("expected a beat, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut clock = BeatClock::new(PERIOD, tx);
        clock.start();

        let started = Instant::now();
        let epoch = next_epoch(&mut rx).await;
        assert_eq!(started.elapsed(), PERIOD);
        assert!(clock.is_current(epoch));

        next_epoch(&mut rx).await;
        assert_eq!(started.elapsed(), PERIOD * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut clock = BeatClock::new(PERIOD, tx);
        clock.start();

        assert!(clock.stop());
        assert!(!clock.stop());
        assert!(!clock.is_running());

        tokio::time::sleep(PERIOD * 3).await;
        let mut recv = tokio_test::task::spawn(rx.recv());
        assert_pending!(recv.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_invalidates_old_epoch() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut clock = BeatClock::new(PERIOD, tx);
        clock.start();
        let first = next_epoch(&mut rx).await;

        clock.start();
        assert!(!clock.is_current(first));

        let second = next_epoch(&mut rx).await;
        assert!(clock.is_current(second));
        assert_ne!(first, second);
    }
}
