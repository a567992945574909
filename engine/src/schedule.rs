//! Cancellable background work owned by the draw session.
//!
//! Every spawned task is held by a [`ScheduledTask`] guard. Dropping the guard
//! aborts the task, so leaving a session state tears down its timers.

use std::time::{Duration, Instant};

use futures_util::future::{AbortHandle, Abortable};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

use gala_types::ParticipantId;

use crate::selection::sample_distinct;

const FRAME_CHANNEL_CAPACITY: usize = 4;

pub(crate) struct ScheduledTask {
    abort: AbortHandle,
}

impl ScheduledTask {
    fn spawn<F>(handle: &tokio::runtime::Handle, task: F) -> Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let (abort, registration) = AbortHandle::new_pair();
        handle.spawn(async move {
            let _ = Abortable::new(task, registration).await;
        });
        Self { abort }
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

/// Publishes random preview frames while a draw is rolling.
///
/// Display only: the task sees a copy of the pool ids and nothing else.
pub(crate) struct RollingTicker {
    _task: ScheduledTask,
    frames: mpsc::Receiver<Vec<ParticipantId>>,
}

impl RollingTicker {
    /// `None` when the ticker is disabled or no runtime is available.
    pub(crate) fn spawn(
        pool: Vec<ParticipantId>,
        interval: Duration,
        preview: usize,
    ) -> Option<Self> {
        if interval.is_zero() || preview == 0 || pool.is_empty() {
            return None;
        }
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let (tx, frames) = mpsc::channel(FRAME_CHANNEL_CAPACITY);

        let task = ScheduledTask::spawn(&handle, async move {
            let mut ticks = tokio::time::interval(interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticks.tick().await;
                let frame = {
                    let mut rng = rand::rng();
                    sample_distinct(&pool, preview, &mut rng)
                };
                if let Err(mpsc::error::TrySendError::Closed(_)) = tx.try_send(frame) {
                    break;
                }
            }
        });

        Some(Self { _task: task, frames })
    }

    /// Most recent frame published since the last call.
    pub(crate) fn latest_frame(&mut self) -> Option<Vec<ParticipantId>> {
        let mut latest = None;
        while let Ok(frame) = self.frames.try_recv() {
            latest = Some(frame);
        }
        latest
    }
}

/// The single pending reveal of a stopped draw.
///
/// With a runtime, a sleep task signals the coordinator; without one the
/// deadline is checked on each tick. The commit itself never runs here.
pub(crate) struct RevealTimer {
    deadline: Instant,
    fired: Option<oneshot::Receiver<()>>,
    _task: Option<ScheduledTask>,
}

impl RevealTimer {
    pub(crate) fn schedule(delay: Duration) -> Self {
        let deadline = Instant::now() + delay;
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return Self {
                deadline,
                fired: None,
                _task: None,
            };
        };

        let (tx, rx) = oneshot::channel();
        let task = ScheduledTask::spawn(&handle, async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(());
        });
        Self {
            deadline,
            fired: Some(rx),
            _task: Some(task),
        }
    }

    pub(crate) fn is_due(&mut self, now: Instant) -> bool {
        match self.fired.as_mut() {
            Some(rx) => rx.try_recv().is_ok() || now >= self.deadline,
            None => now >= self.deadline,
        }
    }

    /// Wait until the reveal is due.
    pub(crate) async fn wait(&mut self) {
        if let Some(rx) = self.fired.as_mut()
            && rx.await.is_ok()
        {
            return;
        }
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        tokio::time::sleep(remaining).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_disabled_without_runtime() {
        let ticker = RollingTicker::spawn(
            vec![ParticipantId::new("a")],
            Duration::from_millis(10),
            5,
        );
        assert!(ticker.is_none());
    }

    #[test]
    fn reveal_without_runtime_uses_deadline() {
        let mut timer = RevealTimer::schedule(Duration::from_secs(60));
        assert!(!timer.is_due(Instant::now()));
        assert!(timer.is_due(Instant::now() + Duration::from_secs(61)));
    }

    #[tokio::test]
    async fn ticker_publishes_frames_from_pool() {
        let pool = vec![
            ParticipantId::new("a"),
            ParticipantId::new("b"),
            ParticipantId::new("c"),
        ];
        let mut ticker = RollingTicker::spawn(pool.clone(), Duration::from_millis(5), 2).unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        let frame = ticker.latest_frame().unwrap();
        assert_eq!(frame.len(), 2);
        assert!(frame.iter().all(|id| pool.contains(id)));
    }

    #[tokio::test]
    async fn dropped_reveal_never_fires() {
        let (tx, mut rx) = oneshot::channel::<()>();
        let handle = tokio::runtime::Handle::current();
        let task = ScheduledTask::spawn(&handle, async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = tx.send(());
        });
        drop(task);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn reveal_wait_returns_after_delay() {
        let mut timer = RevealTimer::schedule(Duration::from_millis(20));
        let started = Instant::now();
        timer.wait().await;
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert!(timer.is_due(Instant::now()));
    }
}
