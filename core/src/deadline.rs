//! One-shot, multi-trigger cancellation deadline
//!
//! Two trigger sources feed one cancellation action: a countdown timer and
//! an external interrupt (a watch flag the embedding layer raises, e.g. on
//! Ctrl-C). An atomic guard ensures the action runs at most once no matter
//! how many sources fire. The action must stay bounded and non-blocking:
//! stop the sampler, flush the sinks, raise the stop request toward the
//! workload runner. Disarming aborts both trigger tasks so neither can
//! fire after teardown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

struct CancelCell {
    fired: AtomicBool,
    stop_tx: broadcast::Sender<()>,
    action: Box<dyn Fn() + Send + Sync>,
}

impl CancelCell {
    fn trigger(&self, reason: &str) {
        // Only the first trigger source runs the action; later sources
        // observe the flag and back off.
        if self
            .fired
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!(reason, "cancellation already fired, ignoring");
            return;
        }

        tracing::warn!(reason, "cancelling run");
        (self.action)();
        // Cooperative stop request toward the workload runner; it may have
        // no subscribers if the workload already returned.
        let _ = self.stop_tx.send(());
    }
}

/// Armed countdown with an at-most-once cancellation action
pub struct DeadlineController {
    cell: Arc<CancelCell>,
    timer: JoinHandle<()>,
    interrupt: JoinHandle<()>,
}

impl DeadlineController {
    /// Arm the deadline.
    ///
    /// `stop_tx` carries the outbound stop request to the workload runner;
    /// `interrupt_rx` turning `true` is the external-interrupt trigger;
    /// `action` is the cancellation work (stop sampler, flush sinks).
    pub fn arm<F>(
        deadline: Duration,
        stop_tx: broadcast::Sender<()>,
        mut interrupt_rx: watch::Receiver<bool>,
        action: F,
    ) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let cell = Arc::new(CancelCell {
            fired: AtomicBool::new(false),
            stop_tx,
            action: Box::new(action),
        });

        let timer = tokio::spawn({
            let cell = Arc::clone(&cell);
            async move {
                tokio::time::sleep(deadline).await;
                cell.trigger("deadline expired");
            }
        });

        let interrupt = tokio::spawn({
            let cell = Arc::clone(&cell);
            async move {
                loop {
                    if *interrupt_rx.borrow() {
                        cell.trigger("interrupt received");
                        break;
                    }
                    if interrupt_rx.changed().await.is_err() {
                        break;
                    }
                }
            }
        });

        tracing::debug!(deadline_secs = deadline.as_secs(), "deadline armed");

        Self {
            cell,
            timer,
            interrupt,
        }
    }

    /// Whether the cancellation action has fired
    pub fn cancelled(&self) -> bool {
        self.cell.fired.load(Ordering::SeqCst)
    }

    /// Cancel the countdown so it cannot fire after teardown
    pub fn disarm(self) {
        self.timer.abort();
        self.interrupt.abort();
        tracing::debug!("deadline disarmed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counted_action() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let action = {
            let count = Arc::clone(&count);
            move || {
                count.fetch_add(1, Ordering::SeqCst);
            }
        };
        (count, action)
    }

    #[tokio::test]
    async fn test_timer_expiry_fires_action_and_stop_signal() {
        let (stop_tx, mut stop_rx) = broadcast::channel(1);
        let (_interrupt_tx, interrupt_rx) = watch::channel(false);
        let (count, action) = counted_action();

        let controller =
            DeadlineController::arm(Duration::from_millis(20), stop_tx, interrupt_rx, action);

        stop_rx.recv().await.unwrap();
        assert!(controller.cancelled());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        controller.disarm();
    }

    #[tokio::test]
    async fn test_interrupt_fires_action() {
        let (stop_tx, mut stop_rx) = broadcast::channel(1);
        let (interrupt_tx, interrupt_rx) = watch::channel(false);
        let (count, action) = counted_action();

        let controller =
            DeadlineController::arm(Duration::from_secs(3600), stop_tx, interrupt_rx, action);

        interrupt_tx.send(true).unwrap();
        stop_rx.recv().await.unwrap();
        assert!(controller.cancelled());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        controller.disarm();
    }

    #[tokio::test]
    async fn test_both_triggers_fire_action_exactly_once() {
        let (stop_tx, mut stop_rx) = broadcast::channel(4);
        let (interrupt_tx, interrupt_rx) = watch::channel(false);
        let (count, action) = counted_action();

        let controller =
            DeadlineController::arm(Duration::from_millis(10), stop_tx, interrupt_rx, action);

        // Raise the interrupt around the same time as the timer expiry.
        interrupt_tx.send(true).unwrap();
        stop_rx.recv().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        controller.disarm();
    }

    #[tokio::test]
    async fn test_disarm_prevents_firing() {
        let (stop_tx, _stop_rx) = broadcast::channel(1);
        let (_interrupt_tx, interrupt_rx) = watch::channel(false);
        let (count, action) = counted_action();

        let controller =
            DeadlineController::arm(Duration::from_millis(30), stop_tx, interrupt_rx, action);
        assert!(!controller.cancelled());
        controller.disarm();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_interrupt_already_raised_when_armed() {
        let (stop_tx, mut stop_rx) = broadcast::channel(1);
        let (interrupt_tx, interrupt_rx) = watch::channel(false);
        interrupt_tx.send(true).unwrap();
        let (count, action) = counted_action();

        let controller =
            DeadlineController::arm(Duration::from_secs(3600), stop_tx, interrupt_rx, action);

        stop_rx.recv().await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        controller.disarm();
    }
}
