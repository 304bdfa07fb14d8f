use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::Duration,
};

use tokio::{sync::mpsc, time::Instant};
use tracing::{debug, error, info, warn};

use super::{ControlEvent, EventKind, HandlerError, PeriodicHandler, PeriodicOptions, PeriodicStats};

/// Why the process resumed.
#[derive(Debug, PartialEq, Eq)]
enum Wake {
    /// At least one event was drained into the pending batch.
    Events,
    Timeout,
    /// Every signaller is gone.
    Closed,
}

/// Events of one kind drained in a single wake-up, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EventBatch {
    pub(crate) kind: EventKind,
    pub(crate) events: Vec<ControlEvent>,
}

/// Groups drained events by kind. Batches are ordered by the first appearance of their kind.
pub(crate) fn into_batches(events: impl IntoIterator<Item = ControlEvent>) -> Vec<EventBatch> {
    let mut batches: Vec<EventBatch> = Vec::with_capacity(3);

    for event in events {
        let kind = event.kind();
        match batches.iter_mut().find(|batch| batch.kind == kind) {
            Some(batch) => batch.events.push(event),
            None => batches.push(EventBatch { kind, events: vec![event] }),
        }
    }

    batches
}

/// The periodic process task. Suspends only while waiting for the next event or timeout.
pub(crate) struct PeriodicDriver {
    pub(super) options: Arc<PeriodicOptions>,
    /// Events from the signallers.
    pub(super) from_signallers: mpsc::Receiver<ControlEvent>,
    pub(super) handler: Box<dyn PeriodicHandler>,
    /// Shared with the process front-end.
    pub(super) stats: Arc<PeriodicStats>,
    pub(super) timer_enabled: bool,
    /// Reference point for the `now` passed to handlers.
    pub(super) epoch: Instant,
    /// Events drained during the current wake-up.
    pub(super) pending: Vec<ControlEvent>,
}

impl PeriodicDriver {
    pub(crate) async fn run(mut self) {
        loop {
            let wake = self.wait().await;
            let now = self.epoch.elapsed();

            match wake {
                Wake::Events => {
                    self.stats.increment_wakeups();
                    let events = std::mem::take(&mut self.pending);
                    for batch in into_batches(events) {
                        self.dispatch(now, batch);
                    }
                }
                Wake::Timeout => {
                    self.stats.increment_wakeups();
                    self.stats.increment_timeouts();
                    self.invoke(EventKind::Timeout, |handler| handler.on_timeout(now));
                }
                Wake::Closed => {
                    debug!("event stream closed, stopping");
                    return;
                }
            }
        }
    }

    /// Waits for the next event, or for the timeout if the timer is armed. An event that is ready
    /// at the same time as the timeout wins.
    async fn wait(&mut self) -> Wake {
        let first = if self.timer_enabled {
            tokio::select! {
                biased;

                event = self.from_signallers.recv() => event,
                _ = tokio::time::sleep(self.options.timeout) => return Wake::Timeout,
            }
        } else {
            self.from_signallers.recv().await
        };

        let Some(first) = first else {
            return Wake::Closed;
        };

        self.pending.push(first);
        while let Ok(event) = self.from_signallers.try_recv() {
            self.pending.push(event);
        }

        Wake::Events
    }

    fn dispatch(&mut self, now: Duration, batch: EventBatch) {
        debug!(kind = ?batch.kind, len = batch.events.len(), "dispatching batch");

        for event in batch.events {
            match event {
                ControlEvent::Event1(data) => {
                    self.stats.increment_event1();
                    self.invoke(EventKind::Event1, |handler| handler.on_event1(now, data));
                }
                ControlEvent::Event2(data) => {
                    self.stats.increment_event2();
                    self.invoke(EventKind::Event2, |handler| handler.on_event2(now, data));
                }
                ControlEvent::SetTimerEnabled(enabled) => {
                    self.stats.increment_timer_toggles();
                    self.set_timer_enabled(enabled);
                    self.invoke(EventKind::TimerEnableDisable, |handler| {
                        handler.on_timer_enabled(now, enabled)
                    });
                }
            }
        }
    }

    fn set_timer_enabled(&mut self, enabled: bool) {
        info!(
            previous = self.timer_enabled,
            enabled,
            "Periodic timeouts now {}",
            if enabled { "enabled" } else { "disabled" }
        );

        self.timer_enabled = enabled;
        self.stats.set_timer_enabled(enabled);
    }

    /// Runs a handler callback. Errors and panics are logged and counted, never propagated.
    fn invoke<F>(&mut self, kind: EventKind, f: F)
    where
        F: FnOnce(&mut Box<dyn PeriodicHandler>) -> Result<(), HandlerError>,
    {
        let handler = &mut self.handler;

        match panic::catch_unwind(AssertUnwindSafe(|| f(handler))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(?kind, err = %e, "handler failed");
                self.stats.increment_handler_failures();
            }
            Err(_) => {
                error!(?kind, "handler panicked");
                self.stats.increment_handler_failures();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_preserve_insertion_order_per_kind() {
        let batches = into_batches([
            ControlEvent::Event2(10),
            ControlEvent::Event1(1),
            ControlEvent::Event2(20),
            ControlEvent::SetTimerEnabled(true),
            ControlEvent::Event1(2),
        ]);

        assert_eq!(
            batches,
            vec![
                EventBatch {
                    kind: EventKind::Event2,
                    events: vec![ControlEvent::Event2(10), ControlEvent::Event2(20)],
                },
                EventBatch {
                    kind: EventKind::Event1,
                    events: vec![ControlEvent::Event1(1), ControlEvent::Event1(2)],
                },
                EventBatch {
                    kind: EventKind::TimerEnableDisable,
                    events: vec![ControlEvent::SetTimerEnabled(true)],
                },
            ]
        );
    }

    #[test]
    fn no_events_no_batches() {
        assert!(into_batches(Vec::new()).is_empty());
    }
}
