use std::{
    fmt,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::{
    runtime::Handle,
    sync::mpsc::{self, error::TrySendError},
};
use tracing::{debug, info, warn, Instrument};

mod driver;
use driver::PeriodicDriver;

mod stats;
pub use stats::PeriodicStats;

/// The default interval between timeouts, when the timer is enabled.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// The default capacity of the event queue.
pub const DEFAULT_QUEUE_SIZE: usize = 1024;

/// Name under which the process node is registered.
pub const PROCESS_NAME: &str = "oddbuf-periodic-process";

/// Process node indices are allocated from here and start at 1.
static NEXT_NODE_INDEX: AtomicU32 = AtomicU32::new(1);

#[derive(Debug, Error)]
pub enum PeriodicError {
    #[error("No Tokio runtime available to run the periodic process")]
    NoRuntime,
}

/// Error returned by a [`PeriodicHandler`]. Only ever logged.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// A control event delivered to the periodic process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Event1(u64),
    Event2(u64),
    /// Arms or disarms the periodic timeout.
    SetTimerEnabled(bool),
}

impl ControlEvent {
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Event1(_) => EventKind::Event1,
            Self::Event2(_) => EventKind::Event2,
            Self::SetTimerEnabled(_) => EventKind::TimerEnableDisable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Event1,
    Event2,
    TimerEnableDisable,
    /// Synthetic: fired by timer expiry, never enqueued.
    Timeout,
}

/// Callbacks run by the periodic process.
///
/// Callbacks run on the process task and must not block. `now` is the time elapsed since the
/// process was created. Returning an error, or panicking, is logged and counted; the process
/// keeps running either way.
pub trait PeriodicHandler: Send + 'static {
    fn on_event1(&mut self, _now: Duration, _data: u64) -> Result<(), HandlerError> {
        Ok(())
    }

    fn on_event2(&mut self, _now: Duration, _data: u64) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Called after the timer state has been updated.
    fn on_timer_enabled(&mut self, _now: Duration, _enabled: bool) -> Result<(), HandlerError> {
        Ok(())
    }

    fn on_timeout(&mut self, _now: Duration) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// Default handler: emits a diagnostic per event and per timeout.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl PeriodicHandler for LoggingHandler {
    fn on_event1(&mut self, now: Duration, data: u64) -> Result<(), HandlerError> {
        info!(now = now.as_secs_f64(), data, "received ODDBUF_EVENT1");
        Ok(())
    }

    fn on_event2(&mut self, now: Duration, data: u64) -> Result<(), HandlerError> {
        info!(now = now.as_secs_f64(), data, "received ODDBUF_EVENT2");
        Ok(())
    }

    fn on_timeout(&mut self, now: Duration) -> Result<(), HandlerError> {
        info!("timeout at {:.2}", now.as_secs_f64());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PeriodicOptions {
    /// Interval between timeouts while the timer is enabled.
    pub timeout: Duration,
    /// Capacity of the event queue. Signals beyond it are dropped.
    pub queue_size: usize,
}

impl Default for PeriodicOptions {
    fn default() -> Self {
        Self { timeout: DEFAULT_TIMEOUT, queue_size: DEFAULT_QUEUE_SIZE }
    }
}

impl PeriodicOptions {
    /// Sets the interval between timeouts.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the capacity of the event queue.
    pub fn queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size;
        self
    }
}

/// Identifier of a created process node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIndex(u32);

impl NodeIndex {
    pub const fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Startup {
    from_signallers: mpsc::Receiver<ControlEvent>,
    handler: Box<dyn PeriodicHandler>,
}

/// Lifecycle of the process task. Moves from `Idle` to `Created` once and never back.
enum Slot {
    Idle(Startup),
    Created(NodeIndex),
}

/// Front-end of the periodic process: creates the task at most once and enqueues events for it.
///
/// The event queue exists from construction, so signals sent before [`Self::create`] are held
/// and handled once the task starts.
pub struct PeriodicProcess {
    options: Arc<PeriodicOptions>,
    stats: Arc<PeriodicStats>,
    to_driver: mpsc::Sender<ControlEvent>,
    slot: Mutex<Slot>,
}

impl fmt::Debug for PeriodicProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodicProcess")
            .field("options", &self.options)
            .field("node", &self.node())
            .finish_non_exhaustive()
    }
}

impl PeriodicProcess {
    /// Creates a process front-end using the [`LoggingHandler`].
    pub fn new(options: PeriodicOptions) -> Self {
        Self::with_handler(options, LoggingHandler)
    }

    pub fn with_handler<H: PeriodicHandler>(options: PeriodicOptions, handler: H) -> Self {
        let (to_driver, from_signallers) = mpsc::channel(options.queue_size.max(1));

        Self {
            options: Arc::new(options),
            stats: Arc::new(PeriodicStats::default()),
            to_driver,
            slot: Mutex::new(Slot::Idle(Startup { from_signallers, handler: Box::new(handler) })),
        }
    }

    /// Spawns the process task on the current Tokio runtime, unless it already exists. Returns the
    /// node index either way.
    pub fn create(&self) -> Result<NodeIndex, PeriodicError> {
        let mut slot = self.slot.lock();

        if let Slot::Created(index) = *slot {
            debug!(node = %index, "periodic process already created");
            return Ok(index);
        }

        let runtime = Handle::try_current().map_err(|_| PeriodicError::NoRuntime)?;
        let index = NodeIndex(NEXT_NODE_INDEX.fetch_add(1, Ordering::Relaxed));

        if let Slot::Idle(Startup { from_signallers, handler }) =
            std::mem::replace(&mut *slot, Slot::Created(index))
        {
            let span = tracing::info_span!(parent: None, "oddbuf_periodic", node = %index);

            let driver = PeriodicDriver {
                options: Arc::clone(&self.options),
                from_signallers,
                handler,
                stats: Arc::clone(&self.stats),
                timer_enabled: false,
                epoch: tokio::time::Instant::now(),
                pending: Vec::new(),
            };

            // Detached: the task stops on its own once every signaller is dropped.
            runtime.spawn(driver.run().instrument(span));
            info!(node = %index, name = PROCESS_NAME, "periodic process created");
        }

        Ok(index)
    }

    /// Returns the node index, or `None` if the process has not been created yet.
    pub fn node(&self) -> Option<NodeIndex> {
        match *self.slot.lock() {
            Slot::Created(index) => Some(index),
            Slot::Idle(_) => None,
        }
    }

    pub fn stats(&self) -> &PeriodicStats {
        &self.stats
    }

    pub fn options(&self) -> &PeriodicOptions {
        &self.options
    }

    /// Enqueues an event for the process. Fire-and-forget: a full queue drops the event.
    pub fn signal(&self, event: ControlEvent) {
        match self.to_driver.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(?event, "periodic event queue full, dropping event");
                self.stats.increment_dropped_signals();
            }
            Err(TrySendError::Closed(event)) => {
                debug!(?event, "periodic process gone, dropping event");
                self.stats.increment_dropped_signals();
            }
        }
    }

    pub fn signal_timer_enabled(&self, enabled: bool) {
        self.signal(ControlEvent::SetTimerEnabled(enabled));
    }

    pub fn signal_event1(&self, data: u64) {
        self.signal(ControlEvent::Event1(data));
    }

    pub fn signal_event2(&self, data: u64) {
        self.signal(ControlEvent::Event2(data));
    }
}
