use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Statistics for the periodic process.
/// These are shared between the process task and its signallers.
#[derive(Debug, Default)]
pub struct PeriodicStats {
    /// Number of times the process woke up, for either reason.
    wakeups: AtomicUsize,
    event1: AtomicUsize,
    event2: AtomicUsize,
    timer_toggles: AtomicUsize,
    timeouts: AtomicUsize,
    /// Handler invocations that returned an error or panicked.
    handler_failures: AtomicUsize,
    /// Signals dropped because the event queue was full.
    dropped_signals: AtomicUsize,
    timer_enabled: AtomicBool,
}

impl PeriodicStats {
    #[inline]
    pub(crate) fn increment_wakeups(&self) {
        self.wakeups.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_event1(&self) {
        self.event1.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_event2(&self) {
        self.event2.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_timer_toggles(&self) {
        self.timer_toggles.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_timeouts(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_handler_failures(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_dropped_signals(&self) {
        self.dropped_signals.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn set_timer_enabled(&self, enabled: bool) {
        self.timer_enabled.store(enabled, Ordering::Relaxed);
    }

    #[inline]
    pub fn wakeups(&self) -> usize {
        self.wakeups.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn event1(&self) -> usize {
        self.event1.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn event2(&self) -> usize {
        self.event2.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn timer_toggles(&self) -> usize {
        self.timer_toggles.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn timeouts(&self) -> usize {
        self.timeouts.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn handler_failures(&self) -> usize {
        self.handler_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_signals(&self) -> usize {
        self.dropped_signals.load(Ordering::Relaxed)
    }

    /// Whether periodic timeouts are currently armed, as last observed by the process.
    #[inline]
    pub fn timer_enabled(&self) -> bool {
        self.timer_enabled.load(Ordering::Relaxed)
    }
}
