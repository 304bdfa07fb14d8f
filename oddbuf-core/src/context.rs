use crate::{
    ConfigUpdate, FeatureToggle, GraphEngine, InterfaceHandle, LoggingHandler, PeriodicError,
    PeriodicHandler, PeriodicOptions, PeriodicProcess, RuntimeConfig, SharedConfig, ToggleError,
};

/// All oddbuf control state, constructed once and shared by every entry point.
///
/// Holds the toggle manager over the graph engine, the runtime configuration record and the
/// periodic process. Dropping it closes the periodic process's event stream, which stops the
/// process task.
#[derive(Debug)]
pub struct Oddbuf<G> {
    toggle: FeatureToggle<G>,
    config: SharedConfig,
    periodic: PeriodicProcess,
}

impl<G: GraphEngine> Oddbuf<G> {
    /// Creates the context with default periodic options and the [`LoggingHandler`].
    pub fn new(graph: G) -> Self {
        Self::with_options(graph, PeriodicOptions::default())
    }

    pub fn with_options(graph: G, options: PeriodicOptions) -> Self {
        Self::with_handler(graph, options, LoggingHandler)
    }

    pub fn with_handler<H: PeriodicHandler>(graph: G, options: PeriodicOptions, handler: H) -> Self {
        Self {
            toggle: FeatureToggle::new(graph),
            config: SharedConfig::default(),
            periodic: PeriodicProcess::with_handler(options, handler),
        }
    }

    /// The action shared by the administrative command and the remote API.
    #[inline]
    pub fn set_feature(&self, handle: InterfaceHandle, enable: bool) -> Result<(), ToggleError> {
        self.toggle.set_feature(handle, enable)
    }

    /// Overwrites the supplied configuration fields and returns the resulting record.
    pub fn configure(&self, update: ConfigUpdate) -> RuntimeConfig {
        self.config.configure(update)
    }

    pub fn config(&self) -> RuntimeConfig {
        self.config.snapshot()
    }

    /// Creates the periodic process if it does not exist yet.
    pub fn create_periodic_process(&self) -> Result<(), PeriodicError> {
        self.periodic.create().map(|_| ())
    }

    pub fn signal_timer_enabled(&self, enabled: bool) {
        self.periodic.signal_timer_enabled(enabled);
    }

    pub fn signal_event1(&self, data: u64) {
        self.periodic.signal_event1(data);
    }

    pub fn signal_event2(&self, data: u64) {
        self.periodic.signal_event2(data);
    }

    pub fn periodic(&self) -> &PeriodicProcess {
        &self.periodic
    }

    pub fn toggle(&self) -> &FeatureToggle<G> {
        &self.toggle
    }

    pub fn graph(&self) -> &G {
        self.toggle.graph()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::InterfaceTable;

    #[tokio::test(start_paused = true)]
    async fn periodic_process_is_created_once() {
        let oddbuf = Oddbuf::new(InterfaceTable::new());

        oddbuf.create_periodic_process().unwrap();
        let node = oddbuf.periodic().node();
        oddbuf.create_periodic_process().unwrap();

        assert!(node.is_some());
        assert_eq!(oddbuf.periodic().node(), node);

        oddbuf.signal_event1(7);
        oddbuf.signal_event2(8);
        tokio::time::sleep(Duration::from_millis(1)).await;

        // A second task would have needed a second receiver; each event is handled exactly once.
        assert_eq!(oddbuf.periodic().stats().event1(), 1);
        assert_eq!(oddbuf.periodic().stats().event2(), 1);
    }

    #[test]
    fn configure_goes_through_the_shared_record() {
        let oddbuf = Oddbuf::new(InterfaceTable::new());
        assert_eq!(oddbuf.config(), RuntimeConfig::default());

        oddbuf.configure(ConfigUpdate::default().copy_count(5));
        assert_eq!(
            oddbuf.config(),
            RuntimeConfig { copy_count: 5, first_chunk_offset: 0, second_chunk_offset: 1 }
        );
    }
}
