use std::fmt;

use thiserror::Error;

/// Process-wide identifier of an interface known to the graph engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceHandle(u32);

impl InterfaceHandle {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn index(&self) -> u32 {
        self.0
    }
}

impl From<u32> for InterfaceHandle {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

impl fmt::Display for InterfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sw_if_index {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceKind {
    /// A physical port.
    HardwarePort,
    /// Sub-interfaces, tunnels and any other virtual construct.
    Other,
}

/// A snapshot of an interface as resolved by the graph engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceRecord {
    pub handle: InterfaceHandle,
    pub name: String,
    pub kind: InterfaceKind,
}

impl InterfaceRecord {
    #[inline]
    pub fn is_hardware_port(&self) -> bool {
        self.kind == InterfaceKind::HardwarePort
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphError {
    /// The interface is gone, typically deleted between lookup and update.
    #[error("no such interface: {0}")]
    NotFound(InterfaceHandle),
    #[error("operation not supported on this interface")]
    Unimplemented,
    #[error("graph engine failure: {0}")]
    Internal(String),
}

/// Where a feature stage is spliced into the packet-processing graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureRegistration {
    pub arc_name: &'static str,
    pub node_name: &'static str,
    pub runs_before: &'static [&'static str],
    /// Whether the plug-in ships disabled.
    pub default_disabled: bool,
}

/// The oddbuf stage: runs on device input, ahead of ethernet parsing.
pub const ODDBUF_FEATURE: FeatureRegistration = FeatureRegistration {
    arc_name: "device-input",
    node_name: "oddbuf",
    runs_before: &["ethernet-input"],
    default_disabled: true,
};

/// The packet-processing graph engine, as seen by the control layer.
///
/// The engine owns interface lifetimes and per-interface feature state. Implementations must be
/// safe to call from several request contexts at once.
pub trait GraphEngine: Send + Sync + 'static {
    /// Looks up a live interface. Returns `None` for stale or never-allocated handles.
    fn resolve_interface(&self, handle: InterfaceHandle) -> Option<InterfaceRecord>;

    /// Looks up an interface by its name.
    fn interface_by_name(&self, name: &str) -> Option<InterfaceHandle>;

    /// Enables or disables `stage_name` on `arc_name` for the given interface.
    fn set_stage_enabled(
        &self,
        arc_name: &str,
        stage_name: &str,
        handle: InterfaceHandle,
        enabled: bool,
    ) -> Result<(), GraphError>;
}

impl<G: GraphEngine> GraphEngine for std::sync::Arc<G> {
    fn resolve_interface(&self, handle: InterfaceHandle) -> Option<InterfaceRecord> {
        (**self).resolve_interface(handle)
    }

    fn interface_by_name(&self, name: &str) -> Option<InterfaceHandle> {
        (**self).interface_by_name(name)
    }

    fn set_stage_enabled(
        &self,
        arc_name: &str,
        stage_name: &str,
        handle: InterfaceHandle,
        enabled: bool,
    ) -> Result<(), GraphError> {
        (**self).set_stage_enabled(arc_name, stage_name, handle, enabled)
    }
}
