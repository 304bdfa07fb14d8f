use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{FeatureRegistration, GraphEngine, GraphError, InterfaceHandle, ODDBUF_FEATURE};

/// Stable status codes shared by the administrative and remote surfaces.
pub mod status {
    pub const OK: i32 = 0;
    pub const UNSPECIFIED: i32 = -1;
    pub const INVALID_SW_IF_INDEX: i32 = -2;
    pub const UNIMPLEMENTED: i32 = -8;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToggleError {
    /// The handle is stale, unknown, or does not name a physical port.
    #[error("Invalid interface {0}, only works on physical ports")]
    InvalidInterface(InterfaceHandle),
    #[error("Device driver doesn't support redirection")]
    Unimplemented,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToggleError {
    /// Returns the numeric status code reported to remote callers.
    pub const fn code(&self) -> i32 {
        match self {
            Self::InvalidInterface(_) => status::INVALID_SW_IF_INDEX,
            Self::Unimplemented => status::UNIMPLEMENTED,
            Self::Internal(_) => status::UNSPECIFIED,
        }
    }
}

impl From<GraphError> for ToggleError {
    fn from(e: GraphError) -> Self {
        match e {
            GraphError::NotFound(handle) => Self::InvalidInterface(handle),
            GraphError::Unimplemented => Self::Unimplemented,
            GraphError::Internal(reason) => Self::Internal(reason),
        }
    }
}

/// Maps a toggle result onto its status code.
#[inline]
pub fn status_code(result: &Result<(), ToggleError>) -> i32 {
    match result {
        Ok(()) => status::OK,
        Err(e) => e.code(),
    }
}

/// Arms and disarms a feature stage per interface.
///
/// Nothing is cached: every call re-validates the handle against the engine's live interface
/// table, and the engine owns the resulting feature state.
#[derive(Debug)]
pub struct FeatureToggle<G> {
    graph: G,
    feature: FeatureRegistration,
}

impl<G: GraphEngine> FeatureToggle<G> {
    /// Creates a toggle manager for the oddbuf stage.
    pub fn new(graph: G) -> Self {
        Self::with_feature(graph, ODDBUF_FEATURE)
    }

    pub fn with_feature(graph: G, feature: FeatureRegistration) -> Self {
        Self { graph, feature }
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn feature(&self) -> &FeatureRegistration {
        &self.feature
    }

    /// Enables or disables the stage on a physical port. Enabling an enabled stage, or disabling a
    /// disabled one, succeeds without change.
    pub fn set_feature(&self, handle: InterfaceHandle, enable: bool) -> Result<(), ToggleError> {
        let Some(record) = self.graph.resolve_interface(handle) else {
            debug!(%handle, "rejecting toggle: no such interface");
            return Err(ToggleError::InvalidInterface(handle));
        };

        if !record.is_hardware_port() {
            debug!(%handle, name = record.name.as_str(), "rejecting toggle: not a physical port");
            return Err(ToggleError::InvalidInterface(handle));
        }

        if let Err(e) =
            self.graph.set_stage_enabled(self.feature.arc_name, self.feature.node_name, handle, enable)
        {
            match e {
                GraphError::NotFound(_) => {
                    debug!(%handle, name = record.name.as_str(), "rejecting toggle: interface deleted")
                }
                GraphError::Unimplemented => {
                    warn!(%handle, name = record.name.as_str(), "driver refused redirection")
                }
                GraphError::Internal(ref reason) => {
                    error!(%handle, name = record.name.as_str(), reason = reason.as_str(), "stage update failed")
                }
            }

            return Err(e.into());
        }

        info!(
            %handle,
            name = record.name.as_str(),
            arc = self.feature.arc_name,
            stage = self.feature.node_name,
            enable,
            "feature updated"
        );

        Ok(())
    }
}
