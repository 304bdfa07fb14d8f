#![doc(issue_tracker_base_url = "https://github.com/oddbuf/oddbuf-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Control layer of the oddbuf dataplane feature: per-interface arming of the buffer-chain
//! shaping stage, its runtime configuration, and the periodic event process.

pub mod admin;
pub use admin::{AdminCommand, AdminError, InterfaceTarget};

mod config;
pub use config::{ConfigUpdate, RuntimeConfig, SharedConfig};

mod context;
pub use context::Oddbuf;

mod interface;
pub use interface::*;

pub mod periodic;
pub use periodic::{
    ControlEvent, EventKind, HandlerError, LoggingHandler, NodeIndex, PeriodicError,
    PeriodicHandler, PeriodicOptions, PeriodicProcess, PeriodicStats,
};

mod table;
pub use table::InterfaceTable;

mod toggle;
pub use toggle::{status, status_code, FeatureToggle, ToggleError};
