#![doc(issue_tracker_base_url = "https://github.com/oddbuf/oddbuf-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub use oddbuf_api::*;
pub use oddbuf_core::*;
pub use oddbuf_wire::api as wire;
