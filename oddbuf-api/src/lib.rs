#![doc(issue_tracker_base_url = "https://github.com/oddbuf/oddbuf-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Remote surface of the oddbuf control layer. The server decodes enable/disable requests and
//! runs them through the same toggle action as the administrative command; the client issues
//! requests and waits for the matching replies.

use thiserror::Error;

mod client;
pub use client::*;

mod server;
pub use server::*;

/// The default capacity of internal command queues.
const DEFAULT_QUEUE_SIZE: usize = 1024;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("IO error: {0:?}")]
    Io(#[from] std::io::Error),
    #[error("Wire protocol error: {0:?}")]
    Wire(#[from] oddbuf_wire::api::Error),
    #[error("Request rejected with status {0}")]
    Rejected(i32),
    #[error("Request timed out")]
    Timeout,
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Could not bind to any valid endpoints")]
    NoValidEndpoints,
}

impl ApiError {
    /// Returns the remote status code if the request was rejected by the server.
    pub const fn retval(&self) -> Option<i32> {
        match self {
            Self::Rejected(retval) => Some(*retval),
            _ => None,
        }
    }
}

/// Wrapping counter for request contexts.
#[derive(Debug, Default)]
pub(crate) struct RequestContext(u32);

impl RequestContext {
    pub(crate) fn next(&mut self) -> u32 {
        let context = self.0;
        self.0 = self.0.wrapping_add(1);
        context
    }
}
