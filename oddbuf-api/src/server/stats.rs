use std::sync::atomic::{AtomicUsize, Ordering};

/// Statistics for an API server.
/// These are shared between the connection tasks and the server.
#[derive(Debug, Default)]
pub struct ApiStats {
    /// Total requests decoded
    requests: AtomicUsize,
    /// Total replies sent
    replies: AtomicUsize,
    /// Requests answered with a non-zero status
    failed_requests: AtomicUsize,
    /// Currently connected clients
    active_clients: AtomicUsize,
    /// Connections refused because of the client limit
    rejected_clients: AtomicUsize,
}

impl ApiStats {
    #[inline]
    pub(crate) fn increment_requests(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_replies(&self) {
        self.replies.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_failed_requests(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_active_clients(&self) {
        self.active_clients.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn decrement_active_clients(&self) {
        self.active_clients.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_rejected_clients(&self) {
        self.rejected_clients.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn replies(&self) -> usize {
        self.replies.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed_requests(&self) -> usize {
        self.failed_requests.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn active_clients(&self) -> usize {
        self.active_clients.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rejected_clients(&self) -> usize {
        self.rejected_clients.load(Ordering::Relaxed)
    }
}
