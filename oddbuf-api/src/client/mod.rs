use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use rustc_hash::FxHashMap;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpStream, ToSocketAddrs},
    sync::{mpsc, oneshot},
};
use tokio_util::codec::Framed;
use tracing::Instrument;

use oddbuf_core::status;
use oddbuf_wire::api;

use crate::{ApiError, RequestContext, DEFAULT_QUEUE_SIZE};

mod driver;
use driver::{ClientDriver, Command};

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// How long to wait for a reply.
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(5) }
    }
}

impl ClientOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Statistics for an API client.
#[derive(Debug, Default)]
pub struct ClientStats {
    /// Requests written to the connection
    requests: AtomicUsize,
    /// Replies carrying a failure status
    async_errors: AtomicUsize,
    /// Requests that got no reply in time
    timeouts: AtomicUsize,
}

impl ClientStats {
    #[inline]
    pub(crate) fn increment_requests(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_async_errors(&self) {
        self.async_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_timeouts(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn async_errors(&self) -> usize {
        self.async_errors.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn timeouts(&self) -> usize {
        self.timeouts.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub(crate) struct ClientState {
    pub(crate) stats: ClientStats,
}

/// A handle to a control API connection. Cheap to clone; all clones share one connection.
#[derive(Debug, Clone)]
pub struct ApiClient {
    to_driver: mpsc::Sender<Command>,
    options: Arc<ClientOptions>,
    state: Arc<ClientState>,
}

impl ApiClient {
    /// Connects to a server over TCP with the default options.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ApiError> {
        Self::connect_with_options(addr, ClientOptions::default()).await
    }

    pub async fn connect_with_options(
        addr: impl ToSocketAddrs,
        options: ClientOptions,
    ) -> Result<Self, ApiError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;

        tracing::debug!(peer = ?stream.peer_addr().ok(), "connected");

        Ok(Self::with_io(stream, options))
    }

    /// Runs the client over an established byte stream. This spawns the connection driver.
    pub fn with_io<Io>(io: Io, options: ClientOptions) -> Self
    where
        Io: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (to_driver, from_client) = mpsc::channel(DEFAULT_QUEUE_SIZE);
        let state = Arc::new(ClientState::default());

        let driver = ClientDriver {
            conn: Framed::new(io, api::Codec::new()),
            from_client,
            pending: FxHashMap::default(),
            context: RequestContext::default(),
            sweep_interval: options.timeout.max(MIN_SWEEP_INTERVAL),
            state: Arc::clone(&state),
        };

        let span = tracing::info_span!(parent: None, "oddbuf_api_client");
        tokio::spawn(driver.run().instrument(span));

        Self { to_driver, options: Arc::new(options), state }
    }

    /// Enables or disables the oddbuf stage on the given interface. A non-zero status from the
    /// server is returned as [`ApiError::Rejected`].
    pub async fn enable_disable(&self, sw_if_index: u32, enable: bool) -> Result<(), ApiError> {
        let (response, rx) = oneshot::channel();

        self.to_driver
            .send(Command::EnableDisable { sw_if_index, enable_disable: enable, response })
            .await
            .map_err(|_| ApiError::ConnectionClosed)?;

        let reply = match tokio::time::timeout(self.options.timeout, rx).await {
            Ok(reply) => reply.map_err(|_| ApiError::ConnectionClosed)??,
            Err(_) => {
                self.state.stats.increment_timeouts();
                return Err(ApiError::Timeout);
            }
        };

        if reply.retval != status::OK {
            self.state.stats.increment_async_errors();
            return Err(ApiError::Rejected(reply.retval));
        }

        Ok(())
    }

    pub fn stats(&self) -> &ClientStats {
        &self.state.stats
    }
}
