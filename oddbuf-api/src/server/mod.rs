use std::{net::SocketAddr, sync::Arc};

use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpListener, ToSocketAddrs},
    task::{JoinHandle, JoinSet},
};
use tracing::{debug, Instrument};

use oddbuf_core::{status, status_code, GraphEngine, InterfaceHandle, Oddbuf};
use oddbuf_wire::api::{EnableDisable, EnableDisableReply};

use crate::ApiError;

mod driver;
use driver::{serve, ServerDriver};

mod stats;
pub use stats::ApiStats;

#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// The maximum number of concurrent clients.
    pub max_clients: Option<usize>,
}

impl ServerOptions {
    /// Sets the number of maximum concurrent clients.
    pub fn max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = Some(max_clients);
        self
    }
}

/// Server state, shared between the accept task, connection tasks and the server.
#[derive(Debug, Default)]
pub(crate) struct ServerState {
    pub(crate) stats: ApiStats,
}

/// Remote adapter over the toggle action: decodes the target and maps the result onto the
/// status code carried by the reply.
pub fn handle_enable_disable<G: GraphEngine>(
    oddbuf: &Oddbuf<G>,
    request: EnableDisable,
) -> EnableDisableReply {
    let handle = InterfaceHandle::new(request.sw_if_index);
    let retval = status_code(&oddbuf.set_feature(handle, request.enable_disable));

    debug!(context = request.context, %handle, enable = request.enable_disable, retval, "handled request");

    EnableDisableReply { context: request.context, retval }
}

/// Serves the oddbuf control API over TCP, or over any byte stream via
/// [`ApiServer::serve_connection`].
pub struct ApiServer<G> {
    oddbuf: Arc<Oddbuf<G>>,
    options: Arc<ServerOptions>,
    state: Arc<ServerState>,
    local_addr: Option<SocketAddr>,
    /// Internal task representing a running [`ServerDriver`].
    _driver_task: Option<JoinHandle<()>>,
}

impl<G: GraphEngine> ApiServer<G> {
    pub fn new(oddbuf: Arc<Oddbuf<G>>) -> Self {
        Self::with_options(oddbuf, ServerOptions::default())
    }

    pub fn with_options(oddbuf: Arc<Oddbuf<G>>, options: ServerOptions) -> Self {
        Self {
            oddbuf,
            options: Arc::new(options),
            state: Arc::new(ServerState::default()),
            local_addr: None,
            _driver_task: None,
        }
    }

    /// Binds the server to the given address. This spawns the accept task.
    pub async fn bind(&mut self, addr: impl ToSocketAddrs) -> Result<(), ApiError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr().map_err(|_| ApiError::NoValidEndpoints)?;

        let span = tracing::info_span!(parent: None, "oddbuf_api_server", ?local_addr);
        span.in_scope(|| debug!("listening"));

        let driver = ServerDriver {
            listener,
            oddbuf: Arc::clone(&self.oddbuf),
            options: Arc::clone(&self.options),
            state: Arc::clone(&self.state),
            connections: JoinSet::new(),
        };

        self._driver_task = Some(tokio::spawn(driver.run().instrument(span)));
        self.local_addr = Some(local_addr);

        Ok(())
    }

    /// Serves requests from a single, already established connection until it closes.
    pub async fn serve_connection<Io>(&self, io: Io) -> Result<(), ApiError>
    where
        Io: AsyncRead + AsyncWrite + Unpin,
    {
        self.state.stats.increment_active_clients();
        let result = serve(io, &*self.oddbuf, &*self.state).await;
        self.state.stats.decrement_active_clients();

        result
    }

    /// Returns the local address this server is bound to. `None` if the server is not bound.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn stats(&self) -> &ApiStats {
        &self.state.stats
    }

    pub fn oddbuf(&self) -> &Arc<Oddbuf<G>> {
        &self.oddbuf
    }
}

/// Returns `true` if `retval` reports success.
#[inline]
pub const fn is_success(retval: i32) -> bool {
    retval == status::OK
}
