use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpListener,
    task::JoinSet,
};
use tokio_util::codec::Framed;
use tracing::{debug, error, info, warn, Instrument};

use oddbuf_core::{GraphEngine, Oddbuf};
use oddbuf_wire::api::{self, Message};

use super::{handle_enable_disable, is_success, ServerOptions, ServerState};
use crate::ApiError;

/// Accepts connections and spawns a task per client.
pub(crate) struct ServerDriver<G> {
    pub(crate) listener: TcpListener,
    pub(crate) oddbuf: Arc<Oddbuf<G>>,
    pub(crate) options: Arc<ServerOptions>,
    /// Shared with the server front-end.
    pub(crate) state: Arc<ServerState>,
    /// One task per connected client.
    pub(crate) connections: JoinSet<Result<(), ApiError>>,
}

impl<G: GraphEngine> ServerDriver<G> {
    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        if let Some(max) = self.options.max_clients {
                            if self.state.stats.active_clients() >= max {
                                warn!(%addr, max, "max clients reached, rejecting connection");
                                self.state.stats.increment_rejected_clients();
                                continue;
                            }
                        }

                        if let Err(e) = stream.set_nodelay(true) {
                            warn!(%addr, err = ?e, "failed to set TCP_NODELAY");
                        }

                        info!(%addr, "new connection");
                        self.state.stats.increment_active_clients();

                        let oddbuf = Arc::clone(&self.oddbuf);
                        let state = Arc::clone(&self.state);
                        let span = tracing::debug_span!("connection", %addr);
                        self.connections.spawn(
                            async move { serve(stream, &*oddbuf, &*state).await }.instrument(span),
                        );
                    }
                    Err(e) => {
                        error!(err = ?e, "error accepting incoming connection");
                    }
                },
                Some(done) = self.connections.join_next() => {
                    self.state.stats.decrement_active_clients();

                    match done {
                        Ok(Ok(())) => debug!("client disconnected"),
                        Ok(Err(e)) => warn!(err = ?e, "client connection failed"),
                        Err(e) => error!(err = ?e, "connection task panicked"),
                    }
                }
            }
        }
    }
}

/// Reads requests off a connection and answers each in order until the peer hangs up.
pub(crate) async fn serve<Io, G>(
    io: Io,
    oddbuf: &Oddbuf<G>,
    state: &ServerState,
) -> Result<(), ApiError>
where
    Io: AsyncRead + AsyncWrite + Unpin,
    G: GraphEngine,
{
    let mut conn = Framed::new(io, api::Codec::new());

    while let Some(msg) = conn.next().await {
        match msg? {
            Message::EnableDisable(request) => {
                state.stats.increment_requests();

                let reply = handle_enable_disable(oddbuf, request);
                if !is_success(reply.retval) {
                    state.stats.increment_failed_requests();
                }

                conn.send(Message::EnableDisableReply(reply)).await?;
                state.stats.increment_replies();
            }
            Message::EnableDisableReply(reply) => {
                warn!(context = reply.context, "ignoring reply sent by a client");
            }
        }
    }

    Ok(())
}
