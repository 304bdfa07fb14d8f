use std::{sync::Arc, time::Duration};

use futures::{SinkExt, StreamExt};
use rustc_hash::FxHashMap;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{mpsc, oneshot},
};
use tokio_util::codec::Framed;
use tracing::{debug, error, warn};

use oddbuf_wire::api::{self, EnableDisable, EnableDisableReply, Message};

use super::ClientState;
use crate::{ApiError, RequestContext};

pub(crate) enum Command {
    EnableDisable {
        sw_if_index: u32,
        enable_disable: bool,
        response: oneshot::Sender<Result<EnableDisableReply, ApiError>>,
    },
}

/// The client connection driver. Writes requests, and routes each reply to its waiter by context.
pub(crate) struct ClientDriver<Io> {
    /// The actual [`Framed`] connection with the API codec.
    pub(crate) conn: Framed<Io, api::Codec>,
    /// Commands from the client handles.
    pub(crate) from_client: mpsc::Receiver<Command>,
    /// Requests awaiting a reply, keyed by context.
    pub(crate) pending: FxHashMap<u32, oneshot::Sender<Result<EnableDisableReply, ApiError>>>,
    pub(crate) context: RequestContext,
    /// How often to forget requests whose waiter has given up.
    pub(crate) sweep_interval: Duration,
    pub(crate) state: Arc<ClientState>,
}

impl<Io: AsyncRead + AsyncWrite + Unpin> ClientDriver<Io> {
    pub(crate) async fn run(mut self) {
        let mut sweep = tokio::time::interval(self.sweep_interval);

        loop {
            tokio::select! {
                cmd = self.from_client.recv() => match cmd {
                    Some(cmd) => {
                        if let Err(e) = self.on_command(cmd).await {
                            error!(err = ?e, "failed to send request, closing connection");
                            break;
                        }
                    }
                    None => {
                        debug!("all client handles dropped, closing connection");
                        break;
                    }
                },
                frame = self.conn.next() => match frame {
                    Some(Ok(Message::EnableDisableReply(reply))) => self.on_reply(reply),
                    Some(Ok(other)) => {
                        warn!(msg_id = other.msg_id(), "ignoring unexpected message from server");
                    }
                    Some(Err(e)) => {
                        error!(err = ?e, "connection error");
                        break;
                    }
                    None => {
                        debug!("server closed the connection");
                        break;
                    }
                },
                _ = sweep.tick() => {
                    self.pending.retain(|_, waiter| !waiter.is_closed());
                }
            }
        }

        for (_, waiter) in self.pending.drain() {
            let _ = waiter.send(Err(ApiError::ConnectionClosed));
        }
    }

    async fn on_command(&mut self, cmd: Command) -> Result<(), ApiError> {
        match cmd {
            Command::EnableDisable { sw_if_index, enable_disable, response } => {
                let context = self.context.next();
                let request = EnableDisable { context, sw_if_index, enable_disable };

                self.pending.insert(context, response);
                self.state.stats.increment_requests();

                if let Err(e) = self.conn.send(Message::EnableDisable(request)).await {
                    if let Some(waiter) = self.pending.remove(&context) {
                        let _ = waiter.send(Err(ApiError::ConnectionClosed));
                    }
                    return Err(e.into());
                }
            }
        }

        Ok(())
    }

    fn on_reply(&mut self, reply: EnableDisableReply) {
        match self.pending.remove(&reply.context) {
            Some(waiter) => {
                let _ = waiter.send(Ok(reply));
            }
            None => {
                debug!(context = reply.context, "reply for unknown or abandoned request");
            }
        }
    }
}
