use crate::{
    directory::{Directory, UserDirectory},
    notify::{LogNotifier, Notifier},
    permission::{DefaultPermission, Permission},
    repos::Repos,
    session::{Session, SessionData, State},
    Config,
};
use anyhow::{Context as _, Result};
use asn_lib::{id::validate_tables, Blob, Pool};
use asn_network::{Accepted, Handle};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::{TcpListener, TcpStream};
use tracing_futures::Instrument as _;

/// everything the sessions of the server share
pub struct Context {
    pub config: Config,
    pub repos: Repos,
    pub(crate) directory: Box<dyn Directory + Send + Sync>,
    pub(crate) permission: Box<dyn Permission + Send + Sync>,
    pub(crate) notifier: Box<dyn Notifier + Send + Sync>,
    pub(crate) sessions: Pool<SessionData>,
    pub(crate) blobs: Pool<Blob>,
}

pub struct Server {
    context: Arc<Context>,
}

impl Context {
    /// context with the directory of the configured users, the default
    /// permission and notifier
    pub fn new(config: Config) -> Self {
        let directory = UserDirectory::new(config.users.clone());
        Self::with(config, directory, DefaultPermission, LogNotifier)
    }

    pub fn with<D, P, N>(config: Config, directory: D, permission: P, notifier: N) -> Self
    where
        D: Directory + Send + Sync + 'static,
        P: Permission + Send + Sync + 'static,
        N: Notifier + Send + Sync + 'static,
    {
        Self {
            repos: Repos::new(config.repos.clone()),
            directory: Box::new(directory),
            permission: Box::new(permission),
            notifier: Box::new(notifier),
            sessions: Pool::new(config.pool_size),
            blobs: Pool::new(config.pool_size),
            config,
        }
    }

    /// sessions waiting for reuse
    pub fn pooled_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// drop the sessions and blobs waiting for reuse
    pub fn flush_pools(&self) {
        self.sessions.clear();
        self.blobs.clear();
    }
}

impl Server {
    /// check the identifier tables and prepare the shared context
    pub fn new(context: Context) -> Result<Self> {
        validate_tables().context("Inconsistent identifier tables")?;
        context.config.check()?;

        Ok(Self {
            context: Arc::new(context),
        })
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// listen to the configured address and accept connections until an
    /// error happens on the listener
    pub async fn serve(self) -> Result<()> {
        let listen_address = self.context.config.listen_address;
        let listener = TcpListener::bind(listen_address)
            .await
            .with_context(|| format!("Cannot listen to {}", listen_address))?;

        self.serve_with(listener).await
    }

    /// accept connections on `listener`, every connection is handled in
    /// its own task
    pub async fn serve_with(self, listener: TcpListener) -> Result<()> {
        let listen_address = listener
            .local_addr()
            .context("Cannot get the address of the listener")?;
        tracing::info!(%listen_address, "listening for inbound connections");

        loop {
            let (stream, peer) = listener
                .accept()
                .await
                .context("Failed to accept a new connection")?;

            let context = Arc::clone(&self.context);
            tokio::spawn(
                async move {
                    if let Err(error) = handle_connection(context, stream, peer).await {
                        tracing::warn!(reason = ?error, "connection closed on error")
                    }
                }
                .in_current_span(),
            );
        }
    }
}

#[tracing::instrument(skip(context, stream), level = "info")]
async fn handle_connection(context: Arc<Context>, stream: TcpStream, peer: SocketAddr) -> Result<()> {
    let (reader, writer) = stream.into_split();

    let keys = &context.config.keys.server;
    let Accepted {
        mut handle,
        ephemeral,
        crypto_box,
    } = Handle::accept(reader, writer)
        .accept(&keys.encr, &keys.secret)
        .await?;

    let mut session = Session::new(Arc::clone(&context));
    session.key_exchange(ephemeral, crypto_box);

    tracing::info!(ephemeral = %ephemeral.short(), "connection accepted");

    while let Some(frame) = handle.receive().await {
        let frame = frame?;

        // blobs are persisted by the dispatch, keep it off the runtime
        let (returned, result) = tokio::task::spawn_blocking(move || {
            let result = session
                .receive(&frame)
                .and_then(|pdu| session.dispatch(pdu));
            (session, result)
        })
        .await
        .context("Failed to await the dispatch of the unit")?;
        session = returned;

        // acknowledgments are queued even when the request fails
        while let Some(ack) = session.next_outbound() {
            handle.send(ack).await?;
        }

        match result {
            Ok(dispatched) => {
                tracing::debug!(session = %session.name(), ?dispatched, "unit handled")
            }
            Err(error) if error.is_fatal() => {
                return Err(error).context("Cannot continue the session");
            }
            Err(error) => {
                tracing::warn!(
                    session = %session.name(),
                    kind = ?error.kind(),
                    reason = %error,
                    "unit rejected"
                )
            }
        }

        if session.state() == State::Quitting {
            break;
        }
    }

    tracing::info!(session = %session.name(), "connection closed");

    Ok(())
}
