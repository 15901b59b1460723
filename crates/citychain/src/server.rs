//! `CityChainServer` builder and server loop.
//!
//! This is the entry point for running a Citychain server. It ties
//! together all the layers: transport → protocol → session → room.

use std::sync::Arc;

use citychain_protocol::{Codec, JsonCodec, ROOM_NAMES};
use citychain_room::{RoomConfig, RoomManager};
use citychain_session::{SessionConfig, SessionRegistry};
use citychain_transport::{MAX_FRAME_LEN, Transport, TcpTransport};
use tokio::sync::Mutex;

use crate::CityChainError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. Only the
/// registry needs a lock; rooms serialize their own commands.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) sessions: Mutex<SessionRegistry>,
    pub(crate) rooms: RoomManager,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Citychain server.
///
/// # Example
///
/// ```rust,no_run
/// use citychain::prelude::*;
///
/// # async fn run() -> Result<(), CityChainError> {
/// let server = CityChainServer::builder()
///     .bind("0.0.0.0:5555")
///     .room_config(RoomConfig {
///         enforce_turns: true,
///         ..RoomConfig::default()
///     })
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct CityChainServerBuilder {
    bind_addr: String,
    room_names: Vec<String>,
    room_config: RoomConfig,
    session_config: SessionConfig,
}

impl CityChainServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:5555".to_string(),
            room_names: ROOM_NAMES.iter().map(|name| name.to_string()).collect(),
            room_config: RoomConfig::default(),
            session_config: SessionConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Replaces the room list. Order is the order clients see.
    pub fn room_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.room_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the configuration shared by every room.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Binds the listener, spawns the rooms, and returns a server ready to
    /// [`run`](CityChainServer::run).
    ///
    /// Uses `JsonCodec` on a `TcpTransport`.
    ///
    /// # Errors
    /// Returns [`CityChainError::Config`] if a full `names` snapshot could
    /// exceed the transport's frame limit, before anything is bound.
    pub async fn build(self) -> Result<CityChainServer<JsonCodec>, CityChainError> {
        let names_payload = self.session_config.max_names_payload();
        if names_payload > MAX_FRAME_LEN {
            return Err(CityChainError::Config(format!(
                "{} names of up to {} characters need {names_payload} bytes, \
                 the frame limit is {MAX_FRAME_LEN}",
                self.session_config.max_sessions, self.session_config.max_name_len,
            )));
        }

        let transport = TcpTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionRegistry::new(self.session_config)),
            rooms: RoomManager::new(self.room_names.as_slice(), self.room_config),
            codec: JsonCodec,
        });

        Ok(CityChainServer { transport, state })
    }
}

impl Default for CityChainServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Citychain server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct CityChainServer<C: Codec> {
    transport: TcpTransport,
    state: Arc<ServerState<C>>,
}

impl CityChainServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> CityChainServerBuilder {
        CityChainServerBuilder::new()
    }
}

impl<C: Codec> CityChainServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a handler task for each accepted connection. A failed accept
    /// is logged and the loop carries on. Runs until the process is
    /// terminated.
    pub async fn run(mut self) -> Result<(), CityChainError> {
        tracing::info!(
            addr = ?self.transport.local_addr().ok(),
            rooms = self.state.rooms.len(),
            "Citychain server running"
        );

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
