//! Per-connection handler: message routing and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task that drains the player's outbound queue onto the
//! socket. The flow is:
//!   1. Spawn the writer, queue the `names` snapshot
//!   2. Loop: receive frames → decode → dispatch by message type
//!   3. Cleanup: leave the room, release the name, flush, close

use std::sync::Arc;
use std::time::Duration;

use citychain_protocol::{Codec, Message};
use citychain_room::{PlayerSender, RemoveReason, RoomError, RoomHandle};
use citychain_transport::{Connection, ConnectionId, MAX_FRAME_LEN, TcpConnection};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::CityChainError;
use crate::server::ServerState;

/// How long cleanup waits for queued outbound messages to reach the
/// socket before giving up on them.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// What the read loop does after a message.
enum Flow {
    Continue,
    Close,
}

/// The connection's view of its player.
struct Player {
    conn_id: ConnectionId,
    /// Display name, once claimed.
    name: Option<String>,
    /// The room this connection last joined. May be stale: a room that
    /// resets evicts its members without telling their handlers.
    room: Option<RoomHandle>,
    outbound: PlayerSender,
}

impl Player {
    /// Queues a message for the writer task. A closed queue means the
    /// writer is gone; the read loop notices that on its own.
    fn send(&self, msg: Message) {
        let _ = self.outbound.send(msg);
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: TcpConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), CityChainError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let (outbound, outbound_rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_loop(
        Arc::clone(&conn),
        Arc::clone(&state),
        outbound_rx,
    ));

    let mut player = Player {
        conn_id,
        name: None,
        room: None,
        outbound,
    };

    let names = state.sessions.lock().await.names();
    player.send(Message::Names(names));

    let result = read_loop(&conn, &state, &mut player).await;

    cleanup(&conn, &state, player, writer).await;
    result
}

/// Encodes and writes queued messages until every sender is dropped.
///
/// A message too large to frame is logged and skipped so it cannot take
/// the connection down.
async fn write_loop<C: Codec>(
    conn: Arc<TcpConnection>,
    state: Arc<ServerState<C>>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
) -> Result<(), CityChainError> {
    while let Some(msg) = outbound.recv().await {
        let bytes = state.codec.encode(&msg)?;
        if bytes.len() > MAX_FRAME_LEN {
            tracing::warn!(
                conn_id = %conn.id(),
                kind = msg.kind(),
                len = bytes.len(),
                "dropping oversized outbound message"
            );
            continue;
        }
        conn.send(&bytes).await?;
    }
    Ok(())
}

/// Receives one message at a time until the peer leaves, misbehaves, or
/// becomes unreachable.
async fn read_loop<C: Codec>(
    conn: &TcpConnection,
    state: &ServerState<C>,
    player: &mut Player,
) -> Result<(), CityChainError> {
    let conn_id = player.conn_id;

    loop {
        let received = tokio::select! {
            received = conn.recv() => Some(received),
            () = player.outbound.closed() => None,
        };

        let data = match received {
            Some(Ok(Some(data))) => data,
            Some(Ok(None)) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                return Ok(());
            }
            Some(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                return Err(e.into());
            }
            None => {
                tracing::debug!(%conn_id, "outbound writer stopped");
                return Ok(());
            }
        };

        let msg: Message = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "malformed message");
                return Err(e.into());
            }
        };

        tracing::trace!(%conn_id, kind = msg.kind(), "message received");
        if let Flow::Close = dispatch(state, player, msg).await? {
            return Ok(());
        }
    }
}

/// Routes one decoded client message.
async fn dispatch<C: Codec>(
    state: &ServerState<C>,
    player: &mut Player,
    msg: Message,
) -> Result<Flow, CityChainError> {
    if msg.is_server_only() {
        tracing::warn!(
            conn_id = %player.conn_id,
            kind = msg.kind(),
            "client sent a server-only message"
        );
        return Ok(Flow::Close);
    }

    match msg {
        Message::Name(name) => claim_name(state, player, &name).await?,
        Message::Room(room) => join_room(state, player, &room).await?,
        Message::Chat(text) => submit_city(player, text).await?,
        Message::Ban(target) => ban(player, target).await?,
        Message::ChangeRoom(_) => leave_room(player, RemoveReason::NormalExit).await?,
        Message::TimeOut(_) => leave_room(player, RemoveReason::Timeout).await?,
        Message::Exit(_) => {
            tracing::info!(conn_id = %player.conn_id, "client exited");
            return Ok(Flow::Close);
        }
        // Rejected above.
        Message::LenClients(_)
        | Message::Clients(_)
        | Message::StartGame(_)
        | Message::EndGame(_)
        | Message::Names(_) => {}
    }
    Ok(Flow::Continue)
}

async fn claim_name<C: Codec>(
    state: &ServerState<C>,
    player: &mut Player,
    name: &str,
) -> Result<(), CityChainError> {
    let conn_id = player.conn_id;

    if let Some(room) = &player.room {
        if room.contains(conn_id).await? {
            tracing::debug!(%conn_id, "name change ignored while in a room");
            return Ok(());
        }
        player.room = None;
    }

    let claimed = state
        .sessions
        .lock()
        .await
        .claim(conn_id, name)
        .map(|session| session.name.clone());

    match claimed {
        Ok(name) => {
            player.name = Some(name);
            let occupancy = state.rooms.occupancy().await;
            player.send(Message::LenClients(occupancy));
        }
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "name claim ignored");
        }
    }
    Ok(())
}

async fn join_room<C: Codec>(
    state: &ServerState<C>,
    player: &mut Player,
    room_name: &str,
) -> Result<(), CityChainError> {
    let conn_id = player.conn_id;

    let Some(name) = player.name.clone() else {
        tracing::debug!(%conn_id, "room request ignored: no name");
        return Ok(());
    };

    let room = match state.rooms.get(room_name) {
        Ok(room) => room.clone(),
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "room request rejected");
            player.send(Message::chat("The room was not found!"));
            return Ok(());
        }
    };

    if let Some(current) = player.room.take() {
        if current.name() == room.name() && current.contains(conn_id).await? {
            player.room = Some(current);
            return Ok(());
        }
        current.remove(conn_id, RemoveReason::NormalExit).await?;
    }

    match room.join(conn_id, name, player.outbound.clone()).await {
        Ok(phase) => {
            tracing::debug!(%conn_id, room = room.name(), %phase, "joined room");
            player.room = Some(room);
        }
        Err(RoomError::RoomFull(_)) => player.send(Message::chat("The room is full!")),
        Err(RoomError::Banned(..)) => {
            player.send(Message::chat("You were banned from this room."));
        }
        Err(RoomError::InvalidState(_)) => {
            player.send(Message::chat("The game is already in progress."));
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn submit_city(player: &mut Player, text: String) -> Result<(), CityChainError> {
    let conn_id = player.conn_id;
    let Some(room) = &player.room else {
        tracing::debug!(%conn_id, "chat ignored in lobby");
        return Ok(());
    };

    // The room has already told the player why a city was rejected.
    match room.submit_city(conn_id, text).await {
        Ok(city) => tracing::debug!(%conn_id, %city, "city accepted"),
        Err(RoomError::NotInRoom(..)) => player.room = None,
        Err(e @ RoomError::Unavailable(_)) => return Err(e.into()),
        Err(e) => tracing::debug!(%conn_id, error = %e, "city rejected"),
    }
    Ok(())
}

async fn ban(player: &mut Player, target: String) -> Result<(), CityChainError> {
    let conn_id = player.conn_id;
    let Some(room) = &player.room else {
        tracing::debug!(%conn_id, "ban ignored in lobby");
        return Ok(());
    };

    match room.ban(conn_id, target).await {
        Ok(banned) => tracing::info!(%conn_id, %banned, room = room.name(), "player banned"),
        Err(RoomError::NotInRoom(..)) => player.room = None,
        Err(e @ RoomError::Unavailable(_)) => return Err(e.into()),
        Err(e) => tracing::debug!(%conn_id, error = %e, "ban rejected"),
    }
    Ok(())
}

async fn leave_room(player: &mut Player, reason: RemoveReason) -> Result<(), CityChainError> {
    if let Some(room) = player.room.take() {
        room.remove(player.conn_id, reason).await?;
    }
    Ok(())
}

/// The single exit path for a connection, however the read loop ended.
async fn cleanup<C: Codec>(
    conn: &TcpConnection,
    state: &ServerState<C>,
    player: Player,
    mut writer: JoinHandle<Result<(), CityChainError>>,
) {
    let Player {
        conn_id,
        room,
        outbound,
        ..
    } = player;

    if let Some(room) = room {
        if let Err(e) = room.remove(conn_id, RemoveReason::NormalExit).await {
            tracing::warn!(%conn_id, error = %e, "failed to leave room");
        }
    }
    state.sessions.lock().await.release(conn_id);
    state.rooms.forget(conn_id).await;

    // Once the room has dropped its copy, this is the last sender and the
    // writer ends after draining the queue.
    drop(outbound);
    match tokio::time::timeout(FLUSH_TIMEOUT, &mut writer).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => tracing::debug!(%conn_id, error = %e, "writer stopped"),
        Ok(Err(e)) => tracing::warn!(%conn_id, error = %e, "writer task failed"),
        Err(_) => {
            tracing::debug!(%conn_id, "outbound flush timed out");
            writer.abort();
        }
    }

    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
    tracing::info!(%conn_id, "connection cleaned up");
}
