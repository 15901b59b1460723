//! Room actor: an isolated Tokio task that owns one room.
//!
//! Each room runs in its own task and talks to the outside world through an
//! mpsc channel. Commands are handled one at a time, so membership, the city
//! chain and the phase are only ever touched by a single writer.
//!
//! Outbound traffic goes through each member's [`PlayerSender`]. Sending on
//! an unbounded channel never blocks, so a slow or dead client can't stall
//! the room. A send that fails means the member's connection task is gone;
//! the member is removed once the current command finishes.

use std::collections::HashSet;
use std::sync::Arc;

use citychain_protocol::Message;
use citychain_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::rules::validate_city;
use crate::{CityError, RoomConfig, RoomError, RoomState};

/// Channel sender for delivering outbound messages to a player.
pub type PlayerSender = mpsc::UnboundedSender<Message>;

/// Why a member is being removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveReason {
    /// The player left (exit, change of room, or a dropped connection).
    NormalExit,
    /// Another member banned the player.
    Ban,
    /// The player's turn timer ran out.
    Timeout,
}

impl std::fmt::Display for RemoveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NormalExit => write!(f, "normal-exit"),
            Self::Ban => write!(f, "ban"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in each variant is the reply channel.
pub(crate) enum RoomCommand {
    Join {
        conn_id: ConnectionId,
        name: String,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<RoomState, RoomError>>,
    },
    Remove {
        conn_id: ConnectionId,
        reason: RemoveReason,
        reply: oneshot::Sender<bool>,
    },
    SubmitCity {
        conn_id: ConnectionId,
        text: String,
        reply: oneshot::Sender<Result<String, RoomError>>,
    },
    Ban {
        by: ConnectionId,
        target: String,
        reply: oneshot::Sender<Result<ConnectionId, RoomError>>,
    },
    Forget {
        conn_id: ConnectionId,
    },
    Contains {
        conn_id: ConnectionId,
        reply: oneshot::Sender<bool>,
    },
    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },
}

/// A snapshot of a room.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    /// The room's fixed name.
    pub name: String,
    /// Current phase.
    pub state: RoomState,
    /// Number of members.
    pub player_count: usize,
    /// Capacity.
    pub max_players: usize,
    /// Member display names in join order.
    pub members: Vec<String>,
    /// Cities named so far this round.
    pub chain: Vec<String>,
}

/// Handle to a running room actor.
///
/// Cheap to clone: a name and an `mpsc::Sender`.
#[derive(Clone)]
pub struct RoomHandle {
    name: Arc<str>,
    sender: mpsc::Sender<RoomCommand>,
}

impl std::fmt::Debug for RoomHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomHandle").field("name", &self.name).finish()
    }
}

impl RoomHandle {
    /// Returns the room's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a member. Returns the phase after the join, so the caller can
    /// tell whether this join started the round.
    ///
    /// # Errors
    /// `RoomFull`, `Banned`, `AlreadyInRoom`, or `InvalidState` if a round
    /// is running.
    pub async fn join(
        &self,
        conn_id: ConnectionId,
        name: impl Into<String>,
        sender: PlayerSender,
    ) -> Result<RoomState, RoomError> {
        let name = name.into();
        self.request(|reply| RoomCommand::Join {
            conn_id,
            name,
            sender,
            reply,
        })
        .await?
    }

    /// Removes a member. Returns `false` if it wasn't a member, which is
    /// not an error: removal is idempotent.
    pub async fn remove(
        &self,
        conn_id: ConnectionId,
        reason: RemoveReason,
    ) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::Remove {
            conn_id,
            reason,
            reply,
        })
        .await
    }

    /// Submits a city. On success returns the normalized city that was
    /// appended to the chain.
    ///
    /// The room itself tells the submitter why a submission was rejected;
    /// the returned error is for the caller's bookkeeping.
    pub async fn submit_city(
        &self,
        conn_id: ConnectionId,
        text: impl Into<String>,
    ) -> Result<String, RoomError> {
        let text = text.into();
        self.request(|reply| RoomCommand::SubmitCity {
            conn_id,
            text,
            reply,
        })
        .await?
    }

    /// Bans the member called `target` on behalf of member `by`.
    /// Returns the banned connection.
    pub async fn ban(
        &self,
        by: ConnectionId,
        target: impl Into<String>,
    ) -> Result<ConnectionId, RoomError> {
        let target = target.into();
        self.request(|reply| RoomCommand::Ban { by, target, reply })
            .await?
    }

    /// Drops any ban recorded against `conn_id` (fire-and-forget).
    pub async fn forget(&self, conn_id: ConnectionId) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Forget { conn_id })
            .await
            .map_err(|_| self.unavailable())
    }

    /// Returns `true` if `conn_id` is currently a member.
    ///
    /// A player can stop being a member without asking, when the round
    /// ends and the room resets.
    pub async fn contains(&self, conn_id: ConnectionId) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::Contains { conn_id, reply })
            .await
    }

    /// Requests a snapshot of the room.
    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::GetInfo { reply }).await
    }

    /// Sends a command built around a fresh reply channel and waits for
    /// the answer.
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.name.to_string())
    }
}

/// One seat in a room.
struct Member {
    conn_id: ConnectionId,
    name: String,
    sender: PlayerSender,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    name: String,
    state: RoomState,
    config: RoomConfig,
    /// Join order matters: index 0 starts the round.
    members: Vec<Member>,
    /// Normalized cities accepted this round.
    chain: Vec<String>,
    /// Index into `members` of whoever may submit next (turn enforcement).
    turn: usize,
    /// Connections banned from this room, until they disconnect.
    banned: HashSet<ConnectionId>,
    /// Members whose outbound channel was found closed.
    dead: Vec<ConnectionId>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop until every handle is dropped.
    async fn run(mut self) {
        tracing::debug!(room = %self.name, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    conn_id,
                    name,
                    sender,
                    reply,
                } => {
                    let result = self.handle_join(conn_id, name, sender);
                    self.reap_dead();
                    let _ = reply.send(result.map(|_| self.state));
                }
                RoomCommand::Remove {
                    conn_id,
                    reason,
                    reply,
                } => {
                    let removed = self.handle_remove(conn_id, reason).is_some();
                    self.reap_dead();
                    let _ = reply.send(removed);
                }
                RoomCommand::SubmitCity {
                    conn_id,
                    text,
                    reply,
                } => {
                    let result = self.handle_submit(conn_id, &text);
                    self.reap_dead();
                    let _ = reply.send(result);
                }
                RoomCommand::Ban { by, target, reply } => {
                    let result = self.handle_ban(by, &target);
                    self.reap_dead();
                    let _ = reply.send(result);
                }
                RoomCommand::Forget { conn_id } => {
                    self.banned.remove(&conn_id);
                }
                RoomCommand::Contains { conn_id, reply } => {
                    let _ = reply.send(self.position(conn_id).is_some());
                }
                RoomCommand::GetInfo { reply } => {
                    let _ = reply.send(self.info());
                }
            }
        }

        tracing::debug!(room = %self.name, "room actor stopped");
    }

    fn handle_join(
        &mut self,
        conn_id: ConnectionId,
        name: String,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        if self.banned.contains(&conn_id) {
            return Err(RoomError::Banned(conn_id, self.name.clone()));
        }
        if self.position(conn_id).is_some() {
            return Err(RoomError::AlreadyInRoom(conn_id, self.name.clone()));
        }
        if self.members.len() >= self.config.max_players {
            return Err(RoomError::RoomFull(self.name.clone()));
        }
        if !self.state.is_joinable() {
            return Err(RoomError::InvalidState(format!(
                "cannot join room in state {}",
                self.state
            )));
        }

        tracing::info!(
            room = %self.name,
            %conn_id,
            player = %name,
            players = self.members.len() + 1,
            "player joined"
        );
        self.members.push(Member {
            conn_id,
            name,
            sender,
        });

        if self.members.len() >= self.config.min_players {
            self.start_game();
        }

        Ok(())
    }

    /// Removes a member and runs the reason-specific notifications.
    /// Returns the removed member, or `None` if it wasn't present.
    fn handle_remove(
        &mut self,
        conn_id: ConnectionId,
        reason: RemoveReason,
    ) -> Option<Member> {
        let idx = self.position(conn_id)?;
        let member = self.members.remove(idx);

        // Keep `turn` pointing at the same remaining member.
        if idx < self.turn {
            self.turn -= 1;
        }
        if self.turn >= self.members.len() {
            self.turn = 0;
        }

        tracing::info!(
            room = %self.name,
            %conn_id,
            player = %member.name,
            %reason,
            players = self.members.len(),
            "player removed"
        );

        // The removed member is no longer in `members`; a failed send to
        // it needs no follow-up.
        match reason {
            RemoveReason::Ban => {
                let _ = member.sender.send(Message::chat("You were banned"));
                let _ = member.sender.send(Message::end_game());
            }
            RemoveReason::Timeout => {
                let _ = member.sender.send(Message::chat("Timed out! You lose!"));
                let _ = member.sender.send(Message::end_game());
                self.broadcast(Message::chat("You win!!"), None);
            }
            RemoveReason::NormalExit => {}
        }

        self.broadcast(
            Message::chat(format!("{} left the game.", member.name)),
            None,
        );

        if self.members.len() < self.config.min_players {
            self.end_game();
        }

        Some(member)
    }

    fn handle_submit(
        &mut self,
        conn_id: ConnectionId,
        text: &str,
    ) -> Result<String, RoomError> {
        let idx = self
            .position(conn_id)
            .ok_or_else(|| RoomError::NotInRoom(conn_id, self.name.clone()))?;

        if !self.state.is_active() {
            self.tell(idx, Message::chat("The game has not started yet."));
            return Err(RoomError::InvalidState(format!(
                "cannot submit a city in state {}",
                self.state
            )));
        }

        if self.config.enforce_turns && idx != self.turn {
            self.tell(idx, Message::chat(CityError::NotYourTurn.to_string()));
            return Err(CityError::NotYourTurn.into());
        }

        let city = match validate_city(text, &self.chain) {
            Ok(city) => city,
            Err(e) => {
                tracing::debug!(
                    room = %self.name,
                    %conn_id,
                    reason = %e,
                    "city rejected"
                );
                self.tell(idx, Message::chat(e.to_string()));
                return Err(e.into());
            }
        };

        self.chain.push(city.clone());
        self.turn = (idx + 1) % self.members.len();
        tracing::debug!(
            room = %self.name,
            %conn_id,
            %city,
            chain_len = self.chain.len(),
            "city accepted"
        );

        self.tell(idx, Message::chat(format!("Your city: {city}.")));
        let announcement =
            Message::chat(format!("{}'s city: {city}.", self.members[idx].name));
        self.broadcast(announcement, Some(conn_id));

        Ok(city)
    }

    fn handle_ban(
        &mut self,
        by: ConnectionId,
        target: &str,
    ) -> Result<ConnectionId, RoomError> {
        if self.position(by).is_none() {
            return Err(RoomError::NotInRoom(by, self.name.clone()));
        }
        let target_id = self
            .members
            .iter()
            .find(|m| m.name == target)
            .map(|m| m.conn_id)
            .ok_or_else(|| {
                RoomError::PlayerNotFound(target.to_string(), self.name.clone())
            })?;
        if target_id == by {
            return Err(RoomError::InvalidState(
                "a player cannot ban themselves".into(),
            ));
        }

        self.banned.insert(target_id);
        if let Some(banned) = self.handle_remove(target_id, RemoveReason::Ban) {
            // Tells the client which room to keep off its list.
            let _ = banned.sender.send(Message::Ban(self.name.clone()));
        }

        Ok(target_id)
    }

    fn start_game(&mut self) {
        debug_assert!(self.state.can_transition_to(RoomState::Active));
        self.state = RoomState::Active;
        self.turn = 0;
        tracing::info!(
            room = %self.name,
            players = self.members.len(),
            "game started"
        );

        self.broadcast(Message::chat("Game started!"), None);
        if !self.members.is_empty() {
            self.tell(0, Message::start_game());
        }
        let names = self.members.iter().map(|m| m.name.clone()).collect();
        self.broadcast(Message::Clients(names), None);
    }

    /// Ends the round (if one was running) and resets to an empty
    /// `Waiting` room.
    fn end_game(&mut self) {
        if self.state.is_active() {
            self.state = RoomState::Ended;
            tracing::info!(
                room = %self.name,
                cities = self.chain.len(),
                "game ended"
            );
        }

        self.broadcast(Message::end_game(), None);
        self.chain.clear();
        self.members.clear();
        self.turn = 0;
        self.state = RoomState::Waiting;
    }

    /// Removes members whose channel turned out to be closed. Removing one
    /// can reveal another, so loop until none are left.
    fn reap_dead(&mut self) {
        while let Some(conn_id) = self.dead.pop() {
            if self.handle_remove(conn_id, RemoveReason::NormalExit).is_some() {
                tracing::warn!(
                    room = %self.name,
                    %conn_id,
                    "removed unreachable player"
                );
            }
        }
    }

    /// Sends to every member except `exclude`. Never fails: closed
    /// channels are queued for removal instead.
    fn broadcast(&mut self, msg: Message, exclude: Option<ConnectionId>) {
        for member in &self.members {
            if Some(member.conn_id) == exclude {
                continue;
            }
            if member.sender.send(msg.clone()).is_err() {
                self.dead.push(member.conn_id);
            }
        }
    }

    /// Sends to the member at `idx`.
    fn tell(&mut self, idx: usize, msg: Message) {
        let member = &self.members[idx];
        if member.sender.send(msg).is_err() {
            self.dead.push(member.conn_id);
        }
    }

    fn position(&self, conn_id: ConnectionId) -> Option<usize> {
        self.members.iter().position(|m| m.conn_id == conn_id)
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            name: self.name.clone(),
            state: self.state,
            player_count: self.members.len(),
            max_players: self.config.max_players,
            members: self.members.iter().map(|m| m.name.clone()).collect(),
            chain: self.chain.clone(),
        }
    }
}

/// Spawns a new room actor task and returns a handle to it.
///
/// `channel_size` bounds the command queue; callers wait when it is full.
pub(crate) fn spawn_room(
    name: &str,
    config: RoomConfig,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = RoomActor {
        name: name.to_string(),
        state: RoomState::Waiting,
        config,
        members: Vec::new(),
        chain: Vec::new(),
        turn: 0,
        banned: HashSet::new(),
        dead: Vec::new(),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        name: Arc::from(name),
        sender: tx,
    }
}
