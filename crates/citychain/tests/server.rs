//! Integration tests for the Citychain server, handler, and full connection
//! flow over real TCP sockets.

use std::net::SocketAddr;
use std::time::Duration;

use citychain::prelude::*;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

// =========================================================================
// Helpers
// =========================================================================

/// Starts a server on a random port and returns the address.
async fn start_server() -> SocketAddr {
    start_server_with(RoomConfig::default()).await
}

async fn start_server_with(room_config: RoomConfig) -> SocketAddr {
    start_server_configured(room_config, SessionConfig::default()).await
}

async fn start_server_configured(
    room_config: RoomConfig,
    session_config: SessionConfig,
) -> SocketAddr {
    let server = CityChainServer::builder()
        .bind("127.0.0.1:0")
        .room_config(room_config)
        .session_config(session_config)
        .build()
        .await
        .expect("server should build");

    let addr = server.local_addr().expect("should have local addr");

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    addr
}

/// A test client speaking the framed JSON protocol.
struct Client {
    conn: TcpConnection,
}

impl Client {
    /// Connects and consumes the `names` snapshot.
    async fn connect(addr: SocketAddr) -> (Self, Vec<String>) {
        let conn = TcpConnection::connect(addr).await.expect("should connect");
        let client = Self { conn };
        match client.recv().await {
            Message::Names(names) => (client, names),
            other => panic!("expected names snapshot, got {other:?}"),
        }
    }

    /// Connects and claims `name`, consuming both replies.
    async fn named(addr: SocketAddr, name: &str) -> Self {
        let (client, _) = Self::connect(addr).await;
        client.send(Message::Name(name.into())).await;
        assert!(matches!(client.recv().await, Message::LenClients(_)));
        client
    }

    async fn send(&self, msg: Message) {
        let bytes = JsonCodec.encode(&msg).expect("encode");
        self.send_raw(&bytes).await;
    }

    async fn send_raw(&self, bytes: &[u8]) {
        self.conn.send(bytes).await.expect("send");
    }

    async fn recv(&self) -> Message {
        let data = tokio::time::timeout(RECV_TIMEOUT, self.conn.recv())
            .await
            .expect("timed out waiting for a message")
            .expect("recv failed")
            .expect("connection closed");
        JsonCodec.decode(&data).expect("decode")
    }

    async fn expect(&self, expected: Message) {
        assert_eq!(self.recv().await, expected);
    }

    async fn expect_chat(&self, text: &str) {
        self.expect(Message::chat(text)).await;
    }

    /// Joins `room` and waits until the server has processed the join.
    ///
    /// Naming a city in a room that hasn't started gets a reply, which
    /// makes a convenient sync point.
    async fn join_waiting(&self, room: &str) {
        self.send(Message::Room(room.into())).await;
        self.send(Message::chat("Lisbon")).await;
        self.expect_chat("The game has not started yet.").await;
    }

    /// Asserts nothing arrives for a short while.
    async fn expect_nothing(&self) {
        let quiet = Duration::from_millis(200);
        if let Ok(received) = tokio::time::timeout(quiet, self.conn.recv()).await {
            panic!("expected silence, got {received:?}");
        }
    }

    /// Waits for the server to close the connection, skipping anything
    /// still queued.
    async fn expect_closed(&self) {
        loop {
            match tokio::time::timeout(RECV_TIMEOUT, self.conn.recv()).await {
                Ok(Ok(None)) | Ok(Err(_)) => return,
                Ok(Ok(Some(_))) => continue,
                Err(_) => panic!("server did not close the connection"),
            }
        }
    }
}

/// Ann and Bob in a started "Word Wanderers" game, start-up messages
/// consumed.
async fn started_game(addr: SocketAddr) -> (Client, Client) {
    let ann = Client::named(addr, "Ann").await;
    let bob = Client::named(addr, "Bob").await;
    ann.join_waiting("Word Wanderers").await;
    bob.send(Message::Room("Word Wanderers".into())).await;

    let clients = Message::Clients(vec!["Ann".into(), "Bob".into()]);
    ann.expect_chat("Game started!").await;
    ann.expect(Message::start_game()).await;
    ann.expect(clients.clone()).await;
    bob.expect_chat("Game started!").await;
    bob.expect(clients).await;
    (ann, bob)
}

// =========================================================================
// Names
// =========================================================================

#[tokio::test]
async fn test_names_snapshot_on_connect() {
    let addr = start_server().await;

    let (ann, names) = Client::connect(addr).await;
    assert!(names.is_empty());

    ann.send(Message::Name("Ann".into())).await;
    ann.expect(Message::LenClients(vec![0, 0, 0, 0, 0])).await;

    let (_bob, names) = Client::connect(addr).await;
    assert_eq!(names, vec!["Ann"]);
}

#[tokio::test]
async fn test_duplicate_name_ignored() {
    let addr = start_server().await;
    let _ann = Client::named(addr, "Ann").await;
    let (bob, _) = Client::connect(addr).await;

    bob.send(Message::Name("Ann".into())).await;
    bob.send(Message::Name("Bob".into())).await;

    // Only the second claim gets a reply.
    assert!(matches!(bob.recv().await, Message::LenClients(_)));
    let (_cy, names) = Client::connect(addr).await;
    assert_eq!(names, vec!["Ann", "Bob"]);
}

#[tokio::test]
async fn test_rename_in_lobby() {
    let addr = start_server().await;
    let ann = Client::named(addr, "Ann").await;

    ann.send(Message::Name("Annie".into())).await;
    assert!(matches!(ann.recv().await, Message::LenClients(_)));

    let (_cy, names) = Client::connect(addr).await;
    assert_eq!(names, vec!["Annie"]);
}

#[tokio::test]
async fn test_claims_beyond_session_cap_ignored() {
    let addr = start_server_configured(
        RoomConfig::default(),
        SessionConfig {
            max_sessions: 2,
            ..SessionConfig::default()
        },
    )
    .await;
    let ann = Client::named(addr, "Ann").await;
    let _bob = Client::named(addr, "Bob").await;
    let (cy, _) = Client::connect(addr).await;

    cy.send(Message::Name("Cy".into())).await;
    cy.expect_nothing().await;

    // A full registry still greets newcomers with the snapshot.
    let (_dee, names) = Client::connect(addr).await;
    assert_eq!(names, vec!["Ann", "Bob"]);

    // A freed slot can be claimed again.
    ann.send(Message::Exit(" ".into())).await;
    ann.expect_closed().await;
    cy.send(Message::Name("Cy".into())).await;
    cy.expect(Message::LenClients(vec![0, 0, 0, 0, 0])).await;
}

#[tokio::test]
async fn test_room_without_name_ignored() {
    let addr = start_server().await;
    let (ann, _) = Client::connect(addr).await;

    ann.send(Message::Room("Word Wanderers".into())).await;
    ann.send(Message::Name("Ann".into())).await;

    ann.expect(Message::LenClients(vec![0, 0, 0, 0, 0])).await;
}

// =========================================================================
// Rooms
// =========================================================================

#[tokio::test]
async fn test_scenario_two_players_start_game() {
    let addr = start_server().await;
    let (_ann, _bob) = started_game(addr).await;

    let (cy, names) = Client::connect(addr).await;
    assert_eq!(names, vec!["Ann", "Bob"]);
    cy.send(Message::Name("Cy".into())).await;
    cy.expect(Message::LenClients(vec![2, 0, 0, 0, 0])).await;
}

#[tokio::test]
async fn test_room_not_found() {
    let addr = start_server().await;
    let ann = Client::named(addr, "Ann").await;

    ann.send(Message::Room("Nowhere".into())).await;

    ann.expect_chat("The room was not found!").await;
}

#[tokio::test]
async fn test_room_full() {
    let addr = start_server().await;
    let (_ann, _bob) = started_game(addr).await;
    let cy = Client::named(addr, "Cy").await;

    cy.send(Message::Room("Word Wanderers".into())).await;

    cy.expect_chat("The room is full!").await;
}

#[tokio::test]
async fn test_chat_in_lobby_ignored() {
    let addr = start_server().await;
    let ann = Client::named(addr, "Ann").await;

    ann.send(Message::chat("Paris")).await;
    ann.send(Message::Room("Nowhere".into())).await;

    ann.expect_chat("The room was not found!").await;
}

// =========================================================================
// Playing
// =========================================================================

#[tokio::test]
async fn test_scenario_city_chain() {
    let addr = start_server().await;
    let (ann, bob) = started_game(addr).await;

    ann.send(Message::chat("Rome")).await;
    ann.expect_chat("Your city: rome.").await;
    bob.expect_chat("Ann's city: rome.").await;

    bob.send(Message::chat("Paris")).await;
    bob.expect_chat("The city must begin with the letter 'e'. Try again.")
        .await;

    bob.send(Message::chat("Elgin")).await;
    bob.expect_chat("Your city: elgin.").await;
    ann.expect_chat("Bob's city: elgin.").await;

    ann.send(Message::chat("rome")).await;
    ann.expect_chat("This city has already been named.").await;
}

#[tokio::test]
async fn test_oversized_city_rejected_and_opponent_stays() {
    let addr = start_server().await;
    let (ann, bob) = started_game(addr).await;

    // Close to the frame limit once encoded.
    ann.send(Message::chat("a".repeat(65_000))).await;
    ann.expect_chat("The name of the city is too long (at most 100 characters).")
        .await;

    // Bob saw nothing of it and is still playing.
    ann.send(Message::chat("Rome")).await;
    ann.expect_chat("Your city: rome.").await;
    bob.expect_chat("Ann's city: rome.").await;
}

#[tokio::test]
async fn test_turns_enforced_when_configured() {
    let addr = start_server_with(RoomConfig {
        enforce_turns: true,
        ..RoomConfig::default()
    })
    .await;
    let (ann, bob) = started_game(addr).await;

    bob.send(Message::chat("Rome")).await;
    bob.expect_chat("It's not your turn.").await;

    ann.send(Message::chat("Rome")).await;
    ann.expect_chat("Your city: rome.").await;
    bob.expect_chat("Ann's city: rome.").await;
}

#[tokio::test]
async fn test_scenario_ban() {
    let addr = start_server().await;
    let (ann, bob) = started_game(addr).await;

    ann.send(Message::Ban("Bob".into())).await;

    bob.expect_chat("You were banned").await;
    bob.expect(Message::end_game()).await;
    bob.expect(Message::Ban("Word Wanderers".into())).await;
    ann.expect_chat("Bob left the game.").await;
    ann.expect(Message::end_game()).await;

    // The room reopened: a third connection gets straight in.
    let cy = Client::named(addr, "Cy").await;
    cy.join_waiting("Word Wanderers").await;

    // The banned connection stays out.
    bob.send(Message::Room("Word Wanderers".into())).await;
    bob.expect_chat("You were banned from this room.").await;

    // Ann was evicted by the reset and can come back.
    ann.send(Message::Room("Word Wanderers".into())).await;
    cy.expect_chat("Game started!").await;
    cy.expect(Message::start_game()).await;
    cy.expect(Message::Clients(vec!["Cy".into(), "Ann".into()]))
        .await;
}

#[tokio::test]
async fn test_scenario_time_out() {
    let addr = start_server().await;
    let (ann, bob) = started_game(addr).await;

    bob.send(Message::TimeOut("Bob".into())).await;

    bob.expect_chat("Timed out! You lose!").await;
    bob.expect(Message::end_game()).await;
    ann.expect_chat("You win!!").await;
    ann.expect_chat("Bob left the game.").await;
    ann.expect(Message::end_game()).await;
}

#[tokio::test]
async fn test_change_room() {
    let addr = start_server().await;
    let (ann, bob) = started_game(addr).await;

    ann.send(Message::ChangeRoom(" ".into())).await;
    bob.expect_chat("Ann left the game.").await;
    bob.expect(Message::end_game()).await;

    ann.join_waiting("City Slickers").await;
    bob.send(Message::Room("City Slickers".into())).await;
    ann.expect_chat("Game started!").await;
    bob.expect_chat("Game started!").await;
}

// =========================================================================
// Leaving
// =========================================================================

#[tokio::test]
async fn test_exit_releases_name_and_seat() {
    let addr = start_server().await;
    let (ann, bob) = started_game(addr).await;

    ann.send(Message::Exit(" ".into())).await;

    bob.expect_chat("Ann left the game.").await;
    bob.expect(Message::end_game()).await;
    ann.expect_closed().await;

    let (again, names) = Client::connect(addr).await;
    assert_eq!(names, vec!["Bob"]);
    again.send(Message::Name("Ann".into())).await;
    again.expect(Message::LenClients(vec![0, 0, 0, 0, 0])).await;
}

#[tokio::test]
async fn test_disconnect_mid_game_notifies_opponent() {
    let addr = start_server().await;
    let (ann, bob) = started_game(addr).await;

    drop(ann);

    bob.expect_chat("Ann left the game.").await;
    bob.expect(Message::end_game()).await;
}

#[tokio::test]
async fn test_malformed_message_closes_and_frees_name() {
    let addr = start_server().await;
    let ann = Client::named(addr, "Ann").await;

    ann.send_raw(b"definitely not json").await;
    ann.expect_closed().await;

    let _again = Client::named(addr, "Ann").await;
}

#[tokio::test]
async fn test_unknown_tag_closes_connection() {
    let addr = start_server().await;
    let ann = Client::named(addr, "Ann").await;

    ann.send_raw(br#"{"type":"teleport","body":"moon"}"#).await;

    ann.expect_closed().await;
}

#[tokio::test]
async fn test_server_only_message_closes_connection() {
    let addr = start_server().await;
    let ann = Client::named(addr, "Ann").await;

    ann.send(Message::Names(vec!["Mallory".into()])).await;

    ann.expect_closed().await;
}
