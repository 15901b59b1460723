//! # Citychain
//!
//! Server for a multiplayer word-chain game: players pick a name, join one
//! of a fixed set of rooms, and take turns naming cities that start with
//! the last letter of the previous city.
//!
//! The server owns the whole session: connection lifecycle, room
//! membership and capacity, round transitions, city-chain validation, bans
//! and timeouts, and the framed JSON protocol that carries it all.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use citychain::prelude::*;
//!
//! # async fn run() -> Result<(), CityChainError> {
//! let server = CityChainServer::builder()
//!     .bind("0.0.0.0:5555")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::CityChainError;
pub use server::{CityChainServer, CityChainServerBuilder};

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{CityChainError, CityChainServer, CityChainServerBuilder};
    pub use citychain_protocol::{Codec, JsonCodec, Message, ROOM_NAMES};
    pub use citychain_room::{RoomConfig, RoomState};
    pub use citychain_session::SessionConfig;
    pub use citychain_transport::{Connection, TcpConnection};
}
