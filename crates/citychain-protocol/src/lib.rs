//! Wire protocol for Citychain.
//!
//! - **Types** ([`Message`], [`ROOM_NAMES`]): the closed set of messages
//!   that client and server exchange.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how a message becomes the
//!   payload of one frame.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (frames) → Protocol (Message) → Room / Session
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{GAME_OVER, Message, ROOM_NAMES, START_GAME_BODY};
