//! Rooms for Citychain.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! members, its city chain, and its phase.
//!
//! # Key types
//!
//! - [`RoomManager`]: the fixed set of rooms, looked up by name
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomState`]: round phase state machine
//! - [`RoomConfig`]: capacity and turn enforcement
//! - [`validate_city`]: the chain rule

mod config;
mod error;
mod manager;
mod room;
mod rules;

pub use config::{RoomConfig, RoomState};
pub use error::{CityError, RoomError};
pub use manager::RoomManager;
pub use room::{PlayerSender, RemoveReason, RoomHandle, RoomInfo};
pub use rules::{MAX_CITY_LEN, normalize_city, validate_city};
