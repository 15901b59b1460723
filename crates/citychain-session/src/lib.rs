//! Player sessions for Citychain.
//!
//! A session is born when a connection claims a display name and dies when
//! that connection closes. The [`SessionRegistry`] is the shared table
//! that keeps names unique among live connections.
//!
//! # How it fits in the stack
//!
//! ```text
//! Connection handler (above)  ← claims a name, releases it on disconnect
//!     ↕
//! Session Layer (this crate)  ← who is connected, under which name
//!     ↕
//! Transport (below)           ← provides ConnectionId
//! ```

mod error;
mod registry;
mod session;

pub use error::SessionError;
pub use registry::SessionRegistry;
pub use session::{Session, SessionConfig};
