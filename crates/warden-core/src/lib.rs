//! Shared value types for the warden workspace.
//!
//! Provides the newtype row identifiers and the injectable clock used
//! by the store and auth crates.

mod clock;
mod ids;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use ids::{SessionId, UserId};
