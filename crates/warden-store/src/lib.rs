//! Persistence boundary for the warden workspace.
//!
//! The auth crate never talks to a concrete store; it goes through the
//! [`SessionGateway`] and [`UserGateway`] ports defined here. This
//! crate also ships [`MemoryGateway`], an in-process backend enforcing
//! the same constraints a relational schema would, and
//! [`BoundedGateway`], a decorator imposing a wall-clock deadline on
//! every call.

mod error;
mod gateway;
mod memory;
mod record;
mod timeout;

pub use error::StoreError;
pub use gateway::{SessionGateway, UserGateway};
pub use memory::MemoryGateway;
pub use record::{SessionRecord, UserRecord};
pub use timeout::{BoundedGateway, DeadlineConfig};
