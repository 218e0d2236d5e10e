//! Key-value store access.
//!
//! [`StoreConnection`] is the seam the publisher writes through and
//! [`Connector`] opens one from a parsed [`StoreAddress`].
//! [`RedisConnector`] talks to a real Redis server; [`MemoryStore`] keeps
//! everything in process.

mod address;
mod connection;
pub mod memory;
mod redis_store;

pub use address::StoreAddress;
pub use connection::{Connector, StoreConnection};
pub use memory::{MemoryConnection, MemoryStore};
pub use redis_store::{RedisConnection, RedisConnector};
