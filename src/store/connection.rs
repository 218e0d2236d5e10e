use crate::error::StoreError;
use crate::store::StoreAddress;

/// An open connection to the key-value store.
///
/// Only the three commands the post-processor needs are exposed.
pub trait StoreConnection {
    /// Sends `AUTH <password>`.
    fn auth(&mut self, password: &str) -> Result<(), StoreError>;

    /// Sends `SET <key> <value>`.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Releases the connection. Later calls are no-ops.
    fn close(&mut self) -> Result<(), StoreError>;
}

/// Opens unauthenticated connections.
pub trait Connector {
    fn open(&self, address: &StoreAddress) -> Result<Box<dyn StoreConnection>, StoreError>;
}
