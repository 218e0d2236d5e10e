//! Records build artifact ids in Redis so later pipeline stages can look up
//! the newest image by a stable key.
//!
//! [`config`] validates the host-supplied settings, [`publisher`] derives the
//! keys and writes them through a [`store`] connection.

pub mod artifact;
pub mod config;
pub mod error;
pub mod keys;
pub mod policy;
pub mod publisher;
pub mod store;

pub use artifact::{ArtifactDescriptor, PostProcessOutcome};
pub use config::{PublishConfig, RawConfig};
pub use error::{ErrorKind, PublishError, StoreError};
pub use publisher::Publisher;
