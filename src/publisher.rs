//! Records artifact ids in the store.
//!
//! One [`Publisher::publish`] call handles one finished build:
//!
//! 1. reject builder ids missing from the [`BuilderPolicyTable`];
//! 2. open (and authenticate) a connection;
//! 3. derive the `(key, value)` pairs and `SET` them in order;
//! 4. close the connection, whatever happened in 3.
//!
//! The first failing `SET` aborts the rest. Earlier writes are not undone.

use tracing::{debug, info, warn};

use crate::artifact::{ArtifactDescriptor, PostProcessOutcome};
use crate::config::{PublishConfig, RawConfig};
use crate::error::PublishError;
use crate::keys::{self, KeyValuePair};
use crate::policy::{BuilderPolicy, BuilderPolicyTable};
use crate::store::{Connector, RedisConnector, StoreAddress, StoreConnection};

/// The connection a single invocation writes through.
///
/// A borrowed connection belongs to the caller and is left open. An owned one
/// is closed when the handle goes out of scope.
enum StoreHandle<'a> {
    Borrowed(&'a mut dyn StoreConnection),
    Owned(OwnedConnection),
}

impl StoreHandle<'_> {
    fn connection(&mut self) -> &mut dyn StoreConnection {
        match self {
            StoreHandle::Borrowed(conn) => &mut **conn,
            StoreHandle::Owned(owned) => owned.inner.as_mut(),
        }
    }
}

/// Closes the wrapped connection exactly once, on drop.
struct OwnedConnection {
    inner: Box<dyn StoreConnection>,
}

impl Drop for OwnedConnection {
    fn drop(&mut self) {
        info!("Closing Redis connection...");
        if let Err(e) = self.inner.close() {
            warn!(error = %e, "Error closing Redis connection");
        }
    }
}

pub struct Publisher<C = RedisConnector> {
    config: PublishConfig,
    policies: BuilderPolicyTable,
    connector: C,
}

impl Publisher<RedisConnector> {
    /// A publisher that talks to a real Redis server.
    pub fn redis(config: PublishConfig) -> Self {
        Self::new(config, RedisConnector::new())
    }
}

impl<C: Connector> Publisher<C> {
    /// Uses the built-in builder table.
    pub fn new(config: PublishConfig, connector: C) -> Self {
        Self::with_policies(config, BuilderPolicyTable::builtin(), connector)
    }

    pub fn with_policies(config: PublishConfig, policies: BuilderPolicyTable, connector: C) -> Self {
        Self {
            config,
            policies,
            connector,
        }
    }

    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    pub fn policies(&self) -> &BuilderPolicyTable {
        &self.policies
    }

    /// Derives the pairs [`publish`](Self::publish) would write, without
    /// touching the store.
    pub fn plan(&self, artifact: &ArtifactDescriptor) -> Result<Vec<KeyValuePair>, PublishError> {
        let policy = self.admit(artifact)?;
        Ok(self.derive(policy, artifact))
    }

    /// Opens a connection, writes every derived pair, and closes it again.
    #[tracing::instrument(skip_all, fields(builder_id = %artifact.builder_id))]
    pub fn publish(&self, artifact: &ArtifactDescriptor) -> Result<PostProcessOutcome, PublishError> {
        let policy = self.admit(artifact)?;

        info!("Putting build artifacts into Redis...");
        let mut handle = StoreHandle::Owned(self.open()?);
        self.write(handle.connection(), policy, artifact)?;

        Ok(PostProcessOutcome::kept(artifact))
    }

    /// Like [`publish`](Self::publish), but writes through a connection the
    /// caller opened. The caller stays responsible for closing it.
    #[tracing::instrument(skip_all, fields(builder_id = %artifact.builder_id))]
    pub fn publish_with(
        &self,
        connection: &mut dyn StoreConnection,
        artifact: &ArtifactDescriptor,
    ) -> Result<PostProcessOutcome, PublishError> {
        let policy = self.admit(artifact)?;

        info!("Putting build artifacts into Redis...");
        let mut handle = StoreHandle::Borrowed(connection);
        self.write(handle.connection(), policy, artifact)?;

        Ok(PostProcessOutcome::kept(artifact))
    }

    fn admit(&self, artifact: &ArtifactDescriptor) -> Result<&BuilderPolicy, PublishError> {
        self.policies.admit(&artifact.builder_id)
    }

    fn derive(&self, policy: &BuilderPolicy, artifact: &ArtifactDescriptor) -> Vec<KeyValuePair> {
        keys::derive(
            &self.config.key_prefix,
            policy,
            self.config.explicit_value_override.as_deref(),
            &artifact.id,
        )
    }

    fn open(&self) -> Result<OwnedConnection, PublishError> {
        info!("Opening Redis connection...");

        let address = StoreAddress::parse(&self.config.store_address).map_err(|reason| {
            PublishError::InvalidAddress {
                address: StoreAddress::redact(&self.config.store_address),
                reason,
            }
        })?;

        let inner = self
            .connector
            .open(&address)
            .map_err(|source| PublishError::Connection {
                address: address.to_string(),
                source,
            })?;
        let mut owned = OwnedConnection { inner };

        if let Some(password) = &address.password {
            debug!(host = %address.host, port = address.port, "Authenticating");
            owned
                .inner
                .auth(password)
                .map_err(|source| PublishError::Authentication {
                    address: address.to_string(),
                    source,
                })?;
        }

        Ok(owned)
    }

    fn write(
        &self,
        conn: &mut dyn StoreConnection,
        policy: &BuilderPolicy,
        artifact: &ArtifactDescriptor,
    ) -> Result<(), PublishError> {
        let pairs = self.derive(policy, artifact);
        debug!(label = %policy.label, pairs = pairs.len(), "Derived keys");

        for KeyValuePair { key, value } in pairs {
            info!(key = %key, value = %value, "Setting key");
            conn.set(&key, &value)
                .map_err(|source| PublishError::Write { key, source })?;
        }
        Ok(())
    }
}

/// Derives the pairs for `artifact` from an unvalidated config.
///
/// Only `key_prefix` is required, so keys can be previewed before a store
/// address is configured.
pub fn plan_keys(
    policies: &BuilderPolicyTable,
    raw: &RawConfig,
    artifact: &ArtifactDescriptor,
) -> Result<Vec<KeyValuePair>, PublishError> {
    let policy = policies.admit(&artifact.builder_id)?;
    let prefix = raw.require_key_prefix()?;
    Ok(keys::derive(
        prefix,
        policy,
        raw.explicit_value_override.as_deref(),
        &artifact.id,
    ))
}
