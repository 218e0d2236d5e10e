//! Builder admission and key-derivation policy.

use std::collections::BTreeMap;

use crate::error::PublishError;

/// How artifacts from one builder are recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderPolicy {
    /// Short name used in log output.
    pub label: String,
    /// The part before the first `:` of each segment is a content digest,
    /// not a region, and must not end up in the key.
    pub digest_prefixed: bool,
}

impl BuilderPolicy {
    pub fn regional(label: &str) -> Self {
        Self {
            label: label.to_string(),
            digest_prefixed: false,
        }
    }

    pub fn digest_prefixed(label: &str) -> Self {
        Self {
            label: label.to_string(),
            digest_prefixed: true,
        }
    }
}

/// Builder ids the post-processor understands, with their policy.
///
/// A builder id that is not in the table is rejected before any connection is
/// opened.
#[derive(Debug, Clone, Default)]
pub struct BuilderPolicyTable {
    entries: BTreeMap<String, BuilderPolicy>,
}

impl BuilderPolicyTable {
    /// An empty table that admits nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// The builders whose artifact id format is known.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        table.insert("mitchellh.amazonebs", BuilderPolicy::regional("amazonebs"));
        table.insert(
            "mitchellh.amazon.instance",
            BuilderPolicy::regional("amazoninstance"),
        );
        table.insert("packer.googlecompute", BuilderPolicy::regional("googlecompute"));
        table.insert("packer.docker", BuilderPolicy::regional("docker"));
        // docker-import ids are "sha256:<image>"
        table.insert(
            "packer.post-processor.docker-import",
            BuilderPolicy::digest_prefixed("docker"),
        );
        table.insert(
            "packer.post-processor.docker-tag",
            BuilderPolicy::regional("docker"),
        );
        table.insert(
            "Azure.ResourceManagement.VMImage",
            BuilderPolicy::regional("azure-arm"),
        );
        table
    }

    /// Adds or replaces the policy for `builder_id`.
    pub fn insert(&mut self, builder_id: &str, policy: BuilderPolicy) -> &mut Self {
        self.entries.insert(builder_id.to_string(), policy);
        self
    }

    pub fn get(&self, builder_id: &str) -> Option<&BuilderPolicy> {
        self.entries.get(builder_id)
    }

    /// Looks up `builder_id`, failing for builders the table does not know.
    pub fn admit(&self, builder_id: &str) -> Result<&BuilderPolicy, PublishError> {
        self.get(builder_id)
            .ok_or_else(|| PublishError::UnsupportedArtifact(builder_id.to_string()))
    }

    /// Iterates over all `(builder_id, policy)` pairs, sorted by builder id.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BuilderPolicy)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
