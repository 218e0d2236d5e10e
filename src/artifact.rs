//! Build artifacts as seen by the post-processor.

use serde::{Deserialize, Serialize};

/// A finished build's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Which builder produced the artifact, e.g. `mitchellh.amazonebs`.
    pub builder_id: String,
    /// Raw artifact id, e.g. `us-east-1:ami-123,us-west-1:ami-456`.
    pub id: String,
    /// Files belonging to the artifact. Passed through untouched.
    #[serde(default)]
    pub files: Vec<String>,
}

impl ArtifactDescriptor {
    pub fn new(builder_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            builder_id: builder_id.into(),
            id: id.into(),
            files: Vec::new(),
        }
    }
}

/// What the post-processor hands back to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostProcessOutcome {
    /// The input artifact, unchanged.
    pub artifact: ArtifactDescriptor,
    /// Always `true`: the input artifact is kept.
    pub keep: bool,
    /// Always `false`.
    pub force_override: bool,
}

impl PostProcessOutcome {
    pub fn kept(artifact: &ArtifactDescriptor) -> Self {
        Self {
            artifact: artifact.clone(),
            keep: true,
            force_override: false,
        }
    }
}
