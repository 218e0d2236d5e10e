//! Artifact id segmentation and key derivation.
//!
//! An artifact id is a comma-separated list of segments. Each segment is
//! either `region:value` or a bare `value`:
//!
//! ```text
//! us-east-1:ami-1,us-west-1:ami-2   -> prefix/us-east-1 = ami-1, prefix/us-west-1 = ami-2
//! image-name-12345                  -> prefix = image-name-12345
//! ```

use serde::Serialize;

use crate::policy::BuilderPolicy;

/// One comma-separated piece of an artifact id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    /// Text before the first `:`, if there was one.
    pub qualifier: Option<&'a str>,
    pub value: &'a str,
}

/// A key and the value to store under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyValuePair {
    pub key: String,
    pub value: String,
}

impl KeyValuePair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Splits `raw` on `,`, then each piece on its first `:`.
pub fn segments(raw: &str) -> impl Iterator<Item = Segment<'_>> {
    raw.split(',').map(|piece| match piece.split_once(':') {
        Some((qualifier, value)) => Segment {
            qualifier: Some(qualifier),
            value,
        },
        None => Segment {
            qualifier: None,
            value: piece,
        },
    })
}

/// Derives the pairs to write for `raw`, in segment order.
///
/// With a regional policy the qualifier becomes the last key component.
/// With a digest-prefixed policy it is dropped. A non-empty
/// `value_override` replaces every parsed value.
pub fn derive(
    prefix: &str,
    policy: &BuilderPolicy,
    value_override: Option<&str>,
    raw: &str,
) -> Vec<KeyValuePair> {
    let value_override = value_override.filter(|v| !v.is_empty());

    segments(raw)
        .map(|segment| {
            let key = match segment.qualifier {
                Some(region) if !policy.digest_prefixed => format!("{prefix}/{region}"),
                _ => prefix.to_string(),
            };
            let value = value_override.unwrap_or(segment.value);
            KeyValuePair::new(key, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regional() -> BuilderPolicy {
        BuilderPolicy::regional("amazonebs")
    }

    #[test]
    fn test_single_region() {
        let pairs = derive("my_prefix", &regional(), None, "us-east-1:ami_12345");
        assert_eq!(pairs, vec![KeyValuePair::new("my_prefix/us-east-1", "ami_12345")]);
    }

    #[test]
    fn test_no_region() {
        let pairs = derive("my_prefix", &regional(), None, "image-name-12345");
        assert_eq!(pairs, vec![KeyValuePair::new("my_prefix", "image-name-12345")]);
    }

    #[test]
    fn test_multi_region_keeps_order() {
        let pairs = derive("my_prefix", &regional(), None, "us-east-1:ami_1,us-west-1:ami_1");
        assert_eq!(
            pairs,
            vec![
                KeyValuePair::new("my_prefix/us-east-1", "ami_1"),
                KeyValuePair::new("my_prefix/us-west-1", "ami_1"),
            ]
        );
    }

    #[test]
    fn test_digest_is_dropped_for_digest_prefixed_builder() {
        let policy = BuilderPolicy::digest_prefixed("docker");
        let pairs = derive("my_prefix", &policy, None, "sha256:image-name-12345");
        assert_eq!(pairs, vec![KeyValuePair::new("my_prefix", "image-name-12345")]);
    }

    #[test]
    fn test_digest_becomes_region_for_regional_builder() {
        let pairs = derive("my_prefix", &regional(), None, "sha256:image-name-12345");
        assert_eq!(pairs, vec![KeyValuePair::new("my_prefix/sha256", "image-name-12345")]);
    }

    #[test]
    fn test_override_replaces_every_value() {
        for raw in ["us-east-1:ami_1,us-west-1:ami_2", "image-name-12345", "sha256:abc"] {
            let pairs = derive("p", &regional(), Some("X"), raw);
            assert!(!pairs.is_empty());
            assert!(pairs.iter().all(|p| p.value == "X"), "raw = {raw}");
        }
    }

    #[test]
    fn test_empty_override_is_ignored() {
        let pairs = derive("p", &regional(), Some(""), "eu-west-1:ami_9");
        assert_eq!(pairs, vec![KeyValuePair::new("p/eu-west-1", "ami_9")]);
    }

    #[test]
    fn test_only_first_colon_splits() {
        let segs: Vec<_> = segments("eu:a:b").collect();
        assert_eq!(
            segs,
            vec![Segment {
                qualifier: Some("eu"),
                value: "a:b"
            }]
        );
    }
}
