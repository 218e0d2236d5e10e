//! Post-processor configuration.
//!
//! [`RawConfig`] is the field mapping as handed over by the host, after its
//! template engine has substituted every value. [`PublishConfig`] is the
//! validated form the publisher works with.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::PublishError;

/// `(current, legacy)` field names.
const FIELD_ALIASES: [(&str, &str); 2] = [
    ("store_address", "redis_url"),
    ("explicit_value_override", "image_id"),
];

/// Unvalidated configuration fields.
///
/// Stored on disk as a JSON object:
/// ```json
/// {
///   "store_address": "user:secret@redis.internal:6379",
///   "key_prefix": "images/web",
///   "explicit_value_override": ""
/// }
/// ```
/// The older `redis_url` and `image_id` names are accepted too, but not
/// alongside their current name. Any other field is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    #[serde(alias = "redis_url")]
    pub store_address: Option<String>,
    pub key_prefix: Option<String>,
    #[serde(alias = "image_id")]
    pub explicit_value_override: Option<String>,
}

impl RawConfig {
    pub fn from_json_str(content: &str) -> Result<Self> {
        let map: Map<String, Value> = serde_json::from_str(content)?;
        Self::from_object(map)
    }

    fn from_object(map: Map<String, Value>) -> Result<Self> {
        for (current, legacy) in FIELD_ALIASES {
            if map.contains_key(current) && map.contains_key(legacy) {
                anyhow::bail!(
                    "both '{current}' and its old name '{legacy}' are set; keep only '{current}'"
                );
            }
        }
        Ok(serde_json::from_value(Value::Object(map))?)
    }

    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{path}'"))?;
        Self::from_json_str(&content)
            .with_context(|| format!("failed to parse config file '{path}'"))
    }

    /// Builds a config from `(field, value)` string pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: Map<String, Value> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), Value::String(v.into())))
            .collect();
        Self::from_object(map)
    }

    /// The key prefix, which is all a dry run needs.
    pub fn require_key_prefix(&self) -> Result<&str, PublishError> {
        self.key_prefix
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| PublishError::Configuration {
                missing: vec!["key_prefix".to_string()],
            })
    }

    /// Overlays `other` on top of `self`. Non-empty values in `other` win.
    pub fn layer(self, other: RawConfig) -> RawConfig {
        fn pick(base: Option<String>, top: Option<String>) -> Option<String> {
            match top {
                Some(v) if !v.is_empty() => Some(v),
                _ => base,
            }
        }

        RawConfig {
            store_address: pick(self.store_address, other.store_address),
            key_prefix: pick(self.key_prefix, other.key_prefix),
            explicit_value_override: pick(
                self.explicit_value_override,
                other.explicit_value_override,
            ),
        }
    }
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishConfig {
    /// `host:port`, optionally `user:password@host:port`.
    pub store_address: String,
    /// Namespace for every derived key.
    pub key_prefix: String,
    /// When set, replaces every derived value.
    pub explicit_value_override: Option<String>,
}

impl PublishConfig {
    /// Checks that every required field is present and non-empty.
    ///
    /// All missing fields are collected before failing so the error names
    /// each of them. The store address is not parsed here.
    pub fn validate(raw: &RawConfig) -> Result<Self, PublishError> {
        let required = [
            ("store_address", &raw.store_address),
            ("key_prefix", &raw.key_prefix),
        ];

        let missing: Vec<String> = required
            .iter()
            .filter(|(_, value)| value.as_deref().is_none_or(str::is_empty))
            .map(|(name, _)| name.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(PublishError::Configuration { missing });
        }

        Ok(Self {
            store_address: raw.store_address.clone().unwrap_or_default(),
            key_prefix: raw.key_prefix.clone().unwrap_or_default(),
            explicit_value_override: raw
                .explicit_value_override
                .clone()
                .filter(|v| !v.is_empty()),
        })
    }
}
