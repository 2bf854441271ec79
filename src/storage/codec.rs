//! Entry encoding.
//!
//! A cache instance uses one codec for both tiers, so an encoded entry can
//! be copied between tiers without re-encoding.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CacheError;

/// Serialization scheme for cached values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryCodec {
    /// serde_json; self-describing, so type mismatches decode as errors
    #[default]
    Json,
    /// bincode; compact, but only detects mismatches that break the layout
    Bincode,
}

impl EntryCodec {
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CacheError> {
        match self {
            EntryCodec::Json => {
                serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))
            }
            EntryCodec::Bincode => {
                bincode::serialize(value).map_err(|e| CacheError::Serialization(e.to_string()))
            }
        }
    }

    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CacheError> {
        match self {
            EntryCodec::Json => {
                serde_json::from_slice(bytes).map_err(|e| CacheError::Deserialization(e.to_string()))
            }
            EntryCodec::Bincode => {
                bincode::deserialize(bytes).map_err(|e| CacheError::Deserialization(e.to_string()))
            }
        }
    }
}

impl fmt::Display for EntryCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryCodec::Json => f.write_str("json"),
            EntryCodec::Bincode => f.write_str("bincode"),
        }
    }
}

impl FromStr for EntryCodec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(EntryCodec::Json),
            "bincode" => Ok(EntryCodec::Bincode),
            other => Err(format!("unknown codec '{}', expected json or bincode", other)),
        }
    }
}
