//! Clustering features

use super::ThreadName;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A named (or anonymous) scalar describing one aspect of a thread.
///
/// The name is an opaque byte buffer: empty, UTF-8 text, or an 8-byte
/// little-endian integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    name: Vec<u8>,
    value: f32,
}

impl Feature {
    pub fn unnamed(value: f32) -> Self {
        Self {
            name: Vec::new(),
            value,
        }
    }

    pub fn named(name: &str, value: f32) -> Self {
        Self {
            name: name.as_bytes().to_vec(),
            value,
        }
    }

    pub fn numbered(id: u64, value: f32) -> Self {
        Self {
            name: id.to_le_bytes().to_vec(),
            value,
        }
    }

    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn is_named(&self) -> bool {
        !self.name.is_empty()
    }

    /// The name as text, if it was built from a string.
    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.name).ok().filter(|s| !s.is_empty())
    }

    /// The name as an integer, if it was built from one.
    pub fn name_id(&self) -> Option<u64> {
        <[u8; 8]>::try_from(self.name.as_slice())
            .ok()
            .map(u64::from_le_bytes)
    }
}

/// Ordered features of one thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    name: String,
    thread: ThreadName,
    features: Vec<Feature>,
}

impl FeatureVector {
    pub fn new(name: impl Into<String>, thread: ThreadName) -> Self {
        Self {
            name: name.into(),
            thread,
            features: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn thread(&self) -> &ThreadName {
        &self.thread
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Append a feature. All features must be named or all unnamed.
    pub fn add(&mut self, feature: Feature) -> Result<()> {
        if let Some(first) = self.features.first() {
            if first.is_named() != feature.is_named() {
                return Err(Error::invalid_argument(format!(
                    "feature vector {} mixes named and unnamed features",
                    self.name
                )));
            }
        }
        self.features.push(feature);
        Ok(())
    }

    pub fn values(&self) -> Vec<f32> {
        self.features.iter().map(Feature::value).collect()
    }
}
