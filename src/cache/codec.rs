use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use thiserror::Error;

/// A value could not be transformed for storage or restored from it.
///
/// Never surfaced to cache callers: the cache falls back to the raw value on
/// write and treats the entry as absent on read.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("encode failed: {0}")]
    Encode(String),

    #[error("decode failed: {0}")]
    Decode(String),
}

/// Symmetric transformation applied to values at rest in the cache.
///
/// An encode failure stores the value untransformed. A decode failure cannot
/// hand back the stored bytes as a `V`, so the cache drops the entry and the
/// read is a miss ([`MissReason::Undecodable`](super::MissReason::Undecodable)).
pub trait ValueCodec<V>: Send + Sync {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    fn encode(&self, value: &V) -> Result<Vec<u8>, TransformError>;

    /// Restore a value. On error the entry is evicted, never returned raw.
    fn decode(&self, bytes: &[u8]) -> Result<V, TransformError>;
}

/// Stores values as compact JSON bytes.
pub struct JsonCodec<V> {
    _marker: PhantomData<fn() -> V>,
}

impl<V> JsonCodec<V> {
    pub fn new() -> Self {
        JsonCodec {
            _marker: PhantomData,
        }
    }
}

impl<V> Default for JsonCodec<V> {
    fn default() -> Self {
        JsonCodec::new()
    }
}

impl<V> ValueCodec<V> for JsonCodec<V>
where
    V: Serialize + DeserializeOwned,
{
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, value: &V) -> Result<Vec<u8>, TransformError> {
        serde_json::to_vec(value).map_err(|e| TransformError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<V, TransformError> {
        serde_json::from_slice(bytes).map_err(|e| TransformError::Decode(e.to_string()))
    }
}
