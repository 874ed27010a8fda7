//! Namespaced TTL/LRU cache with version-aware lookups.

pub mod clock;
pub mod codec;
pub mod layer;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{JsonCodec, TransformError, ValueCodec};
pub use layer::{with_cache, AsyncCachedFn, CacheLayer, CachedFn};
pub use store::{CacheStats, EntryInfo, MissReason, PolicyCache};
