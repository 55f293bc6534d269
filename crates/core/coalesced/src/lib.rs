mod error;
mod key;
mod service;
mod stats;

pub use error::Error;
pub use key::CacheKey;
pub use service::CoalescingCache;
pub use stats::CacheStats;
