pub mod fake_cache;
pub mod fixtures;

pub use fake_cache::{FakeCache, FakeCacheStats, FakeOpener, FakeValueOutcome};
