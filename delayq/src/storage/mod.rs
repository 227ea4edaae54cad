//! Storage layer
//!
//! Provides the ordered store contract and its Redis and in-memory
//! implementations.

pub mod keys;
pub mod memory;
pub mod redis;
pub mod store;

pub use keys::{derive_key, KeyRole, QueueKeys};
pub use memory::InMemoryStore;
pub use redis::{RedisConfig, RedisMode, RedisStore};
pub use store::{promote_with_compensation, Promotion, Store};
