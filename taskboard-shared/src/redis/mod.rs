/// Redis integration
///
/// Redis is the shared cache backend when the API runs as more than one
/// instance; see [`crate::cache::redis::RedisCache`].

pub mod client;

pub use client::{RedisClient, RedisClientError, RedisConfig};
