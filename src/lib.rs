//! A thread-safe, sharded cache with FIFO eviction and compressed snapshots.
//!
//! The cache holds at most a fixed number of entries. When it is full, inserting a new key evicts
//! the oldest entries first. There is no time-based expiration, and reading an entry does not keep
//! it alive for longer.
//!
//! # Features
//!
//! - Thread-safe by default - all operations take `&self`
//! - Sharded design to reduce contention during concurrent access
//! - Atomic compound operations: [`Cache::get_or_insert`], [`Cache::insert_if_absent`] and
//!   [`Cache::remove`]
//! - Snapshots to any writer or, atomically, to a file, restorable with [`Cache::load_from`] and
//!   [`Cache::load_from_file`]
//! - No unsafe code
//!
//! # Architecture
//!
//! Keys are hashed to one of several shards, each guarded by its own read/write lock. A shard
//! keeps its entries in a hash map and records the order in which they arrived in a fixed-size
//! ring. A single atomic counter, shared by all shards, tracks the number of entries in the cache.
//! When that counter has reached the capacity, an insert walks its shard's ring from the oldest
//! slot and evicts entries until the cache has room again.
//!
//! Deletes only remove the entry from the map. The ring slot it occupied is reconciled lazily, the
//! next time the ring's cursor passes over it.
//!
//! Capacity is enforced globally while eviction order is tracked per shard. Two consequences
//! follow:
//!
//! - inserts racing on different shards may briefly push the number of entries past the capacity,
//!   by at most one per racing shard;
//! - a shard that receives more new keys than its ring has slots, before the cache is full, stops
//!   tracking its oldest keys. They stay in the cache until deleted or cleared.
//!
//! # Examples
//!
//! Basic usage with string keys and values:
//!
//! ```rust
//! use fifo_cache::Cache;
//!
//! // Create a new cache with a capacity of 1000 items
//! let cache = Cache::with_capacity(1000);
//!
//! // Insert and retrieve a value
//! cache.insert("key1", "value1");
//! assert_eq!(cache.get("key1"), Some("value1"));
//! ```
//!
//! Compound operations:
//!
//! ```rust
//! use fifo_cache::Cache;
//!
//! let cache = Cache::with_capacity(100);
//!
//! assert_eq!(cache.get_or_insert("key1", "value1"), ("value1", false));
//! assert_eq!(cache.get_or_insert("key1", "value2"), ("value1", true));
//!
//! assert!(!cache.insert_if_absent("key1", "value3"));
//! assert_eq!(cache.remove("key1"), Some("value1"));
//! assert!(cache.is_empty());
//! ```
//!
//! Saving and restoring:
//!
//! ```rust
//! use fifo_cache::Cache;
//!
//! let cache = Cache::with_capacity(100);
//! cache.insert(String::from("key1"), 42_u64);
//!
//! let mut snapshot: Vec<u8> = Vec::new();
//! cache.save_to(&mut snapshot).unwrap();
//!
//! let restored: Cache<String, u64> = Cache::load_from(snapshot.as_slice()).unwrap();
//! assert_eq!(restored.get("key1"), Some(42));
//! ```
//!
//! Thread-safe usage across multiple threads:
//!
//! ```rust
//! use fifo_cache::Cache;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let cache = Arc::new(Cache::with_capacity(100));
//! cache.insert("key1", "value1");
//!
//! // Spawn a thread that inserts a value
//! let cache_in_arc = Arc::clone(&cache);
//! let handle = thread::spawn(move || {
//!     cache_in_arc.insert("key2", "value2");
//! });
//!
//! handle.join().unwrap();
//!
//! assert_eq!(cache.get("key1"), Some("value1"));
//! assert_eq!(cache.get("key2"), Some("value2"));
//! ```

#![forbid(unsafe_code)]
pub mod cache;
pub mod error;

pub use cache::Cache;
pub use cache::CacheBuilder;
pub use cache::stats::Stats;
pub use error::{Error, Result};
