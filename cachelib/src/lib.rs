//! # CacheLib
//!
//! Cachelib measures the hit rate of cache organisations replaying a memory access trace
//!
//! It provides a generic set associative cache which can be parameterised by a replacement policy
//! (direct mapped is the one way case), an exact LRU fully associative cache, and a tree based
//! pseudo-LRU fully associative cache, along with write-allocate and prefetch policies. There is no
//! timing model, only hits and accesses are counted
//!
//! Traces are loaded into memory once and shared read-only by every configuration, which can be run
//! in parallel

/// Splits addresses into set index and tag
pub mod address;

/// Contains the set associative cache implementation, and a utility enum over every cache engine
pub mod cache;

/// Contains definitions for the JSON configuration format, and its validation
pub mod config;

/// The exact LRU fully associative cache
pub mod fully_associative;

/// Loads trace files
pub mod io;

/// Runs suites of configurations on a pool of worker threads
pub mod parallel_sim;

/// The tree based pseudo-LRU fully associative cache
pub mod pseudo_lru;

/// Contains the provided replacement policies, with a trait for implementing custom replacement
/// policies
pub mod replacement_policies;

/// Contains the simulator used to replay a trace with a given cache configuration
pub mod simulator;

/// Trace records and the textual trace format
pub mod trace;

#[cfg(test)]
mod test;

/// Contains synthetic trace generators for tests and benchmarks.
pub mod util;
