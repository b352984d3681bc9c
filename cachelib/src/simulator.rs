use std::fmt;
use std::time::{Duration, Instant};
use serde::{Deserialize, Serialize};
use crate::cache::{Cache, CacheModel, GenericCache};
use crate::config::{CacheConfig, CacheKindConfig, ConfigError, ReplacementPolicyConfig};
use crate::fully_associative::FullyAssociativeCache;
use crate::pseudo_lru::PseudoLruCache;
use crate::replacement_policies::{NoPolicy, RecencyCounters};
use crate::trace::MemoryAccess;

/// The result of replaying a trace against one cache. Can be serialised to the JSON output format,
/// and displays as `<hits>,<accesses>;`
#[derive(Debug, Default, Copy, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct SimulationResult {
    hits: u64,
    accesses: u64,
}

impl SimulationResult {
    pub fn new(hits: u64, accesses: u64) -> Self {
        Self { hits, accesses }
    }

    /// Counts one real access
    #[inline]
    pub fn record(&mut self, hit: bool) {
        self.accesses += 1;
        self.hits += hit as u64;
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn accesses(&self) -> u64 {
        self.accesses
    }

    pub fn misses(&self) -> u64 {
        self.accesses - self.hits
    }

    /// Hits over accesses, 0 for an empty trace
    pub fn hit_rate(&self) -> f64 {
        if self.accesses == 0 {
            0.0
        } else {
            self.hits as f64 / self.accesses as f64
        }
    }
}

impl fmt::Display for SimulationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{};", self.hits, self.accesses)
    }
}

/// The simulator replays traces against one cache, and collects results.
///
/// It supports calling simulate multiple times, and will update the time taken to simulate and the
/// results accordingly. Use [`run`] for a fresh cache per trace
#[derive(Debug)]
pub struct Simulator {
    cache: GenericCache,
    simulation_time: Duration,
}

impl Simulator {
    /// Creates a new simulator with an empty cache for a given configuration
    ///
    /// # Arguments
    ///
    /// * `config`: A cache configuration, usually resulting from parsing JSON
    ///
    /// returns: Result<Simulator, ConfigError>, failing if the configuration is invalid
    pub fn new(config: &CacheConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            cache: Self::config_to_cache(config)?,
            simulation_time: Duration::new(0, 0),
        })
    }

    /// Replays every access of the trace, in order
    ///
    /// # Arguments
    ///
    /// * `trace`: The accesses to replay
    ///
    /// returns: SimulationResult, the totals over every trace simulated so far
    pub fn simulate(&mut self, trace: &[MemoryAccess]) -> SimulationResult {
        let start = Instant::now();
        for access in trace {
            self.cache.access(*access);
        }
        let end = Instant::now();
        self.simulation_time += end - start;
        self.cache.result()
    }

    /// Gets the wall-clock execution time for processing
    pub fn get_execution_time(&self) -> &Duration {
        &self.simulation_time
    }

    /// Gets the number of lines never filled
    pub fn get_uninitialised_line_count(&self) -> usize {
        self.cache.get_uninitialised_line_count()
    }

    /// Creates a new cache from a cache configuration
    fn config_to_cache(config: &CacheConfig) -> Result<GenericCache, ConfigError> {
        let geometry = config.validate()?;
        log::debug!(
            "Building {}: {} bytes, {} ways, {} sets",
            config.name,
            geometry.total_size_bytes(),
            geometry.ways(),
            geometry.num_sets()
        );
        let cache = match (config.kind, config.replacement_policy) {
            (CacheKindConfig::Full, ReplacementPolicyConfig::PseudoLeastRecentlyUsed) => {
                GenericCache::from(PseudoLruCache::new(geometry))
            }
            (CacheKindConfig::Full, ReplacementPolicyConfig::LeastRecentlyUsed) => {
                GenericCache::from(FullyAssociativeCache::new(geometry))
            }
            _ if geometry.ways() == 1 => {
                GenericCache::from(Cache::new(geometry, NoPolicy, config.write_policy, config.prefetch_policy))
            }
            _ => {
                let policy = RecencyCounters::new(geometry.total_blocks() as usize);
                GenericCache::from(Cache::new(geometry, policy, config.write_policy, config.prefetch_policy))
            }
        };
        Ok(cache)
    }
}

/// Replays a whole trace against a fresh, empty cache built from `config`
pub fn run(config: &CacheConfig, trace: &[MemoryAccess]) -> Result<SimulationResult, ConfigError> {
    Ok(Simulator::new(config)?.simulate(trace))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_engine_from_config() {
        let cases = [
            (CacheConfig::direct("d", 1), "DirectMapped"),
            (CacheConfig::set_associative("one", 1, 1), "DirectMapped"),
            (CacheConfig::set_associative("s", 1, 2), "SetAssociative"),
            (CacheConfig::full("f", 1, ReplacementPolicyConfig::LeastRecentlyUsed), "FullyAssociative"),
            (CacheConfig::full("p", 1, ReplacementPolicyConfig::PseudoLeastRecentlyUsed), "PseudoLeastRecentlyUsed"),
        ];
        for (config, variant) in cases {
            let simulator = Simulator::new(&config).unwrap();
            assert!(format!("{:?}", simulator.cache).starts_with(variant), "{}", config.name);
        }
    }

    #[test]
    fn rejects_invalid_config_before_running() {
        assert_eq!(run(&CacheConfig::set_associative("s", 16, 3), &[]), Err(ConfigError::WaysNotPowerOfTwo(3)));
    }

    #[test]
    fn simulate_accumulates() {
        let mut simulator = Simulator::new(&CacheConfig::direct("d", 1)).unwrap();
        let trace = [MemoryAccess::load(0x0), MemoryAccess::load(0x0)];
        assert_eq!(simulator.simulate(&trace), SimulationResult::new(1, 2));
        assert_eq!(simulator.simulate(&trace), SimulationResult::new(3, 4));
        assert_eq!(simulator.get_uninitialised_line_count(), 31);
        // A fresh run starts from an empty cache
        assert_eq!(run(&CacheConfig::direct("d", 1), &trace).unwrap(), SimulationResult::new(1, 2));
    }

    #[test]
    fn result_formatting() {
        let result = SimulationResult::new(3, 8);
        assert_eq!(result.to_string(), "3,8;");
        assert_eq!(result.misses(), 5);
        assert_eq!(result.hit_rate(), 0.375);
        assert_eq!(SimulationResult::default().hit_rate(), 0.0);
        assert_eq!(serde_json::to_string(&result).unwrap(), r#"{"hits":3,"accesses":8}"#);
    }
}
