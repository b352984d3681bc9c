use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::address::{AddressDecomposer, LINE_SIZE};

/// Reasons a cache configuration can't be turned into a cache. All of these are raised when the
/// cache is built, before any access is replayed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("cache capacity must be non-zero")]
    ZeroCapacity,
    #[error("cache capacity of {0} bytes is smaller than one 32 byte line")]
    Undersized(u32),
    #[error("cache capacity of {0}KB does not fit in a 32-bit byte count")]
    CapacityTooLarge(u32),
    #[error("cache capacity of {0} bytes is not a whole number of lines")]
    CapacityNotLineMultiple(u32),
    #[error("cache holds {0} lines, which is not a power of two")]
    BlocksNotPowerOfTwo(u32),
    #[error("associativity of {0} ways is not a power of two")]
    WaysNotPowerOfTwo(u32),
    #[error("associativity of {ways} ways exceeds the {blocks} lines in the cache")]
    TooManyWays { ways: u32, blocks: u32 },
    #[error("set count of {0} is not a power of two")]
    SetsNotPowerOfTwo(u32),
    #[error("set count of {0} needs more index bits than a 32-bit address has")]
    TooManySets(u32),
    #[error("set associative cache {0} needs a `ways` value")]
    MissingWays(String),
    #[error("cache {name} of kind {kind:?} can't have {ways} ways")]
    InconsistentWays { name: String, kind: CacheKindConfig, ways: u32 },
    #[error("cache {0} uses pseudo-LRU, which is only modelled for fully associative caches")]
    PseudoLruRequiresFullyAssociative(String),
    #[error("cache {0} is fully associative, write and prefetch policies only apply to direct mapped and set associative caches")]
    UnsupportedPolicy(String),
}

/// A named group of configurations, reported together as one output row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigGroup {
    pub name: String,
    pub caches: Vec<CacheConfig>,
}

/// Every configuration to run against a single trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSuite {
    pub groups: Vec<ConfigGroup>,
}

/// A configuration for a single cache. The line size is fixed at 32 bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub name: String,
    pub size_kb: u32,
    pub kind: CacheKindConfig,
    /// Required for set associative caches, implied for the others
    #[serde(default)]
    pub ways: Option<u32>,
    #[serde(default = "ReplacementPolicyConfig::default")]
    pub replacement_policy: ReplacementPolicyConfig,
    #[serde(default)]
    pub write_policy: WritePolicy,
    #[serde(default)]
    pub prefetch_policy: PrefetchPolicy,
}

/// The kind of cache - direct, set associative, or full
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheKindConfig {
    #[serde(alias = "direct")]
    Direct,
    #[serde(alias = "set")]
    SetAssociative,
    #[serde(alias = "full")]
    Full,
}

/// The replacement policy - lru, or plru for fully associative caches. Defaults to lru.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplacementPolicyConfig {
    #[default]
    #[serde(alias = "lru")]
    LeastRecentlyUsed,
    #[serde(alias = "plru")]
    PseudoLeastRecentlyUsed,
}

/// What a store that misses does
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WritePolicy {
    /// Missed stores bring the line into the cache, like loads
    #[default]
    #[serde(alias = "allocate")]
    WriteAllocate,
    /// Missed stores go straight to memory and leave the cache untouched
    #[serde(alias = "no_write_allocate")]
    NoWriteAllocate,
}

/// When the next sequential line is fetched alongside an access
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrefetchPolicy {
    #[default]
    #[serde(alias = "none")]
    None,
    #[serde(alias = "always")]
    Always,
    #[serde(alias = "on_miss")]
    OnMiss,
}

/// The validated shape of a cache. Construction fails rather than producing a geometry the index
/// arithmetic can't handle
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CacheGeometry {
    total_size_bytes: u32,
    ways: u32,
    decomposer: AddressDecomposer,
}

impl CacheGeometry {
    pub fn new(total_size_bytes: u32, ways: u32) -> Result<Self, ConfigError> {
        if total_size_bytes == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if total_size_bytes < LINE_SIZE {
            return Err(ConfigError::Undersized(total_size_bytes));
        }
        if total_size_bytes % LINE_SIZE != 0 {
            return Err(ConfigError::CapacityNotLineMultiple(total_size_bytes));
        }
        let blocks = total_size_bytes / LINE_SIZE;
        if !blocks.is_power_of_two() {
            return Err(ConfigError::BlocksNotPowerOfTwo(blocks));
        }
        if ways == 0 || !ways.is_power_of_two() {
            return Err(ConfigError::WaysNotPowerOfTwo(ways));
        }
        if ways > blocks {
            return Err(ConfigError::TooManyWays { ways, blocks });
        }
        // Checks the index width as well as the power of two
        let decomposer = AddressDecomposer::new(blocks / ways)?;
        Ok(Self {
            total_size_bytes,
            ways,
            decomposer,
        })
    }

    /// A geometry with a single set holding every line
    pub fn fully_associative(total_size_bytes: u32) -> Result<Self, ConfigError> {
        if total_size_bytes < LINE_SIZE {
            return Self::new(total_size_bytes, 1);
        }
        Self::new(total_size_bytes, total_size_bytes / LINE_SIZE)
    }

    pub fn total_size_bytes(&self) -> u32 {
        self.total_size_bytes
    }

    pub fn ways(&self) -> u32 {
        self.ways
    }

    pub fn num_sets(&self) -> u32 {
        self.decomposer.num_sets()
    }

    pub fn total_blocks(&self) -> u32 {
        self.total_size_bytes / LINE_SIZE
    }

    pub fn decomposer(&self) -> AddressDecomposer {
        self.decomposer
    }
}

impl CacheConfig {
    pub fn direct(name: impl Into<String>, size_kb: u32) -> Self {
        Self::with_kind(name, size_kb, CacheKindConfig::Direct, None)
    }

    pub fn set_associative(name: impl Into<String>, size_kb: u32, ways: u32) -> Self {
        Self::with_kind(name, size_kb, CacheKindConfig::SetAssociative, Some(ways))
    }

    pub fn full(name: impl Into<String>, size_kb: u32, replacement_policy: ReplacementPolicyConfig) -> Self {
        Self {
            replacement_policy,
            ..Self::with_kind(name, size_kb, CacheKindConfig::Full, None)
        }
    }

    fn with_kind(name: impl Into<String>, size_kb: u32, kind: CacheKindConfig, ways: Option<u32>) -> Self {
        Self {
            name: name.into(),
            size_kb,
            kind,
            ways,
            replacement_policy: ReplacementPolicyConfig::default(),
            write_policy: WritePolicy::default(),
            prefetch_policy: PrefetchPolicy::default(),
        }
    }

    pub fn with_write_policy(mut self, write_policy: WritePolicy) -> Self {
        self.write_policy = write_policy;
        self
    }

    pub fn with_prefetch_policy(mut self, prefetch_policy: PrefetchPolicy) -> Self {
        self.prefetch_policy = prefetch_policy;
        self
    }

    /// Checks the configuration and derives its geometry
    ///
    /// Catches every precondition the engines rely on: capacity and associativity are powers of
    /// two, the kind and `ways` agree, and policies are only combined with engines that model them
    pub fn validate(&self) -> Result<CacheGeometry, ConfigError> {
        let total_size_bytes = self.size_kb.checked_mul(1024).ok_or(ConfigError::CapacityTooLarge(self.size_kb))?;
        let geometry = match self.kind {
            CacheKindConfig::Direct => {
                match self.ways {
                    None | Some(1) => CacheGeometry::new(total_size_bytes, 1)?,
                    Some(ways) => return Err(self.inconsistent_ways(ways)),
                }
            }
            CacheKindConfig::SetAssociative => {
                let ways = self.ways.ok_or_else(|| ConfigError::MissingWays(self.name.clone()))?;
                CacheGeometry::new(total_size_bytes, ways)?
            }
            CacheKindConfig::Full => {
                let geometry = CacheGeometry::fully_associative(total_size_bytes)?;
                match self.ways {
                    Some(ways) if ways != geometry.ways() => return Err(self.inconsistent_ways(ways)),
                    _ => geometry,
                }
            }
        };
        match (self.kind, self.replacement_policy) {
            (CacheKindConfig::Full, _) => {
                if self.write_policy != WritePolicy::default() || self.prefetch_policy != PrefetchPolicy::default() {
                    return Err(ConfigError::UnsupportedPolicy(self.name.clone()));
                }
            }
            (_, ReplacementPolicyConfig::PseudoLeastRecentlyUsed) => {
                return Err(ConfigError::PseudoLruRequiresFullyAssociative(self.name.clone()));
            }
            (_, ReplacementPolicyConfig::LeastRecentlyUsed) => {}
        }
        Ok(geometry)
    }

    fn inconsistent_ways(&self, ways: u32) -> ConfigError {
        ConfigError::InconsistentWays {
            name: self.name.clone(),
            kind: self.kind,
            ways,
        }
    }
}

impl SimulationSuite {
    /// Total number of configurations across all groups
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.caches.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every configuration, in group order
    pub fn configs(&self) -> impl Iterator<Item = &CacheConfig> {
        self.groups.iter().flat_map(|g| g.caches.iter())
    }
}

const ASSOCIATIVITIES: [u32; 4] = [2, 4, 8, 16];
const DEFAULT_SIZE_KB: u32 = 16;

/// The standard experiment: direct mapped caches of several sizes, then 16KB caches with
/// increasing associativity, full associativity, and each write and prefetch policy
impl Default for SimulationSuite {
    fn default() -> Self {
        let associative = |suffix: &str, write_policy: WritePolicy, prefetch_policy: PrefetchPolicy| -> Vec<CacheConfig> {
            ASSOCIATIVITIES.iter()
                .map(|&ways| {
                    CacheConfig::set_associative(format!("{DEFAULT_SIZE_KB}KB-{ways}way{suffix}"), DEFAULT_SIZE_KB, ways)
                        .with_write_policy(write_policy)
                        .with_prefetch_policy(prefetch_policy)
                })
                .collect()
        };
        Self {
            groups: vec![
                ConfigGroup {
                    name: "direct".to_string(),
                    caches: [1, 4, 16, 32].iter().map(|&kb| CacheConfig::direct(format!("direct-{kb}KB"), kb)).collect(),
                },
                ConfigGroup {
                    name: "set_associative".to_string(),
                    caches: associative("", WritePolicy::WriteAllocate, PrefetchPolicy::None),
                },
                ConfigGroup {
                    name: "full_lru".to_string(),
                    caches: vec![CacheConfig::full(format!("{DEFAULT_SIZE_KB}KB-full-lru"), DEFAULT_SIZE_KB, ReplacementPolicyConfig::LeastRecentlyUsed)],
                },
                ConfigGroup {
                    name: "full_plru".to_string(),
                    caches: vec![CacheConfig::full(format!("{DEFAULT_SIZE_KB}KB-full-plru"), DEFAULT_SIZE_KB, ReplacementPolicyConfig::PseudoLeastRecentlyUsed)],
                },
                ConfigGroup {
                    name: "no_write_allocate".to_string(),
                    caches: associative("-no-write-allocate", WritePolicy::NoWriteAllocate, PrefetchPolicy::None),
                },
                ConfigGroup {
                    name: "prefetch_always".to_string(),
                    caches: associative("-prefetch-always", WritePolicy::WriteAllocate, PrefetchPolicy::Always),
                },
                ConfigGroup {
                    name: "prefetch_on_miss".to_string(),
                    caches: associative("-prefetch-on-miss", WritePolicy::WriteAllocate, PrefetchPolicy::OnMiss),
                },
            ],
        }
    }
}
