use proptest::prelude::*;
use crate::cache::{Cache, CacheModel};
use crate::config::CacheGeometry;
use crate::fully_associative::FullyAssociativeCache;
use crate::pseudo_lru::PseudoLruCache;
use crate::replacement_policies::RecencyCounters;
use crate::config::{CacheConfig, PrefetchPolicy, ReplacementPolicyConfig, SimulationSuite, WritePolicy};
use crate::simulator::{run, SimulationResult};
use crate::trace::{parse_trace, MemoryAccess};
use crate::util::{looping_trace, random_trace, sequential_trace};

const SIZES_KB: [u32; 5] = [1, 2, 4, 8, 16];

fn every_engine() -> Vec<CacheConfig> {
    vec![
        CacheConfig::direct("direct", 1),
        CacheConfig::set_associative("2way", 1, 2),
        CacheConfig::set_associative("8way", 2, 8),
        CacheConfig::set_associative("4way-nwa", 1, 4).with_write_policy(WritePolicy::NoWriteAllocate),
        CacheConfig::set_associative("4way-always", 1, 4).with_prefetch_policy(PrefetchPolicy::Always),
        CacheConfig::set_associative("4way-on-miss", 1, 4).with_prefetch_policy(PrefetchPolicy::OnMiss),
        CacheConfig::full("full", 1, ReplacementPolicyConfig::LeastRecentlyUsed),
        CacheConfig::full("plru", 1, ReplacementPolicyConfig::PseudoLeastRecentlyUsed),
    ]
}

/// True when no tag is held by two valid slots of the same set
fn tags_unique_per_set(lines: &[Option<u32>], ways: usize) -> bool {
    lines.chunks(ways).all(|set| {
        let mut tags: Vec<u32> = set.iter().flatten().copied().collect();
        let held = tags.len();
        tags.sort_unstable();
        tags.dedup();
        tags.len() == held
    })
}

fn trace_strategy() -> impl Strategy<Value = Vec<MemoryAccess>> {
    prop::collection::vec((any::<bool>(), 0u32..0x4000), 0..400).prop_map(|records| {
        records.into_iter()
            .map(|(store, address)| if store { MemoryAccess::store(address) } else { MemoryAccess::load(address) })
            .collect()
    })
}

proptest! {
    #[test]
    fn counts_every_access(trace in trace_strategy()) {
        for config in every_engine() {
            let result = run(&config, &trace).unwrap();
            prop_assert_eq!(result.accesses(), trace.len() as u64, "{}", config.name);
            prop_assert!(result.hits() <= result.accesses(), "{}", config.name);
        }
    }

    #[test]
    fn direct_is_one_way(trace in trace_strategy(), kb in 0usize..SIZES_KB.len()) {
        let size = SIZES_KB[kb];
        for (write_policy, prefetch_policy) in [
            (WritePolicy::WriteAllocate, PrefetchPolicy::None),
            (WritePolicy::NoWriteAllocate, PrefetchPolicy::OnMiss),
        ] {
            let direct = CacheConfig::direct("d", size).with_write_policy(write_policy).with_prefetch_policy(prefetch_policy);
            let one_way = CacheConfig::set_associative("s", size, 1).with_write_policy(write_policy).with_prefetch_policy(prefetch_policy);
            prop_assert_eq!(run(&direct, &trace).unwrap(), run(&one_way, &trace).unwrap());
        }
    }

    #[test]
    fn bigger_caches_never_hit_less(trace in trace_strategy()) {
        for ways in [1, 2, 4] {
            let hits: Vec<u64> = SIZES_KB.iter()
                .map(|&kb| run(&CacheConfig::set_associative("s", kb, ways), &trace).unwrap().hits())
                .collect();
            prop_assert!(hits.windows(2).all(|w| w[0] <= w[1]), "{} ways: {:?}", ways, hits);
        }
        let full: Vec<u64> = SIZES_KB.iter()
            .map(|&kb| run(&CacheConfig::full("f", kb, ReplacementPolicyConfig::LeastRecentlyUsed), &trace).unwrap().hits())
            .collect();
        prop_assert!(full.windows(2).all(|w| w[0] <= w[1]), "full: {:?}", full);
    }

    #[test]
    fn a_tag_is_held_at_most_once_per_set(trace in trace_strategy()) {
        for (ways, write_policy, prefetch_policy) in [
            (2, WritePolicy::WriteAllocate, PrefetchPolicy::None),
            (4, WritePolicy::NoWriteAllocate, PrefetchPolicy::Always),
            (8, WritePolicy::WriteAllocate, PrefetchPolicy::OnMiss),
        ] {
            let geometry = CacheGeometry::new(1024, ways).unwrap();
            let policy = RecencyCounters::new(geometry.total_blocks() as usize);
            let mut cache = Cache::new(geometry, policy, write_policy, prefetch_policy);
            for access in &trace {
                cache.access(*access);
            }
            prop_assert!(tags_unique_per_set(&cache.lines(), cache.ways()), "{} ways", ways);
        }

        let mut exact = FullyAssociativeCache::new(CacheGeometry::fully_associative(1024).unwrap());
        let mut pseudo = PseudoLruCache::new(CacheGeometry::fully_associative(1024).unwrap());
        for access in &trace {
            exact.access(*access);
            pseudo.access(*access);
        }
        prop_assert!(tags_unique_per_set(&exact.lines(), 32));
        prop_assert!(tags_unique_per_set(&pseudo.leaves(), 32));
    }

    #[test]
    fn single_set_matches_fully_associative(trace in trace_strategy()) {
        // 1KB is 32 lines, so 32 ways is one set holding everything
        let single_set = CacheConfig::set_associative("s", 1, 32);
        let full = CacheConfig::full("f", 1, ReplacementPolicyConfig::LeastRecentlyUsed);
        prop_assert_eq!(run(&single_set, &trace).unwrap(), run(&full, &trace).unwrap());
    }
}

#[test]
fn worked_scenario_direct_16kb() {
    // 16KB direct mapped, 32 byte lines: 512 sets
    // offset = bits 0..5, index = bits 5..14, tag = bits 14..32
    // 0x00: index 0, tag 0
    // 0x20: index 1, tag 0, a different set so 0x00 stays cached
    let trace = parse_trace("L 0\nL 0\nL 20\nL 0\n").unwrap();
    let result = run(&CacheConfig::direct("direct-16KB", 16), &trace).unwrap();
    // Misses on both first touches, hits on the repeated 0x00 loads
    assert_eq!(result, SimulationResult::new(2, 4));
}

#[test]
fn no_write_allocate_scenario() {
    let trace = [MemoryAccess::store(0xA000), MemoryAccess::load(0xA000)];
    for kb in SIZES_KB {
        for ways in [1, 2, 4, 8, 16] {
            let config = CacheConfig::set_associative("nwa", kb, ways).with_write_policy(WritePolicy::NoWriteAllocate);
            assert_eq!(run(&config, &trace).unwrap(), SimulationResult::new(0, 2), "{kb}KB {ways} ways");
        }
    }
}

#[test]
fn prefetch_helps_sequential_access() {
    let trace = sequential_trace(0x1_0000, 1000);
    for ways in [1, 2, 4, 8, 16] {
        let none = run(&CacheConfig::set_associative("none", 16, ways), &trace).unwrap();
        let always = run(&CacheConfig::set_associative("always", 16, ways).with_prefetch_policy(PrefetchPolicy::Always), &trace).unwrap();
        let on_miss = run(&CacheConfig::set_associative("on-miss", 16, ways).with_prefetch_policy(PrefetchPolicy::OnMiss), &trace).unwrap();
        assert_eq!(none, SimulationResult::new(0, 1000));
        assert_eq!(always, SimulationResult::new(999, 1000));
        assert_eq!(on_miss, SimulationResult::new(500, 1000));
        assert!(always.hits() >= none.hits());
    }
}

#[test]
fn replacement_engines_are_deterministic() {
    let trace = random_trace(7, 20_000, 0x8000, 0x8000);
    for config in every_engine() {
        assert_eq!(run(&config, &trace).unwrap(), run(&config, &trace).unwrap(), "{}", config.name);
    }
}

#[test]
fn working_set_that_fits_always_hits_after_warmup() {
    let trace = looping_trace(0x4_0000, 32, 5);
    for config in every_engine() {
        let result = run(&config, &trace).unwrap();
        assert!(result.hits() >= 32 * 4, "{}: {result}", config.name);
    }
}

#[test]
fn default_suite_runs() {
    let trace = random_trace(3, 5_000, 0, 0x1_0000);
    for config in SimulationSuite::default().configs() {
        let result = run(config, &trace).unwrap();
        assert_eq!(result.accesses(), 5_000);
    }
}
