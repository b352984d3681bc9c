/// A generic trait for implementing replacement policies. Used to parameterise a Cache.
///
/// Indices are positions in the cache's flat slot array; a set occupies `lines_per_set`
/// consecutive slots starting at `set_lower_bound_index`
pub trait ReplacementPolicy {
    /// Called once for every access to a set, before its tags are searched
    ///
    /// Not applicable for some policies, a default which does nothing is provided
    fn age_set(&mut self, _set_lower_bound_index: usize, _lines_per_set: usize) {}

    /// Updates the policy when a cache line is read
    ///
    /// Not applicable for some policies, a default which does nothing is provided
    ///
    /// # Arguments
    ///
    /// * `cache_index`: The index of the cache line which was read
    ///
    /// returns: ()
    fn update_on_read(&mut self, _cache_index: usize) {}

    /// Updates the policy when an empty line is filled without evicting anything. By default a fill
    /// counts as a read
    fn update_on_fill(&mut self, cache_index: usize) {
        self.update_on_read(cache_index)
    }

    /// Used by the cache to pick the line to evict when every line of the set is valid
    ///
    /// Implementations should assume that when this method is called, the cache line has been
    /// replaced
    ///
    /// # Arguments
    ///
    /// * `set_lower_bound_index`: The lower bound for the cache lines of the set. This is equal to
    /// set * lines_per_set, but the cache already knows it
    /// * `lines_per_set`: The number of cache lines per set
    ///
    /// returns: usize
    fn get_new_line(&mut self, set_lower_bound_index: usize, lines_per_set: usize) -> usize;
}

#[derive(Debug, Default)]
/// NoPolicy is used for direct mapped caches. It does nothing when updating on read, and simply
/// returns the set lower bound index when a new line is requested
///
/// As the generic cache implementation is monomorphised, the compiler can completely optimise this
/// away, removing the need for a separate implementation
pub struct NoPolicy;

impl ReplacementPolicy for NoPolicy {
    fn get_new_line(&mut self, set_lower_bound_index: usize, _lines_per_set: usize) -> usize {
        set_lower_bound_index
    }
}

/// Exact least recently used replacement, with one recency counter per line
///
/// Every access to a set ages all of its counters by one and resets the counter of the line that
/// was used, so a counter holds the number of set accesses since that line was last referenced.
/// The line with the largest counter is the least recently used one
#[derive(Debug)]
pub struct RecencyCounters {
    counters: Vec<u64>,
}

impl RecencyCounters {
    pub fn new(num_lines: usize) -> Self {
        Self {
            counters: vec![0; num_lines],
        }
    }

    pub fn counter(&self, cache_index: usize) -> u64 {
        self.counters[cache_index]
    }
}

impl ReplacementPolicy for RecencyCounters {
    fn age_set(&mut self, set_lower_bound_index: usize, lines_per_set: usize) {
        for counter in &mut self.counters[set_lower_bound_index..set_lower_bound_index + lines_per_set] {
            *counter += 1;
        }
    }

    fn update_on_read(&mut self, cache_index: usize) {
        self.counters[cache_index] = 0;
    }

    fn get_new_line(&mut self, set_lower_bound_index: usize, lines_per_set: usize) -> usize {
        let slb = set_lower_bound_index;
        let mut index = slb;
        // Strictly greater, so ties go to the lowest index
        let mut max_value = 0;
        let mut max_index = slb;
        while index < slb + lines_per_set {
            if self.counters[index] > max_value {
                max_value = self.counters[index];
                max_index = index;
            }
            index += 1;
        }
        self.counters[max_index] = 0;
        max_index
    }
}
