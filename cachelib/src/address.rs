use crate::config::ConfigError;

/// The fixed cache line size used by every cache organisation, in bytes
pub const LINE_SIZE: u32 = 32;

/// Number of low-order address bits addressing a byte within one line
pub const BLOCK_OFFSET_BITS: u32 = LINE_SIZE.trailing_zeros();

/// Largest number of sets whose index bits still fit into a 32-bit address above the block offset
pub const MAX_SETS: u32 = 1 << (u32::BITS - BLOCK_OFFSET_BITS);

/// Integer log2 by shifting, `n` must be a non-zero power of two for the result to be exact
pub const fn log2(n: u32) -> u32 {
    let mut n = n;
    let mut exp = 0;
    while n > 1 {
        n >>= 1;
        exp += 1;
    }
    exp
}

/// Maps an address to its set index and tag for a cache with `num_sets` sets
///
/// `num_sets` must be a power of two, this is not checked here. Use [`AddressDecomposer`] to get
/// the check done once when the cache is built
///
/// # Arguments
///
/// * `address`: The byte address of the access
/// * `num_sets`: The number of sets in the cache
///
/// returns: (u32, u32), the set index and the tag
///
/// # Examples
///
/// ```
/// use cachelib::address::decompose;
/// // 512 sets: 5 offset bits, 9 index bits, tag is everything above bit 14
/// assert_eq!(decompose(0x0000_4020, 512), (1, 1));
/// ```
pub const fn decompose(address: u32, num_sets: u32) -> (u32, u32) {
    let index = (address >> BLOCK_OFFSET_BITS) & num_sets.wrapping_sub(1);
    let tag = shift_right(address, BLOCK_OFFSET_BITS + log2(num_sets));
    (index, tag)
}

// Shifting a u32 by 32 or more overflows, a cache with every address bit as index has a zero tag
const fn shift_right(value: u32, bits: u32) -> u32 {
    match value.checked_shr(bits) {
        Some(v) => v,
        None => 0,
    }
}

/// Precomputed index mask and tag shift for a validated set count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressDecomposer {
    set_selection_bit_mask: u32,
    tag_shift: u32,
}

impl AddressDecomposer {
    pub fn new(num_sets: u32) -> Result<Self, ConfigError> {
        if num_sets == 0 || !num_sets.is_power_of_two() {
            return Err(ConfigError::SetsNotPowerOfTwo(num_sets));
        }
        if num_sets > MAX_SETS {
            return Err(ConfigError::TooManySets(num_sets));
        }
        Ok(Self {
            set_selection_bit_mask: num_sets - 1,
            tag_shift: BLOCK_OFFSET_BITS + num_sets.trailing_zeros(),
        })
    }

    /// Splits an address into (set index, tag), the index can be used directly to select a set
    #[inline]
    pub fn decompose(&self, address: u32) -> (usize, u32) {
        let index = (address >> BLOCK_OFFSET_BITS) & self.set_selection_bit_mask;
        (index as usize, shift_right(address, self.tag_shift))
    }

    pub fn num_sets(&self) -> u32 {
        self.set_selection_bit_mask + 1
    }
}
