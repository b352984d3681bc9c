use crate::address::LINE_SIZE;
use crate::trace::MemoryAccess;

/// Loads `lines` consecutive cache lines starting at `start`
pub fn sequential_trace(start: u32, lines: u32) -> Vec<MemoryAccess> {
    (0..lines).map(|i| MemoryAccess::load(line_address(start, i))).collect()
}

/// Address of the `line`th line after `start`, wrapping at the top of the 32-bit address space
fn line_address(start: u32, line: u32) -> u32 {
    start.wrapping_add(line.wrapping_mul(LINE_SIZE))
}

/// Walks the same `lines` consecutive lines `passes` times, a loop over an array
pub fn looping_trace(start: u32, lines: u32, passes: usize) -> Vec<MemoryAccess> {
    let pass = sequential_trace(start, lines);
    let mut out = Vec::with_capacity(pass.len() * passes);
    for _ in 0..passes {
        out.extend_from_slice(&pass);
    }
    out
}

/// A reproducible mix of loads and stores, with addresses drawn from `span` bytes above `base`
///
/// Uses a small xorshift generator so traces are identical across runs and platforms. Roughly one
/// access in four is a store
pub fn random_trace(seed: u64, len: usize, base: u32, span: u32) -> Vec<MemoryAccess> {
    // Neighbouring seeds give unrelated streams, and xorshift never leaves a zero state
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ 0xD1B5_4A32_D192_ED03;
    if state == 0 {
        state = 0xD1B5_4A32_D192_ED03;
    }
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    (0..len)
        .map(|_| {
            let value = next();
            let address = base.wrapping_add((value >> 16) as u32 % span.max(1));
            if value & 3 == 0 {
                MemoryAccess::store(address)
            } else {
                MemoryAccess::load(address)
            }
        })
        .collect()
}
