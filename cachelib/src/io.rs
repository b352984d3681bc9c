use std::fs::File;
use std::path::Path;
use crate::trace::{parse_trace, MemoryAccess, TraceError};

/// Loads and parses a whole trace file into memory
///
/// The full trace is buffered before any simulation starts, so it can be shared read-only between
/// every configuration
pub fn load_trace(path: impl AsRef<Path>) -> Result<Vec<MemoryAccess>, TraceError> {
    let file = File::open(path.as_ref())?;
    // Mapping an empty file fails on some systems, and there's nothing to parse anyway
    if file.metadata()?.len() == 0 {
        return Ok(Vec::new());
    }
    // Compatibility on other systems
    #[cfg(not(unix))]
    {
        use std::io::Read;
        let mut text = String::new();
        std::io::BufReader::new(file).read_to_string(&mut text)?;
        parse_trace(&text)
    }
    // Memory map the file for speed on unix systems
    #[cfg(unix)]
    {
        use memmap2::{Advice, Mmap};
        // The map is only read, and dropped before this function returns
        let m = unsafe { Mmap::map(&file)? };
        m.advise(Advice::Sequential)?;
        parse_trace(std::str::from_utf8(&m)?)
    }
}
