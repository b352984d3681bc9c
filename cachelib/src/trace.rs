use std::fmt;
use std::str::FromStr;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Whether an access reads or writes memory
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessKind {
    Load,
    Store,
}

/// A single trace record. The trace is replayed in order
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryAccess {
    pub kind: AccessKind,
    pub address: u32,
}

impl MemoryAccess {
    pub const fn load(address: u32) -> Self {
        Self { kind: AccessKind::Load, address }
    }

    pub const fn store(address: u32) -> Self {
        Self { kind: AccessKind::Store, address }
    }
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("couldn't read the trace file: {0}")]
    Io(#[from] std::io::Error),
    #[error("the trace file is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("line {line}: expected `<L|S> <hex-address>`, found {record:?}")]
    MalformedRecord { line: usize, record: String },
    #[error("line {line}: address {address:?} does not fit in 32 bits")]
    AddressOutOfRange { line: usize, address: String },
    #[error("couldn't build the record pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("unknown access kind {0:?}, expected L or S")]
    UnknownKind(String),
}

impl FromStr for AccessKind {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "L" | "l" => Ok(AccessKind::Load),
            "S" | "s" => Ok(AccessKind::Store),
            _ => Err(TraceError::UnknownKind(s.to_string())),
        }
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessKind::Load => write!(f, "L"),
            AccessKind::Store => write!(f, "S"),
        }
    }
}

impl fmt::Display for MemoryAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:08x}", self.kind, self.address)
    }
}

/// Parses a textual trace with one `<L|S> <hex-address>` record per line
///
/// The address may carry a `0x` prefix. Blank lines are skipped, anything else that doesn't match
/// is an error naming its (1-based) line number
///
/// # Arguments
///
/// * `text`: The whole trace
///
/// returns: Result<Vec<MemoryAccess>, TraceError>
///
/// # Examples
///
/// ```
/// use cachelib::trace::{parse_trace, MemoryAccess};
/// let trace = parse_trace("L 0\nS 0x20\n").unwrap();
/// assert_eq!(trace, vec![MemoryAccess::load(0), MemoryAccess::store(0x20)]);
/// ```
pub fn parse_trace(text: &str) -> Result<Vec<MemoryAccess>, TraceError> {
    let pattern = Regex::new(r"^\s*(?P<kind>[LlSs])\s+(?:0[xX])?(?P<address>[0-9a-fA-F]+)\s*$")?;
    // Counting pass first so the trace is allocated once, whatever its length
    let records = text.lines().filter(|l| !l.trim().is_empty()).count();
    let mut trace = Vec::with_capacity(records);
    for (number, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let captures = pattern.captures(line).ok_or_else(|| TraceError::MalformedRecord {
            line: number + 1,
            record: line.to_string(),
        })?;
        let kind = captures["kind"].parse::<AccessKind>()?;
        let address = u32::from_str_radix(&captures["address"], 16).map_err(|_| TraceError::AddressOutOfRange {
            line: number + 1,
            address: captures["address"].to_string(),
        })?;
        trace.push(MemoryAccess { kind, address });
    }
    log::debug!("Parsed {} trace records", trace.len());
    Ok(trace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_records() {
        let trace = parse_trace("L 7fff5a8c\nS 0x10010000\n\n  l   1f  \ns DEADBEEF\r\n").unwrap();
        assert_eq!(trace, vec![
            MemoryAccess::load(0x7fff_5a8c),
            MemoryAccess::store(0x1001_0000),
            MemoryAccess::load(0x1f),
            MemoryAccess::store(0xDEAD_BEEF),
        ]);
    }

    #[test]
    fn empty_trace() {
        assert!(parse_trace("").unwrap().is_empty());
        assert!(parse_trace("\n\n").unwrap().is_empty());
    }

    #[test]
    fn reports_line_numbers() {
        match parse_trace("L 0\n\nX 20\n") {
            Err(TraceError::MalformedRecord { line, record }) => {
                assert_eq!(line, 3);
                assert_eq!(record, "X 20");
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert!(matches!(parse_trace("L\n"), Err(TraceError::MalformedRecord { line: 1, .. })));
        assert!(matches!(parse_trace("L 0x\n"), Err(TraceError::MalformedRecord { line: 1, .. })));
        assert!(matches!(parse_trace("S 100000000\n"), Err(TraceError::AddressOutOfRange { line: 1, .. })));
    }

    #[test]
    fn kind_round_trip() {
        assert_eq!("L".parse::<AccessKind>().unwrap(), AccessKind::Load);
        assert_eq!("s".parse::<AccessKind>().unwrap(), AccessKind::Store);
        assert!("Q".parse::<AccessKind>().is_err());
        assert_eq!(MemoryAccess::store(0x20).to_string(), "S 00000020");
    }
}
