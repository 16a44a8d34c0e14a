//! Small helpers for reading procfs/sysfs files

use std::path::Path;

use crate::Result;

pub(crate) fn read(path: impl AsRef<Path>) -> Result<String> {
    Ok(std::fs::read_to_string(path)?)
}

/// Read a file and return its trimmed content, or `None` if missing or blank
pub(crate) fn read_trimmed(path: impl AsRef<Path>) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    let v = raw.trim();
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

/// Value of a `Key:   1234 kB` style line, in the file's own unit
pub(crate) fn parse_kv_number(line: &str) -> Option<(&str, f64)> {
    let (key, rest) = line.split_once(':')?;
    let value = rest.split_whitespace().next()?.parse::<f64>().ok()?;
    Some((key.trim(), value))
}
