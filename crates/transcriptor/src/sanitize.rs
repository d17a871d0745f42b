//! Helpers for turning user-supplied paths into log-safe fields and
//! filesystem-safe names.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Returns only the filename component of a path (no directory).
///
/// Safe for span fields: reveals the file name without exposing the full path.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Archive stem with every whitespace run replaced by a single `_`.
///
/// `"Shift 12 May.zip"` becomes `"Shift_12_May"`. Falls back to `"job"` when
/// the path has no usable stem.
pub fn archive_base_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("job");
    RE_WHITESPACE.replace_all(stem, "_").into_owned()
}

/// Human readable byte size: `B`, `KB`, `MB`, `GB`, `TB` with one decimal
/// below 10 units and none above.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if value < 10.0 && unit > 0 {
        format!("{:.1} {}", value, UNITS[unit])
    } else {
        format!("{:.0} {}", value, UNITS[unit])
    }
}
