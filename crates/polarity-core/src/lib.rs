use anyhow::Result;
use chrono::Utc;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::Path;

mod error;
mod inputs;
mod record;
mod table;

pub use error::PolarityError;
pub use inputs::{load_tables, resolve_inputs};
pub use record::{
    ResultsWriter, StatementRecord, Valence, ValenceTexts, WordCount, WordCounts, PARSE_FAILED,
    RESULTS_HEADER,
};
pub use table::{load_csv_file, ProbeRow, ProbeTable};

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Writes `bytes` to a sibling temp file and renames it over `path`, so
/// readers never observe a half-written file.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let ts = Utc::now().timestamp_micros();
    let pid = std::process::id();
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("tmpfile");
    let tmp = path.with_file_name(format!(".{}.tmp.{}.{}", name, pid, ts));
    let mut file = fs::File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn atomic_write_json_pretty(path: &Path, value: &Value) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    atomic_write_bytes(path, &bytes)
}

/// Formats a temperature the way result files and reports show it: whole
/// numbers keep one decimal (`0.0`, `1.0`), everything else prints as-is.
pub fn fmt_temperature(t: f64) -> String {
    if t.is_finite() && t.fract() == 0.0 {
        format!("{:.1}", t)
    } else {
        format!("{}", t)
    }
}

/// First `max_chars` characters of `s`, never splitting a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_temperature_keeps_one_decimal_for_whole_numbers() {
        assert_eq!(fmt_temperature(0.0), "0.0");
        assert_eq!(fmt_temperature(1.0), "1.0");
        assert_eq!(fmt_temperature(0.3), "0.3");
        assert_eq!(fmt_temperature(0.75), "0.75");
    }

    #[test]
    fn truncate_chars_is_char_boundary_safe() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("abc", 60), "abc");
    }

    #[test]
    fn atomic_write_replaces_existing_content() {
        let root = std::env::temp_dir().join(format!(
            "polarity_atomic_test_{}_{}",
            std::process::id(),
            Utc::now().timestamp_micros()
        ));
        let path = root.join("nested").join("out.json");
        atomic_write_bytes(&path, b"first").expect("first write");
        atomic_write_json_pretty(&path, &serde_json::json!({"k": 1})).expect("second write");
        let text = fs::read_to_string(&path).expect("read back");
        assert!(text.contains("\"k\": 1"), "unexpected content: {}", text);
        let leftovers: Vec<_> = fs::read_dir(path.parent().expect("parent"))
            .expect("list")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind");
        let _ = fs::remove_dir_all(root);
    }
}
