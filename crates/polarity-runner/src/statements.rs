use anyhow::{anyhow, Result};
use std::fs;
use std::path::Path;

const STATEMENT_COLUMN: &str = "statement";

/// Reads statements from a CSV with a `statement` column, or from a plain
/// file with one statement per line. Blank entries are dropped.
pub fn load_statements(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path)
        .map_err(|e| anyhow!("error loading {}: {}", path.display(), e))?;
    let statements = match statements_from_csv(&raw) {
        Some(rows) => rows,
        None => raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
    };
    if statements.is_empty() {
        return Err(anyhow!(
            "no statements loaded from {}; check the file format",
            path.display()
        ));
    }
    Ok(statements)
}

fn statements_from_csv(raw: &str) -> Option<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(raw.as_bytes());
    let column = reader
        .headers()
        .ok()?
        .iter()
        .position(|h| h.trim() == STATEMENT_COLUMN)?;
    let mut out = Vec::new();
    for record in reader.records() {
        let record = record.ok()?;
        if let Some(value) = record.get(column).map(str::trim) {
            if !value.is_empty() {
                out.push(value.to_string());
            }
        }
    }
    Some(out)
}
