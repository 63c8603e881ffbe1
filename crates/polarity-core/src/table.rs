use crate::PolarityError;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

const STATEMENT: &str = "statement";
const REPEAT_ID: &str = "repeat_id";
const TEMPERATURE: &str = "temperature";
const FULL_OUTPUT: &str = "full_output";
const TOKENS_USED: &str = "tokens_used";
const WORDS_SUFFIX: &str = "_words";

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRow {
    pub statement: String,
    pub repeat_id: Option<u32>,
    pub temperature: f64,
    /// Valence text columns; an empty cell is stored as `None`.
    pub texts: BTreeMap<String, Option<String>>,
    /// `*_words` columns coerced to numbers; sentinels become `None`.
    pub word_counts: BTreeMap<String, Option<f64>>,
    pub full_output: Option<String>,
    pub tokens_used: Option<u64>,
}

impl ProbeRow {
    pub fn text(&self, column: &str) -> Option<&str> {
        self.texts.get(column).and_then(|v| v.as_deref())
    }

    pub fn word_count(&self, column: &str) -> Option<f64> {
        self.word_counts.get(column).copied().flatten()
    }
}

/// Rows from one or more result files. Column lists are the union of every
/// file's header, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeTable {
    pub rows: Vec<ProbeRow>,
    pub text_columns: Vec<String>,
    pub word_columns: Vec<String>,
}

impl ProbeTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_text_column(&self, column: &str) -> bool {
        self.text_columns.iter().any(|c| c == column)
    }

    pub fn concat(&mut self, other: ProbeTable) {
        for c in other.text_columns {
            if !self.text_columns.contains(&c) {
                self.text_columns.push(c);
            }
        }
        for c in other.word_columns {
            if !self.word_columns.contains(&c) {
                self.word_columns.push(c);
            }
        }
        self.rows.extend(other.rows);
    }

    /// Distinct temperatures, ascending.
    pub fn temperatures(&self) -> Vec<f64> {
        let mut temps: Vec<f64> = self.rows.iter().map(|r| r.temperature).collect();
        temps.sort_by(|a, b| a.total_cmp(b));
        temps.dedup();
        temps
    }

    /// Distinct statements in order of first appearance.
    pub fn statements(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !out.contains(&row.statement.as_str()) {
                out.push(&row.statement);
            }
        }
        out
    }

    pub fn rows_at(&self, temperature: f64) -> impl Iterator<Item = &ProbeRow> {
        self.rows.iter().filter(move |r| r.temperature == temperature)
    }
}

pub fn load_csv_file(path: &Path) -> Result<ProbeTable, PolarityError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let index_of = |name: &str| headers.iter().position(|h| h == name);
    let require = |name: &str| {
        index_of(name).ok_or_else(|| PolarityError::MissingColumn {
            path: path.to_path_buf(),
            column: name.to_string(),
        })
    };
    let statement_idx = require(STATEMENT)?;
    let temperature_idx = require(TEMPERATURE)?;
    let repeat_idx = index_of(REPEAT_ID);
    let full_output_idx = index_of(FULL_OUTPUT);
    let tokens_idx = index_of(TOKENS_USED);

    let mut text_columns = Vec::new();
    let mut word_columns = Vec::new();
    for (idx, name) in headers.iter().enumerate() {
        let known = [STATEMENT, REPEAT_ID, TEMPERATURE, FULL_OUTPUT, TOKENS_USED];
        if known.contains(&name.as_str()) || name.is_empty() {
            continue;
        }
        if name.ends_with(WORDS_SUFFIX) {
            word_columns.push((idx, name.clone()));
        } else {
            text_columns.push((idx, name.clone()));
        }
    }

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        // Header is line 1.
        let line = i as u64 + 2;
        let field = |idx: usize| record.get(idx).unwrap_or("");
        let Ok(temperature) = field(temperature_idx).trim().parse::<f64>() else {
            let err = PolarityError::MalformedRow {
                path: path.to_path_buf(),
                line,
                reason: format!("temperature is not a number: '{}'", field(temperature_idx)),
            };
            warn!(error = %err, "skipping row");
            continue;
        };
        let texts = text_columns
            .iter()
            .map(|(idx, name)| (name.clone(), non_empty(field(*idx))))
            .collect();
        let word_counts = word_columns
            .iter()
            .map(|(idx, name)| (name.clone(), coerce_number(field(*idx))))
            .collect();
        rows.push(ProbeRow {
            statement: field(statement_idx).to_string(),
            repeat_id: repeat_idx.and_then(|idx| field(idx).trim().parse().ok()),
            temperature,
            texts,
            word_counts,
            full_output: full_output_idx.and_then(|idx| non_empty(field(idx))),
            tokens_used: tokens_idx.and_then(|idx| field(idx).trim().parse().ok()),
        });
    }

    Ok(ProbeTable {
        rows,
        text_columns: text_columns.into_iter().map(|(_, n)| n).collect(),
        word_columns: word_columns.into_iter().map(|(_, n)| n).collect(),
    })
}

fn non_empty(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

fn coerce_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
