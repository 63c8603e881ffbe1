use crate::fmt_temperature;
use crate::PolarityError;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Stored in all three valence fields when the response could not be split.
pub const PARSE_FAILED: &str = "Parse failed";

pub const RESULTS_HEADER: [&str; 11] = [
    "statement",
    "repeat_id",
    "temperature",
    "bearish",
    "neutral",
    "bullish",
    "bearish_words",
    "neutral_words",
    "bullish_words",
    "full_output",
    "tokens_used",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Valence {
    Bearish,
    Neutral,
    Bullish,
}

impl Valence {
    pub const ALL: [Valence; 3] = [Valence::Bearish, Valence::Neutral, Valence::Bullish];

    /// Section header the model is asked to emit in the response body.
    pub fn marker(self) -> &'static str {
        match self {
            Valence::Bearish => "BEARISH:",
            Valence::Neutral => "NEUTRAL:",
            Valence::Bullish => "BULLISH:",
        }
    }

    /// Label used inside the trailing word-count block.
    pub fn count_label(self) -> &'static str {
        match self {
            Valence::Bearish => "Bearish:",
            Valence::Neutral => "Neutral:",
            Valence::Bullish => "Bullish:",
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Valence::Bearish => "bearish",
            Valence::Neutral => "neutral",
            Valence::Bullish => "bullish",
        }
    }

    pub fn words_column(self) -> &'static str {
        match self {
            Valence::Bearish => "bearish_words",
            Valence::Neutral => "neutral_words",
            Valence::Bullish => "bullish_words",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValenceTexts {
    pub bearish: String,
    pub neutral: String,
    pub bullish: String,
}

impl ValenceTexts {
    pub fn parse_failed() -> Self {
        Self {
            bearish: PARSE_FAILED.to_string(),
            neutral: PARSE_FAILED.to_string(),
            bullish: PARSE_FAILED.to_string(),
        }
    }

    pub fn get(&self, valence: Valence) -> &str {
        match valence {
            Valence::Bearish => &self.bearish,
            Valence::Neutral => &self.neutral,
            Valence::Bullish => &self.bullish,
        }
    }

    pub fn is_parse_failure(&self) -> bool {
        Valence::ALL.iter().all(|v| self.get(*v) == PARSE_FAILED)
    }
}

/// Self-reported word count from the response's trailing block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordCount {
    Count(u32),
    /// The label was absent from the count block.
    NotAvailable,
    /// The label was present but its value could not be read.
    Error,
}

impl WordCount {
    pub fn as_number(self) -> Option<u32> {
        match self {
            WordCount::Count(n) => Some(n),
            _ => None,
        }
    }
}

impl fmt::Display for WordCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WordCount::Count(n) => write!(f, "{}", n),
            WordCount::NotAvailable => f.write_str("N/A"),
            WordCount::Error => f.write_str("Error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordCounts {
    pub bearish: WordCount,
    pub neutral: WordCount,
    pub bullish: WordCount,
}

impl WordCounts {
    pub fn get(&self, valence: Valence) -> WordCount {
        match valence {
            Valence::Bearish => self.bearish,
            Valence::Neutral => self.neutral,
            Valence::Bullish => self.bullish,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatementRecord {
    pub statement: String,
    pub repeat_id: u32,
    pub temperature: f64,
    pub texts: ValenceTexts,
    pub word_counts: WordCounts,
    pub full_output: String,
    pub tokens_used: u64,
}

impl StatementRecord {
    pub fn to_csv_fields(&self) -> Vec<String> {
        vec![
            self.statement.clone(),
            self.repeat_id.to_string(),
            fmt_temperature(self.temperature),
            self.texts.bearish.clone(),
            self.texts.neutral.clone(),
            self.texts.bullish.clone(),
            self.word_counts.bearish.to_string(),
            self.word_counts.neutral.to_string(),
            self.word_counts.bullish.to_string(),
            self.full_output.clone(),
            self.tokens_used.to_string(),
        ]
    }
}

/// Append-only CSV sink for one temperature's results. Every row is flushed
/// as soon as it is written, so an interrupted run keeps what it produced.
pub struct ResultsWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows: usize,
}

impl ResultsWriter {
    pub fn create(path: &Path) -> Result<Self, PolarityError> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(RESULTS_HEADER)?;
        writer.flush()?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            rows: 0,
        })
    }

    pub fn append(&mut self, record: &StatementRecord) -> Result<(), PolarityError> {
        self.writer.write_record(record.to_csv_fields())?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_record() -> StatementRecord {
        StatementRecord {
            statement: "Rates will fall, eventually".to_string(),
            repeat_id: 3,
            temperature: 0.0,
            texts: ValenceTexts {
                bearish: "Careful.\nVery careful.".to_string(),
                neutral: "Maybe.".to_string(),
                bullish: "Yes!".to_string(),
            },
            word_counts: WordCounts {
                bearish: WordCount::Count(3),
                neutral: WordCount::NotAvailable,
                bullish: WordCount::Error,
            },
            full_output: "BEARISH:\nCareful.".to_string(),
            tokens_used: 812,
        }
    }

    #[test]
    fn word_count_sentinels_render_as_stored_text() {
        assert_eq!(WordCount::Count(120).to_string(), "120");
        assert_eq!(WordCount::NotAvailable.to_string(), "N/A");
        assert_eq!(WordCount::Error.to_string(), "Error");
        assert_eq!(WordCount::Error.as_number(), None);
    }

    #[test]
    fn record_fields_follow_header_order() {
        let fields = sample_record().to_csv_fields();
        assert_eq!(fields.len(), RESULTS_HEADER.len());
        assert_eq!(fields[1], "3");
        assert_eq!(fields[2], "0.0");
        assert_eq!(fields[7], "N/A");
        assert_eq!(fields[8], "Error");
        assert_eq!(fields[10], "812");
    }

    #[test]
    fn parse_failed_texts_are_detected() {
        assert!(ValenceTexts::parse_failed().is_parse_failure());
        assert!(!sample_record().texts.is_parse_failure());
    }

    #[test]
    fn results_writer_flushes_each_row() {
        let root = std::env::temp_dir().join(format!(
            "polarity_writer_test_{}_{}",
            std::process::id(),
            Utc::now().timestamp_micros()
        ));
        std::fs::create_dir_all(&root).expect("temp dir");
        let path = root.join("results_temp0.0_repeats1.csv");
        let mut writer = ResultsWriter::create(&path).expect("create");
        writer.append(&sample_record()).expect("append");
        // Still open: the row must already be on disk.
        let text = std::fs::read_to_string(&path).expect("read");
        assert!(text.starts_with("statement,repeat_id,temperature,bearish"));
        assert!(text.contains("\"Careful.\nVery careful.\""));
        assert_eq!(writer.rows_written(), 1);
        drop(writer);
        let _ = std::fs::remove_dir_all(root);
    }
}
