use crate::stance::{words_column, ClassifierProfile, KeywordClassifier, StanceLabel};
use polarity_core::{ProbeRow, ProbeTable};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Share of `repeats` whose text duplicates another row in the same group.
pub fn identical_percentage(repeats: usize, distinct: usize) -> f64 {
    if repeats == 0 {
        return 0.0;
    }
    repeats.saturating_sub(distinct) as f64 / repeats as f64 * 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StanceDistribution {
    pub counts: BTreeMap<StanceLabel, usize>,
    pub total: usize,
}

impl StanceDistribution {
    pub fn from_labels(labels: impl IntoIterator<Item = StanceLabel>) -> Self {
        let mut counts = BTreeMap::new();
        let mut total = 0;
        for label in labels {
            *counts.entry(label).or_insert(0) += 1;
            total += 1;
        }
        Self { counts, total }
    }

    pub fn count(&self, label: StanceLabel) -> usize {
        self.counts.get(&label).copied().unwrap_or(0)
    }

    pub fn percent(&self, label: StanceLabel) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(label) as f64 / self.total as f64 * 100.0
    }

    pub fn percentages(&self) -> BTreeMap<StanceLabel, f64> {
        self.counts
            .keys()
            .map(|label| (*label, self.percent(*label)))
            .collect()
    }

    /// Most frequent label; ties resolve in `StanceLabel::ALL` order.
    pub fn dominant(&self) -> Option<StanceLabel> {
        let mut best: Option<(StanceLabel, usize)> = None;
        for label in StanceLabel::ALL {
            let n = self.count(label);
            if n > 0 && best.map_or(true, |(_, b)| n > b) {
                best = Some((label, n));
            }
        }
        best.map(|(label, _)| label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnUniqueness {
    pub column: String,
    pub repeats: usize,
    pub distinct: usize,
    pub identical_pct: f64,
}

impl ColumnUniqueness {
    /// Missing cells do not count as a distinct value.
    pub fn measure<'a>(column: &str, rows: impl IntoIterator<Item = &'a ProbeRow>) -> Self {
        let mut repeats = 0;
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for row in rows {
            repeats += 1;
            if let Some(text) = row.text(column) {
                seen.insert(text);
            }
        }
        Self {
            column: column.to_string(),
            repeats,
            distinct: seen.len(),
            identical_pct: identical_percentage(repeats, seen.len()),
        }
    }

    pub fn distinct_pct(&self) -> f64 {
        if self.repeats == 0 {
            return 0.0;
        }
        self.distinct as f64 / self.repeats as f64 * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStances {
    pub column: String,
    pub distribution: StanceDistribution,
}

impl ColumnStances {
    pub fn classify<'a>(
        column: &str,
        classifier: &KeywordClassifier,
        rows: impl IntoIterator<Item = &'a ProbeRow>,
    ) -> Self {
        Self {
            column: column.to_string(),
            distribution: StanceDistribution::from_labels(
                rows.into_iter().map(|r| classifier.classify(r.text(column))),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub statement: String,
    pub repeats: usize,
    pub uniqueness: Vec<ColumnUniqueness>,
    pub stances: Vec<ColumnStances>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeanWords {
    pub column: String,
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShorterShare {
    /// Column whose count is checked for being smaller.
    pub shorter: String,
    pub than: String,
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureStats {
    pub temperature: f64,
    pub rows: usize,
    pub mean_words: Vec<MeanWords>,
    pub shorter: Option<ShorterShare>,
    pub groups: Vec<GroupStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub profile: &'static str,
    pub total_rows: usize,
    pub statements: Vec<String>,
    pub temperatures: Vec<f64>,
    pub per_temperature: Vec<TemperatureStats>,
}

pub fn aggregate(table: &ProbeTable, profile: &ClassifierProfile) -> Summary {
    let valence_columns = profile.active_valence_columns(table);
    let stance_columns = profile.active_stance_columns(table);
    let temperatures = table.temperatures();

    let per_temperature = temperatures
        .iter()
        .map(|&temperature| {
            let rows: Vec<&ProbeRow> = table.rows_at(temperature).collect();
            let mean_words = valence_columns
                .iter()
                .map(|c| MeanWords {
                    column: c.to_string(),
                    mean: mean_word_count(&rows, &words_column(c)),
                })
                .collect();
            let shorter = match (valence_columns.first(), valence_columns.last()) {
                (Some(first), Some(last)) if first != last => shorter_share(&rows, last, first),
                _ => None,
            };
            let groups = statements_in_order(&rows)
                .into_iter()
                .map(|statement| {
                    let group: Vec<&ProbeRow> = rows
                        .iter()
                        .copied()
                        .filter(|r| r.statement == statement)
                        .collect();
                    group_stats(statement, &group, &valence_columns, &stance_columns, profile)
                })
                .collect();
            TemperatureStats {
                temperature,
                rows: rows.len(),
                mean_words,
                shorter,
                groups,
            }
        })
        .collect();

    Summary {
        profile: profile.name(),
        total_rows: table.len(),
        statements: table.statements().into_iter().map(str::to_string).collect(),
        temperatures,
        per_temperature,
    }
}

fn group_stats(
    statement: &str,
    rows: &[&ProbeRow],
    valence_columns: &[&str],
    stance_columns: &[&str],
    profile: &ClassifierProfile,
) -> GroupStats {
    GroupStats {
        statement: statement.to_string(),
        repeats: rows.len(),
        uniqueness: valence_columns
            .iter()
            .map(|c| ColumnUniqueness::measure(c, rows.iter().copied()))
            .collect(),
        stances: stance_columns
            .iter()
            .map(|c| ColumnStances::classify(c, &profile.classifier, rows.iter().copied()))
            .collect(),
    }
}

fn statements_in_order<'a>(rows: &[&'a ProbeRow]) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for row in rows {
        if !out.contains(&row.statement.as_str()) {
            out.push(&row.statement);
        }
    }
    out
}

fn mean_word_count(rows: &[&ProbeRow], column: &str) -> Option<f64> {
    let values: Vec<f64> = rows.iter().filter_map(|r| r.word_count(column)).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn shorter_share(rows: &[&ProbeRow], shorter: &str, than: &str) -> Option<ShorterShare> {
    let pairs: Vec<(f64, f64)> = rows
        .iter()
        .filter_map(|r| {
            Some((
                r.word_count(&words_column(shorter))?,
                r.word_count(&words_column(than))?,
            ))
        })
        .collect();
    if pairs.is_empty() {
        return None;
    }
    let hits = pairs.iter().filter(|(a, b)| a < b).count();
    Some(ShorterShare {
        shorter: shorter.to_string(),
        than: than.to_string(),
        pct: hits as f64 / pairs.len() as f64 * 100.0,
    })
}
