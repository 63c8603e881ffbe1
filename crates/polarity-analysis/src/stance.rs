use polarity_core::{ProbeTable, PARSE_FAILED};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StanceLabel {
    #[serde(rename = "Bearish/Skeptical")]
    Bearish,
    #[serde(rename = "Neutral/Balanced")]
    Neutral,
    #[serde(rename = "Bullish/Optimistic")]
    Bullish,
    #[serde(rename = "Parse Error")]
    ParseError,
}

impl StanceLabel {
    pub const ALL: [StanceLabel; 4] = [
        StanceLabel::Bearish,
        StanceLabel::Neutral,
        StanceLabel::Bullish,
        StanceLabel::ParseError,
    ];

    /// Labels a keyword vote can produce; charts only draw these.
    pub const VOTED: [StanceLabel; 3] = [
        StanceLabel::Bearish,
        StanceLabel::Neutral,
        StanceLabel::Bullish,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StanceLabel::Bearish => "Bearish/Skeptical",
            StanceLabel::Neutral => "Neutral/Balanced",
            StanceLabel::Bullish => "Bullish/Optimistic",
            StanceLabel::ParseError => "Parse Error",
        }
    }
}

impl fmt::Display for StanceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Majority vote between two keyword sets. Keywords match as substrings of
/// the lower-cased text and each keyword counts at most once. Longer keywords
/// are matched first and blanked out, so "not unlock" is never also read as
/// "unlock".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordClassifier {
    keywords: Vec<(String, Lean)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lean {
    Bearish,
    Bullish,
}

const MASK: &str = "\u{0}";

impl KeywordClassifier {
    pub fn new(bearish: &[&str], bullish: &[&str]) -> Self {
        let mut keywords: Vec<(String, Lean)> = bearish
            .iter()
            .map(|w| (w.to_lowercase(), Lean::Bearish))
            .chain(bullish.iter().map(|w| (w.to_lowercase(), Lean::Bullish)))
            .filter(|(w, _)| !w.is_empty())
            .collect();
        keywords.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
        Self { keywords }
    }

    pub fn counts(&self, text: &str) -> (usize, usize) {
        let mut text = text.to_lowercase();
        let (mut bear, mut bull) = (0, 0);
        for (word, lean) in &self.keywords {
            if !text.contains(word.as_str()) {
                continue;
            }
            match lean {
                Lean::Bearish => bear += 1,
                Lean::Bullish => bull += 1,
            }
            text = text.replace(word.as_str(), MASK);
        }
        (bear, bull)
    }

    pub fn classify(&self, text: Option<&str>) -> StanceLabel {
        let Some(text) = text.filter(|t| *t != PARSE_FAILED) else {
            return StanceLabel::ParseError;
        };
        let (bear, bull) = self.counts(text);
        if bear > bull {
            StanceLabel::Bearish
        } else if bull > bear {
            StanceLabel::Bullish
        } else {
            StanceLabel::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    /// Two-column runs (`defensive`/`aggressive`), stance on `aggressive` only.
    Legacy,
    /// Three-valence runs (`bearish`/`neutral`/`bullish`), all classified.
    Triad,
}

/// Keyword sets plus the columns they apply to. Presets are kept separate
/// because the two run formats ask different questions of the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierProfile {
    pub kind: ProfileKind,
    pub valence_columns: Vec<String>,
    pub stance_columns: Vec<String>,
    pub classifier: KeywordClassifier,
}

const LEGACY_BEARISH: &[&str] = &[
    "won't",
    "not unlock",
    "hype",
    "insufficient",
    "no silver",
    "crumbles",
    "reckless",
    "disaster",
];
const LEGACY_BULLISH: &[&str] = &[
    "unlock",
    "essential",
    "linchpin",
    "causal control",
    "breakthrough",
    "ruthlessly",
];

const TRIAD_BEARISH: &[&str] = &[
    "uncertain",
    "risk",
    "danger",
    "hedge",
    "cautious",
    "possible",
    "unproven",
    "emergent",
    "jailbreak",
    "delusion",
    "warp",
    "vulnerable",
];
const TRIAD_BULLISH: &[&str] = &[
    "robust",
    "enforceable",
    "prioritize truth",
    "universal",
    "stable",
    "reliable",
    "breakthrough",
    "solvable",
    "progress",
    "anchored",
];

impl ClassifierProfile {
    pub fn legacy() -> Self {
        Self {
            kind: ProfileKind::Legacy,
            valence_columns: vec!["defensive".to_string(), "aggressive".to_string()],
            stance_columns: vec!["aggressive".to_string()],
            classifier: KeywordClassifier::new(LEGACY_BEARISH, LEGACY_BULLISH),
        }
    }

    pub fn triad() -> Self {
        let columns: Vec<String> = ["bearish", "neutral", "bullish"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        Self {
            kind: ProfileKind::Triad,
            valence_columns: columns.clone(),
            stance_columns: columns,
            classifier: KeywordClassifier::new(TRIAD_BEARISH, TRIAD_BULLISH),
        }
    }

    pub fn for_kind(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Legacy => Self::legacy(),
            ProfileKind::Triad => Self::triad(),
        }
    }

    /// Legacy when the data only carries the two-column layout.
    pub fn detect(table: &ProbeTable) -> Self {
        if table.has_text_column("aggressive") && !table.has_text_column("bearish") {
            Self::legacy()
        } else {
            Self::triad()
        }
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            ProfileKind::Legacy => "legacy",
            ProfileKind::Triad => "triad",
        }
    }

    pub fn active_valence_columns<'a>(&'a self, table: &ProbeTable) -> Vec<&'a str> {
        self.valence_columns
            .iter()
            .filter(|c| table.has_text_column(c))
            .map(String::as_str)
            .collect()
    }

    pub fn active_stance_columns<'a>(&'a self, table: &ProbeTable) -> Vec<&'a str> {
        self.stance_columns
            .iter()
            .filter(|c| table.has_text_column(c))
            .map(String::as_str)
            .collect()
    }
}

pub fn words_column(column: &str) -> String {
    format!("{}_words", column)
}

/// `bearish` -> `Bearish`, for report lines and chart legends.
pub fn column_title(column: &str) -> String {
    let mut chars = column.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn majority_vote_and_ties() {
        let c = KeywordClassifier::new(&["risky", "uncertain"], &["stable", "robust"]);
        assert_eq!(c.classify(Some("This is RISKY and uncertain")), StanceLabel::Bearish);
        assert_eq!(c.classify(Some("fully stable and robust")), StanceLabel::Bullish);
        assert_eq!(c.classify(Some("risky but stable")), StanceLabel::Neutral);
        assert_eq!(c.classify(Some("nothing to see")), StanceLabel::Neutral);
        assert_eq!(c.counts("nothing to see"), (0, 0));
    }

    #[test]
    fn substring_matching_is_not_word_bounded() {
        let c = KeywordClassifier::new(&["risk"], &[]);
        assert_eq!(c.counts("the riskiest plan"), (1, 0));
        // Repeated mentions still count once per keyword.
        assert_eq!(c.counts("risk, risk, risk"), (1, 0));
    }

    #[test]
    fn longer_phrase_masks_the_keyword_it_contains() {
        let legacy = ClassifierProfile::legacy().classifier;
        assert_eq!(legacy.counts("Scaling will not unlock general reasoning."), (1, 0));
        assert_eq!(
            legacy.classify(Some("Scaling will not unlock general reasoning.")),
            StanceLabel::Bearish
        );
        // A bare "unlock" elsewhere in the text still counts.
        assert_eq!(legacy.counts("It will not unlock it, but RL could unlock it"), (1, 1));
        assert_eq!(legacy.classify(Some("This could unlock reasoning")), StanceLabel::Bullish);
    }

    #[test]
    fn missing_and_sentinel_text_is_a_parse_error() {
        let c = ClassifierProfile::triad().classifier;
        assert_eq!(c.classify(None), StanceLabel::ParseError);
        assert_eq!(c.classify(Some(PARSE_FAILED)), StanceLabel::ParseError);
    }

    #[test]
    fn bullish_keywords_are_counted_against_the_text() {
        let c = ClassifierProfile::triad().classifier;
        assert_eq!(
            c.classify(Some("A robust, reliable and stable result.")),
            StanceLabel::Bullish
        );
    }

    #[test]
    fn presets_stay_distinct() {
        let legacy = ClassifierProfile::legacy();
        let triad = ClassifierProfile::triad();
        assert_ne!(legacy.classifier, triad.classifier);
        assert_eq!(legacy.stance_columns, vec!["aggressive"]);
        assert_eq!(triad.stance_columns, vec!["bearish", "neutral", "bullish"]);
        // "hype" only matters to the legacy preset.
        assert_eq!(legacy.classifier.classify(Some("pure hype")), StanceLabel::Bearish);
        assert_eq!(triad.classifier.classify(Some("pure hype")), StanceLabel::Neutral);
    }

    #[test]
    fn labels_render_with_full_names() {
        assert_eq!(StanceLabel::Bearish.to_string(), "Bearish/Skeptical");
        assert_eq!(
            serde_json::to_value(StanceLabel::ParseError).expect("json"),
            serde_json::json!("Parse Error")
        );
    }
}
