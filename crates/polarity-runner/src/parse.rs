use polarity_core::{Valence, ValenceTexts, WordCount, WordCounts};

pub const WORD_COUNTS_MARKER: &str = "Word counts:";
const WORDS_TOKEN: &str = "words";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub texts: ValenceTexts,
    pub word_counts: WordCounts,
}

pub fn parse_response(output: &str) -> ParsedResponse {
    let (body, counts) = split_sections(output);
    ParsedResponse {
        texts: extract_valences(body),
        word_counts: extract_word_counts(counts),
    }
}

/// Splits on the first `Word counts:` marker. Without the marker the whole
/// output is the body and the count block is empty.
pub fn split_sections(output: &str) -> (&str, &str) {
    match output.split_once(WORD_COUNTS_MARKER) {
        Some((body, counts)) => (body.trim(), counts.trim()),
        None => (output.trim(), ""),
    }
}

/// All-or-nothing: unless the three markers appear in bearish, neutral,
/// bullish order, every field is the parse-failure sentinel.
pub fn extract_valences(body: &str) -> ValenceTexts {
    let positions: Option<Vec<usize>> = Valence::ALL
        .iter()
        .map(|v| body.find(v.marker()))
        .collect();
    let Some(pos) = positions else {
        return ValenceTexts::parse_failed();
    };
    if !(pos[0] < pos[1] && pos[1] < pos[2]) {
        return ValenceTexts::parse_failed();
    }
    let section = |i: usize| {
        let start = pos[i] + Valence::ALL[i].marker().len();
        let end = pos.get(i + 1).copied().unwrap_or(body.len());
        body[start..end].trim().to_string()
    };
    ValenceTexts {
        bearish: section(0),
        neutral: section(1),
        bullish: section(2),
    }
}

pub fn extract_word_counts(block: &str) -> WordCounts {
    WordCounts {
        bearish: extract_word_count(block, Valence::Bearish),
        neutral: extract_word_count(block, Valence::Neutral),
        bullish: extract_word_count(block, Valence::Bullish),
    }
}

pub fn extract_word_count(block: &str, valence: Valence) -> WordCount {
    let label = valence.count_label();
    let Some(start) = block.find(label) else {
        return WordCount::NotAvailable;
    };
    let rest = &block[start + label.len()..];
    let Some(end) = rest.find(WORDS_TOKEN) else {
        return WordCount::Error;
    };
    rest[..end]
        .trim()
        .parse::<u32>()
        .map(WordCount::Count)
        .unwrap_or(WordCount::Error)
}
