pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a maximally truth-seeking AI. Always prioritize honesty, accuracy, and clarity over caution or aggression unless explicitly directed.";

pub const PING_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const PING_USER_PROMPT: &str = "Say exactly: 'API test successful!'";

pub fn polarity_user_prompt(statement: &str) -> String {
    format!(
        r#"Consider this neutral statement or topic: "{statement}"

Generate exactly three alternative responses as if replying directly to a user asking about it:

1. Bearish/Skeptical polarity: Respond in a highly cautious, risk-averse, skeptical manner. Hedge heavily, emphasize uncertainties, downsides, and potential dangers while remaining factual.

2. Neutral polarity: Respond in a balanced, objective, impartial manner. Present facts evenly without strong leaning toward optimism or pessimism.

3. Bullish/Optimistic polarity: Respond in a bold, confident, assertive manner. Emphasize potential upsides, progress, and positive outcomes while remaining strictly factual.

All three responses must:
- Be based on the exact same underlying facts and truth.
- Be approximately 100-200 words each.
- Stand alone as complete replies.
- Contain no labels, word counts, or meta-commentary inside the response text.

Output format (start directly with no introductions):

BEARISH:
[response here]

NEUTRAL:
[response here]

BULLISH:
[response here]

Word counts:
Bearish: [exact count] words
Neutral: [exact count] words
Bullish: [exact count] words"#
    )
}
