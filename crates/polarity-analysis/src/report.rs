use crate::aggregate::{StanceDistribution, Summary};
use crate::stance::{column_title as title, StanceLabel};
use polarity_core::{fmt_temperature, truncate_chars};
use serde_json::Value;
use std::fmt::Write;

const HIGHLIGHT_CHARS: usize = 60;
const RULE_WIDTH: usize = 50;

/// Plain-text report printed by `polarity analyze`.
pub fn render_text(summary: &Summary) -> String {
    let mut out = String::new();
    let temps: Vec<String> = summary
        .temperatures
        .iter()
        .map(|t| fmt_temperature(*t))
        .collect();
    let _ = writeln!(
        out,
        "=== Polarity Variance Summary ({} total queries) ===",
        summary.total_rows
    );
    let _ = writeln!(
        out,
        "Profile: {} | Statements: {} | Temperatures: [{}]",
        summary.profile,
        summary.statements.len(),
        temps.join(", ")
    );

    for temp in &summary.per_temperature {
        let _ = writeln!(
            out,
            "\n--- Temp {} ({} queries) ---",
            fmt_temperature(temp.temperature),
            temp.rows
        );
        let means: Vec<String> = temp
            .mean_words
            .iter()
            .map(|m| format!("Avg {} Words: {}", title(&m.column), fmt_mean(m.mean)))
            .collect();
        if !means.is_empty() {
            let _ = writeln!(out, "{}", means.join(" | "));
        }
        if let Some(shorter) = &temp.shorter {
            let _ = writeln!(
                out,
                "{} shorter than {} %: {:.1}%",
                title(&shorter.shorter),
                title(&shorter.than),
                shorter.pct
            );
        }
        for group in &temp.groups {
            let _ = writeln!(out, "\nStatement: {}", group.statement);
            let _ = writeln!(out, "  Repeats: {}", group.repeats);
            for u in &group.uniqueness {
                let _ = writeln!(
                    out,
                    "  {} uniqueness: {}/{} ({:.0}% identical)",
                    title(&u.column),
                    u.distinct,
                    u.repeats,
                    u.identical_pct
                );
            }
            for s in &group.stances {
                let _ = writeln!(
                    out,
                    "  {} stance variants: {} -> {}",
                    title(&s.column),
                    fmt_counts(&s.distribution),
                    fmt_percentages(&s.distribution)
                );
            }
        }
    }

    let _ = writeln!(out, "\n{}", "=".repeat(RULE_WIDTH));
    let _ = writeln!(out, "Polarity variance highlights:");
    for temp in &summary.per_temperature {
        let _ = writeln!(out, "\nTemp {}:", fmt_temperature(temp.temperature));
        for group in &temp.groups {
            let stances: Vec<String> = group
                .stances
                .iter()
                .map(|s| format!("{} {}", title(&s.column), fmt_percentages(&s.distribution)))
                .collect();
            let _ = writeln!(
                out,
                "  {}...: {}",
                truncate_chars(&group.statement, HIGHLIGHT_CHARS),
                stances.join(" | ")
            );
            let uniq: Vec<String> = group
                .uniqueness
                .iter()
                .map(|u| format!("{} {}/{}", title(&u.column), u.distinct, u.repeats))
                .collect();
            let _ = writeln!(out, "    Uniqueness: {}", uniq.join(" | "));
        }
    }
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
    out
}

pub fn render_json(summary: &Summary) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(summary)?)
}

fn fmt_mean(mean: Option<f64>) -> String {
    match mean {
        Some(m) => format!("{:.1}", m),
        None => "n/a".to_string(),
    }
}

fn fmt_counts(dist: &StanceDistribution) -> String {
    let parts: Vec<String> = StanceLabel::ALL
        .iter()
        .filter(|l| dist.count(**l) > 0)
        .map(|l| format!("{}: {}", l, dist.count(*l)))
        .collect();
    format!("{{{}}}", parts.join(", "))
}

fn fmt_percentages(dist: &StanceDistribution) -> String {
    let parts: Vec<String> = StanceLabel::ALL
        .iter()
        .filter(|l| dist.count(**l) > 0)
        .map(|l| format!("{}: {:.1}%", l, dist.percent(*l)))
        .collect();
    format!("{{{}}}", parts.join(", "))
}
