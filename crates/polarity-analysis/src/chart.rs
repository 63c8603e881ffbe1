use crate::aggregate::{ColumnUniqueness, StanceDistribution};
use crate::stance::{column_title, ClassifierProfile, StanceLabel};
use anyhow::{anyhow, Result};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use polarity_core::{ensure_dir, fmt_temperature, truncate_chars, ProbeRow, ProbeTable};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::info;

const BAR_LABEL_CHARS: usize = 60;
const STAR_LABEL_CHARS: usize = 30;
pub const DEFAULT_SEED: u64 = 42;

/// Segment colors indexed by stance column, then by voted label.
const SEGMENT_COLORS: [[RGBColor; 3]; 3] = [
    [RGBColor(139, 0, 0), RGBColor(128, 128, 128), RGBColor(0, 100, 0)],
    [RGBColor(255, 0, 0), RGBColor(211, 211, 211), RGBColor(0, 128, 0)],
    [RGBColor(128, 0, 0), RGBColor(192, 192, 192), RGBColor(0, 255, 0)],
];

#[derive(Debug, Clone, PartialEq)]
pub struct BarRow {
    pub label: String,
    /// One entry per stance column, each holding the percentage of rows per
    /// `StanceLabel::VOTED` label.
    pub segments: Vec<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChartData {
    pub temperature: f64,
    pub columns: Vec<String>,
    pub rows: Vec<BarRow>,
}

impl BarChartData {
    pub fn x_max(&self) -> f64 {
        100.0 * self.columns.len().max(1) as f64
    }
}

pub fn bar_label(statement: &str) -> String {
    if statement.chars().count() > BAR_LABEL_CHARS {
        format!("{}...", truncate_chars(statement, BAR_LABEL_CHARS))
    } else {
        statement.to_string()
    }
}

pub fn stance_bar_data(
    table: &ProbeTable,
    profile: &ClassifierProfile,
    temperature: f64,
) -> BarChartData {
    let columns = profile.active_stance_columns(table);
    let rows: Vec<&ProbeRow> = table.rows_at(temperature).collect();
    let mut statements: Vec<&str> = rows.iter().map(|r| r.statement.as_str()).collect();
    statements.sort_unstable();
    statements.dedup();

    let bars = statements
        .into_iter()
        .map(|statement| {
            let group: Vec<&ProbeRow> = rows
                .iter()
                .copied()
                .filter(|r| r.statement == statement)
                .collect();
            let segments = columns
                .iter()
                .map(|c| {
                    let dist = StanceDistribution::from_labels(
                        group.iter().map(|r| profile.classifier.classify(r.text(c))),
                    );
                    let mut pcts = [0.0; 3];
                    for (slot, label) in pcts.iter_mut().zip(StanceLabel::VOTED) {
                        *slot = dist.percent(label);
                    }
                    pcts
                })
                .collect();
            BarRow {
                label: bar_label(statement),
                segments,
            }
        })
        .collect();

    BarChartData {
        temperature,
        columns: columns.into_iter().map(str::to_string).collect(),
        rows: bars,
    }
}

pub fn bar_chart_file_name(temperature: f64) -> String {
    format!("stance_clusters_temp{:.1}.png", temperature)
}

pub fn render_bar_chart(data: &BarChartData, out_path: &Path) -> Result<(), Box<dyn Error>> {
    let n = data.rows.len().max(1);
    let height = 600 + 40 * n as u32;
    let root = BitMapBackend::new(out_path, (1600, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!(
                "Valence Stance Clusters - Temp {}",
                fmt_temperature(data.temperature)
            ),
            ("sans-serif", 28),
        )
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(480)
        .build_cartesian_2d(0.0..data.x_max(), 0.0..n as f64)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .disable_y_axis()
        .x_desc("percent of repeats (stacked per valence)")
        .draw()?;

    let mut offsets = vec![0.0f64; data.rows.len()];
    for (ci, column) in data.columns.iter().enumerate() {
        for (li, label) in StanceLabel::VOTED.iter().enumerate() {
            let color = SEGMENT_COLORS[ci % 3][li];
            let mut bars = Vec::with_capacity(data.rows.len());
            for (ri, row) in data.rows.iter().enumerate() {
                let width = row.segments[ci][li];
                let y = (n - 1 - ri) as f64;
                bars.push(Rectangle::new(
                    [(offsets[ri], y + 0.15), (offsets[ri] + width, y + 0.85)],
                    color.filled(),
                ));
                offsets[ri] += width;
            }
            chart
                .draw_series(bars)?
                .label(format!("{} {}", column_title(column), short_label(*label)))
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.filled()));
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    let label_style = ("sans-serif", 15)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Right, VPos::Center));
    for (ri, row) in data.rows.iter().enumerate() {
        let (px, py) = chart.backend_coord(&(0.0, (n - 1 - ri) as f64 + 0.5));
        root.draw(&Text::new(row.label.clone(), (px - 8, py), label_style.clone()))?;
    }

    root.present()?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Star {
    pub statement: String,
    pub label: String,
    pub x: f64,
    pub y: f64,
    /// Share of the dominant label among every stance label of the statement.
    pub certainty_pct: f64,
    /// Mean of distinct/n across valence columns.
    pub uniqueness_pct: f64,
    pub dominant: StanceLabel,
}

impl Star {
    pub fn radius(&self) -> f64 {
        (self.certainty_pct * 10.0).sqrt()
    }

    pub fn alpha(&self) -> f64 {
        (self.uniqueness_pct / 100.0).clamp(0.05, 1.0)
    }
}

pub fn star_label(statement: &str) -> String {
    format!("{}...", truncate_chars(statement, STAR_LABEL_CHARS))
}

/// One star per distinct statement, sorted. All x positions are drawn before
/// any y position, so a seed always yields the same layout.
pub fn constellation_stars<R: Rng>(
    table: &ProbeTable,
    profile: &ClassifierProfile,
    rng: &mut R,
) -> Vec<Star> {
    let mut statements = table.statements();
    statements.sort_unstable();
    let xs: Vec<f64> = statements.iter().map(|_| rng.gen_range(0.0..100.0)).collect();
    let ys: Vec<f64> = statements.iter().map(|_| rng.gen_range(0.0..100.0)).collect();
    let stance_columns = profile.active_stance_columns(table);
    let valence_columns = profile.active_valence_columns(table);

    statements
        .iter()
        .enumerate()
        .map(|(i, statement)| {
            let rows: Vec<&ProbeRow> = table
                .rows
                .iter()
                .filter(|r| r.statement == *statement)
                .collect();
            let labels = StanceDistribution::from_labels(stance_columns.iter().flat_map(|c| {
                rows.iter().map(move |r| profile.classifier.classify(r.text(c)))
            }));
            let dominant = labels.dominant().unwrap_or(StanceLabel::Neutral);
            let certainty_pct = if labels.total == 0 {
                50.0
            } else {
                labels.percent(dominant)
            };
            let uniqueness_pct = if valence_columns.is_empty() {
                100.0
            } else {
                valence_columns
                    .iter()
                    .map(|c| ColumnUniqueness::measure(c, rows.iter().copied()).distinct_pct())
                    .sum::<f64>()
                    / valence_columns.len() as f64
            };
            Star {
                statement: statement.to_string(),
                label: star_label(statement),
                x: xs[i],
                y: ys[i],
                certainty_pct,
                uniqueness_pct,
                dominant,
            }
        })
        .collect()
}

pub const CONSTELLATION_FILE_NAME: &str = "constellation_all.png";

pub fn render_constellation(stars: &[Star], out_path: &Path) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(out_path, (1400, 1000)).into_drawing_area();
    root.fill(&BLACK)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Semiotic Constellation - Statements as Stars (size = certainty, glow = uniqueness, color = dominant stance)",
            ("sans-serif", 22).into_font().color(&WHITE),
        )
        .margin(30)
        .build_cartesian_2d(-5.0..125.0, -5.0..105.0)?;

    let text_style = ("sans-serif", 14).into_font().color(&WHITE.mix(0.8));
    for star in stars {
        let color = star_color(star.dominant);
        let points = star_points(star.radius());
        let mut outline = points.clone();
        outline.push(points[0]);
        chart.draw_series(std::iter::once(
            EmptyElement::at((star.x, star.y))
                + Polygon::new(points, color.mix(star.alpha()).filled())
                + PathElement::new(outline, YELLOW.stroke_width(1)),
        ))?;
        chart.draw_series(std::iter::once(Text::new(
            star.label.clone(),
            (star.x + 2.0, star.y),
            text_style.clone(),
        )))?;
    }

    root.present()?;
    Ok(())
}

fn star_color(label: StanceLabel) -> RGBColor {
    match label {
        StanceLabel::Bearish => RGBColor(255, 0, 0),
        StanceLabel::Bullish => RGBColor(0, 255, 0),
        StanceLabel::Neutral | StanceLabel::ParseError => WHITE,
    }
}

/// Five-pointed star outline in pixel offsets around the anchor.
fn star_points(radius: f64) -> Vec<(i32, i32)> {
    let inner = radius * 0.45;
    (0..10)
        .map(|k| {
            let r = if k % 2 == 0 { radius } else { inner };
            let angle = std::f64::consts::FRAC_PI_2 + k as f64 * std::f64::consts::PI / 5.0;
            ((r * angle.cos()).round() as i32, (-r * angle.sin()).round() as i32)
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct VizOptions {
    pub standard_dir: PathBuf,
    pub artistic_dir: PathBuf,
    pub artistic: bool,
    pub seed: u64,
}

#[derive(Debug, Clone, Default)]
pub struct VizOutputs {
    pub bar_charts: Vec<PathBuf>,
    pub constellation: Option<PathBuf>,
}

/// Writes one bar chart per temperature and, when requested, the
/// constellation chart.
pub fn render_all(
    table: &ProbeTable,
    profile: &ClassifierProfile,
    opts: &VizOptions,
) -> Result<VizOutputs> {
    ensure_dir(&opts.standard_dir)?;
    let mut outputs = VizOutputs::default();
    for temperature in table.temperatures() {
        let data = stance_bar_data(table, profile, temperature);
        let path = opts.standard_dir.join(bar_chart_file_name(temperature));
        render_bar_chart(&data, &path)
            .map_err(|e| anyhow!("rendering {}: {}", path.display(), e))?;
        info!(file = %path.display(), statements = data.rows.len(), "wrote bar chart");
        outputs.bar_charts.push(path);
    }

    if opts.artistic {
        ensure_dir(&opts.artistic_dir)?;
        let mut rng = ChaCha8Rng::seed_from_u64(opts.seed);
        let stars = constellation_stars(table, profile, &mut rng);
        let path = opts.artistic_dir.join(CONSTELLATION_FILE_NAME);
        render_constellation(&stars, &path)
            .map_err(|e| anyhow!("rendering {}: {}", path.display(), e))?;
        info!(file = %path.display(), stars = stars.len(), "wrote constellation chart");
        outputs.constellation = Some(path);
    }
    Ok(outputs)
}

fn short_label(label: StanceLabel) -> &'static str {
    match label {
        StanceLabel::Bearish => "Bearish",
        StanceLabel::Neutral => "Neutral",
        StanceLabel::Bullish => "Bullish",
        StanceLabel::ParseError => "Parse Error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stance::KeywordClassifier;
    use std::collections::BTreeMap;

    fn row(statement: &str, temperature: f64, texts: &[(&str, Option<&str>)]) -> ProbeRow {
        ProbeRow {
            statement: statement.to_string(),
            repeat_id: None,
            temperature,
            texts: texts
                .iter()
                .map(|(c, t)| (c.to_string(), t.map(str::to_string)))
                .collect(),
            word_counts: BTreeMap::new(),
            full_output: None,
            tokens_used: None,
        }
    }

    fn table(rows: Vec<ProbeRow>) -> ProbeTable {
        ProbeTable {
            rows,
            text_columns: vec![
                "bearish".to_string(),
                "neutral".to_string(),
                "bullish".to_string(),
            ],
            word_columns: Vec::new(),
        }
    }

    fn profile() -> ClassifierProfile {
        ClassifierProfile {
            classifier: KeywordClassifier::new(&["risky"], &["stable"]),
            ..ClassifierProfile::triad()
        }
    }

    #[test]
    fn bar_segments_are_percentages_per_stance_column() {
        let t = table(vec![
            row("B", 0.0, &[("bearish", Some("risky")), ("neutral", Some("x")), ("bullish", Some("stable"))]),
            row("B", 0.0, &[("bearish", Some("risky")), ("neutral", Some("risky")), ("bullish", None)]),
            row("A", 0.0, &[("bearish", Some("stable")), ("neutral", Some("x")), ("bullish", Some("x"))]),
            row("A", 0.7, &[("bearish", Some("risky")), ("neutral", Some("x")), ("bullish", Some("x"))]),
        ]);
        let data = stance_bar_data(&t, &profile(), 0.0);
        assert_eq!(data.columns, vec!["bearish", "neutral", "bullish"]);
        assert_eq!(data.x_max(), 300.0);
        assert_eq!(data.rows.len(), 2);
        assert_eq!(data.rows[0].label, "A");
        assert_eq!(data.rows[0].segments[0], [0.0, 0.0, 100.0]);
        let b = &data.rows[1];
        assert_eq!(b.segments[0], [100.0, 0.0, 0.0]);
        assert_eq!(b.segments[1], [50.0, 50.0, 0.0]);
        // The parse error still counts toward the denominator.
        assert_eq!(b.segments[2], [0.0, 0.0, 50.0]);
    }

    #[test]
    fn long_statements_are_truncated_for_labels() {
        let long = "x".repeat(75);
        assert_eq!(bar_label(&long), format!("{}...", "x".repeat(60)));
        assert_eq!(bar_label("short"), "short");
        assert_eq!(star_label("short"), "short...");
        assert_eq!(star_label(&long), format!("{}...", "x".repeat(30)));
        assert_eq!(bar_chart_file_name(0.0), "stance_clusters_temp0.0.png");
        assert_eq!(bar_chart_file_name(0.7), "stance_clusters_temp0.7.png");
    }

    #[test]
    fn constellation_layout_is_reproducible_for_a_seed() {
        let t = table(vec![
            row("S1", 0.0, &[("bearish", Some("risky"))]),
            row("S2", 0.0, &[("bearish", Some("stable"))]),
            row("S3", 0.0, &[("bearish", Some("x"))]),
        ]);
        let a = constellation_stars(&t, &profile(), &mut ChaCha8Rng::seed_from_u64(DEFAULT_SEED));
        let b = constellation_stars(&t, &profile(), &mut ChaCha8Rng::seed_from_u64(DEFAULT_SEED));
        let c = constellation_stars(&t, &profile(), &mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.iter().all(|s| (0.0..100.0).contains(&s.x) && (0.0..100.0).contains(&s.y)));

        let mut rng = ChaCha8Rng::seed_from_u64(DEFAULT_SEED);
        let xs: Vec<f64> = (0..3).map(|_| rng.gen_range(0.0..100.0)).collect();
        assert_eq!(a.iter().map(|s| s.x).collect::<Vec<_>>(), xs);
    }

    #[test]
    fn certainty_and_dominant_stance_span_all_valences() {
        let t = table(vec![
            row("S", 0.0, &[("bearish", Some("risky")), ("neutral", Some("risky")), ("bullish", Some("stable"))]),
            row("S", 1.0, &[("bearish", Some("risky")), ("neutral", Some("risky")), ("bullish", Some("risky"))]),
        ]);
        let stars = constellation_stars(&t, &profile(), &mut ChaCha8Rng::seed_from_u64(1));
        let star = &stars[0];
        assert_eq!(star.dominant, StanceLabel::Bearish);
        assert!((star.certainty_pct - 500.0 / 6.0).abs() < 1e-9);
        // bearish: 1 distinct of 2, neutral: 1 of 2, bullish: 2 of 2.
        assert!((star.uniqueness_pct - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(star.label, "S...");
        assert!(star.radius() > 28.0 && star.radius() < 29.0);
    }

    #[test]
    fn statements_without_stance_columns_fall_back_to_defaults() {
        let t = ProbeTable {
            rows: vec![row("S", 0.0, &[])],
            text_columns: Vec::new(),
            word_columns: Vec::new(),
        };
        let stars = constellation_stars(&t, &profile(), &mut ChaCha8Rng::seed_from_u64(1));
        assert_eq!(stars[0].dominant, StanceLabel::Neutral);
        assert_eq!(stars[0].certainty_pct, 50.0);
        assert_eq!(stars[0].uniqueness_pct, 100.0);
        assert_eq!(stars[0].alpha(), 1.0);
    }
}
