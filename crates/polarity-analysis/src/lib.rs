mod aggregate;
mod chart;
mod report;
mod stance;

pub use aggregate::{
    aggregate, identical_percentage, ColumnStances, ColumnUniqueness, GroupStats, MeanWords,
    ShorterShare, StanceDistribution, Summary, TemperatureStats,
};
pub use chart::{
    bar_chart_file_name, bar_label, constellation_stars, render_all, render_bar_chart,
    render_constellation, stance_bar_data, star_label, BarChartData, BarRow, Star, VizOptions,
    VizOutputs, CONSTELLATION_FILE_NAME, DEFAULT_SEED,
};
pub use report::{render_json, render_text};
pub use stance::{
    column_title, words_column, ClassifierProfile, KeywordClassifier, ProfileKind, StanceLabel,
};
