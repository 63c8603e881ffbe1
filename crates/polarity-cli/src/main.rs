use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use polarity_analysis::{ClassifierProfile, ProfileKind, VizOptions, DEFAULT_SEED};
use polarity_core::{fmt_temperature, load_tables, resolve_inputs, PolarityError, ProbeTable};
use polarity_runner::{
    ClientConfig, HttpChatClient, ProbeConfigFile, ProbeError, ProbePlan, DEFAULT_DELAY,
    DEFAULT_MAX_TOKENS, DEFAULT_SYSTEM_PROMPT,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "polarity",
    version,
    about = "Probe a chat model for polarity variance and summarize the results"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileArg {
    #[value(name = "triad")]
    Triad,
    #[value(name = "legacy")]
    Legacy,
}

impl From<ProfileArg> for ProfileKind {
    fn from(value: ProfileArg) -> Self {
        match value {
            ProfileArg::Triad => ProfileKind::Triad,
            ProfileArg::Legacy => ProfileKind::Legacy,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Query the model for every statement, temperature and repeat.
    Probe {
        #[arg(default_value = "statements.csv")]
        statements: PathBuf,
        #[arg(long, alias = "output_prefix", default_value = "")]
        output_prefix: String,
        #[arg(long, default_value_t = 20)]
        repeats: u32,
        #[arg(long, num_args = 1.., default_values_t = [0.0, 0.3, 0.7, 1.0])]
        temps: Vec<f64>,
        #[arg(long, default_value = "Results")]
        output_dir: PathBuf,
        #[arg(long)]
        delay_ms: Option<u64>,
        #[arg(long)]
        max_tokens: Option<u32>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Summarize uniqueness and stance distributions of result files.
    Analyze {
        path: Option<PathBuf>,
        #[arg(long, value_enum)]
        profile: Option<ProfileArg>,
        #[arg(long)]
        json: bool,
    },
    /// Render stance bar charts and, optionally, the constellation chart.
    Viz {
        #[arg(default_value = "Results")]
        path: PathBuf,
        #[arg(long)]
        artistic: bool,
        #[arg(long, value_enum)]
        profile: Option<ProfileArg>,
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
        #[arg(long, default_value = "Viz_Standard")]
        standard_dir: PathBuf,
        #[arg(long, default_value = "Viz_Artistic")]
        artistic_dir: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Send one short request to check the API key and endpoint.
    Ping {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let json_mode = command_json_mode(&cli.command);
    dotenvy::dotenv().ok();
    init_tracing(json_mode);
    let result = run_command(cli.command);
    match result {
        Ok(Some(payload)) => {
            emit_json(&payload);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) => {
            if json_mode {
                emit_json(&json_error(error_code(&err), err.to_string(), error_details(&err)));
                std::process::exit(1);
            }
            Err(err)
        }
    }
}

/// Logs share stdout with the report unless stdout carries JSON.
fn init_tracing(json_mode: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if json_mode {
        builder.with_writer(std::io::stderr).init();
    } else {
        builder.with_writer(std::io::stdout).init();
    }
}

fn run_command(command: Commands) -> Result<Option<Value>> {
    match command {
        Commands::Probe {
            statements,
            output_prefix,
            repeats,
            temps,
            output_dir,
            delay_ms,
            max_tokens,
            config,
            json,
        } => {
            let file = load_config(config.as_deref())?;
            let client_config = ClientConfig::resolve(&file)?;
            let statements = polarity_runner::load_statements(&statements)?;
            info!(
                statements = statements.len(),
                model = %client_config.model_name,
                "starting probe run"
            );
            let plan = ProbePlan {
                statements,
                temperatures: temps,
                repeats,
                output_dir,
                output_prefix,
                max_tokens: max_tokens
                    .or(file.max_tokens)
                    .unwrap_or(DEFAULT_MAX_TOKENS),
                delay: delay_ms
                    .or(file.delay_ms)
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_DELAY),
                system_prompt: file
                    .system_prompt
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            };
            let client = HttpChatClient::new(client_config)?;
            let summary = polarity_runner::run_probes(&client, &plan)?;
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "probe",
                    "files": paths_to_json(&summary.files),
                    "rows_written": summary.rows_written,
                    "failed_requests": summary.failed_requests,
                    "manifest": summary.manifest_path.display().to_string()
                })));
            }
            println!(
                "All done! {} rows written, {} failed requests.",
                summary.rows_written, summary.failed_requests
            );
            for file in &summary.files {
                println!("results: {}", file.display());
            }
            println!("manifest: {}", summary.manifest_path.display());
        }
        Commands::Analyze {
            path,
            profile,
            json,
        } => {
            let path = path.unwrap_or_else(|| PathBuf::from("Results"));
            let table = load_input(&path)?;
            let profile = select_profile(&table, profile);
            let summary = polarity_analysis::aggregate(&table, &profile);
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "analyze",
                    "input": path.display().to_string(),
                    "summary": polarity_analysis::render_json(&summary)?
                })));
            }
            print!("{}", polarity_analysis::render_text(&summary));
            println!("\nDone. Run again on new batches for fresh stats.");
        }
        Commands::Viz {
            path,
            artistic,
            profile,
            seed,
            standard_dir,
            artistic_dir,
            json,
        } => {
            let table = load_input(&path)?;
            let profile = select_profile(&table, profile);
            let temps: Vec<String> = table
                .temperatures()
                .into_iter()
                .map(fmt_temperature)
                .collect();
            info!(
                "Total rows: {} | Statements: {} | Temps: [{}]",
                table.len(),
                table.statements().len(),
                temps.join(", ")
            );
            let outputs = polarity_analysis::render_all(
                &table,
                &profile,
                &VizOptions {
                    standard_dir: standard_dir.clone(),
                    artistic_dir,
                    artistic,
                    seed,
                },
            )?;
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "viz",
                    "profile": profile.name(),
                    "bar_charts": paths_to_json(&outputs.bar_charts),
                    "constellation": outputs.constellation.map(|p| p.display().to_string())
                })));
            }
            println!("Viz complete!");
            println!("Standard stacked bars -> {}", standard_dir.display());
            if let Some(p) = outputs.constellation {
                println!("Artistic star constellation -> {}", p.display());
            }
        }
        Commands::Ping { config, json } => {
            let file = load_config(config.as_deref())?;
            let client = HttpChatClient::new(ClientConfig::resolve(&file)?)?;
            let completion = polarity_runner::ping(
                &client,
                file.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            )?;
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "ping",
                    "content": completion.content,
                    "total_tokens": completion.total_tokens
                })));
            }
            println!("Response: {}", completion.content);
            println!("Tokens used: {}", completion.total_tokens);
        }
    }
    Ok(None)
}

fn load_config(path: Option<&Path>) -> Result<ProbeConfigFile> {
    match path {
        Some(p) => ProbeConfigFile::load(p),
        None => Ok(ProbeConfigFile::default()),
    }
}

fn load_input(path: &Path) -> Result<ProbeTable> {
    let files = resolve_inputs(path)?;
    info!(count = files.len(), path = %path.display(), "found result files");
    Ok(load_tables(&files)?)
}

fn select_profile(table: &ProbeTable, arg: Option<ProfileArg>) -> ClassifierProfile {
    let profile = match arg {
        Some(kind) => ClassifierProfile::for_kind(kind.into()),
        None => ClassifierProfile::detect(table),
    };
    info!(profile = profile.name(), "classifier profile");
    profile
}

fn error_code(err: &anyhow::Error) -> &'static str {
    if let Some(e) = err.downcast_ref::<PolarityError>() {
        return match e {
            PolarityError::NoInputFiles(_) => "no_input_files",
            PolarityError::InvalidInputPath(_) => "invalid_input_path",
            PolarityError::NoDataLoaded => "no_data_loaded",
            _ => "io_error",
        };
    }
    if let Some(ProbeError::MissingApiKey(_)) = err.downcast_ref::<ProbeError>() {
        return "missing_api_key";
    }
    "command_failed"
}

/// Everything below the top-level message, outermost first.
fn error_details(err: &anyhow::Error) -> Value {
    let causes: Vec<String> = err.chain().skip(1).map(|c| c.to_string()).collect();
    json!({ "causes": causes })
}

fn emit_json(value: &Value) {
    match serde_json::to_string(value) {
        Ok(s) => println!("{}", s),
        Err(_) => println!(
            "{{\"ok\":false,\"error\":{{\"code\":\"serialization_error\",\"message\":\"failed to serialize JSON payload\",\"details\":{{}}}}}}"
        ),
    }
}

fn json_error(code: &str, message: String, details: Value) -> Value {
    json!({
        "ok": false,
        "error": {
            "code": code,
            "message": message,
            "details": details
        }
    })
}

fn command_json_mode(command: &Commands) -> bool {
    match command {
        Commands::Probe { json, .. }
        | Commands::Analyze { json, .. }
        | Commands::Viz { json, .. }
        | Commands::Ping { json, .. } => *json,
    }
}

fn paths_to_json(paths: &[PathBuf]) -> Value {
    Value::Array(
        paths
            .iter()
            .map(|p| Value::String(p.display().to_string()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn probe_defaults_match_documented_run() {
        let cli = Cli::try_parse_from(["polarity", "probe"]).expect("parse");
        match cli.command {
            Commands::Probe {
                statements,
                repeats,
                temps,
                output_dir,
                delay_ms,
                ..
            } => {
                assert_eq!(statements, PathBuf::from("statements.csv"));
                assert_eq!(repeats, 20);
                assert_eq!(temps, vec![0.0, 0.3, 0.7, 1.0]);
                assert_eq!(output_dir, PathBuf::from("Results"));
                assert_eq!(delay_ms, None);
            }
            _ => panic!("expected probe"),
        }
    }

    #[test]
    fn output_prefix_accepts_underscore_and_dash_spellings() {
        for flag in ["--output_prefix", "--output-prefix"] {
            let cli = Cli::try_parse_from(["polarity", "probe", flag, "alignment_"])
                .expect("parse");
            match cli.command {
                Commands::Probe { output_prefix, .. } => assert_eq!(output_prefix, "alignment_"),
                _ => panic!("expected probe"),
            }
        }
    }

    #[test]
    fn viz_and_analyze_accept_profiles_and_json() {
        let cli = Cli::try_parse_from(["polarity", "viz", "--artistic", "--profile", "legacy"])
            .expect("parse");
        assert!(!command_json_mode(&cli.command));
        match cli.command {
            Commands::Viz {
                path,
                artistic,
                profile,
                seed,
                ..
            } => {
                assert_eq!(path, PathBuf::from("Results"));
                assert!(artistic);
                assert!(matches!(profile, Some(ProfileArg::Legacy)));
                assert_eq!(seed, 42);
            }
            _ => panic!("expected viz"),
        }
        let cli = Cli::try_parse_from(["polarity", "analyze", "out.csv", "--json"]).expect("parse");
        assert!(command_json_mode(&cli.command));
    }

    #[test]
    fn input_errors_map_to_stable_codes() {
        let err = anyhow::Error::from(PolarityError::NoDataLoaded);
        assert_eq!(error_code(&err), "no_data_loaded");
        let err = anyhow::Error::from(ProbeError::MissingApiKey("XAI_API_KEY".to_string()));
        assert_eq!(error_code(&err), "missing_api_key");
        assert_eq!(error_code(&anyhow!("boom")), "command_failed");
    }

    #[test]
    fn error_payload_carries_the_cause_chain() {
        let err = anyhow::Error::from(PolarityError::NoDataLoaded).context("loading Results");
        let payload = json_error(error_code(&err), err.to_string(), error_details(&err));
        assert_eq!(payload["ok"], false);
        assert_eq!(payload["error"]["code"], "no_data_loaded");
        assert_eq!(payload["error"]["message"], "loading Results");
        assert_eq!(
            payload["error"]["details"]["causes"],
            json!([PolarityError::NoDataLoaded.to_string()])
        );
        assert_eq!(error_details(&anyhow!("boom"))["causes"], json!([]));
    }
}
