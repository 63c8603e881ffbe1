use anyhow::Result;
use chrono::Utc;
use polarity_core::{
    atomic_write_json_pretty, ensure_dir, fmt_temperature, ResultsWriter, StatementRecord,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{error, info};

mod client;
mod config;
mod parse;
mod prompt;
mod statements;

pub use client::{ChatClient, ChatCompletion, ChatRequest, HttpChatClient, ProbeError};
pub use config::{
    ClientConfig, ProbeConfigFile, BASE_URL_ENV, DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL,
    DEFAULT_MODEL, MODEL_ENV,
};
pub use parse::{
    extract_valences, extract_word_count, extract_word_counts, parse_response, split_sections,
    ParsedResponse, WORD_COUNTS_MARKER,
};
pub use prompt::{
    polarity_user_prompt, DEFAULT_SYSTEM_PROMPT, PING_SYSTEM_PROMPT, PING_USER_PROMPT,
};
pub use statements::load_statements;

pub const DEFAULT_MAX_TOKENS: u32 = 1500;
pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct ProbePlan {
    pub statements: Vec<String>,
    pub temperatures: Vec<f64>,
    pub repeats: u32,
    pub output_dir: PathBuf,
    pub output_prefix: String,
    pub max_tokens: u32,
    /// Pause after every successful request.
    pub delay: Duration,
    pub system_prompt: String,
}

impl ProbePlan {
    pub fn results_path(&self, temperature: f64) -> PathBuf {
        self.output_dir
            .join(results_file_name(&self.output_prefix, temperature, self.repeats))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir.join(format!(
            "{}probe_manifest_repeats{}.json",
            self.output_prefix, self.repeats
        ))
    }
}

pub fn results_file_name(prefix: &str, temperature: f64, repeats: u32) -> String {
    format!("{}results_temp{:.1}_repeats{}.csv", prefix, temperature, repeats)
}

#[derive(Debug, Clone)]
pub struct ProbeSummary {
    pub files: Vec<PathBuf>,
    pub rows_written: usize,
    pub failed_requests: usize,
    pub manifest_path: PathBuf,
}

/// Runs every (temperature, statement, repeat) combination, writing one
/// results file per temperature. A failed request is logged and skipped;
/// only filesystem errors abort the run.
pub fn run_probes(client: &dyn ChatClient, plan: &ProbePlan) -> Result<ProbeSummary> {
    ensure_dir(&plan.output_dir)?;
    let started_at = Utc::now();
    let total_statements = plan.statements.len();
    let mut files = Vec::new();
    let mut rows_written = 0usize;
    let mut failed_requests = 0usize;

    for &temperature in &plan.temperatures {
        let path = plan.results_path(temperature);
        let mut writer = ResultsWriter::create(&path)?;
        for (i, statement) in plan.statements.iter().enumerate() {
            for repeat in 1..=plan.repeats {
                match probe_once(client, plan, statement, temperature, repeat) {
                    Ok(record) => {
                        writer.append(&record)?;
                        info!(
                            "Temp {} | Stmt {}/{} | Repeat {}/{} ({} tokens)",
                            fmt_temperature(temperature),
                            i + 1,
                            total_statements,
                            repeat,
                            plan.repeats,
                            record.tokens_used
                        );
                        if !plan.delay.is_zero() {
                            thread::sleep(plan.delay);
                        }
                    }
                    Err(err) => {
                        failed_requests += 1;
                        error!("Error on stmt {} repeat {}: {}", i + 1, repeat, err);
                    }
                }
            }
        }
        rows_written += writer.rows_written();
        info!(
            "Temp {} complete -> {}",
            fmt_temperature(temperature),
            writer.path().display()
        );
        files.push(path);
    }

    let manifest_path = plan.manifest_path();
    write_manifest(
        &manifest_path,
        client.model_name(),
        plan,
        &files,
        rows_written,
        failed_requests,
        &started_at.to_rfc3339(),
    )?;

    Ok(ProbeSummary {
        files,
        rows_written,
        failed_requests,
        manifest_path,
    })
}

pub fn probe_once(
    client: &dyn ChatClient,
    plan: &ProbePlan,
    statement: &str,
    temperature: f64,
    repeat_id: u32,
) -> Result<StatementRecord, ProbeError> {
    let user_prompt = polarity_user_prompt(statement);
    let completion = client.complete(&ChatRequest {
        system_prompt: &plan.system_prompt,
        user_prompt: &user_prompt,
        temperature,
        max_tokens: plan.max_tokens,
    })?;
    let parsed = parse_response(&completion.content);
    Ok(StatementRecord {
        statement: statement.to_string(),
        repeat_id,
        temperature,
        texts: parsed.texts,
        word_counts: parsed.word_counts,
        full_output: completion.content,
        tokens_used: completion.total_tokens,
    })
}

/// One short deterministic request to check credentials and connectivity.
/// Reasoning models spend tokens before answering, so the budget is the same
/// one a statement query would get.
pub fn ping(client: &dyn ChatClient, max_tokens: u32) -> Result<ChatCompletion, ProbeError> {
    client.complete(&ChatRequest {
        system_prompt: PING_SYSTEM_PROMPT,
        user_prompt: PING_USER_PROMPT,
        temperature: 0.0,
        max_tokens,
    })
}

fn write_manifest(
    path: &Path,
    model: &str,
    plan: &ProbePlan,
    files: &[PathBuf],
    rows_written: usize,
    failed_requests: usize,
    started_at: &str,
) -> Result<()> {
    let payload = json!({
        "schema_version": "probe_manifest_v1",
        "model": model,
        "temperatures": plan.temperatures,
        "repeats": plan.repeats,
        "statements": plan.statements.len(),
        "max_tokens": plan.max_tokens,
        "rows_written": rows_written,
        "failed_requests": failed_requests,
        "files": files.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
        "started_at": started_at,
        "finished_at": Utc::now().to_rfc3339(),
    });
    atomic_write_json_pretty(path, &payload)
}
