//! CLI probe for `stepcanvas_core`.
//!
//! # Responsibility
//! - Load Task documents from disk and drive the core end to end.
//! - Keep output deterministic: ids come from `SequentialIdGenerator`.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use stepcanvas_core::{
    reconcile, ActionItemTable, EditorConfig, ProposalBatch, SequentialIdGenerator, SortKey,
    TableScope, Task,
};

/// Work-breakdown document probe
#[derive(Parser)]
#[command(name = "stepcanvas")]
#[command(about = "Inspect and merge work-breakdown documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Editor config (JSON); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for rolling log files (absolute path)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the action item table of a Task
    Table {
        /// Task document (JSON)
        task: PathBuf,

        /// Limit the table to one SubStep
        #[arg(long)]
        sub_step: Option<String>,

        /// Column header clicks, applied in order
        #[arg(long = "sort", value_name = "COLUMN")]
        sort: Vec<String>,
    },

    /// Merge a proposal batch into a Task and print the result
    Reconcile {
        /// Task document (JSON)
        task: PathBuf,

        /// Proposal batch (JSON)
        proposals: PathBuf,
    },

    /// Print the core version
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    start_logging(&config, cli.log_dir.as_deref())?;

    let output = match cli.command {
        Commands::Table {
            task,
            sub_step,
            sort,
        } => {
            let task = load_task(&task)?;
            let scope = sub_step.map_or(TableScope::All, TableScope::SubStep);
            let clicks = sort
                .iter()
                .map(|raw| raw.parse::<SortKey>())
                .collect::<Result<Vec<_>, _>>()?;
            render_table(&task, &scope, &clicks)
        }
        Commands::Reconcile { task, proposals } => {
            let task = load_task(&task)?;
            let batch = load_batch(&proposals)?;
            let merged = merge_proposals(&task, &batch, &config);
            serde_json::to_string_pretty(&merged)?
        }
        Commands::Version => format!("stepcanvas_core version={}", stepcanvas_core::core_version()),
    };
    println!("{output}");
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    let Some(path) = path else {
        return Ok(EditorConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    EditorConfig::from_json_str(&raw).with_context(|| format!("invalid config {}", path.display()))
}

fn start_logging(config: &EditorConfig, log_dir: Option<&Path>) -> Result<()> {
    match log_dir {
        Some(dir) => {
            let Some(dir) = dir.to_str() else {
                bail!("log dir is not valid UTF-8: {}", dir.display());
            };
            stepcanvas_core::init_logging(&config.logging.level, dir)
                .map_err(|message| anyhow::anyhow!(message))?;
        }
        None => {
            stepcanvas_core::init_logging_from_config(&config.logging)
                .map_err(|message| anyhow::anyhow!(message))?;
        }
    }
    Ok(())
}

fn load_task(path: &Path) -> Result<Task> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read task {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid task document {}", path.display()))
}

fn load_batch(path: &Path) -> Result<ProposalBatch> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read proposals {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid proposal batch {}", path.display()))
}

fn render_table(task: &Task, scope: &TableScope, clicks: &[SortKey]) -> String {
    let details = task.details_or_default();
    let mut table = ActionItemTable::new(&details, &task.title, scope);
    for key in clicks {
        table.request_sort(*key);
    }

    let mut out = String::new();
    let sort_label = match table.sort_state().active() {
        Some(active) => format!("{} {}", active.key.as_str(), active.direction.as_str()),
        None => "none".to_string(),
    };
    // Writes into a String cannot fail.
    let _ = writeln!(
        out,
        "{} / {} (sort: {})",
        table.task_name(),
        table.scope_label(),
        sort_label
    );
    for row in table.rows() {
        let item = row.action_item;
        let _ = writeln!(
            out,
            "[{}] {}\t{}\t{}\t{}\t{}",
            if item.completed { "x" } else { " " },
            item.text,
            row.sub_step_name,
            item.responsible.as_deref().unwrap_or("-"),
            item.due_date.as_deref().unwrap_or("-"),
            item.completed_date.as_deref().unwrap_or("-"),
        );
    }
    out.trim_end().to_string()
}

fn merge_proposals(task: &Task, batch: &ProposalBatch, config: &EditorConfig) -> Task {
    let details = task.details_or_default();
    let mut ids = SequentialIdGenerator::resume_after(&details);
    let outcome = reconcile(&details, batch, &mut ids, config);
    info!(
        "event=cli_reconcile module=cli status=ok substeps={} action_items={} dropped={}",
        outcome.created_sub_step_ids.len(),
        outcome.created_action_item_ids.len(),
        outcome.dropped_action_items
    );
    Task {
        extended_details: Some(outcome.details),
        ..task.clone()
    }
}
