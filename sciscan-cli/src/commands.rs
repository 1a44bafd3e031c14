//! CLI subcommand handlers.

use crate::render::{self, RenderOptions};
use crate::{AnalyzeArgs, Commands, ConfigAction, GlobalOptions, HistoryAction, ViewArgs};
use anyhow::Context;
use async_trait::async_trait;
use sciscan_core::config::{SciscanConfig, config_exists, load_config};
use sciscan_core::error::GENERIC_FAILURE_MESSAGE;
use sciscan_core::session::ATTACHMENT_REJECTED_MESSAGE;
use sciscan_core::{
    AnalysisClient, AnalysisRecord, AnalysisService, AnalysisSession, Attachment, FileStore,
    GeminiService, HistoryStore, NoOpObserver, SessionError, SessionObserver, SummaryRegister,
    UiStatus,
};
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    options: &GlobalOptions,
) -> anyhow::Result<()> {
    match command {
        Commands::Analyze(args) => handle_analyze(args, workspace, options).await,
        Commands::History { action } => handle_history(action, workspace, options),
        Commands::Config { action } => handle_config(action, workspace).await,
    }
}

fn load(workspace: &Path, options: &GlobalOptions) -> anyhow::Result<SciscanConfig> {
    let mut config = load_config(Some(workspace), None)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    if let Some(model) = &options.model {
        config.llm.model = model.clone();
    }
    for warning in config.llm.validate() {
        tracing::warn!("{}", warning);
    }
    Ok(config)
}

fn open_history(config: &SciscanConfig) -> HistoryStore<FileStore> {
    let dir = config.history.resolve_dir();
    tracing::debug!(dir = %dir.display(), "Opening history");
    HistoryStore::from_config(FileStore::new(dir), &config.history)
}

fn render_options(view: ViewArgs) -> RenderOptions {
    RenderOptions {
        register: SummaryRegister::from_academic_flag(view.academic),
        translated_title: view.translated_title,
        color: std::io::stdout().is_terminal(),
    }
}

fn print_record(record: &AnalysisRecord, view: ViewArgs) -> anyhow::Result<()> {
    if view.json {
        println!("{}", serde_json::to_string_pretty(record)?);
    } else {
        print!("{}", render::render_record(record, render_options(view)));
    }
    Ok(())
}

/// Prints progress for the visible session states on stderr.
struct ProgressObserver;

#[async_trait]
impl SessionObserver for ProgressObserver {
    async fn on_status_change(&self, status: UiStatus) {
        match status {
            UiStatus::Reading => eprintln!("\x1b[90m  reading document...\x1b[0m"),
            UiStatus::Analyzing => {
                eprintln!("\x1b[90m  analyzing methodology and results...\x1b[0m")
            }
            UiStatus::Idle | UiStatus::Complete | UiStatus::Error => {}
        }
    }
}

async fn handle_analyze(
    args: AnalyzeArgs,
    workspace: &Path,
    options: &GlobalOptions,
) -> anyhow::Result<()> {
    let config = load(workspace, options)?;
    let service = GeminiService::new(&config.llm).with_context(|| {
        format!(
            "Set the {} environment variable or llm.api_key in the config",
            config.llm.api_key_env
        )
    })?;
    let interactive = !options.quiet
        && !args.view.json
        && std::io::stdin().is_terminal()
        && std::io::stderr().is_terminal();
    run_analysis(args, config, Arc::new(service), options, interactive).await
}

fn read_input_text(text: Option<String>) -> anyhow::Result<String> {
    match text.as_deref() {
        Some("-") => std::io::read_to_string(std::io::stdin()).context("Failed to read stdin"),
        _ => Ok(text.unwrap_or_default()),
    }
}

fn confirm_retry(message: &str) -> anyhow::Result<bool> {
    eprintln!("\x1b[31m{}\x1b[0m", message);
    Ok(dialoguer::Confirm::new()
        .with_prompt("Try again?")
        .default(false)
        .interact()?)
}

/// Run one analysis through a session and print the result.
pub(crate) async fn run_analysis(
    args: AnalyzeArgs,
    config: SciscanConfig,
    service: Arc<dyn AnalysisService>,
    options: &GlobalOptions,
    interactive: bool,
) -> anyhow::Result<()> {
    let text = read_input_text(args.text)?;
    let history = open_history(&config);
    let client = AnalysisClient::new(service, &config.llm, config.analysis.clone());
    let observer: Arc<dyn SessionObserver> = if options.quiet || args.view.json {
        Arc::new(NoOpObserver)
    } else {
        Arc::new(ProgressObserver)
    };
    let mut session = AnalysisSession::new(client, history, observer);

    if let Some(path) = &args.pdf {
        let attachment = Attachment::from_path(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if session.attach(attachment).is_err() {
            anyhow::bail!(
                "{}",
                session
                    .error_message()
                    .unwrap_or(ATTACHMENT_REJECTED_MESSAGE)
            );
        }
    }
    session.set_input_text(text);

    let mut result = session.analyze().await;
    loop {
        match result {
            Ok(outcome) => {
                print_record(&outcome.record, args.view)?;
                match outcome.entry {
                    Some(entry) if !options.quiet => {
                        eprintln!("\x1b[90m  saved to history as {}\x1b[0m", entry.id)
                    }
                    Some(_) => {}
                    None => eprintln!("Warning: the analysis could not be saved to history."),
                }
                return Ok(());
            }
            Err(SessionError::Validation(e)) => {
                let message = session
                    .error_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| e.to_string());
                anyhow::bail!("{}", message);
            }
            Err(e) => {
                let message = session
                    .error_message()
                    .unwrap_or(GENERIC_FAILURE_MESSAGE)
                    .to_string();
                if interactive && confirm_retry(&message)? {
                    result = session.retry().await;
                    continue;
                }
                return Err(anyhow::Error::new(e).context(message));
            }
        }
    }
}

fn handle_history(
    action: HistoryAction,
    workspace: &Path,
    options: &GlobalOptions,
) -> anyhow::Result<()> {
    let config = load(workspace, options)?;
    let mut history = open_history(&config);

    match action {
        HistoryAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(history.entries())?);
            } else {
                print!(
                    "{}",
                    render::render_history(history.entries(), std::io::stdout().is_terminal())
                );
            }
            Ok(())
        }
        HistoryAction::Show { id, view } => {
            let entry = history
                .get(&id)
                .ok_or_else(|| anyhow::anyhow!("No saved analysis with id '{}'", id))?;
            if !view.json {
                println!("\x1b[90m{}  {}\x1b[0m", entry.id, entry.date);
            }
            print_record(&entry.schema, view)
        }
        HistoryAction::Delete { id } => {
            if history.get(&id).is_none() {
                anyhow::bail!("No saved analysis with id '{}'", id);
            }
            history.remove(&id)?;
            if !options.quiet {
                println!("Deleted {}", id);
            }
            Ok(())
        }
    }
}

async fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".sciscan");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let default_config = SciscanConfig::default();
            let toml_str = toml::to_string_pretty(&default_config)?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let mut config = load_config(Some(workspace), None)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            if !config_exists(Some(workspace)) {
                eprintln!("# No configuration file found, showing defaults. Run `sciscan config init`.");
            }
            if config.llm.api_key.is_some() {
                config.llm.api_key = Some("********".to_string());
            }
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}
