//! CLI binary for paper-digest.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `SummaryConfig`, opens a JSON library and reports the outcome.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use paper_digest::{
    summarize, ItemId, JsonLibrary, OpenAiClient, ProgressCallback, Stage, SummaryConfig,
    SummaryOutcome, SummaryProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal stand-in for the host's progress window: a spinner whose
/// prefix is the short title and whose message is the current stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:24.green/238}] {pos:>3}%  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("paper-digest");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl SummaryProgressCallback for CliProgressCallback {
    fn on_start(&self, short_title: &str) {
        self.bar.set_prefix(short_title.to_string());
    }

    fn on_stage(&self, stage: Stage) {
        self.bar.set_position(u64::from(stage.percent()));
        self.bar.set_message(stage.label());
    }

    fn on_already_exists(&self) {
        self.bar.set_position(100);
        self.bar.finish_and_clear();
        eprintln!("{} Summary already exists.", cyan("◆"));
    }

    fn on_complete(&self, note_id: &str) {
        self.bar.set_position(100);
        self.bar.finish_and_clear();
        eprintln!(
            "{} Summary generated successfully! {}",
            green("✔"),
            dim(&format!("(note {note_id})"))
        );
    }

    fn on_error(&self, message: &str) {
        self.bar.abandon_with_message(red(message));
    }
}

/// Exit status for pipeline failures other than bad input.
const EXIT_FAILURE: i32 = 1;

/// Exit status when the selection or its text cannot be summarised.
const EXIT_INPUT: i32 = 2;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarise a record (first PDF/HTML attachment with text)
  paper-digest --library library.json R1

  # Summarise a specific attachment, regenerate even if a summary exists
  paper-digest --library library.json --skip-existing-check A1

  # Local OpenAI-compatible server with custom instructions
  paper-digest --base-url http://localhost:11434/v1 --model qwen2.5:7b \
      --instructions prompt.txt --library library.json R1

  # Machine-readable outcome
  paper-digest --json --library library.json R1

LIBRARY FORMAT:
  {
    "libraryId": 1,
    "items": [
      { "key": "R1", "itemType": "journalArticle", "title": "..." },
      { "key": "A1", "itemType": "attachment", "parentKey": "R1",
        "contentType": "application/pdf", "textPath": "R1/fulltext.txt" }
    ]
  }

EXIT STATUS:
  0  note created, or a summary already exists
  1  setup, network, HTTP, response or library failure
  2  nothing to summarise (no attachment, no text, text too short, ...)

ENVIRONMENT VARIABLES:
  OPENAI_BASE_URL                OpenAI-compatible base URL
  OPENAI_API_KEY                 Bearer token
  PAPER_DIGEST_MODEL             Model name
  PAPER_DIGEST_LIBRARY           Library manifest path
  RUST_LOG                       Override log filter
"#;

/// Summarise a library item with an LLM and attach the result as a note.
#[derive(Parser, Debug)]
#[command(
    name = "paper-digest",
    version,
    about = "Summarise a library item with an LLM and attach the result as a note",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Key of the record or attachment to summarise.
    item: String,

    /// Library manifest (JSON).
    #[arg(short, long, env = "PAPER_DIGEST_LIBRARY")]
    library: PathBuf,

    /// OpenAI-compatible base URL; a trailing slash is ignored.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = paper_digest::config::DEFAULT_BASE_URL)]
    base_url: String,

    /// Model name, also shown in the note header.
    #[arg(long, env = "PAPER_DIGEST_MODEL", default_value = paper_digest::config::DEFAULT_MODEL)]
    model: String,

    /// Bearer token for the API.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, default_value = "")]
    api_key: String,

    /// Note header template; `{{modelName}}` is replaced with the model name.
    #[arg(long, env = "PAPER_DIGEST_HEADER")]
    header_template: Option<String>,

    /// Text file with the instruction block appended to the prompt.
    #[arg(long, env = "PAPER_DIGEST_INSTRUCTIONS")]
    instructions: Option<PathBuf>,

    /// Sampling temperature (0.0–2.0). Default: 0.3.
    #[arg(long, env = "PAPER_DIGEST_TEMPERATURE")]
    temperature: Option<f32>,

    /// Max output tokens. Omitted from the request unless set.
    #[arg(long, env = "PAPER_DIGEST_MAX_TOKENS")]
    max_tokens: Option<u32>,

    /// Top-p sampling (0.0–1.0). Omitted from the request unless set.
    #[arg(long, env = "PAPER_DIGEST_TOP_P")]
    top_p: Option<f32>,

    /// Generate even if a summary note with the same header exists.
    #[arg(long, env = "PAPER_DIGEST_SKIP_EXISTING_CHECK")]
    skip_existing_check: bool,

    /// LLM request timeout in seconds.
    #[arg(long, env = "PAPER_DIGEST_API_TIMEOUT", default_value_t = paper_digest::config::DEFAULT_API_TIMEOUT_SECS)]
    api_timeout: u64,

    /// Print the outcome as JSON.
    #[arg(long)]
    json: bool,

    /// Also write the note HTML to stdout.
    #[arg(long)]
    print_note: bool,

    /// Disable the progress spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Setup ────────────────────────────────────────────────────────────
    let config = build_config(&cli).await?;
    let library = JsonLibrary::open(&cli.library)
        .await
        .with_context(|| format!("Failed to open library {:?}", cli.library))?;
    let client = OpenAiClient::new(&config).context("Failed to create LLM client")?;

    // The spinner starts only once nothing but the pipeline can fail.
    let config = if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new();
        SummaryConfig {
            progress_callback: Some(cb),
            ..config
        }
    } else {
        config
    };

    // ── Run ──────────────────────────────────────────────────────────────
    let selection = library.selection(&ItemId::new(cli.item.clone()));
    let outcome = match summarize(selection.as_ref(), &library, &client, &config).await {
        Ok(outcome) => outcome,
        Err(e) => {
            // The spinner already shows the message; without it, print here.
            if !show_progress {
                eprintln!("{}", red(&e.user_message()));
            }
            std::process::exit(if e.is_input() { EXIT_INPUT } else { EXIT_FAILURE });
        }
    };

    report(&cli, &outcome, show_progress)
}

/// Map CLI args to `SummaryConfig`.
async fn build_config(cli: &Cli) -> Result<SummaryConfig> {
    let mut builder = SummaryConfig::builder()
        .base_url(&cli.base_url)
        .model_name(&cli.model)
        .api_key(&cli.api_key)
        .skip_existing_check(cli.skip_existing_check)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref header) = cli.header_template {
        builder = builder.header_template(header);
    }
    if let Some(ref path) = cli.instructions {
        let instructions = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read instructions from {:?}", path))?;
        builder = builder.user_prompt_instructions(instructions);
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = cli.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(p) = cli.top_p {
        builder = builder.top_p(p);
    }
    builder.build().context("Invalid configuration")
}

fn report(cli: &Cli, outcome: &SummaryOutcome, show_progress: bool) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(outcome).context("Failed to serialise outcome")?;
        println!("{json}");
        return Ok(());
    }

    if let (true, SummaryOutcome::Created { content, .. }) = (cli.print_note, outcome) {
        println!("{content}");
    }

    // The spinner already printed the final line.
    if cli.quiet || show_progress {
        return Ok(());
    }
    match outcome {
        SummaryOutcome::Created {
            note_id,
            parent_id,
            text_chars,
            fallback_render,
            ..
        } => {
            eprintln!(
                "Created note {} under {} from {} characters{}",
                note_id,
                parent_id,
                text_chars,
                if *fallback_render { " (preformatted)" } else { "" }
            );
        }
        SummaryOutcome::AlreadyExists { note_id, parent_id } => {
            eprintln!("Summary already exists: note {} under {}", note_id, parent_id);
        }
    }
    Ok(())
}
