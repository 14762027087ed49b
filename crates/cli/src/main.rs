//! anvil CLI — the main entry point.
//!
//! Interactive REPL by default; `-p/--prompt` runs a single request
//! non-interactively and exits.

use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use anvil_agent::{AgentLoop, StdoutSink};
use anvil_config::AppConfig;

const BANNER: &str = "
╔══════════════════════════════════════╗
║      anvil — coding assistant        ║
║  Type your request and press Enter.  ║
║  Ctrl+C or 'exit' to quit.           ║
╚══════════════════════════════════════╝
";

#[derive(Parser)]
#[command(name = "anvil", about = "A local coding assistant for the terminal", version)]
struct Cli {
    /// Model backend: "anthropic" or "local"
    #[arg(long)]
    backend: Option<String>,

    /// Model name for the selected backend
    #[arg(long)]
    model: Option<String>,

    /// Working directory for shell commands and relative file paths
    #[arg(long)]
    working_dir: Option<String>,

    /// Run a single prompt non-interactively and exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn model_name(config: &AppConfig) -> String {
    if config.backend == "anthropic" {
        config.anthropic.model.clone()
    } else {
        format!("{} @ {}", config.local.model, config.local.base_url)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let mut config = AppConfig::load()?;

    // Flags override config and env
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(model) = cli.model {
        if config.backend == "anthropic" {
            config.anthropic.model = model;
        } else {
            config.local.model = model;
        }
    }
    if let Some(dir) = cli.working_dir {
        config.working_directory = dir;
    }
    config.validate()?;

    let backend = anvil_backends::from_config(&config)?;
    let tools = Arc::new(anvil_tools::default_registry(
        &config.working_directory,
        Duration::from_secs(config.tool_timeout_secs),
    ));
    let mut agent = AgentLoop::new(backend, tools, config.max_context_messages);
    let mut sink = StdoutSink;

    // Non-interactive mode: run one prompt and exit
    if let Some(prompt) = cli.prompt {
        if let Err(e) = agent.run_turn(&prompt, &mut sink).await {
            eprintln!("[error] {e}");
            std::process::exit(1);
        }
        return Ok(());
    }

    println!("{BANNER}");
    println!("  Backend : {}", config.backend);
    println!("  Model   : {}", model_name(&config));
    println!("  Work dir: {}\n", config.working_directory);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!("\nGoodbye.");
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            println!("Goodbye.");
            break;
        }

        // A failed turn ends the turn, not the session
        if let Err(e) = agent.run_turn(input, &mut sink).await {
            eprintln!("[error] {e}");
        }
    }

    let usage = agent.usage();
    tracing::debug!(
        requests = usage.requests,
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        "Session token usage"
    );

    Ok(())
}
