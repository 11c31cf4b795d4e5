use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use simlab_core::{
    bootstrap, config, presets, CommandMode, LogEvent, Session, SessionError, Settlement,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

mod render;
mod repl;

use repl::ReplCommand;

#[derive(Parser)]
#[command(name = "simlab", version, about = "SIM/SMS research console")]
struct Cli {
    /// Configuration file (defaults to configs/simlab.toml when present)
    #[arg(long, env = "SIMLAB_CONFIG", global = true)]
    config: Option<PathBuf>,
    /// Use the offline synthetic oracle regardless of configuration
    #[arg(long, global = true)]
    synthetic: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive console streaming the activity log
    Console,
    /// Decode and analyze one PDU, then exit
    Analyze {
        hex: String,
        /// Print the resulting session state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the scripted sequence to completion
    Simulate {
        /// Override the step interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// List the canned examples
    Examples,
    /// Print the configuration JSON schema
    Schema {
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn load_config(cli: &Cli) -> Result<config::Config> {
    let (mut cfg, path) = config::load_effective(cli.config.as_deref())?;
    if let Some(path) = path {
        tracing::info!(path = %path.display(), "configuration loaded");
    }
    if cli.synthetic {
        cfg.oracle.backend = config::BackendKind::Synthetic;
    }
    Ok(cfg)
}

/// Prints log events as they arrive until the channel closes.
fn spawn_log_printer(session: &Session) -> tokio::task::JoinHandle<()> {
    let mut rx = session.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(LogEvent::Appended(entry)) => println!("{}", render::entry_line(&entry)),
                Ok(LogEvent::Cleared) => println!("-- log cleared --"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "log display fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn report(result: Result<Settlement, SessionError>) {
    match result {
        Ok(Settlement::Succeeded) | Ok(Settlement::Failed) => {}
        Ok(Settlement::Discarded) => println!("(result discarded after reset)"),
        Err(err) => eprintln!("refused: {err}"),
    }
}

async fn run_analyze(session: Session, hex: &str, json: bool) -> Result<()> {
    let settlement = session.submit_for_analysis(hex).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
        return Ok(());
    }
    for entry in session.log().entries() {
        println!("{}", render::entry_line(&entry));
    }
    if settlement.is_success() {
        let state = session.state();
        if let Some(decoded) = &state.decoded {
            println!("\n{}", render::decoded(decoded));
        }
        if let Some(analysis) = &state.analysis {
            println!("\n{}", render::analysis(analysis));
        }
    }
    Ok(())
}

async fn run_simulation(session: Session) -> Result<()> {
    let printer = spawn_log_printer(&session);
    session.start_simulation()?;
    while session.is_running() || session.pending_followups() > 0 || session.in_flight() {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    session.shutdown();
    // Let the printer drain what is already queued.
    tokio::time::sleep(Duration::from_millis(50)).await;
    printer.abort();
    Ok(())
}

fn dispatch(session: &Session, cmd: ReplCommand) -> bool {
    match cmd {
        ReplCommand::Analyze(hex) => {
            let s = session.clone();
            tokio::spawn(async move { report(s.submit_for_analysis(&hex).await) });
        }
        ReplCommand::Import(hex) => {
            let s = session.clone();
            tokio::spawn(async move { report(s.import_params(&hex).await) });
        }
        ReplCommand::Exec(name) => {
            let s = session.clone();
            tokio::spawn(async move {
                report(s.execute_command(&name, CommandMode::Interactive, None).await)
            });
        }
        ReplCommand::Form(params) => {
            let s = session.clone();
            tokio::spawn(async move { report(s.submit_builder_form(params).await) });
        }
        ReplCommand::Topic(topic) => {
            let s = session.clone();
            tokio::spawn(async move {
                report(s.fetch_topic(&topic).await);
                if let Some(info) = s.state().info {
                    println!("# {}\n{}", info.topic, info.body);
                }
            });
        }
        ReplCommand::Env(stk_type) => session.set_stk_type(stk_type),
        ReplCommand::View(view) => session.set_view(view),
        ReplCommand::ToggleSimulation => {
            if let Err(err) = session.toggle_simulation() {
                eprintln!("refused: {err}");
            }
        }
        ReplCommand::Examples => {
            for example in presets::catalog() {
                println!("{}", render::example_row(example));
            }
        }
        ReplCommand::Example(id) => {
            if let Err(err) = session.apply_example_by_id(&id) {
                eprintln!("{err}");
            }
        }
        ReplCommand::DismissAnalysis => session.dismiss_analysis(),
        ReplCommand::DismissCommand => session.dismiss_command(),
        ReplCommand::State => println!("{}", render::state(&session.state())),
        ReplCommand::Reset => session.reset(),
        ReplCommand::Help => println!("{}", repl::HELP),
        ReplCommand::Quit => return false,
    }
    true
}

async fn run_console(session: Session) -> Result<()> {
    let printer = spawn_log_printer(&session);
    println!(
        "simlab console ({} oracle). Type `help` for commands.",
        session.oracle().backend_id()
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        match repl::parse_line(&line) {
            Ok(Some(cmd)) => {
                if !dispatch(&session, cmd) {
                    break;
                }
            }
            Ok(None) => {}
            Err(err) => eprintln!("{err}"),
        }
    }
    session.shutdown();
    printer.abort();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    simlab_otel::init_with_default("warn");
    let cli = Cli::parse();
    match &cli.command {
        Commands::Examples => {
            for example in presets::catalog() {
                println!("{}", render::example_row(example));
            }
            Ok(())
        }
        Commands::Schema { out } => {
            let schema = serde_json::to_string_pretty(&config::config_schema_json()?)?;
            match out {
                Some(path) => std::fs::write(path, schema)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{schema}"),
            }
            Ok(())
        }
        Commands::Console => {
            let cfg = load_config(&cli)?;
            run_console(bootstrap::session_from_config(&cfg)?).await
        }
        Commands::Analyze { hex, json } => {
            let cfg = load_config(&cli)?;
            run_analyze(bootstrap::session_from_config(&cfg)?, hex, *json).await
        }
        Commands::Simulate { interval_ms } => {
            let mut cfg = load_config(&cli)?;
            if let Some(ms) = interval_ms {
                cfg.session.step_interval_ms = *ms;
            }
            run_simulation(bootstrap::session_from_config(&cfg)?).await
        }
    }
}
