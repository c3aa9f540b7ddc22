use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sqlx::sqlite::SqlitePool;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use uuid::Uuid;

use unifaq_core::actors::{SupervisorHandle, TurnReply};
use unifaq_core::brain::{evaluate, IntentDataset, IntentFile, LinearIntentModel, Resolver, QUICK_QUESTIONS};
use unifaq_core::config::BotConfig;
use unifaq_core::database;
use unifaq_core::telemetry::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "unifaq", version, about = "University FAQ assistant")]
struct Cli {
    /// Overrides FAQBOT_DATA_DIR.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Do not write the interaction log.
    #[arg(long, global = true)]
    no_log: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive conversation (default).
    Chat {
        #[arg(long)]
        session: Option<String>,
    },
    /// Answer a single question and exit.
    Ask {
        #[arg(required = true)]
        text: Vec<String>,
        /// Print the full turn as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Score the intent model against the patterns in intents.json.
    Evaluate,
    /// Summarize the interaction log.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = BotConfig::from_env().context("invalid configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    init_tracing(config.log_format);

    let layout = config.layout();
    layout
        .init()
        .with_context(|| format!("cannot prepare data directory {}", layout.root().display()))?;

    match cli.command.unwrap_or(Command::Chat { session: None }) {
        Command::Chat { session } => {
            let supervisor = start_supervisor(&config, cli.no_log).await?;
            let session_id = session.unwrap_or_else(|| Uuid::new_v4().to_string());
            run_chat(&supervisor, session_id).await?;
            supervisor.shutdown().await?;
        }
        Command::Ask { text, json } => {
            let supervisor = start_supervisor(&config, cli.no_log).await?;
            let reply = supervisor
                .process_turn(Uuid::new_v4().to_string(), text.join(" "))
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&reply)?);
            } else {
                println!("{}", reply.display_text);
            }
            supervisor.shutdown().await?;
        }
        Command::Evaluate => run_evaluate(&config)?,
        Command::Stats => {
            let pool = database::init_db(&config.database_url()).await?;
            let stats = database::interaction_stats(&pool).await?;
            println!("turns:           {}", stats.total_turns);
            println!(
                "fallbacks:       {} ({:.1}%)",
                stats.fallback_turns,
                stats.fallback_rate() * 100.0
            );
            match stats.mean_confidence {
                Some(mean) => println!("mean confidence: {:.3}", mean),
                None => println!("mean confidence: n/a"),
            }
            println!("helpful:         {}", stats.helpful);
            println!("unhelpful:       {}", stats.unhelpful);
        }
    }

    Ok(())
}

async fn start_supervisor(config: &BotConfig, no_log: bool) -> Result<SupervisorHandle> {
    let resolver = Arc::new(Resolver::from_config(config)?);
    let pool = if no_log { None } else { open_log(config).await };
    Ok(SupervisorHandle::from_config(config, resolver, pool)?)
}

/// The assistant keeps answering without a log.
async fn open_log(config: &BotConfig) -> Option<SqlitePool> {
    match database::init_db(&config.database_url()).await {
        Ok(pool) => Some(pool),
        Err(e) => {
            error!("Failed to initialize database, interactions will not be logged: {}", e);
            None
        }
    }
}

fn run_evaluate(config: &BotConfig) -> Result<()> {
    let layout = config.layout();
    let intents = IntentFile::from_path(&layout.intents_file())
        .with_context(|| format!("cannot read {}", layout.intents_file().display()))?;
    let dataset = IntentDataset::from_intents(&intents);
    if dataset.is_empty() {
        bail!("{} has no patterns to evaluate", layout.intents_file().display());
    }
    let model = LinearIntentModel::load(&layout.model_file())?;

    info!("Evaluating on {} patterns", dataset.len());
    println!("{}", evaluate(&model, &dataset));
    Ok(())
}

fn print_quick_questions() {
    println!("Quick questions:");
    for (i, (title, _)) in QUICK_QUESTIONS.iter().enumerate() {
        println!("  :quick {}  {}", i + 1, title);
    }
}

fn print_reply(reply: &TurnReply) {
    println!("bot> {}", reply.display_text);
}

fn prompt() -> Result<()> {
    print!("you> ");
    std::io::stdout().flush()?;
    Ok(())
}

async fn run_chat(supervisor: &SupervisorHandle, session_id: String) -> Result<()> {
    println!("Ask me about admissions, programmes, fees or exams. :quick for shortcuts, :quit to leave.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((head, tail)) => (head, tail.trim()),
            None => (line, ""),
        };

        match command {
            ":quit" | ":q" | ":exit" => break,
            ":quick" if rest.is_empty() => print_quick_questions(),
            ":quick" => match rest.parse::<usize>().ok().and_then(|n| QUICK_QUESTIONS.get(n.wrapping_sub(1))) {
                Some((_, question)) => {
                    let reply = supervisor.process_turn(session_id.clone(), question.to_string()).await?;
                    print_reply(&reply);
                }
                None => println!("Pick a number between 1 and {}.", QUICK_QUESTIONS.len()),
            },
            ":history" => {
                for turn in supervisor.history(session_id.clone()).await? {
                    println!(
                        "[{}] you: {}\n    bot: {} ({:.2})",
                        turn.timestamp.format("%H:%M:%S"),
                        turn.user_text,
                        turn.response_text,
                        turn.confidence
                    );
                }
            }
            ":reset" => {
                supervisor.reset_session(session_id.clone()).await?;
                println!("Conversation cleared.");
            }
            ":good" | ":bad" => {
                let helpful = command == ":good";
                let comment = (!rest.is_empty()).then(|| rest.to_string());
                match supervisor
                    .record_feedback(session_id.clone(), None, helpful, comment)
                    .await
                {
                    Ok(_) => println!("Thanks for the feedback."),
                    Err(e) => println!("Feedback not recorded: {}", e),
                }
            }
            _ => {
                let reply = supervisor.process_turn(session_id.clone(), line.to_string()).await?;
                print_reply(&reply);
            }
        }
        prompt()?;
    }

    Ok(())
}
