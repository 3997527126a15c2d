use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    gateway::VotingApi, ActionOutcome, ClientEvent, GatewayOptions, HttpGateway, RemoteGateway,
    VotingClient,
};
use shared::domain::{PresentationId, WeekId};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, normalize_base_url, DEFAULT_CONFIG_FILE};

#[derive(Parser, Debug)]
#[command(name = "lab-voting", about = "Weekly lab presentation voting")]
struct Cli {
    /// Server root, e.g. http://127.0.0.1:5000
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[arg(long)]
    poll_seconds: Option<u64>,
    /// Bearer token sent with every request.
    #[arg(long)]
    token: Option<String>,
    #[arg(long)]
    timeout_seconds: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Keep the page open, polling for changes and reading commands from stdin.
    Watch {
        #[arg(long, default_value = "")]
        date: String,
        #[arg(long)]
        week: Option<String>,
    },
    /// Print weeks and the selected week's presentations once.
    Weeks {
        #[arg(long)]
        week: Option<String>,
    },
    /// Create the week containing DATE, or open it if it already exists.
    CreateWeek {
        #[arg(long)]
        date: String,
    },
    Vote {
        #[arg(long)]
        presentation: i64,
        #[arg(long)]
        week: Option<String>,
    },
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(&cli.config)?;
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }
    if let Some(seconds) = cli.poll_seconds.filter(|s| *s > 0) {
        settings.poll_interval = Duration::from_secs(seconds);
    }
    if let Some(token) = cli.token {
        settings.auth_token = Some(token);
    }
    if let Some(seconds) = cli.timeout_seconds {
        settings.request_timeout = Some(Duration::from_secs(seconds));
    }
    let base_url = normalize_base_url(&settings.base_url)?;
    info!(base_url = %base_url, "using voting server");

    let gateway: Arc<dyn RemoteGateway> = Arc::new(
        HttpGateway::with_options(
            base_url,
            GatewayOptions {
                bearer_token: settings.auth_token.clone(),
                request_timeout: settings.request_timeout,
            },
        )
        .context("failed to build http client")?,
    );
    let client = VotingClient::new_with_poll_interval(Arc::clone(&gateway), settings.poll_interval);

    match cli.command {
        Command::Watch { date, week } => watch(&client, date, week.map(WeekId)).await,
        Command::Weeks { week } => {
            load_or_render(&client, week.map(WeekId)).await?;
            print_page(&client, "").await;
            Ok(())
        }
        Command::CreateWeek { date } => {
            load_or_render(&client, None).await?;
            let outcome = client.controller().create_week_from_input(&date).await;
            print_page(&client, &date).await;
            outcome_to_result(outcome)
        }
        Command::Vote { presentation, week } => {
            load_or_render(&client, week.map(WeekId)).await?;
            let outcome = client.controller().vote(PresentationId(presentation)).await;
            print_page(&client, "").await;
            outcome_to_result(outcome)
        }
        Command::Health => {
            let health = gateway.health().await?;
            println!("ok={}", health.ok);
            Ok(())
        }
    }
}

async fn load_or_render(client: &VotingClient, preferred: Option<WeekId>) -> Result<()> {
    if let Err(err) = client.initial_load(preferred).await {
        print_page(client, "").await;
        return Err(err);
    }
    Ok(())
}

async fn print_page(client: &VotingClient, date_input: &str) {
    println!("{}", client.page(date_input).await.render_text());
}

fn outcome_to_result(outcome: ActionOutcome) -> Result<()> {
    match outcome {
        ActionOutcome::Failed(message) => Err(anyhow!(message)),
        _ => Ok(()),
    }
}

const WATCH_HELP: &str =
    "commands: date YYYY-MM-DD | create | select WEEK | vote ID | dismiss | refresh | quit";

async fn watch(client: &Arc<VotingClient>, mut date: String, week: Option<WeekId>) -> Result<()> {
    let mut events = client.subscribe_events();
    let handle = match client.start(week).await {
        Ok(handle) => handle,
        Err(err) => {
            print_page(client, &date).await;
            return Err(err);
        }
    };
    print_page(client, &date).await;
    println!("{WATCH_HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(ClientEvent::IdentityLoaded(_)) => {}
                Ok(_) => print_page(client, &date).await,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "render events lagged");
                    print_page(client, &date).await;
                }
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                if !run_watch_command(client, &mut date, line.trim()).await {
                    break;
                }
            }
        }
    }

    handle.stop();
    Ok(())
}

/// Returns false when the user asked to quit.
async fn run_watch_command(client: &VotingClient, date: &mut String, line: &str) -> bool {
    let controller = client.controller();
    let (verb, arg) = line
        .split_once(char::is_whitespace)
        .map(|(verb, arg)| (verb, arg.trim()))
        .unwrap_or((line, ""));

    match verb {
        "" => {}
        "quit" | "exit" => return false,
        "date" => {
            *date = arg.to_string();
            print_page(client, date).await;
        }
        "create" => {
            controller.create_week_from_input(date).await;
        }
        "select" => {
            controller.select_week(WeekId::new(arg)).await;
        }
        "vote" => match arg.parse::<i64>() {
            Ok(id) => {
                controller.vote(PresentationId(id)).await;
            }
            Err(_) => println!("vote expects a numeric presentation id"),
        },
        "dismiss" => controller.dismiss_message().await,
        "refresh" => {
            controller.reload().await;
        }
        _ => println!("{WATCH_HELP}"),
    }
    true
}
