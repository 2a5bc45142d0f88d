use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use smsbridge_cli::cli::{
    cmd_call, cmd_contact, cmd_info, cmd_listen, cmd_messages, cmd_photo, cmd_profile, cmd_send,
    cmd_sims, CallArgs, ContactArgs, ListenArgs, MessagesArgs, PhotoArgs, SendArgs,
};
use smsbridge_cli::config::{load_config, AppConfig, PromptResponse};
use smsbridge_cli::session::Session;
use smsbridge_core_types::PermissionRight;
use smsbridge_record_query::MessageBox;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_DATE"),
    ")"
);

/// smsbridge - permission-gated SMS, contacts and SIM access against a device fixture
#[derive(Parser)]
#[command(author, version, long_version = LONG_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Enable debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Device fixture (YAML or JSON), overrides the configured one
    #[arg(long, value_name = "FILE", global = true)]
    device: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Treat a right as already granted (repeatable)
    #[arg(long, value_name = "RIGHT", global = true)]
    grant: Vec<PermissionRight>,

    /// Answer every permission prompt with a denial
    #[arg(long, global = true)]
    deny: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read received messages
    Inbox(MessagesArgs),

    /// Read sent messages
    Sent(MessagesArgs),

    /// Read draft messages
    Draft(MessagesArgs),

    /// Send a text message
    Send(SendArgs),

    /// Look up a contact by phone number
    Contact(ContactArgs),

    /// Read a contact photo (base64 encoded)
    Photo(PhotoArgs),

    /// Show the device owner's profile
    Profile,

    /// List SIM slots
    Sims,

    /// Issue a raw method call
    Call(CallArgs),

    /// Open the incoming-message and send-status streams and print their events
    Listen(ListenArgs),

    /// Show build information and the active configuration
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.debug)?;
    info!(target = "smsbridge", "Starting smsbridge v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(cli.config.as_deref()).await?;
    apply_overrides(&mut config, &cli);

    match run(cli.command, &config, cli.device.as_deref()).await {
        Ok(()) => {
            info!(target = "smsbridge", "Command completed successfully");
            Ok(())
        }
        Err(e) => {
            error!(target = "smsbridge", "Command failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    config.pretty |= cli.pretty;
    config.pre_granted.extend(cli.grant.iter().copied());
    if cli.deny {
        config.prompt.response = PromptResponse::Deny;
        config.prompt.overrides.clear();
    }
}

async fn run(command: Commands, config: &AppConfig, device: Option<&Path>) -> Result<()> {
    let pretty = config.pretty;
    if let Commands::Info = command {
        return cmd_info(config, pretty).await;
    }

    let session = Session::start(config, device).await?;
    let result = match command {
        Commands::Inbox(args) => cmd_messages(MessageBox::Inbox, args, &session, pretty).await,
        Commands::Sent(args) => cmd_messages(MessageBox::Sent, args, &session, pretty).await,
        Commands::Draft(args) => cmd_messages(MessageBox::Draft, args, &session, pretty).await,
        Commands::Send(args) => cmd_send(args, &session, pretty).await,
        Commands::Contact(args) => cmd_contact(args, &session, pretty).await,
        Commands::Photo(args) => cmd_photo(args, &session, pretty).await,
        Commands::Profile => cmd_profile(&session, pretty).await,
        Commands::Sims => cmd_sims(&session, pretty).await,
        Commands::Call(args) => cmd_call(args, &session, pretty).await,
        Commands::Listen(args) => cmd_listen(args, &session, pretty).await,
        Commands::Info => Ok(()),
    };
    session.close();
    result
}

fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}
