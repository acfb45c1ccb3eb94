mod config_commands;
mod render;
mod shell;

use std::{path::PathBuf, time::Duration};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    fimoney_client::Dashboard,
    fimoney_config::FiMoneyConfig,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "fimoney", about = "Fi Money dashboard client", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Gateway base URL (overrides config and FIMONEY_GATEWAY_URL).
    #[arg(long, global = true)]
    gateway: Option<String>,

    /// Fi Money server URL for one-shot commands (overrides config).
    #[arg(long, global = true)]
    server: Option<String>,

    /// Custom config directory (overrides ./ and the user config dir).
    #[arg(long, global = true, env = "FIMONEY_CONFIG_DIR")]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive dashboard (default when no subcommand is provided).
    Shell,
    /// List the tools the server offers.
    Tools,
    /// List the resources the server offers.
    Resources,
    /// Call a tool once.
    Call {
        tool: String,
        /// Arguments as a JSON object; blank means none.
        #[arg(default_value = "")]
        arguments: String,
    },
    /// Read a resource once.
    Read { uri: String },
    /// Ask a free-text question.
    Query {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Show what the gateway reports about its session.
    Status,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

fn dashboard(config: &FiMoneyConfig) -> anyhow::Result<Dashboard> {
    Dashboard::over_http(
        &config.gateway.base_url,
        Duration::from_secs(config.gateway.timeout_secs),
        config.dashboard.suggested_queries.clone(),
    )
    .context("failed to create dashboard")
}

/// Connect, run one command, and disconnect again whatever it returned.
async fn one_shot(dashboard: &Dashboard, server_url: &str, command: Commands) -> anyhow::Result<()> {
    dashboard
        .connect(server_url)
        .await
        .with_context(|| format!("could not connect to {server_url}"))?;
    let outcome = run_connected(dashboard, command).await;
    if let Err(e) = dashboard.disconnect().await {
        warn!(error = %e, "disconnect failed");
    }
    outcome
}

async fn run_connected(dashboard: &Dashboard, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Tools => {
            let registry = dashboard.registry();
            println!(
                "{}",
                render::tools(&registry.get_tools().await, &registry.state().await)
            );
        },
        Commands::Resources => {
            let registry = dashboard.registry();
            println!(
                "{}",
                render::resources(&registry.get_resources().await, &registry.state().await)
            );
        },
        Commands::Call { tool, arguments } => {
            let result = dashboard.invoke(&tool, &arguments).await;
            if let Some(reason) = result.reason() {
                anyhow::bail!("{reason}");
            }
            println!("{}", render::invocation(&result));
        },
        Commands::Read { uri } => {
            let result = dashboard.read(&uri).await;
            if let Some(reason) = result.reason() {
                anyhow::bail!("{reason}");
            }
            println!("{}", render::resource(&result));
        },
        Commands::Query { text } => {
            let result = dashboard.ask(&text.join(" ")).await;
            if let Some(reason) = result.reason() {
                anyhow::bail!("{reason}");
            }
            println!("{}", render::query(&result));
        },
        Commands::Shell | Commands::Status | Commands::Config { .. } => {},
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "fimoney starting");

    let mut config = fimoney_config::discover_and_load(cli.config_dir.as_deref());
    if let Some(gateway) = cli.gateway {
        config.gateway.base_url = gateway;
    }
    if let Some(server) = cli.server {
        config.session.server_url = server;
    }

    match cli.command {
        None | Some(Commands::Shell) => shell::run(dashboard(&config)?, &config).await,
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, cli.config_dir.as_deref(), &config)
        },
        Some(Commands::Status) => {
            let report = dashboard(&config)?.session().status().await?;
            println!("{}", render::status_report(&report));
            Ok(())
        },
        Some(command) => {
            one_shot(&dashboard(&config)?, &config.session.server_url, command).await
        },
    }
}
