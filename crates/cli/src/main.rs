use std::path::PathBuf;

use {
    clap::Parser,
    clawboot::{Bootstrap, DryRunLauncher, ExecLauncher, HttpProbe, Launcher, launch::NODE_OPTIONS_ENV},
    clawboot_config::{BootSettings, GatewayDefaults, SettingsOverrides},
    clawboot_storage::SystemDisks,
    secrecy::Secret,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

/// Every option is also read from the environment; the container runs this
/// with no arguments.
#[derive(Parser)]
#[command(name = "clawboot", version, about = "OpenClaw gateway container launcher")]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "CLAWBOOT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, env = "CLAWBOOT_JSON_LOGS", default_value_t = false)]
    json_logs: bool,

    /// Persistent state directory holding `openclaw.json`.
    #[arg(long, env = "OPENCLAW_STATE_DIR")]
    state_dir: Option<PathBuf>,
    /// Config file (default: `<state-dir>/openclaw.json`).
    #[arg(long, env = "OPENCLAW_CONFIG_PATH")]
    config_path: Option<PathBuf>,
    /// Root of the ephemeral disk.
    #[arg(long, env = "CLAWBOOT_EPHEMERAL_DIR")]
    ephemeral_dir: Option<PathBuf>,
    /// Agent workspace directory (default: `<ephemeral-dir>/workspace`).
    #[arg(long, env = "OPENCLAW_WORKSPACE_DIR")]
    workspace_dir: Option<PathBuf>,
    /// Sessions directory (default: `<ephemeral-dir>/sessions`).
    #[arg(long, env = "OPENCLAW_SESSIONS_DIR")]
    sessions_dir: Option<PathBuf>,
    /// Port the gateway listens on.
    #[arg(long, env = "PORT")]
    port: Option<u16>,
    /// External cleanup routine.
    #[arg(long, env = "CLAWBOOT_CLEANUP_SCRIPT")]
    cleanup_script: Option<PathBuf>,
    /// Gateway executable.
    #[arg(long, env = "CLAWBOOT_GATEWAY_BIN")]
    gateway_bin: Option<String>,
    /// URL probed for upstream reachability.
    #[arg(long, env = "CLAWBOOT_PROBE_URL")]
    probe_url: Option<String>,
    /// Skip the readiness probe.
    #[arg(long, env = "CLAWBOOT_SKIP_PROBE", default_value_t = false)]
    skip_probe: bool,
    /// Run every step but log the gateway invocation instead of exec'ing it.
    #[arg(long, env = "CLAWBOOT_DRY_RUN", default_value_t = false)]
    dry_run: bool,
    /// Provider API key stored in the main agent's auth profiles.
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

impl Cli {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            state_dir: self.state_dir.clone(),
            config_path: self.config_path.clone(),
            ephemeral_dir: self.ephemeral_dir.clone(),
            workspace_dir: self.workspace_dir.clone(),
            sessions_dir: self.sessions_dir.clone(),
            port: self.port,
            cleanup_script: self.cleanup_script.clone(),
            gateway_bin: self.gateway_bin.clone(),
            probe_url: self.probe_url.clone(),
            skip_probe: self.skip_probe,
            api_key: self
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .map(Secret::new),
        }
    }
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "clawboot starting");

    let settings = BootSettings::resolve(cli.overrides());
    info!(
        state_dir = %settings.state_dir.display(),
        config = %settings.config_path.display(),
        ephemeral_dir = %settings.ephemeral_dir.display(),
        port = settings.port,
        "resolved settings"
    );

    let defaults = GatewayDefaults::default();
    let probe = HttpProbe::new();
    let launcher: Box<dyn Launcher> = if cli.dry_run {
        Box::new(DryRunLauncher)
    } else {
        Box::new(ExecLauncher)
    };

    let report = Bootstrap::new(&settings, &defaults, &SystemDisks, &probe, launcher.as_ref())
        .with_node_options(std::env::var(NODE_OPTIONS_ENV).ok())
        .run()
        .await?;

    info!(
        failures = report.failures.len(),
        config_source = ?report.config_source,
        "boot sequence finished without exec"
    );
    Ok(())
}
