//! Handing the process over to the gateway.

use std::process::Command;

use {clawboot_config::BIND_MODE, tracing::info};

pub const PORT_ENV: &str = "OPENCLAW_GATEWAY_PORT";
pub const BIND_ENV: &str = "OPENCLAW_GATEWAY_BIND";
pub const NODE_OPTIONS_ENV: &str = "NODE_OPTIONS";
/// Heap ceiling for the gateway's runtime, in MiB.
pub const MEMORY_CEILING_MB: u32 = 1536;

/// Fully resolved gateway command line and extra environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl GatewayInvocation {
    /// Build the invocation. `node_options` is the inherited `NODE_OPTIONS`;
    /// a heap flag already present there is respected.
    pub fn new(gateway_bin: &str, port: u16, node_options: Option<&str>) -> Self {
        let heap_flag = format!("--max-old-space-size={MEMORY_CEILING_MB}");
        let node_options = match node_options.map(str::trim) {
            Some(existing) if existing.contains("--max-old-space-size") => existing.to_string(),
            Some(existing) if !existing.is_empty() => format!("{existing} {heap_flag}"),
            _ => heap_flag,
        };

        Self {
            program: gateway_bin.to_string(),
            args: vec![
                "gateway".into(),
                "--port".into(),
                port.to_string(),
                "--bind".into(),
                BIND_MODE.into(),
                "--allow-unconfigured".into(),
            ],
            env: vec![
                (PORT_ENV.into(), port.to_string()),
                (BIND_ENV.into(), BIND_MODE.into()),
                (NODE_OPTIONS_ENV.into(), node_options),
            ],
        }
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn command(&self) -> Command {
        let program = which::which(&self.program)
            .map(|p| p.into_os_string())
            .unwrap_or_else(|_| self.program.clone().into());
        let mut cmd = Command::new(program);
        cmd.args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        cmd
    }
}

/// Final step of the boot sequence.
pub trait Launcher: Send + Sync {
    /// Start the gateway. The exec implementation only returns on failure.
    fn launch(&self, invocation: &GatewayInvocation) -> std::io::Result<()>;
}

/// Replaces the current process image with the gateway.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExecLauncher;

impl Launcher for ExecLauncher {
    fn launch(&self, invocation: &GatewayInvocation) -> std::io::Result<()> {
        info!(
            command = %invocation.command_line(),
            env = ?invocation.env,
            "exec gateway"
        );

        let mut cmd = invocation.command();

        #[cfg(unix)]
        let err = {
            use std::os::unix::process::CommandExt;
            // Only returns if exec failed.
            cmd.exec()
        };

        #[cfg(not(unix))]
        let err = match cmd.status() {
            Ok(status) => std::process::exit(status.code().unwrap_or(1)),
            Err(e) => e,
        };

        Err(err)
    }
}

/// Logs the invocation instead of running it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunLauncher;

impl Launcher for DryRunLauncher {
    fn launch(&self, invocation: &GatewayInvocation) -> std::io::Result<()> {
        info!(
            command = %invocation.command_line(),
            env = ?invocation.env,
            "dry run: would exec gateway"
        );
        Ok(())
    }
}
