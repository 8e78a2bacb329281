//! The boot sequence: one linear pass, each step governed by a [`StepPolicy`].

use std::path::{Path, PathBuf};

use {
    clawboot_common::{Error, Result, StepPolicy},
    clawboot_config::{
        BootSettings, DesiredGateway, GatewayDefaults, ReconcileOutcome, reconcile,
        write_auth_profiles,
    },
    clawboot_storage::{
        CleanupMode, CleanupReport, DiskUsageSource, LinkOutcome, ensure_dirs,
        ensure_ephemeral_dirs, format_size, link_agents_dir, needs_diagnostics,
        remove_legacy_paths, run_cleanup, top_entries,
    },
    tracing::{debug, error, info, warn},
};

use crate::{
    launch::{GatewayInvocation, Launcher},
    probe::{Reachability, ReadinessProbe},
};

/// How many of the largest entries to list when the volume stays full.
const DIAGNOSTIC_ENTRIES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    EnsureDirectories,
    ReconcileConfig,
    AuthProfiles,
    LinkAgents,
    RemoveLegacy,
    ReclaimSpace,
    ReadinessProbe,
    Launch,
}

impl Step {
    /// Execution order.
    pub const ALL: [Step; 8] = [
        Step::EnsureDirectories,
        Step::ReconcileConfig,
        Step::AuthProfiles,
        Step::LinkAgents,
        Step::RemoveLegacy,
        Step::ReclaimSpace,
        Step::ReadinessProbe,
        Step::Launch,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::EnsureDirectories => "ensure-directories",
            Self::ReconcileConfig => "reconcile-config",
            Self::AuthProfiles => "auth-profiles",
            Self::LinkAgents => "link-agents",
            Self::RemoveLegacy => "remove-legacy",
            Self::ReclaimSpace => "reclaim-space",
            Self::ReadinessProbe => "readiness-probe",
            Self::Launch => "launch",
        }
    }

    pub fn policy(self) -> StepPolicy {
        match self {
            Self::EnsureDirectories | Self::Launch => StepPolicy::Fatal,
            Self::ReconcileConfig => StepPolicy::RecoverWithFallback,
            Self::AuthProfiles
            | Self::LinkAgents
            | Self::RemoveLegacy
            | Self::ReclaimSpace
            | Self::ReadinessProbe => StepPolicy::Ignored,
        }
    }
}

/// Where the gateway's effective settings come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// `openclaw.json` was reconciled; the env vars agree with it.
    File(ReconcileOutcome),
    /// The file could not be reconciled; only the exported env vars are trustworthy.
    EnvOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub step: Step,
    pub message: String,
}

/// Everything the boot sequence observed, for logging and tests.
#[derive(Debug, Default)]
pub struct BootReport {
    pub config_source: Option<ConfigSource>,
    pub auth_profiles: Option<PathBuf>,
    pub link: Option<LinkOutcome>,
    pub legacy_removed: Vec<PathBuf>,
    pub usage_before: Option<u8>,
    pub cleanup_mode: Option<CleanupMode>,
    pub cleanup: Option<CleanupReport>,
    pub usage_after: Option<u8>,
    pub largest_entries: Vec<(PathBuf, u64)>,
    pub reachability: Option<Reachability>,
    pub invocation: Option<GatewayInvocation>,
    pub failures: Vec<StepFailure>,
}

impl BootReport {
    pub fn failed(&self, step: Step) -> bool {
        self.failures.iter().any(|f| f.step == step)
    }
}

pub struct Bootstrap<'a> {
    settings: &'a BootSettings,
    defaults: &'a GatewayDefaults,
    disks: &'a dyn DiskUsageSource,
    probe: &'a dyn ReadinessProbe,
    launcher: &'a dyn Launcher,
    node_options: Option<String>,
}

impl<'a> Bootstrap<'a> {
    pub fn new(
        settings: &'a BootSettings,
        defaults: &'a GatewayDefaults,
        disks: &'a dyn DiskUsageSource,
        probe: &'a dyn ReadinessProbe,
        launcher: &'a dyn Launcher,
    ) -> Self {
        Self {
            settings,
            defaults,
            disks,
            probe,
            launcher,
            node_options: None,
        }
    }

    /// Inherited `NODE_OPTIONS`, extended rather than overwritten at launch.
    #[must_use]
    pub fn with_node_options(mut self, node_options: Option<String>) -> Self {
        self.node_options = node_options;
        self
    }

    /// Run every step in order. With the exec launcher this only returns on
    /// a fatal failure.
    pub async fn run(&self) -> Result<BootReport> {
        let mut report = BootReport::default();
        let s = self.settings;

        // 1. Directories the rest of the sequence writes into.
        let config_dir = s
            .config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let agents_target = s.agents_target();
        let dirs = [config_dir, s.state_dir.as_path(), agents_target.as_path()];
        settle(
            &mut report,
            Step::EnsureDirectories,
            ensure_dirs(&dirs)
                .and_then(|()| ensure_ephemeral_dirs(&s.workspace_dir, &s.sessions_dir)),
        )?;

        // 2. openclaw.json
        let desired = DesiredGateway {
            port: s.port,
            workspace_dir: &s.workspace_dir,
            defaults: self.defaults,
        };
        let reconciled = settle(
            &mut report,
            Step::ReconcileConfig,
            reconcile(&s.config_path, &desired),
        )?;
        report.config_source = Some(match reconciled {
            Some(outcome) => ConfigSource::File(outcome),
            None => {
                warn!(
                    port = s.port,
                    "continuing with environment overrides as the only config source"
                );
                ConfigSource::EnvOnly
            },
        });

        // 3. Provider credentials for the main agent.
        match &s.api_key {
            Some(key) => {
                report.auth_profiles = settle(
                    &mut report,
                    Step::AuthProfiles,
                    write_auth_profiles(&s.state_dir, self.defaults, key),
                )?;
            },
            None => debug!(
                env = %self.defaults.api_key_env,
                "no provider API key set, auth profiles untouched"
            ),
        }

        // 4-5. Layout.
        report.link = settle(
            &mut report,
            Step::LinkAgents,
            link_agents_dir(&s.agents_link(), &agents_target),
        )?;
        report.legacy_removed = settle(
            &mut report,
            Step::RemoveLegacy,
            remove_legacy_paths(
                &s.state_dir,
                &[s.workspace_dir.as_path(), s.sessions_dir.as_path()],
            ),
        )?
        .unwrap_or_default();

        // 6. Disk space.
        self.reclaim_space(&mut report).await?;

        // 7. Upstream reachability, informational only.
        if s.skip_probe {
            debug!("readiness probe skipped");
        } else {
            let url = s
                .probe_url
                .clone()
                .unwrap_or_else(|| self.defaults.models_url());
            let result = self.probe.check(&url).await;
            report.reachability = Some(result.clone());
            if let Some(status) =
                settle(&mut report, Step::ReadinessProbe, result.into_result(&url))?
            {
                info!(url = %url, status, "model provider reachable");
            }
        }

        // 8. Hand over.
        let invocation =
            GatewayInvocation::new(&s.gateway_bin, s.port, self.node_options.as_deref());
        report.invocation = Some(invocation.clone());
        settle(&mut report, Step::Launch, self.launcher.launch(&invocation))?;

        Ok(report)
    }

    async fn reclaim_space(&self, report: &mut BootReport) -> Result<()> {
        let root = &self.settings.state_dir;

        let before = self.disks.used_percent(root);
        let mode = CleanupMode::for_usage(before);
        info!(
            root = %root.display(),
            used_percent = ?before,
            mode = mode.as_str(),
            "persistent volume usage"
        );
        report.usage_before = before;
        report.cleanup_mode = Some(mode);

        report.cleanup = settle(
            report,
            Step::ReclaimSpace,
            run_cleanup(&self.settings.cleanup_script, mode).await,
        )?;

        let after = self.disks.used_percent(root);
        report.usage_after = after;
        info!(used_percent = ?after, "persistent volume usage after cleanup");

        if needs_diagnostics(after) {
            let largest = top_entries(root, DIAGNOSTIC_ENTRIES);
            warn!(
                used_percent = ?after,
                "persistent volume still nearly full; largest entries follow"
            );
            for (path, size) in &largest {
                warn!(size = %format_size(*size), path = %path.display(), "large entry");
            }
            report.largest_entries = largest;
        }
        Ok(())
    }
}

/// Apply `step`'s policy to its result: fatal errors abort, others are
/// recorded and logged.
fn settle<T, E>(
    report: &mut BootReport,
    step: Step,
    result: std::result::Result<T, E>,
) -> Result<Option<T>>
where
    E: std::error::Error + Send + Sync + 'static,
{
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            let policy = step.policy();
            if policy.is_fatal() {
                error!(step = step.name(), policy = %policy, error = %e, "boot step failed");
                return Err(Error::step(step.name(), e));
            }
            warn!(step = step.name(), policy = %policy, error = %e, "boot step failed");
            report.failures.push(StepFailure {
                step,
                message: e.to_string(),
            });
            Ok(None)
        },
    }
}
