#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use {
    async_trait::async_trait,
    clawboot::{
        BootReport, Bootstrap, ConfigSource, GatewayInvocation, Launcher, Reachability,
        ReadinessProbe, Step,
    },
    clawboot_config::{BootSettings, GatewayDefaults, ReconcileOutcome, SettingsOverrides},
    clawboot_storage::{CleanupMode, DiskUsage, DiskUsageSource, LinkOutcome},
    secrecy::Secret,
    serde_json::Value,
};

/// Reports a fixed usage percentage for every path.
struct FixedDisk(u8);

impl DiskUsageSource for FixedDisk {
    fn usage(&self, _path: &Path) -> Option<DiskUsage> {
        Some(DiskUsage {
            mount_point: PathBuf::from("/"),
            total_bytes: 100,
            available_bytes: u64::from(100 - self.0),
        })
    }
}

struct FixedProbe(Reachability);

#[async_trait]
impl ReadinessProbe for FixedProbe {
    async fn check(&self, _url: &str) -> Reachability {
        self.0.clone()
    }
}

#[derive(Default)]
struct RecordingLauncher {
    launched: Mutex<Vec<GatewayInvocation>>,
}

impl Launcher for RecordingLauncher {
    fn launch(&self, invocation: &GatewayInvocation) -> std::io::Result<()> {
        self.launched.lock().unwrap().push(invocation.clone());
        Ok(())
    }
}

struct FailingLauncher;

impl Launcher for FailingLauncher {
    fn launch(&self, _invocation: &GatewayInvocation) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file or directory",
        ))
    }
}

fn settings(root: &Path) -> BootSettings {
    BootSettings::resolve(SettingsOverrides {
        state_dir: Some(root.join("data").join(".openclaw")),
        ephemeral_dir: Some(root.join("tmp").join("openclaw")),
        port: Some(18789),
        cleanup_script: Some(root.join("scripts").join("cleanup.sh")),
        ..Default::default()
    })
}

fn unreachable() -> FixedProbe {
    FixedProbe(Reachability::Unreachable {
        reason: "timed out after 10s".into(),
    })
}

async fn boot(settings: &BootSettings, disk: u8, launcher: &dyn Launcher) -> BootReport {
    let defaults = GatewayDefaults::default();
    let probe = unreachable();
    let disks = FixedDisk(disk);
    Bootstrap::new(settings, &defaults, &disks, &probe, launcher)
        .run()
        .await
        .unwrap()
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn fresh_volume_boots_and_launches() {
    let tmp = tempfile::tempdir().unwrap();
    let s = settings(tmp.path());
    let launcher = RecordingLauncher::default();

    let report = boot(&s, 40, &launcher).await;

    assert_eq!(
        report.config_source,
        Some(ConfigSource::File(ReconcileOutcome::Created))
    );
    let doc = read_json(&s.config_path);
    assert_eq!(doc["gateway"]["port"], 18789);
    assert_eq!(doc["gateway"]["bind"], "lan");
    assert_eq!(
        doc["agents"]["defaults"]["workspace"],
        s.workspace_dir.display().to_string()
    );

    assert!(s.workspace_dir.is_dir());
    assert!(s.sessions_dir.is_dir());
    assert_eq!(report.link, Some(LinkOutcome::Created));
    assert!(
        std::fs::symlink_metadata(s.agents_link())
            .unwrap()
            .file_type()
            .is_symlink()
    );

    let launched = launcher.launched.lock().unwrap();
    assert_eq!(launched.len(), 1);
    assert_eq!(
        launched[0].command_line(),
        "openclaw gateway --port 18789 --bind lan --allow-unconfigured"
    );
}

#[tokio::test]
async fn unreachable_provider_does_not_block_launch() {
    let tmp = tempfile::tempdir().unwrap();
    let s = settings(tmp.path());
    let launcher = RecordingLauncher::default();

    let report = boot(&s, 40, &launcher).await;

    assert!(matches!(
        report.reachability,
        Some(Reachability::Unreachable { .. })
    ));
    assert!(report.failed(Step::ReadinessProbe));
    assert!(report.invocation.is_some());
    assert_eq!(launcher.launched.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn missing_cleanup_routine_is_recorded_and_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    let s = settings(tmp.path());
    let launcher = RecordingLauncher::default();

    let report = boot(&s, 97, &launcher).await;

    assert_eq!(report.usage_before, Some(97));
    assert_eq!(report.cleanup_mode, Some(CleanupMode::Aggressive));
    assert!(report.cleanup.is_none());
    assert!(report.failed(Step::ReclaimSpace));
    assert_eq!(launcher.launched.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn moderate_usage_uses_default_tier_without_diagnostics() {
    let tmp = tempfile::tempdir().unwrap();
    let s = settings(tmp.path());
    let launcher = RecordingLauncher::default();

    let report = boot(&s, 50, &launcher).await;

    assert_eq!(report.cleanup_mode, Some(CleanupMode::Default));
    assert!(report.largest_entries.is_empty());
}

#[tokio::test]
async fn full_volume_lists_largest_entries() {
    let tmp = tempfile::tempdir().unwrap();
    let s = settings(tmp.path());
    std::fs::create_dir_all(&s.state_dir).unwrap();
    std::fs::write(s.state_dir.join("huge.log"), vec![0u8; 8192]).unwrap();
    let launcher = RecordingLauncher::default();

    let report = boot(&s, 93, &launcher).await;

    assert_eq!(report.cleanup_mode, Some(CleanupMode::Default));
    assert_eq!(report.usage_after, Some(93));
    assert_eq!(
        report.largest_entries.first(),
        Some(&(s.state_dir.join("huge.log"), 8192))
    );
}

#[cfg(unix)]
#[tokio::test]
async fn aggressive_cleanup_runs_the_routine() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempfile::tempdir().unwrap();
    let s = settings(tmp.path());
    let record = tmp.path().join("args");
    std::fs::create_dir_all(s.cleanup_script.parent().unwrap()).unwrap();
    std::fs::write(
        &s.cleanup_script,
        format!("#!/bin/sh\necho \"$*\" > {}\n", record.display()),
    )
    .unwrap();
    std::fs::set_permissions(&s.cleanup_script, std::fs::Permissions::from_mode(0o755)).unwrap();
    let launcher = RecordingLauncher::default();

    let report = boot(&s, 99, &launcher).await;

    let cleanup = report.cleanup.unwrap();
    assert_eq!(cleanup.mode, CleanupMode::Aggressive);
    assert_eq!(cleanup.exit_code, Some(0));
    assert_eq!(std::fs::read_to_string(&record).unwrap().trim(), "--aggressive");
}

#[tokio::test]
async fn corrupt_config_falls_back_to_env() {
    let tmp = tempfile::tempdir().unwrap();
    let s = settings(tmp.path());
    std::fs::create_dir_all(&s.state_dir).unwrap();
    std::fs::write(&s.config_path, "{ not json").unwrap();
    let launcher = RecordingLauncher::default();

    let report = boot(&s, 40, &launcher).await;

    assert_eq!(report.config_source, Some(ConfigSource::EnvOnly));
    assert!(report.failed(Step::ReconcileConfig));
    assert_eq!(
        std::fs::read_to_string(&s.config_path).unwrap(),
        "{ not json"
    );

    let launched = launcher.launched.lock().unwrap();
    assert_eq!(launched.len(), 1);
    assert!(
        launched[0]
            .env
            .contains(&("OPENCLAW_GATEWAY_PORT".to_string(), "18789".to_string()))
    );
}

#[tokio::test]
async fn second_boot_leaves_config_untouched() {
    let tmp = tempfile::tempdir().unwrap();
    let s = settings(tmp.path());
    let launcher = RecordingLauncher::default();

    boot(&s, 40, &launcher).await;
    let first = std::fs::read(&s.config_path).unwrap();
    let report = boot(&s, 40, &launcher).await;

    assert_eq!(
        report.config_source,
        Some(ConfigSource::File(ReconcileOutcome::Unchanged))
    );
    assert_eq!(report.link, Some(LinkOutcome::AlreadyLinked));
    assert_eq!(std::fs::read(&s.config_path).unwrap(), first);
}

#[cfg(unix)]
#[tokio::test]
async fn real_agents_dir_is_migrated_to_ephemeral_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let s = settings(tmp.path());
    let sessions = s.agents_link().join("main").join("sessions");
    std::fs::create_dir_all(&sessions).unwrap();
    std::fs::write(sessions.join("s1.jsonl"), "{}\n").unwrap();
    let launcher = RecordingLauncher::default();

    let report = boot(&s, 40, &launcher).await;

    assert!(matches!(
        report.link,
        Some(LinkOutcome::Migrated { failed: 0, .. })
    ));
    assert_eq!(std::fs::read_link(s.agents_link()).unwrap(), s.agents_target());
    assert!(
        s.agents_target()
            .join("main")
            .join("sessions")
            .join("s1.jsonl")
            .is_file()
    );
}

#[cfg(unix)]
#[tokio::test]
async fn api_key_lands_behind_the_agents_link() {
    let tmp = tempfile::tempdir().unwrap();
    let mut s = settings(tmp.path());
    s.api_key = Some(Secret::new("sk-or-test".to_string()));
    let defaults = GatewayDefaults::default();
    let launcher = RecordingLauncher::default();

    let report = boot(&s, 40, &launcher).await;

    assert!(report.auth_profiles.is_some());
    assert_eq!(
        clawboot_config::stored_key(&s.state_dir, &defaults.auth_profile_id()).as_deref(),
        Some("sk-or-test")
    );
    assert!(
        s.agents_target()
            .join("main")
            .join("agent")
            .join("auth-profiles.json")
            .is_file()
    );
}

#[tokio::test]
async fn legacy_paths_are_removed() {
    let tmp = tempfile::tempdir().unwrap();
    let s = settings(tmp.path());
    std::fs::create_dir_all(s.state_dir.join("workspace").join("old")).unwrap();
    std::fs::create_dir_all(s.state_dir.join(".cache")).unwrap();
    let launcher = RecordingLauncher::default();

    let report = boot(&s, 40, &launcher).await;

    assert!(!s.state_dir.join("workspace").exists());
    assert!(!s.state_dir.join(".cache").exists());
    assert_eq!(report.legacy_removed.len(), 2);
    assert!(!report.failed(Step::RemoveLegacy));
}

#[tokio::test]
async fn uncreatable_state_dir_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();
    let s = BootSettings::resolve(SettingsOverrides {
        state_dir: Some(blocker.join("state")),
        ephemeral_dir: Some(tmp.path().join("eph")),
        ..Default::default()
    });
    let defaults = GatewayDefaults::default();
    let launcher = RecordingLauncher::default();
    let probe = unreachable();

    let result = Bootstrap::new(&s, &defaults, &FixedDisk(10), &probe, &launcher)
        .run()
        .await;

    assert!(matches!(
        result,
        Err(clawboot_common::Error::Step {
            step: "ensure-directories",
            ..
        })
    ));
    assert!(launcher.launched.lock().unwrap().is_empty());
}

#[tokio::test]
async fn launch_failure_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let s = settings(tmp.path());
    let defaults = GatewayDefaults::default();
    let probe = unreachable();

    let err = Bootstrap::new(&s, &defaults, &FixedDisk(10), &probe, &FailingLauncher)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        clawboot_common::Error::Step { step: "launch", .. }
    ));
}

#[tokio::test]
async fn skipped_probe_leaves_no_reading() {
    let tmp = tempfile::tempdir().unwrap();
    let mut s = settings(tmp.path());
    s.skip_probe = true;
    let launcher = RecordingLauncher::default();

    let report = boot(&s, 40, &launcher).await;

    assert!(report.reachability.is_none());
    assert!(!report.failed(Step::ReadinessProbe));
    assert_eq!(launcher.launched.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn http_probe_hits_configured_url() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v1/models")
        .with_status(503)
        .create_async()
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let mut s = settings(tmp.path());
    s.probe_url = Some(format!("{}/api/v1/models", server.url()));
    let defaults = GatewayDefaults::default();
    let launcher = RecordingLauncher::default();
    let probe = clawboot::HttpProbe::new();

    let report = Bootstrap::new(&s, &defaults, &FixedDisk(10), &probe, &launcher)
        .run()
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(
        report.reachability,
        Some(Reachability::Reachable { status: 503 })
    );
    assert!(!report.failed(Step::ReadinessProbe));
    assert_eq!(launcher.launched.lock().unwrap().len(), 1);
}
