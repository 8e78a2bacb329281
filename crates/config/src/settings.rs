//! Resolved launcher settings.
//!
//! Every value comes from the environment (or the matching CLI flag); this
//! module only applies defaults and derives dependent paths.

use std::path::PathBuf;

use secrecy::Secret;

use crate::defaults::DEFAULT_PORT;

pub const DEFAULT_STATE_DIR: &str = "/data/.openclaw";
pub const DEFAULT_EPHEMERAL_DIR: &str = "/tmp/openclaw";
pub const DEFAULT_CLEANUP_SCRIPT: &str = "/app/scripts/cleanup.sh";
pub const DEFAULT_GATEWAY_BIN: &str = "openclaw";
pub const CONFIG_FILENAME: &str = "openclaw.json";

/// Raw, optional inputs before defaults are applied.
#[derive(Debug, Default, Clone)]
pub struct SettingsOverrides {
    pub state_dir: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub ephemeral_dir: Option<PathBuf>,
    pub workspace_dir: Option<PathBuf>,
    pub sessions_dir: Option<PathBuf>,
    pub port: Option<u16>,
    pub cleanup_script: Option<PathBuf>,
    pub gateway_bin: Option<String>,
    pub probe_url: Option<String>,
    pub skip_probe: bool,
    pub api_key: Option<Secret<String>>,
}

/// Settings for one launcher run.
#[derive(Debug, Clone)]
pub struct BootSettings {
    /// Persistent root holding `openclaw.json` and the `agents` link.
    pub state_dir: PathBuf,
    pub config_path: PathBuf,
    /// Ephemeral root; the `agents` link points here.
    pub ephemeral_dir: PathBuf,
    pub workspace_dir: PathBuf,
    pub sessions_dir: PathBuf,
    pub port: u16,
    pub cleanup_script: PathBuf,
    pub gateway_bin: String,
    /// Readiness probe target; `None` means the provider's models endpoint.
    pub probe_url: Option<String>,
    pub skip_probe: bool,
    /// Provider API key written to the agent's auth-profile store.
    pub api_key: Option<Secret<String>>,
}

impl BootSettings {
    pub fn resolve(overrides: SettingsOverrides) -> Self {
        let state_dir = overrides
            .state_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR));
        let config_path = overrides
            .config_path
            .unwrap_or_else(|| state_dir.join(CONFIG_FILENAME));
        let ephemeral_dir = overrides
            .ephemeral_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EPHEMERAL_DIR));
        let workspace_dir = overrides
            .workspace_dir
            .unwrap_or_else(|| ephemeral_dir.join("workspace"));
        let sessions_dir = overrides
            .sessions_dir
            .unwrap_or_else(|| ephemeral_dir.join("sessions"));

        Self {
            config_path,
            workspace_dir,
            sessions_dir,
            port: overrides.port.unwrap_or(DEFAULT_PORT),
            cleanup_script: overrides
                .cleanup_script
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CLEANUP_SCRIPT)),
            gateway_bin: overrides
                .gateway_bin
                .filter(|b| !b.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GATEWAY_BIN.to_string()),
            probe_url: overrides.probe_url.filter(|u| !u.trim().is_empty()),
            skip_probe: overrides.skip_probe,
            api_key: overrides.api_key,
            state_dir,
            ephemeral_dir,
        }
    }

    /// `<state>/agents`, the path that must end up a symlink.
    pub fn agents_link(&self) -> PathBuf {
        self.state_dir.join("agents")
    }

    /// `<ephemeral>/agents`, the link's target.
    pub fn agents_target(&self) -> PathBuf {
        self.ephemeral_dir.join("agents")
    }
}

impl Default for BootSettings {
    fn default() -> Self {
        Self::resolve(SettingsOverrides::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_derive_from_roots() {
        let s = BootSettings::default();
        assert_eq!(s.state_dir, PathBuf::from("/data/.openclaw"));
        assert_eq!(s.config_path, PathBuf::from("/data/.openclaw/openclaw.json"));
        assert_eq!(s.workspace_dir, PathBuf::from("/tmp/openclaw/workspace"));
        assert_eq!(s.sessions_dir, PathBuf::from("/tmp/openclaw/sessions"));
        assert_eq!(s.port, DEFAULT_PORT);
        assert_eq!(s.gateway_bin, "openclaw");
        assert_eq!(s.agents_link(), PathBuf::from("/data/.openclaw/agents"));
        assert_eq!(s.agents_target(), PathBuf::from("/tmp/openclaw/agents"));
    }

    #[test]
    fn state_dir_override_moves_config_path() {
        let s = BootSettings::resolve(SettingsOverrides {
            state_dir: Some(PathBuf::from("/srv/state")),
            port: Some(8080),
            ..Default::default()
        });
        assert_eq!(s.config_path, PathBuf::from("/srv/state/openclaw.json"));
        assert_eq!(s.port, 8080);
    }

    #[test]
    fn explicit_dirs_win_over_ephemeral_root() {
        let s = BootSettings::resolve(SettingsOverrides {
            ephemeral_dir: Some(PathBuf::from("/scratch")),
            workspace_dir: Some(PathBuf::from("/work")),
            ..Default::default()
        });
        assert_eq!(s.workspace_dir, PathBuf::from("/work"));
        assert_eq!(s.sessions_dir, PathBuf::from("/scratch/sessions"));
    }

    #[test]
    fn blank_strings_fall_back_to_defaults() {
        let s = BootSettings::resolve(SettingsOverrides {
            gateway_bin: Some("  ".into()),
            probe_url: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(s.gateway_bin, "openclaw");
        assert!(s.probe_url.is_none());
    }
}
