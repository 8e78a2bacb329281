//! The main agent's credential store (`agents/main/agent/auth-profiles.json`).

use std::path::{Path, PathBuf};

use {
    secrecy::{ExposeSecret, Secret},
    serde_json::{Value, json},
    tracing::info,
};

use crate::{
    defaults::GatewayDefaults,
    document::{load_document, object_at, save_document},
    error::Result,
};

const STORE_VERSION: u32 = 1;

pub fn auth_profiles_path(state_dir: &Path) -> PathBuf {
    state_dir
        .join("agents")
        .join("main")
        .join("agent")
        .join("auth-profiles.json")
}

/// Upsert the default provider's `api_key` profile, keeping other profiles.
///
/// An unreadable existing store is replaced rather than failing the boot.
pub fn write_auth_profiles(
    state_dir: &Path,
    defaults: &GatewayDefaults,
    api_key: &Secret<String>,
) -> Result<PathBuf> {
    let path = auth_profiles_path(state_dir);

    let mut store = load_document(&path)
        .ok()
        .flatten()
        .unwrap_or_else(|| json!({}));
    let root = object_at(&mut store, &[]);
    root.insert("version".into(), json!(STORE_VERSION));

    let profile_id = defaults.auth_profile_id();
    object_at(&mut store, &["profiles"]).insert(
        profile_id.clone(),
        json!({
            "type": "api_key",
            "provider": defaults.provider_id,
            "key": api_key.expose_secret(),
        }),
    );

    save_document(&path, &store)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
    }

    info!(path = %path.display(), profile = %profile_id, "auth profile written");
    Ok(path)
}

/// Read back the key stored for `profile_id`, if any.
pub fn stored_key(state_dir: &Path, profile_id: &str) -> Option<String> {
    let store = load_document(&auth_profiles_path(state_dir)).ok().flatten()?;
    store
        .get("profiles")
        .and_then(|p| p.get(profile_id))
        .and_then(|p| p.get("key"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn writes_profile_under_main_agent() {
        let tmp = tempfile::tempdir().unwrap();
        let defaults = GatewayDefaults::default();
        let key = Secret::new("sk-or-test".to_string());

        let path = write_auth_profiles(tmp.path(), &defaults, &key).unwrap();
        assert!(path.ends_with("agents/main/agent/auth-profiles.json"));

        let store = load_document(&path).unwrap().unwrap();
        assert_eq!(store["version"], 1);
        assert_eq!(store["profiles"]["openrouter:default"]["type"], "api_key");
        assert_eq!(
            stored_key(tmp.path(), "openrouter:default").as_deref(),
            Some("sk-or-test")
        );
    }

    #[test]
    fn keeps_other_profiles() {
        let tmp = tempfile::tempdir().unwrap();
        let path = auth_profiles_path(tmp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"version":1,"profiles":{"anthropic:work":{"type":"token","provider":"anthropic","token":"x"}}}"#,
        )
        .unwrap();

        let defaults = GatewayDefaults::default();
        write_auth_profiles(tmp.path(), &defaults, &Secret::new("k".into())).unwrap();

        let store = load_document(&path).unwrap().unwrap();
        assert_eq!(store["profiles"]["anthropic:work"]["token"], "x");
        assert_eq!(store["profiles"]["openrouter:default"]["key"], "k");
    }

    #[test]
    fn corrupt_store_is_replaced() {
        let tmp = tempfile::tempdir().unwrap();
        let path = auth_profiles_path(tmp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{{{").unwrap();

        let defaults = GatewayDefaults::default();
        write_auth_profiles(tmp.path(), &defaults, &Secret::new("k".into())).unwrap();
        assert_eq!(
            stored_key(tmp.path(), "openrouter:default").as_deref(),
            Some("k")
        );
    }

    #[cfg(unix)]
    #[test]
    fn store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let defaults = GatewayDefaults::default();
        let path = write_auth_profiles(tmp.path(), &defaults, &Secret::new("k".into())).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
