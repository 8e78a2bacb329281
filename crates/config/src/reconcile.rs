//! Create-or-patch reconciliation of `openclaw.json`.
//!
//! Only the launcher-owned subset is overwritten: gateway port/bind/proxies,
//! the forced plugin set, and the default provider's model routing. Any other
//! field a user or the gateway itself wrote survives untouched.

use std::path::Path;

use {
    serde_json::{Value, json},
    tracing::info,
};

use crate::{
    defaults::{BIND_MODE, GatewayDefaults, LEGACY_GATEWAY_FIELDS},
    document::{ensure_object, load_document, object_at, save_document},
    error::Result,
};

/// What the launcher wants the gateway config to say.
#[derive(Debug, Clone, Copy)]
pub struct DesiredGateway<'a> {
    pub port: u16,
    /// Written to `agents.defaults.workspace` on first run only.
    pub workspace_dir: &'a Path,
    pub defaults: &'a GatewayDefaults,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No file existed; a full default document was written.
    Created,
    /// The file existed and at least one owned field changed.
    Patched,
    /// The file already matched; nothing was written.
    Unchanged,
}

impl ReconcileOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Patched => "patched",
            Self::Unchanged => "unchanged",
        }
    }
}

/// Build the document written on first run.
pub fn default_document(desired: &DesiredGateway<'_>) -> Result<Value> {
    let defaults = desired.defaults;
    let profile = serde_json::to_value(defaults.auth_profile())?;
    let mut doc = json!({
        "auth": {
            "profiles": {
                (defaults.auth_profile_id()): profile,
            },
        },
        "agents": {
            "defaults": {
                "workspace": desired.workspace_dir.display().to_string(),
            },
        },
    });
    patch_document(&mut doc, desired)?;
    Ok(doc)
}

/// Apply the launcher-owned overwrites to `doc` in place.
pub fn patch_document(doc: &mut Value, desired: &DesiredGateway<'_>) -> Result<()> {
    let defaults = desired.defaults;

    let gateway = object_at(doc, &["gateway"]);
    gateway.insert("port".into(), json!(desired.port));
    gateway.insert("bind".into(), json!(BIND_MODE));
    gateway.insert("trustedProxies".into(), json!(defaults.trusted_proxies));
    for field in LEGACY_GATEWAY_FIELDS {
        gateway.remove(*field);
    }

    let entries = object_at(doc, &["plugins", "entries"]);
    for name in &defaults.plugins {
        let entry = entries
            .entry(name.clone())
            .or_insert_with(|| json!({}));
        ensure_object(entry).insert("enabled".into(), Value::Bool(true));
    }

    object_at(doc, &["models"]).insert("mode".into(), json!("merge"));
    object_at(doc, &["models", "providers"]).insert(
        defaults.provider_id.clone(),
        serde_json::to_value(&defaults.provider)?,
    );

    object_at(doc, &["agents", "defaults"])
        .insert("model".into(), serde_json::to_value(&defaults.routing)?);

    Ok(())
}

/// Bring the file at `path` in line with `desired`, creating it if missing.
pub fn reconcile(path: &Path, desired: &DesiredGateway<'_>) -> Result<ReconcileOutcome> {
    let outcome = match load_document(path)? {
        None => {
            let doc = default_document(desired)?;
            save_document(path, &doc)?;
            ReconcileOutcome::Created
        },
        Some(mut doc) => {
            let before = doc.clone();
            patch_document(&mut doc, desired)?;
            if doc == before {
                ReconcileOutcome::Unchanged
            } else {
                save_document(path, &doc)?;
                ReconcileOutcome::Patched
            }
        },
    };

    info!(
        path = %path.display(),
        port = desired.port,
        bind = BIND_MODE,
        outcome = outcome.as_str(),
        "gateway config reconciled"
    );
    Ok(outcome)
}
