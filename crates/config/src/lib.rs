//! Launcher settings and reconciliation of the gateway's `openclaw.json`.
//!
//! The gateway config is treated as an untyped JSON tree: only the fields the
//! launcher owns are rewritten, everything else round-trips untouched.

pub mod auth_profiles;
pub mod defaults;
pub mod document;
pub mod error;
pub mod reconcile;
pub mod settings;

pub use {
    auth_profiles::{auth_profiles_path, stored_key, write_auth_profiles},
    defaults::{BIND_MODE, GatewayDefaults, ModelEntry, ModelRouting, ProviderEntry},
    document::{load_document, save_document},
    error::{Error, Result},
    reconcile::{DesiredGateway, ReconcileOutcome, default_document, patch_document, reconcile},
    settings::{BootSettings, SettingsOverrides},
};
