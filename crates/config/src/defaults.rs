//! Fixed values the launcher owns inside `openclaw.json`.

use serde::{Deserialize, Serialize};

/// Bind mode forced on every boot; the container is reached through the LAN interface.
pub const BIND_MODE: &str = "lan";

pub const DEFAULT_PORT: u16 = 18789;

/// Plugins that are force-enabled on every boot.
pub const ENABLED_PLUGINS: [&str; 5] = ["telegram", "discord", "slack", "whatsapp", "signal"];

/// Private ranges of the platform's ingress proxies.
pub const TRUSTED_PROXIES: &[&str] = &[
    "10.0.0.0/8",
    "172.16.0.0/12",
    "192.168.0.0/16",
    "100.64.0.0/10",
    "127.0.0.1",
];

/// Fields under `gateway` written by older images and removed on patch.
pub const LEGACY_GATEWAY_FIELDS: &[&str] = &["host"];

/// Provider description stored at `models.providers.<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderEntry {
    pub base_url: String,
    /// Kept as a `${VAR}` placeholder; the gateway expands it at load time.
    pub api_key: String,
    pub api: String,
    pub models: Vec<ModelEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    pub id: String,
    pub name: String,
    pub context_window: u32,
    pub max_tokens: u32,
}

/// `agents.defaults.model`: `{primary, fallbacks}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRouting {
    pub primary: String,
    #[serde(default)]
    pub fallbacks: Vec<String>,
}

/// `auth.profiles.<id>`: metadata only, the secret lives in the agent's
/// `auth-profiles.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthProfileMeta {
    pub provider: String,
    pub mode: String,
}

/// Everything the reconciler writes besides the port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayDefaults {
    pub provider_id: String,
    pub provider: ProviderEntry,
    pub routing: ModelRouting,
    pub plugins: Vec<String>,
    pub trusted_proxies: Vec<String>,
    /// Env var the provider's `apiKey` placeholder refers to.
    pub api_key_env: String,
}

impl GatewayDefaults {
    /// Profile id under `auth.profiles`, e.g. `openrouter:default`.
    pub fn auth_profile_id(&self) -> String {
        format!("{}:default", self.provider_id)
    }

    pub fn auth_profile(&self) -> AuthProfileMeta {
        AuthProfileMeta {
            provider: self.provider_id.clone(),
            mode: "api_key".into(),
        }
    }

    /// Endpoint probed for upstream reachability.
    pub fn models_url(&self) -> String {
        format!("{}/models", self.provider.base_url.trim_end_matches('/'))
    }
}

fn model(id: &str, name: &str, context_window: u32, max_tokens: u32) -> ModelEntry {
    ModelEntry {
        id: id.into(),
        name: name.into(),
        context_window,
        max_tokens,
    }
}

impl Default for GatewayDefaults {
    fn default() -> Self {
        let provider_id = "openrouter".to_string();
        let api_key_env = "OPENROUTER_API_KEY".to_string();
        Self {
            provider: ProviderEntry {
                base_url: "https://openrouter.ai/api/v1".into(),
                api_key: format!("${{{api_key_env}}}"),
                api: "openai-completions".into(),
                models: vec![
                    model("anthropic/claude-sonnet-4", "Claude Sonnet 4", 200_000, 64_000),
                    model("google/gemini-2.5-flash", "Gemini 2.5 Flash", 1_048_576, 65_536),
                    model("openai/gpt-4.1-mini", "GPT-4.1 mini", 1_047_576, 32_768),
                ],
            },
            routing: ModelRouting {
                primary: format!("{provider_id}/anthropic/claude-sonnet-4"),
                fallbacks: vec![
                    format!("{provider_id}/google/gemini-2.5-flash"),
                    format!("{provider_id}/openai/gpt-4.1-mini"),
                ],
            },
            plugins: ENABLED_PLUGINS.iter().map(|p| (*p).to_string()).collect(),
            trusted_proxies: TRUSTED_PROXIES.iter().map(|p| (*p).to_string()).collect(),
            provider_id,
            api_key_env,
        }
    }
}
