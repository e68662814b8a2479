use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use switchboard_core::providers::{GoogleProvider, LlmProvider, OpenAiCompatProvider, OpenAiProvider};
use switchboard_core::{AgentDefinition, AgentRegistry, RunnerConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchboardConfig {
    pub app: AppConfig,
    #[serde(default)]
    pub runner: RunnerSettings,
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub agents: Vec<AgentDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    pub root_agent: String,
}

fn default_app_name() -> String {
    "switchboard".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSettings {
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
    #[serde(default)]
    pub strict_routing: bool,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            generation_timeout_secs: default_generation_timeout_secs(),
            strict_routing: false,
        }
    }
}

fn default_generation_timeout_secs() -> u64 {
    60
}

impl RunnerSettings {
    pub fn to_runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            generation_timeout: Duration::from_secs(self.generation_timeout_secs),
            strict_routing: self.strict_routing,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Provider used by agents that do not name one
    #[serde(default = "default_provider")]
    pub default: String,
    #[serde(default)]
    pub openai: Option<OpenAiProviderConfig>,
    #[serde(default)]
    pub google: Option<GoogleProviderConfig>,
    #[serde(default)]
    pub openai_compat: Option<OpenAiCompatProviderConfig>,
}

fn default_provider() -> String {
    "openai".to_string()
}

#[derive(Clone, Serialize, Deserialize)]
pub struct OpenAiProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl std::fmt::Debug for OpenAiProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProviderConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_openai_model() -> String {
    "gpt-3.5-turbo-0125".to_string()
}
fn default_max_tokens() -> u32 {
    1024
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GoogleProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_google_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl std::fmt::Debug for GoogleProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProviderConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_google_model() -> String {
    "gemini-2.0-flash".to_string()
}

#[derive(Clone, Serialize, Deserialize)]
pub struct OpenAiCompatProviderConfig {
    /// Agents may refer to this provider by this name or by "openai_compat"
    #[serde(default = "default_compat_name")]
    pub name: String,
    #[serde(default)]
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl std::fmt::Debug for OpenAiCompatProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProviderConfig")
            .field("name", &self.name)
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_compat_name() -> String {
    "openai_compat".to_string()
}

/// Mask a secret for Debug output: first 3 and last 4 chars of longer
/// values, "***" otherwise.
fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 7 {
        return "***".to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".switchboard")
}

impl SwitchboardConfig {
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = custom_path
            .clone()
            .unwrap_or_else(|| config_dir().join("config.toml"));

        check_permissions(&path)?;

        let content = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `switchboard init` first.",
                path.display()
            )
        })?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse TOML text, expanding allowlisted `${VAR}` placeholders first
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        let config: Self = toml::from_str(&expanded)?;
        config.warn_hardcoded_keys();
        Ok(config)
    }

    fn warn_hardcoded_keys(&self) {
        let keys = [
            ("openai", self.providers.openai.as_ref().map(|p| &p.api_key), "OPENAI_API_KEY"),
            ("google", self.providers.google.as_ref().map(|p| &p.api_key), "GOOGLE_AI_API_KEY"),
            (
                "openai_compat",
                self.providers.openai_compat.as_ref().map(|p| &p.api_key),
                "CUSTOM_LLM_API_KEY",
            ),
        ];
        for (provider, key, var) in keys {
            // Placeholders are already expanded here, so compare against
            // the environment to tell a raw key apart.
            let Some(key) = key else { continue };
            if looks_like_api_key(key) && !env_matches(var, key) {
                warn!(
                    "API key for '{}' is hardcoded in config file. For security, use environment variables: api_key = \"${{{}}}\"",
                    provider, var
                );
            }
        }
    }

    /// Build the validated agent tree described by `[[agents]]`
    pub fn build_registry(&self) -> Result<AgentRegistry> {
        if self.agents.is_empty() {
            bail!("No agents defined. Add [[agents]] entries to the config.");
        }
        let registry = AgentRegistry::from_definitions(&self.agents, &self.app.root_agent, |def| {
            self.provider_for(def)
        })?;
        Ok(registry)
    }

    /// Generation provider for one agent, honoring its provider and model overrides
    pub fn provider_for(&self, def: &AgentDefinition) -> Result<Arc<dyn LlmProvider>> {
        let name = def.provider.as_deref().unwrap_or(&self.providers.default);

        match name {
            "openai" => {
                let cfg = self
                    .providers
                    .openai
                    .as_ref()
                    .ok_or_else(|| anyhow!("provider 'openai' is not configured"))?;
                if cfg.api_key.trim().is_empty() {
                    bail!("provider 'openai' has no api_key (set OPENAI_API_KEY)");
                }
                let model = def.model.clone().unwrap_or_else(|| cfg.model.clone());
                Ok(Arc::new(OpenAiProvider::new(
                    cfg.api_key.clone(),
                    model,
                    cfg.base_url.clone(),
                    cfg.max_tokens,
                )?))
            }
            "google" => {
                let cfg = self
                    .providers
                    .google
                    .as_ref()
                    .ok_or_else(|| anyhow!("provider 'google' is not configured"))?;
                if cfg.api_key.trim().is_empty() {
                    bail!("provider 'google' has no api_key (set GOOGLE_AI_API_KEY)");
                }
                let model = def.model.clone().unwrap_or_else(|| cfg.model.clone());
                Ok(Arc::new(GoogleProvider::new(
                    cfg.api_key.clone(),
                    model,
                    cfg.max_tokens,
                )?))
            }
            other => {
                let cfg = self
                    .providers
                    .openai_compat
                    .as_ref()
                    .filter(|c| other == "openai_compat" || other == c.name)
                    .ok_or_else(|| anyhow!("provider '{}' is not configured", other))?;
                let model = def.model.clone().unwrap_or_else(|| cfg.model.clone());
                Ok(Arc::new(OpenAiCompatProvider::new(
                    cfg.name.clone(),
                    cfg.api_key.clone(),
                    model,
                    cfg.base_url.clone(),
                    cfg.max_tokens,
                )?))
            }
        }
    }
}

/// Refuse config files readable by group or other; they hold API keys
#[cfg(unix)]
fn check_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(metadata) = std::fs::metadata(path) {
        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            bail!(
                "Config file {} has overly permissive permissions ({:o}). Fix with: chmod 600 {}",
                path.display(),
                mode & 0o777,
                path.display()
            );
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

fn looks_like_api_key(value: &str) -> bool {
    value.starts_with("sk-") || value.starts_with("AIza")
}

fn env_matches(var: &str, value: &str) -> bool {
    std::env::var(var).is_ok_and(|v| v == value)
}

/// Environment variables that may be expanded in config files
const ALLOWED_ENV_VARS: &[&str] = &[
    "OPENAI_API_KEY",
    "GOOGLE_AI_API_KEY",
    "CUSTOM_LLM_API_KEY",
    "HOME",
    "USER",
];

/// Replace `${VAR}` for allowlisted variables; others are left as written.
/// Unset allowlisted variables expand to an empty string.
fn expand_env_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let placeholder = &rest[start..start + len + 1];
        let var = &placeholder[2..placeholder.len() - 1];

        if ALLOWED_ENV_VARS.contains(&var) {
            out.push_str(&std::env::var(var).unwrap_or_default());
        } else {
            warn!(
                "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                var
            );
            out.push_str(placeholder);
        }
        rest = &rest[start + len + 1..];
    }

    out.push_str(rest);
    out
}
