use serde::Deserialize;
use std::{env, fs, path::PathBuf, time::Duration};

use crate::gateway::registry::{DEFAULT_DEDUP_WINDOW_MS, DEFAULT_RELEASE_GRACE_MS};

/// Default request timeout applied to every backend call.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Environment variable carrying the backend base URL.
pub const API_URL_ENV: &str = "ULIP_API_URL";

/// Environment variable pointing at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "ULIP_GATEWAY_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Backend base URL, e.g. `https://portal.example.com/api`.
    pub base_url: String,
    pub request_timeout_ms: u64,
    /// Span during which identical reads are coalesced.
    pub dedup_window_ms: u64,
    /// Extra time a settled read stays joinable.
    pub release_grace_ms: u64,
    /// Login boundary the session interceptor navigates to.
    pub login_route: String,
    /// Path fragment whose 403 responses become soft failures.
    pub soft_failure_marker: String,
    /// Durable session storage file.
    pub session_file: PathBuf,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            dedup_window_ms: DEFAULT_DEDUP_WINDOW_MS,
            release_grace_ms: DEFAULT_RELEASE_GRACE_MS,
            login_route: "/login".to_string(),
            soft_failure_marker: "generate-statement".to_string(),
            session_file: PathBuf::from(".ulip-session.json"),
        }
    }
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }

    pub fn release_grace(&self) -> Duration {
        Duration::from_millis(self.release_grace_ms)
    }

    /// Parse a JSON config document and expand `${VAR}` references.
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let cfg: GatewayConfig = serde_json::from_str(raw)?;
        Ok(cfg.expanded())
    }

    /// Load the config file if one can be found, otherwise use defaults,
    /// then apply the `ULIP_API_URL` override.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match resolve_config_path() {
            Some(path) => {
                let raw = fs::read_to_string(&path).map_err(|e| {
                    anyhow::anyhow!("Failed to read config `{}`: {}", path.display(), e)
                })?;
                Self::from_json(&raw)?
            }
            None => Self::default(),
        };

        if let Ok(url) = env::var(API_URL_ENV) {
            cfg.base_url = url;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        url::Url::parse(&self.base_url)
            .map_err(|e| anyhow::anyhow!("Invalid base_url `{}`: {}", self.base_url, e))?;

        if self.request_timeout_ms == 0 {
            return Err(anyhow::anyhow!("request_timeout_ms must be greater than zero"));
        }

        if !self.login_route.starts_with('/') {
            return Err(anyhow::anyhow!(
                "login_route `{}` must start with `/`",
                self.login_route
            ));
        }

        Ok(())
    }

    fn expanded(mut self) -> Self {
        self.base_url = expand_env_vars(&self.base_url);
        self.login_route = expand_env_vars(&self.login_route);
        self.session_file = PathBuf::from(expand_env_vars(&self.session_file.to_string_lossy()));
        self
    }
}

/// Locate the config file: `ULIP_GATEWAY_CONFIG`, then
/// `$XDG_CONFIG_HOME/ulip/gateway.json`, then `./gateway.json`.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(p) = env::var(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(p));
    }

    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let candidate = PathBuf::from(xdg).join("ulip").join("gateway.json");
        if candidate.exists() {
            return Some(candidate);
        }
    }

    let candidate = PathBuf::from("gateway.json");
    if candidate.exists() {
        return Some(candidate);
    }

    None
}

fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next(); // consume '{'
            let mut name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                name.push(c);
            }
            match env::var(&name) {
                Ok(val) if closed => out.push_str(&val),
                _ => {
                    out.push_str("${");
                    out.push_str(&name);
                    if closed {
                        out.push('}');
                    }
                }
            }
        } else {
            out.push(ch);
        }
    }

    out
}
