use crate::constants::{defaults, env};
use crate::error::ConfigError;
use crate::traits::ConfigProvider;

use std::fmt;
use std::path::PathBuf;

/// Everything needed to reach the remote environment.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Bridge binary (websocat-compatible).
    pub bridge_bin: PathBuf,
    pub domain: String,
    pub user_id: String,
    pub pre_shared_key: String,
    pub ssh_user: String,
    pub identity_file: PathBuf,
    pub local_port: u16,
    /// Preferred remote python version, e.g. `311` for `~/.py311/bin/python3`.
    pub python_version: Option<String>,
    /// Explicit remote interpreter; skips discovery when set.
    pub interpreter: Option<String>,
    /// WebSocket path, `{user_id}` is substituted.
    pub endpoint_path: String,
    /// Cookie name carrying the pre-shared key.
    pub psk_cookie: String,
}

impl ConnectionConfig {
    /// Builds the configuration from a key lookup (usually the process environment).
    ///
    /// All missing required keys are reported at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut missing = Vec::new();
        let mut required = |key: &str| {
            let value = get(key);
            if value.is_none() {
                missing.push(key.to_string());
            }
            value.unwrap_or_default()
        };

        let bridge_bin = required(env::BRIDGE_BIN);
        let domain = required(env::DOMAIN);
        let user_id = required(env::USER_ID);
        let pre_shared_key = required(env::PRE_SHARED_KEY);
        let identity_file = required(env::IDENTITY_FILE);

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let local_port = match get(env::LOCAL_PORT) {
            None => defaults::LOCAL_PORT,
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: env::LOCAL_PORT.to_string(),
                reason: format!("'{raw}': {e}"),
            })?,
        };

        Ok(Self {
            bridge_bin: PathBuf::from(bridge_bin),
            domain,
            user_id,
            pre_shared_key,
            ssh_user: get(env::SSH_USER).unwrap_or_else(|| defaults::SSH_USER.to_string()),
            identity_file: PathBuf::from(identity_file),
            local_port,
            python_version: get(env::PYTHON_VERSION),
            interpreter: get(env::INTERPRETER),
            endpoint_path: get(env::ENDPOINT_PATH)
                .unwrap_or_else(|| defaults::ENDPOINT_PATH.to_string()),
            psk_cookie: get(env::PSK_COOKIE).unwrap_or_else(|| defaults::PSK_COOKIE.to_string()),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// The `wss://` endpoint the bridge connects to.
    pub fn endpoint_url(&self) -> String {
        let path = self.endpoint_path.replace("{user_id}", &self.user_id);
        let path = path.trim_start_matches('/');
        format!("wss://{}/{}", self.domain.trim_end_matches('/'), path)
    }

    /// The header line authenticating the bridge against the endpoint.
    pub fn auth_header(&self) -> String {
        format!("cookie: {}={}", self.psk_cookie, self.pre_shared_key)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("bridge_bin", &self.bridge_bin)
            .field("domain", &self.domain)
            .field("user_id", &self.user_id)
            .field("pre_shared_key", &"<redacted>")
            .field("ssh_user", &self.ssh_user)
            .field("identity_file", &self.identity_file)
            .field("local_port", &self.local_port)
            .field("python_version", &self.python_version)
            .field("interpreter", &self.interpreter)
            .field("endpoint_path", &self.endpoint_path)
            .field("psk_cookie", &self.psk_cookie)
            .finish()
    }
}

/// Reads [`ConnectionConfig`] from the process environment on every load.
#[derive(Clone, Debug, Default)]
pub struct EnvConfigProvider;

impl ConfigProvider for EnvConfigProvider {
    fn load(&self) -> Result<ConnectionConfig, ConfigError> {
        ConnectionConfig::from_env()
    }
}

/// A fixed configuration, e.g. for tests or programmatic setups.
impl ConfigProvider for ConnectionConfig {
    fn load(&self) -> Result<ConnectionConfig, ConfigError> {
        Ok(self.clone())
    }
}
