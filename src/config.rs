//! Registry connection options and Docker environment settings.

use crate::error::{ExtensionError, Result};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Registry URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    #[default]
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl FromStr for Scheme {
    type Err = ExtensionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(ExtensionError::InvalidOption(format!(
                "unsupported scheme {other:?}, expected http or https"
            ))),
        }
    }
}

/// Connection settings for the single registry the images module talks to.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionOption {
    #[serde(default)]
    pub scheme: Scheme,
    pub host: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Skip TLS certificate verification.
    #[serde(default)]
    pub insecure: bool,
}

impl ConnectionOption {
    /// An anonymous HTTPS connection to `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            scheme: Scheme::default(),
            host: host.into(),
            username: String::new(),
            password: String::new(),
            insecure: false,
        }
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// The host must be a bare `name[:port]`.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(ExtensionError::InvalidOption("host is empty".to_string()));
        }
        if self.host.contains("://") || self.host.contains('/') {
            return Err(ExtensionError::InvalidOption(format!(
                "host {:?} must not carry a scheme or path",
                self.host
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectionOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionOption")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("insecure", &self.insecure)
            .finish()
    }
}

/// Where the Docker daemon lives, as derived from [`DockerEnv`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonEndpoint {
    LocalDefault,
    Socket(String),
    Http(String),
    Tls { addr: String, cert_dir: PathBuf },
}

/// Docker client settings read from the standard `DOCKER_*` variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DockerEnv {
    pub host: Option<String>,
    pub tls_verify: bool,
    pub cert_path: Option<PathBuf>,
    pub api_version: Option<(usize, usize)>,
}

impl DockerEnv {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let api_version = get("DOCKER_API_VERSION")
            .map(|v| parse_api_version(&v))
            .transpose()?;

        Ok(Self {
            host: get("DOCKER_HOST"),
            tls_verify: get("DOCKER_TLS_VERIFY").is_some(),
            cert_path: get("DOCKER_CERT_PATH")
                .map(PathBuf::from)
                .or_else(|| get("HOME").map(|home| PathBuf::from(home).join(".docker"))),
            api_version,
        })
    }

    /// Resolves `DOCKER_HOST` and the TLS settings to a daemon endpoint.
    pub fn endpoint(&self) -> Result<DaemonEndpoint> {
        let Some(host) = &self.host else {
            return Ok(DaemonEndpoint::LocalDefault);
        };

        if host.starts_with("unix://") || host.starts_with("npipe://") {
            return Ok(DaemonEndpoint::Socket(host.clone()));
        }

        if host.starts_with("tcp://") || host.starts_with("http://") || host.starts_with("https://")
        {
            if self.tls_verify || host.starts_with("https://") {
                let cert_dir = self.cert_path.clone().ok_or_else(|| {
                    ExtensionError::Config(
                        "TLS requested but DOCKER_CERT_PATH is not set".to_string(),
                    )
                })?;
                return Ok(DaemonEndpoint::Tls {
                    addr: host.clone(),
                    cert_dir,
                });
            }
            return Ok(DaemonEndpoint::Http(host.clone()));
        }

        Err(ExtensionError::Config(format!(
            "unsupported DOCKER_HOST {host:?}"
        )))
    }
}

fn parse_api_version(value: &str) -> Result<(usize, usize)> {
    let invalid = || ExtensionError::Config(format!("invalid DOCKER_API_VERSION {value:?}"));
    let (major, minor) = value.split_once('.').ok_or_else(invalid)?;
    let major = major.parse().map_err(|_| invalid())?;
    let minor = minor.parse().map_err(|_| invalid())?;
    Ok((major, minor))
}
