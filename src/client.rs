//! Docker Engine client construction.

use crate::config::{DaemonEndpoint, DockerEnv};
use crate::error::Result;
use bollard::{ClientVersion, Docker, API_DEFAULT_VERSION};
use tracing::{debug, info};

const TIMEOUT_SECS: u64 = 120;

#[cfg(unix)]
const LOCAL_SOCKET: &str = "unix:///var/run/docker.sock";
#[cfg(windows)]
const LOCAL_SOCKET: &str = "npipe:////./pipe/docker_engine";

/// A Docker Engine client shared by every operation handle.
///
/// Cloning is cheap: clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct DockerClient {
    docker: Docker,
    pinned_version: bool,
}

impl DockerClient {
    /// Builds a client from the `DOCKER_*` environment variables.
    ///
    /// Misconfiguration is reported as an error; whether that aborts
    /// startup is up to the embedding host.
    pub fn from_env() -> Result<Self> {
        Self::from_docker_env(&DockerEnv::from_env()?)
    }

    pub fn from_docker_env(env: &DockerEnv) -> Result<Self> {
        let pinned = env.api_version.map(|(major, minor)| ClientVersion {
            major_version: major,
            minor_version: minor,
        });
        let version = pinned.as_ref().unwrap_or(API_DEFAULT_VERSION);

        let endpoint = env.endpoint()?;
        debug!(?endpoint, "Connecting to docker daemon");

        let docker = match endpoint {
            DaemonEndpoint::LocalDefault if pinned.is_none() => {
                Docker::connect_with_local_defaults()?
            }
            DaemonEndpoint::LocalDefault => {
                Docker::connect_with_socket(LOCAL_SOCKET, TIMEOUT_SECS, version)?
            }
            DaemonEndpoint::Socket(path) => {
                Docker::connect_with_socket(&path, TIMEOUT_SECS, version)?
            }
            DaemonEndpoint::Http(addr) => Docker::connect_with_http(&addr, TIMEOUT_SECS, version)?,
            DaemonEndpoint::Tls { addr, cert_dir } => Docker::connect_with_ssl(
                &addr,
                &cert_dir.join("key.pem"),
                &cert_dir.join("cert.pem"),
                &cert_dir.join("ca.pem"),
                TIMEOUT_SECS,
                version,
            )?,
        };

        Ok(Self {
            docker,
            pinned_version: pinned.is_some(),
        })
    }

    /// Like [`DockerClient::from_env`], then negotiates the API version with
    /// the daemon unless `DOCKER_API_VERSION` pinned one.
    pub async fn connect() -> Result<Self> {
        let client = Self::from_env()?;
        if client.pinned_version {
            return Ok(client);
        }

        let docker = client.docker.negotiate_version().await?;
        info!("Negotiated docker API version");

        Ok(Self {
            docker,
            pinned_version: false,
        })
    }

    pub fn from_docker(docker: Docker) -> Self {
        Self {
            docker,
            pinned_version: false,
        }
    }

    /// The underlying `bollard` handle, for calls the handles do not wrap.
    pub fn docker(&self) -> &Docker {
        &self.docker
    }

    pub async fn ping(&self) -> Result<()> {
        self.docker.ping().await?;
        Ok(())
    }
}
