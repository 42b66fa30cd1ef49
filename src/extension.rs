//! Composition root: one Docker client shared by every module handle.

use crate::client::DockerClient;
use crate::containers::Containers;
use crate::error::Result;
use crate::images::Images;
use crate::networks::Networks;
use crate::volumes::Volumes;

/// A handle the scripting host can address by name.
pub trait Module {
    const MODULE_NAME: &'static str;
}

/// The extension's top-level export.
///
/// # Examples
///
/// ```no_run
/// use docker_loadkit::{ConnectionOption, DockerExtension};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let extension = DockerExtension::from_env()?;
/// extension
///     .images()
///     .initialize(ConnectionOption::new("registry.example.com"))?;
/// # Ok(())
/// # }
/// ```
pub struct DockerExtension {
    client: DockerClient,
    containers: Containers,
    volumes: Volumes,
    networks: Networks,
    images: Images,
}

impl DockerExtension {
    pub fn new(client: DockerClient) -> Self {
        Self {
            containers: Containers::new(client.clone()),
            volumes: Volumes::new(client.clone()),
            networks: Networks::new(client.clone()),
            images: Images::new(client.clone()),
            client,
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(DockerClient::from_env()?))
    }

    /// Like [`DockerExtension::from_env`], with API version negotiation.
    pub async fn connect() -> Result<Self> {
        Ok(Self::new(DockerClient::connect().await?))
    }

    pub fn client(&self) -> &DockerClient {
        &self.client
    }

    pub fn containers(&self) -> &Containers {
        &self.containers
    }

    pub fn volumes(&self) -> &Volumes {
        &self.volumes
    }

    pub fn networks(&self) -> &Networks {
        &self.networks
    }

    pub fn images(&self) -> &Images {
        &self.images
    }

    /// Every name this extension registers under.
    pub fn module_names() -> [&'static str; 5] {
        [
            Self::MODULE_NAME,
            Containers::MODULE_NAME,
            Volumes::MODULE_NAME,
            Networks::MODULE_NAME,
            Images::<crate::resolver::OciPusher>::MODULE_NAME,
        ]
    }
}

impl Module for DockerExtension {
    const MODULE_NAME: &'static str = "k6/x/docker";
}
