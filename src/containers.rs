//! The containers module.

use crate::client::DockerClient;
use crate::error::Result;
use crate::extension::Module;
use bollard::models::{ContainerInspectResponse, ContainerSummary};
use bollard::query_parameters::{
    InspectContainerOptions, ListContainersOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use tracing::debug;

/// Container operations on the shared client.
#[derive(Debug, Clone)]
pub struct Containers {
    client: DockerClient,
}

impl Containers {
    /// Shares `client` with the other modules.
    pub fn new(client: DockerClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &DockerClient {
        &self.client
    }

    /// Lists containers; stopped ones only when `all` is set.
    pub async fn list(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        let options = ListContainersOptions {
            all,
            ..Default::default()
        };
        Ok(self.client.docker().list_containers(Some(options)).await?)
    }

    /// Full daemon-side details of one container.
    pub async fn inspect(&self, id: &str) -> Result<ContainerInspectResponse> {
        Ok(self
            .client
            .docker()
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?)
    }

    pub async fn start(&self, id: &str) -> Result<()> {
        debug!("Starting container {}", id);
        self.client
            .docker()
            .start_container(id, None::<StartContainerOptions>)
            .await?;
        Ok(())
    }

    pub async fn stop(&self, id: &str) -> Result<()> {
        debug!("Stopping container {}", id);
        self.client
            .docker()
            .stop_container(id, None::<StopContainerOptions>)
            .await?;
        Ok(())
    }

    /// Removes a container, killing it first when `force` is set.
    pub async fn remove(&self, id: &str, force: bool) -> Result<()> {
        debug!("Removing container {} (force: {})", id, force);
        let options = RemoveContainerOptions {
            force,
            ..Default::default()
        };
        self.client
            .docker()
            .remove_container(id, Some(options))
            .await?;
        Ok(())
    }
}

impl Module for Containers {
    const MODULE_NAME: &'static str = "k6/x/docker/containers";
}
