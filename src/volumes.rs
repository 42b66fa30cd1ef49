//! The volumes module.

use crate::client::DockerClient;
use crate::error::Result;
use crate::extension::Module;
use bollard::models::{Volume, VolumeListResponse};
use bollard::query_parameters::{ListVolumesOptions, RemoveVolumeOptions};

/// Volume operations on the shared client.
#[derive(Debug, Clone)]
pub struct Volumes {
    client: DockerClient,
}

impl Volumes {
    /// Shares `client` with the other modules.
    pub fn new(client: DockerClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &DockerClient {
        &self.client
    }

    pub async fn list(&self) -> Result<VolumeListResponse> {
        Ok(self
            .client
            .docker()
            .list_volumes(None::<ListVolumesOptions>)
            .await?)
    }

    /// Full daemon-side details of one volume.
    pub async fn inspect(&self, name: &str) -> Result<Volume> {
        Ok(self.client.docker().inspect_volume(name).await?)
    }

    pub async fn remove(&self, name: &str) -> Result<()> {
        self.client
            .docker()
            .remove_volume(name, None::<RemoveVolumeOptions>)
            .await?;
        Ok(())
    }
}

impl Module for Volumes {
    const MODULE_NAME: &'static str = "k6/x/docker/volumes";
}
