//! The networks module.

use crate::client::DockerClient;
use crate::error::Result;
use crate::extension::Module;
use bollard::models::Network;
use bollard::query_parameters::{InspectNetworkOptions, ListNetworksOptions};

/// Network operations on the shared client.
#[derive(Debug, Clone)]
pub struct Networks {
    client: DockerClient,
}

impl Networks {
    /// Shares `client` with the other modules.
    pub fn new(client: DockerClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &DockerClient {
        &self.client
    }

    pub async fn list(&self) -> Result<Vec<Network>> {
        Ok(self
            .client
            .docker()
            .list_networks(None::<ListNetworksOptions>)
            .await?)
    }

    /// Full daemon-side details of one network.
    pub async fn inspect(&self, id: &str) -> Result<Network> {
        Ok(self
            .client
            .docker()
            .inspect_network(id, None::<InspectNetworkOptions>)
            .await?)
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        self.client.docker().remove_network(id).await?;
        Ok(())
    }
}

impl Module for Networks {
    const MODULE_NAME: &'static str = "k6/x/docker/networks";
}
