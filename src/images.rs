//! The images module: registry push plus a thin view of local images.

use crate::client::DockerClient;
use crate::config::ConnectionOption;
use crate::error::{ExtensionError, Result};
use crate::extension::Module;
use crate::resolver::{OciPusher, RegistryPush, Resolver};
use crate::store::{ContentStore, Descriptor};
use bollard::models::ImageSummary;
use bollard::query_parameters::{ListImagesOptions, RemoveImageOptions};
use serde::Serialize;
use std::sync::OnceLock;
use tracing::{info, warn};
use uuid::Uuid;

pub const IMAGE_CONFIG_MEDIA_TYPE: &str = "application/vnd.oci.image.config.v1+json";

/// What to push: the store holding the blobs and their descriptors.
#[derive(Debug, Clone)]
pub struct PushRequest {
    pub reference: String,
    pub store: ContentStore,
    pub blobs: Vec<Descriptor>,
}

/// Extra arguments accepted by [`Images::push`]; reserved for resolver
/// construction and currently empty.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct PushArgs {}

// Registries such as Harbor classify an artifact with an image config as a
// container image rather than a generic OCI artifact.
#[derive(Serialize)]
struct StubConfig {
    #[serde(rename = "User")]
    user: String,
}

/// Prefixes `reference` with `host/` unless it already starts with `host`.
pub fn qualify_reference(host: &str, reference: &str) -> String {
    if reference.starts_with(host) {
        reference.to_string()
    } else {
        format!("{}/{}", host, reference)
    }
}

/// Registry push and local image operations.
///
/// Holds the shared Docker client and, once [`Images::initialize`] has run,
/// the registry connection used by [`Images::push`].
pub struct Images<P = OciPusher> {
    client: DockerClient,
    option: OnceLock<ConnectionOption>,
    pusher: P,
}

impl Images<OciPusher> {
    /// Uses [`OciPusher`] for registry uploads.
    pub fn new(client: DockerClient) -> Self {
        Self::with_pusher(client, OciPusher)
    }

    /// Builds the module with its own client from the `DOCKER_*` environment.
    pub fn setup_client() -> Result<Self> {
        Ok(Self::new(DockerClient::from_env()?))
    }
}

impl<P: RegistryPush> Images<P> {
    pub fn with_pusher(client: DockerClient, pusher: P) -> Self {
        Self {
            client,
            option: OnceLock::new(),
            pusher,
        }
    }

    /// Sets the registry connection. Can only be done once.
    pub fn initialize(&self, option: ConnectionOption) -> Result<()> {
        option.validate()?;
        let host = option.host.clone();
        self.option
            .set(option)
            .map_err(|_| ExtensionError::AlreadyInitialized)?;
        info!(host = %host, "Images module initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.option.get().is_some()
    }

    fn option(&self) -> Result<&ConnectionOption> {
        self.option.get().ok_or(ExtensionError::Uninitialized)
    }

    pub fn client(&self) -> &DockerClient {
        &self.client
    }

    /// Builds a resolver for the configured registry.
    pub fn make_resolver(&self, _args: &PushArgs) -> Result<Resolver> {
        Ok(Resolver::new(self.option()?))
    }

    /// Qualifies `reference` with the configured host.
    pub fn normalize_reference(&self, reference: &str) -> Result<String> {
        Ok(qualify_reference(&self.option()?.host, reference))
    }

    /// Pushes `request.blobs` plus a generated image config and returns the
    /// manifest digest, e.g. `sha256:<hex>`.
    pub async fn push(&self, request: PushRequest, args: PushArgs) -> Result<String> {
        let resolver = self.make_resolver(&args)?;
        let reference = self.normalize_reference(&request.reference)?;

        info!(reference = %reference, blobs = request.blobs.len(), "Pushing artifact");

        let config_bytes = serde_json::to_vec(&StubConfig {
            user: Uuid::new_v4().to_string(),
        })?;

        let config_digest = request
            .store
            .write_blob(&config_bytes)
            .await
            .map_err(|source| {
                warn!(reference = %reference, "Failed to stage image config: {}", source);
                ExtensionError::PrepareConfig {
                    name: reference.clone(),
                    source,
                }
            })?;
        let config = Descriptor::new(
            IMAGE_CONFIG_MEDIA_TYPE,
            config_digest,
            config_bytes.len() as u64,
        );

        let digest = self
            .pusher
            .push(&resolver, &reference, &request.store, &request.blobs, &config)
            .await
            .map_err(|e| ExtensionError::Push {
                name: reference.clone(),
                source: Box::new(e),
            })?;

        info!(reference = %reference, digest = %digest, "Pushed artifact");
        Ok(digest.to_string())
    }

    pub async fn list(&self) -> Result<Vec<ImageSummary>> {
        Ok(self
            .client
            .docker()
            .list_images(None::<ListImagesOptions>)
            .await?)
    }

    pub async fn remove(&self, name: &str) -> Result<()> {
        self.client
            .docker()
            .remove_image(name, Some(RemoveImageOptions::default()), None)
            .await?;
        Ok(())
    }
}

impl<P> Module for Images<P> {
    const MODULE_NAME: &'static str = "k6/x/docker/images";
}
