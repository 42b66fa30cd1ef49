//! Registry resolution for the single configured registry.
//!
//! A [`Resolver`] combines three decisions, each scoped to the configured
//! host and nothing else:
//!
//! - which credentials to present ([`HostAuthorizer`]),
//! - whether to speak plain HTTP ([`PlainHttp`]),
//! - whether to verify TLS certificates ([`Transport`]).
//!
//! Any other host a push touches is treated as an anonymous HTTPS registry.

use crate::config::{ConnectionOption, Scheme};
use crate::digest::Digest;
use crate::error::{ExtensionError, Result};
use crate::store::{ContentStore, Descriptor};
use async_trait::async_trait;
use oci_distribution::client::{ClientConfig, ClientProtocol, Config, ImageLayer};
use oci_distribution::manifest::{OciImageManifest, OciManifest};
use oci_distribution::secrets::RegistryAuth;
use oci_distribution::{Client, Reference};
use olpc_cjson::CanonicalFormatter;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Username and password for HTTP Basic auth. Both empty means anonymous.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// True when both fields are empty.
    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }

    fn to_registry_auth(&self) -> RegistryAuth {
        if self.is_anonymous() {
            RegistryAuth::Anonymous
        } else {
            RegistryAuth::Basic(self.username.clone(), self.password.clone())
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Hands out the configured credentials for the configured host only.
///
/// The comparison is exact and case-sensitive. Redirect targets such as a
/// CDN or mirror never receive credentials.
#[derive(Debug, Clone)]
pub struct HostAuthorizer {
    host: String,
    credentials: Credentials,
}

impl HostAuthorizer {
    /// Presents `credentials` to `host` and nowhere else.
    pub fn new(host: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            host: host.into(),
            credentials,
        }
    }

    /// The configured credentials if `host` is the configured host,
    /// anonymous otherwise.
    pub fn credentials(&self, host: &str) -> Credentials {
        if host == self.host {
            self.credentials.clone()
        } else {
            Credentials::default()
        }
    }

    /// [`HostAuthorizer::credentials`] in the registry client's form.
    pub fn registry_auth(&self, host: &str) -> RegistryAuth {
        self.credentials(host).to_registry_auth()
    }
}

/// Decides per host whether to use unencrypted HTTP.
#[derive(Debug, Clone)]
pub struct PlainHttp {
    host: String,
    scheme: Scheme,
}

impl PlainHttp {
    /// `scheme` applies to `host` only.
    pub fn new(host: impl Into<String>, scheme: Scheme) -> Self {
        Self {
            host: host.into(),
            scheme,
        }
    }

    /// Only the configured host can be plain HTTP; everything else is HTTPS.
    pub fn is_plain_http(&self, host: &str) -> bool {
        host == self.host && self.scheme == Scheme::Http
    }

    fn protocol(&self) -> ClientProtocol {
        match self.scheme {
            Scheme::Http => ClientProtocol::HttpsExcept(vec![self.host.clone()]),
            Scheme::Https => ClientProtocol::Https,
        }
    }
}

/// TLS settings for registry connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transport {
    /// Skip certificate verification.
    pub insecure: bool,
}

/// Everything a registry push needs to reach and authenticate against the
/// configured registry.
#[derive(Debug, Clone)]
pub struct Resolver {
    transport: Transport,
    authorizer: HostAuthorizer,
    plain_http: PlainHttp,
}

impl Resolver {
    /// Scopes credentials, scheme and TLS settings to `option.host`.
    pub fn new(option: &ConnectionOption) -> Self {
        debug!(
            host = %option.host,
            scheme = option.scheme.as_str(),
            insecure = option.insecure,
            "Building registry resolver"
        );

        Self {
            transport: Transport {
                insecure: option.insecure,
            },
            authorizer: HostAuthorizer::new(
                option.host.clone(),
                Credentials::new(option.username.clone(), option.password.clone()),
            ),
            plain_http: PlainHttp::new(option.host.clone(), option.scheme),
        }
    }

    /// Credential lookup by host.
    pub fn authorizer(&self) -> &HostAuthorizer {
        &self.authorizer
    }

    pub fn plain_http(&self) -> &PlainHttp {
        &self.plain_http
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Registry client settings: protocol per host and certificate checks.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            protocol: self.plain_http.protocol(),
            accept_invalid_certificates: self.transport.insecure,
            ..Default::default()
        }
    }

    /// A registry client configured for this resolver.
    pub fn client(&self) -> Client {
        Client::new(self.client_config())
    }

    /// Credentials for the registry `reference` points at.
    pub fn auth_for(&self, reference: &Reference) -> RegistryAuth {
        self.authorizer.registry_auth(reference.registry())
    }
}

/// Digest of `manifest` as the registry client uploads it: the
/// `OciManifest` wrapper serialized as canonical JSON.
///
/// Names this call's manifest regardless of where the tag points later.
pub fn manifest_digest(manifest: &OciImageManifest) -> Result<Digest> {
    let wrapped: OciManifest = manifest.clone().into();
    let mut body = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut body, CanonicalFormatter::new());
    wrapped.serialize(&mut ser)?;
    Ok(Digest::from_bytes(&body))
}

/// Uploads a blob set plus config under a reference and reports the
/// manifest digest.
#[async_trait]
pub trait RegistryPush: Send + Sync {
    async fn push(
        &self,
        resolver: &Resolver,
        reference: &str,
        store: &ContentStore,
        blobs: &[Descriptor],
        config: &Descriptor,
    ) -> Result<Digest>;
}

/// [`RegistryPush`] backed by the `oci-distribution` client.
#[derive(Debug, Clone, Copy, Default)]
pub struct OciPusher;

#[async_trait]
impl RegistryPush for OciPusher {
    async fn push(
        &self,
        resolver: &Resolver,
        reference: &str,
        store: &ContentStore,
        blobs: &[Descriptor],
        config: &Descriptor,
    ) -> Result<Digest> {
        let parsed = reference.parse::<Reference>().map_err(|e| {
            ExtensionError::InvalidReference {
                reference: reference.to_string(),
                reason: e.to_string(),
            }
        })?;

        let config = Config::new(
            store.read_blob(config).await?,
            config.media_type.clone(),
            None,
        );

        let mut layers = Vec::with_capacity(blobs.len());
        for blob in blobs {
            let data = store.read_blob(blob).await?;
            layers.push(ImageLayer::new(data, blob.media_type.clone(), None));
        }

        let manifest = OciImageManifest::build(&layers, &config, None);
        let digest = manifest_digest(&manifest)?;

        let client = resolver.client();
        let auth = resolver.auth_for(&parsed);

        let response = client
            .push(&parsed, &layers, config, &auth, Some(manifest))
            .await?;
        info!(
            reference = %parsed,
            digest = %digest,
            manifest_url = %response.manifest_url,
            "Pushed manifest"
        );

        Ok(digest)
    }
}
