pub mod client;
pub mod config;
pub mod containers;
pub mod digest;
pub mod error;
pub mod extension;
pub mod images;
pub mod logging;
pub mod networks;
pub mod resolver;
pub mod store;
pub mod volumes;

pub use client::DockerClient;
pub use config::{ConnectionOption, DockerEnv, Scheme};
pub use containers::Containers;
pub use digest::{Algorithm, Digest};
pub use error::{ExtensionError, Result};
pub use extension::{DockerExtension, Module};
pub use images::{Images, PushArgs, PushRequest};
pub use networks::Networks;
pub use resolver::{HostAuthorizer, OciPusher, PlainHttp, RegistryPush, Resolver};
pub use store::{ContentStore, Descriptor};
pub use volumes::Volumes;
