pub mod error;
pub mod feature;
pub mod load_result;
pub mod manifest;
pub mod name;

pub use error::{CoreError, ErrorCategory, Result};
pub use load_result::{EngineMode, LoadError, LoadResult};
pub use manifest::{
    BuildDetails, Command, CustomBuild, DeployTarget, DockerBuild, DockerComposeTarget,
    ImageTarget, K8sTarget, LocalTarget, Manifest, ManifestName,
};
pub use name::{NamespacedName, sanitize_name};
