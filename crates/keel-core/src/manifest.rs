//! Manifests as produced by the configuration evaluator.
//!
//! A [`Manifest`] is one named unit of desired state: zero or more image
//! targets that must be built, and at most one deploy target that consumes
//! them. The contents of each target (YAML, argv, Dockerfile) are opaque to
//! the reconciler; it only copies them into object specs.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Stable name of a manifest, unique within one load result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestName(String);

impl ManifestName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ManifestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ManifestName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ManifestName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: ManifestName,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub image_targets: Vec<ImageTarget>,
    #[serde(default)]
    pub deploy_target: Option<DeployTarget>,
}

impl Manifest {
    pub fn new(name: impl Into<ManifestName>) -> Self {
        Self {
            name: name.into(),
            labels: BTreeMap::new(),
            image_targets: Vec::new(),
            deploy_target: None,
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_image_target(mut self, target: ImageTarget) -> Self {
        self.image_targets.push(target);
        self
    }

    pub fn with_deploy_target(mut self, target: DeployTarget) -> Self {
        self.deploy_target = Some(target);
        self
    }

    /// Shorthand for a manifest deploying raw Kubernetes YAML.
    pub fn with_k8s_yaml(self, yaml: impl Into<String>) -> Self {
        let image_refs = self
            .image_targets
            .iter()
            .map(|t| t.image_ref.clone())
            .collect();
        self.with_deploy_target(DeployTarget::Kubernetes(K8sTarget {
            yaml: yaml.into(),
            image_refs,
        }))
    }

    /// Shorthand for a local resource running `update_cmd` when `deps` change.
    pub fn with_local_resource<I, S>(self, update_cmd: &str, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PathBuf>,
    {
        self.with_deploy_target(DeployTarget::Local(LocalTarget {
            update_cmd: Some(Command::shell(update_cmd)),
            serve_cmd: None,
            deps: deps.into_iter().map(Into::into).collect(),
            ignores: Vec::new(),
        }))
    }

    pub fn k8s_target(&self) -> Option<&K8sTarget> {
        match &self.deploy_target {
            Some(DeployTarget::Kubernetes(t)) => Some(t),
            _ => None,
        }
    }

    pub fn local_target(&self) -> Option<&LocalTarget> {
        match &self.deploy_target {
            Some(DeployTarget::Local(t)) => Some(t),
            _ => None,
        }
    }

    pub fn docker_compose_target(&self) -> Option<&DockerComposeTarget> {
        match &self.deploy_target {
            Some(DeployTarget::DockerCompose(t)) => Some(t),
            _ => None,
        }
    }

    /// Checks the invariants the object builder relies on.
    pub fn validate(&self) -> Result<()> {
        let name = self.name.as_str();
        if name.is_empty() || name.contains('/') {
            return Err(CoreError::invalid_manifest_name(name));
        }
        for target in &self.image_targets {
            if target.image_ref.trim().is_empty() {
                return Err(CoreError::invalid_target(name, "image ref is empty"));
            }
            if let BuildDetails::Custom(build) = &target.build
                && build.argv.is_empty()
            {
                return Err(CoreError::invalid_target(name, "custom build has no command"));
            }
        }
        if let Some(DeployTarget::Local(local)) = &self.deploy_target {
            let has_cmd = |cmd: &Option<Command>| cmd.as_ref().is_some_and(|c| !c.is_empty());
            if !has_cmd(&local.update_cmd) && !has_cmd(&local.serve_cmd) && local.deps.is_empty()
            {
                return Err(CoreError::invalid_target(
                    name,
                    "local resource needs a command or deps",
                ));
            }
        }
        Ok(())
    }
}

/// An image that must be built before the deploy target can run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageTarget {
    /// Reference the deploy target selects on, e.g. `gcr.io/project/app`.
    pub image_ref: String,
    pub build: BuildDetails,
    /// Paths whose changes trigger a rebuild.
    #[serde(default)]
    pub deps: Vec<PathBuf>,
    #[serde(default)]
    pub ignores: Vec<String>,
}

impl ImageTarget {
    pub fn docker(image_ref: impl Into<String>, build: DockerBuild) -> Self {
        let deps = vec![build.context.clone()];
        Self {
            image_ref: image_ref.into(),
            build: BuildDetails::Docker(build),
            deps,
            ignores: Vec::new(),
        }
    }

    pub fn custom(image_ref: impl Into<String>, build: CustomBuild) -> Self {
        Self {
            image_ref: image_ref.into(),
            build: BuildDetails::Custom(build),
            deps: Vec::new(),
            ignores: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuildDetails {
    Docker(DockerBuild),
    Custom(CustomBuild),
}

/// Options passed through to a Docker image build.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DockerBuild {
    pub context: PathBuf,
    #[serde(default)]
    pub dockerfile_contents: String,
    #[serde(default)]
    pub build_args: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub ssh_specs: Vec<String>,
    #[serde(default)]
    pub secret_specs: Vec<String>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub cache_from: Vec<String>,
    #[serde(default)]
    pub pull_parent: bool,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub extra_tags: Vec<String>,
}

/// An image produced by a user-supplied command.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomBuild {
    pub argv: Vec<String>,
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Tag the command is expected to produce, if fixed.
    #[serde(default)]
    pub output_tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeployTarget {
    Kubernetes(K8sTarget),
    DockerCompose(DockerComposeTarget),
    Local(LocalTarget),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct K8sTarget {
    /// Rendered YAML applied to the cluster.
    pub yaml: String,
    /// Image refs this deploy injects; each must match an image target.
    #[serde(default)]
    pub image_refs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DockerComposeTarget {
    pub project: String,
    pub service: String,
    #[serde(default)]
    pub config_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocalTarget {
    #[serde(default)]
    pub update_cmd: Option<Command>,
    #[serde(default)]
    pub serve_cmd: Option<Command>,
    #[serde(default)]
    pub deps: Vec<PathBuf>,
    #[serde(default)]
    pub ignores: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Command {
    pub argv: Vec<String>,
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub env: Vec<String>,
}

impl Command {
    /// Wraps a shell snippet the way the evaluator does for string commands.
    pub fn shell(script: &str) -> Self {
        Self {
            argv: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            dir: None,
            env: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }
}
