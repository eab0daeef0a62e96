//! Kind-specific object payloads.
//!
//! [`ObjectSpec`] is a closed set: one variant per [`ObjectKind`], tagged by
//! `kind` when serialized. Generic code works on the enum and asks it for its
//! kind and disable source instead of matching on every variant.

use std::collections::BTreeMap;
use std::path::PathBuf;

use keel_core::EngineMode;
use serde::{Deserialize, Serialize};

use crate::types::ObjectKind;

/// Key under which a toggle's backing ConfigMap stores its state.
pub const DISABLE_KEY: &str = "isDisabled";

/// Reference to an externally mutable toggle that governs whether the objects
/// carrying it are active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisableSource {
    /// Disabled when this ConfigMap entry is `"true"`.
    ConfigMap(ConfigMapDisableSource),
    /// Disabled only when every listed ConfigMap entry is `"true"`.
    EveryConfigMap(Vec<ConfigMapDisableSource>),
}

impl DisableSource {
    pub fn config_map(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::ConfigMap(ConfigMapDisableSource {
            name: name.into(),
            key: key.into(),
        })
    }

    /// All ConfigMap entries this source reads.
    pub fn config_maps(&self) -> &[ConfigMapDisableSource] {
        match self {
            Self::ConfigMap(cm) => std::slice::from_ref(cm),
            Self::EveryConfigMap(cms) => cms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfigMapDisableSource {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfigMapSpec {
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl ConfigMapSpec {
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CmdSpec {
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
    #[serde(default)]
    pub engine_mode: EngineMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_source: Option<DisableSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileWatchSpec {
    pub watched_paths: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignores: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_source: Option<DisableSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KubernetesApplySpec {
    pub yaml: String,
    /// Names of the ImageMap objects whose images this apply injects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_maps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_source: Option<DisableSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DockerComposeServiceSpec {
    pub project: String,
    pub service: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_paths: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_maps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_source: Option<DisableSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageMapSpec {
    /// Image reference deploy targets select on.
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_source: Option<DisableSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DockerImageSpec {
    pub image_ref: String,
    /// ImageMap that receives the built image.
    pub image_map: String,
    pub context: PathBuf,
    #[serde(default)]
    pub dockerfile_contents: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub build_args: BTreeMap<String, Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ssh_specs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secret_specs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cache_from: Vec<String>,
    #[serde(default)]
    pub pull: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CmdImageSpec {
    pub image_ref: String,
    pub image_map: String,
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tag: Option<String>,
}

/// Where a UI component is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UiComponentLocation {
    pub component_id: String,
    pub component_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ButtonStateSpec {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfigMapStateSource {
    pub name: String,
    pub key: String,
    pub on_value: String,
    pub off_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StateSource {
    pub config_map: ConfigMapStateSource,
}

/// A two-state button whose state lives in a ConfigMap.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToggleButtonSpec {
    pub location: UiComponentLocation,
    pub on: ButtonStateSpec,
    pub off: ButtonStateSpec,
    #[serde(default)]
    pub default_on: bool,
    pub state_source: StateSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisableResourceStatus {
    #[serde(default)]
    pub sources: Vec<DisableSource>,
}

/// Summary of one manifest, or of the owner itself, for display.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UiResourceSpec {
    #[serde(default)]
    pub disable_status: DisableResourceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_mode: Option<EngineMode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ObjectSpec {
    ConfigMap(ConfigMapSpec),
    Cmd(CmdSpec),
    FileWatch(FileWatchSpec),
    KubernetesApply(KubernetesApplySpec),
    DockerComposeService(DockerComposeServiceSpec),
    ImageMap(ImageMapSpec),
    DockerImage(DockerImageSpec),
    CmdImage(CmdImageSpec),
    ToggleButton(ToggleButtonSpec),
    #[serde(rename = "UIResource")]
    UiResource(UiResourceSpec),
}

impl ObjectSpec {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::ConfigMap(_) => ObjectKind::ConfigMap,
            Self::Cmd(_) => ObjectKind::Cmd,
            Self::FileWatch(_) => ObjectKind::FileWatch,
            Self::KubernetesApply(_) => ObjectKind::KubernetesApply,
            Self::DockerComposeService(_) => ObjectKind::DockerComposeService,
            Self::ImageMap(_) => ObjectKind::ImageMap,
            Self::DockerImage(_) => ObjectKind::DockerImage,
            Self::CmdImage(_) => ObjectKind::CmdImage,
            Self::ToggleButton(_) => ObjectKind::ToggleButton,
            Self::UiResource(_) => ObjectKind::UiResource,
        }
    }

    /// The toggle governing this object, if any.
    pub fn disable_source(&self) -> Option<&DisableSource> {
        match self {
            Self::Cmd(s) => s.disable_source.as_ref(),
            Self::FileWatch(s) => s.disable_source.as_ref(),
            Self::KubernetesApply(s) => s.disable_source.as_ref(),
            Self::DockerComposeService(s) => s.disable_source.as_ref(),
            Self::ImageMap(s) => s.disable_source.as_ref(),
            Self::ConfigMap(_)
            | Self::DockerImage(_)
            | Self::CmdImage(_)
            | Self::ToggleButton(_)
            | Self::UiResource(_) => None,
        }
    }
}

macro_rules! impl_spec_from {
    ($($variant:ident => $ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for ObjectSpec {
                fn from(spec: $ty) -> Self {
                    Self::$variant(spec)
                }
            }
        )+
    };
}

impl_spec_from! {
    ConfigMap => ConfigMapSpec,
    Cmd => CmdSpec,
    FileWatch => FileWatchSpec,
    KubernetesApply => KubernetesApplySpec,
    DockerComposeService => DockerComposeServiceSpec,
    ImageMap => ImageMapSpec,
    DockerImage => DockerImageSpec,
    CmdImage => CmdImageSpec,
    ToggleButton => ToggleButtonSpec,
    UiResource => UiResourceSpec,
}
