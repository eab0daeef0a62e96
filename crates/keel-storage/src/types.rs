//! Object model shared by the store and the reconciler.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use keel_core::NamespacedName;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::StorageError;
use crate::spec::ObjectSpec;

/// Every kind of object the reconciler knows how to produce.
///
/// Adding a variant here does not make the reconciler garbage-collect it;
/// that is decided by the reconciled kind registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    ConfigMap,
    Cmd,
    FileWatch,
    KubernetesApply,
    DockerComposeService,
    ImageMap,
    DockerImage,
    CmdImage,
    ToggleButton,
    #[serde(rename = "UIResource")]
    UiResource,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigMap => "ConfigMap",
            Self::Cmd => "Cmd",
            Self::FileWatch => "FileWatch",
            Self::KubernetesApply => "KubernetesApply",
            Self::DockerComposeService => "DockerComposeService",
            Self::ImageMap => "ImageMap",
            Self::DockerImage => "DockerImage",
            Self::CmdImage => "CmdImage",
            Self::ToggleButton => "ToggleButton",
            Self::UiResource => "UIResource",
        }
    }

    /// Whether the object's payload may be mutated by actors other than the
    /// reconciler. Such objects are merged on update: values already in the
    /// store win over desired values.
    pub fn preserves_payload(&self) -> bool {
        matches!(self, Self::ConfigMap)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "ConfigMap" => Self::ConfigMap,
            "Cmd" => Self::Cmd,
            "FileWatch" => Self::FileWatch,
            "KubernetesApply" => Self::KubernetesApply,
            "DockerComposeService" => Self::DockerComposeService,
            "ImageMap" => Self::ImageMap,
            "DockerImage" => Self::DockerImage,
            "CmdImage" => Self::CmdImage,
            "ToggleButton" => Self::ToggleButton,
            "UIResource" => Self::UiResource,
            other => {
                return Err(StorageError::invalid_object(format!(
                    "Unknown object kind: {other}"
                )));
            }
        };
        Ok(kind)
    }
}

/// Addresses one object in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub namespace: String,
    pub name: String,
}

impl ObjectRef {
    pub fn new(kind: ObjectKind, key: &NamespacedName) -> Self {
        Self {
            kind,
            namespace: key.namespace.clone(),
            name: key.name.clone(),
        }
    }

    pub fn key(&self) -> NamespacedName {
        NamespacedName::new(self.namespace.clone(), self.name.clone())
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Opaque token assigned by the store on every write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub creation_timestamp: Option<OffsetDateTime>,
}

impl ObjectMeta {
    pub fn new(key: &NamespacedName) -> Self {
        Self {
            name: key.name.clone(),
            namespace: key.namespace.clone(),
            ..Default::default()
        }
    }

    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_annotations(mut self, annotations: BTreeMap<String, String>) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn key(&self) -> NamespacedName {
        NamespacedName::new(self.namespace.clone(), self.name.clone())
    }
}

/// A typed object: metadata plus a kind-specific spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiObject {
    pub metadata: ObjectMeta,
    #[serde(flatten)]
    pub spec: ObjectSpec,
}

impl ApiObject {
    pub fn new(metadata: ObjectMeta, spec: impl Into<ObjectSpec>) -> Self {
        Self {
            metadata,
            spec: spec.into(),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.spec.kind()
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn key(&self) -> NamespacedName {
        self.metadata.key()
    }

    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.kind(), &self.key())
    }

    pub fn resource_version(&self) -> Option<&str> {
        self.metadata.resource_version.as_deref()
    }
}

/// Equality-based label selector: every listed label must match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LabelSelector {
    pub match_labels: BTreeMap<String, String>,
}

impl LabelSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.match_labels.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty()
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.match_labels
            .iter()
            .all(|(k, v)| labels.get(k).is_some_and(|actual| actual == v))
    }
}

/// Parameters for listing objects of one kind.
///
/// The selector is mandatory: callers always scope listings, so a store is
/// free to index on labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Restrict to one namespace. `None` lists across all namespaces.
    pub namespace: Option<String>,
    pub selector: LabelSelector,
}

impl ListParams {
    pub fn new(selector: LabelSelector) -> Self {
        Self {
            namespace: None,
            selector,
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn matches(&self, meta: &ObjectMeta) -> bool {
        self.namespace
            .as_deref()
            .is_none_or(|ns| ns == meta.namespace)
            && self.selector.matches(&meta.labels)
    }
}
