//! Desired object set construction.
//!
//! Turns the manifests of one load result into the complete set of objects
//! that should exist for an owner. Everything here is pure: the same inputs
//! always produce the same set, with deterministic names.

use std::collections::BTreeMap;

use keel_core::{
    BuildDetails, Command, DeployTarget, EngineMode, ImageTarget, LoadResult, Manifest,
    ManifestName, NamespacedName, feature, sanitize_name,
};
use keel_storage::{
    ApiObject, ButtonStateSpec, CmdImageSpec, CmdSpec, ConfigMapSpec, ConfigMapStateSource,
    DisableResourceStatus, DisableSource, DockerComposeServiceSpec, DockerImageSpec,
    FileWatchSpec, ImageMapSpec, KubernetesApplySpec, LabelSelector, ObjectKind, ObjectMeta,
    ObjectSpec, StateSource, ToggleButtonSpec, UiComponentLocation, UiResourceSpec,
};
use serde::{Deserialize, Serialize};

use super::disable::{DisableSourceMap, combine_sources, disable_object_name};

/// Label marking which owner produced an object.
pub const OWNER_LABEL: &str = "keel.dev/owner";

/// Namespace holding every object produced for `owner`, and the value of
/// its [`OWNER_LABEL`].
///
/// Each owner gets its own, so two owners may use the same manifest names.
/// `owner` must pass [`NamespacedName::validate`].
pub fn owner_scope(owner: &NamespacedName) -> String {
    owner.to_string()
}

/// Selector matching every object produced for `owner`.
pub fn owner_selector(owner: &NamespacedName) -> LabelSelector {
    LabelSelector::new().with_label(OWNER_LABEL, owner_scope(owner))
}

/// Parent payload of an owner, copied onto every object the owner produces.
///
/// Manifest labels take precedence over owner labels of the same key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OwnerRecord {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl OwnerRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }
}

/// Desired objects grouped by kind and keyed by name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DesiredObjectSet {
    objects: BTreeMap<ObjectKind, BTreeMap<String, ApiObject>>,
}

impl DesiredObjectSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object, replacing any previous one of the same kind and name.
    pub fn insert(&mut self, object: ApiObject) -> Option<ApiObject> {
        self.objects
            .entry(object.kind())
            .or_default()
            .insert(object.name().to_string(), object)
    }

    pub fn get(&self, kind: ObjectKind, name: &str) -> Option<&ApiObject> {
        self.objects.get(&kind).and_then(|objs| objs.get(name))
    }

    pub fn of_kind(&self, kind: ObjectKind) -> Option<&BTreeMap<String, ApiObject>> {
        self.objects.get(&kind)
    }

    /// Kinds with at least one desired object.
    pub fn kinds(&self) -> impl Iterator<Item = ObjectKind> + '_ {
        self.objects
            .iter()
            .filter(|(_, objs)| !objs.is_empty())
            .map(|(kind, _)| *kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ApiObject> {
        self.objects.values().flat_map(|objs| objs.values())
    }

    pub fn len(&self) -> usize {
        self.objects.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds the desired object set for `owner` from `result`.
pub fn to_api_objects(
    owner: &NamespacedName,
    record: &OwnerRecord,
    result: &LoadResult,
    mode: EngineMode,
    disable_sources: &DisableSourceMap,
) -> DesiredObjectSet {
    let builder = ObjectBuilder { owner, record };
    let mut set = DesiredObjectSet::new();

    for manifest in &result.manifests {
        let source = disable_sources.get(&manifest.name);
        builder.add_deploy_target(&mut set, manifest, source);
        builder.add_local_target(&mut set, manifest, mode, source);
        builder.add_ui_resource(&mut set, manifest, source);
    }

    builder.add_image_targets(&mut set, result, disable_sources);

    let show_toggles = result.feature_enabled(feature::DISABLE_RESOURCES);
    for (manifest, source) in disable_sources {
        builder.add_toggle(&mut set, manifest, source, show_toggles);
    }

    builder.add_owner_summary(&mut set, mode);
    set
}

struct ObjectBuilder<'a> {
    owner: &'a NamespacedName,
    record: &'a OwnerRecord,
}

impl ObjectBuilder<'_> {
    fn meta(&self, name: impl Into<String>) -> ObjectMeta {
        self.meta_with_labels(name, BTreeMap::new())
    }

    fn meta_with_labels(
        &self,
        name: impl Into<String>,
        extra: BTreeMap<String, String>,
    ) -> ObjectMeta {
        let scope = owner_scope(self.owner);
        let mut labels = self.record.labels.clone();
        labels.extend(extra);
        labels.insert(OWNER_LABEL.to_string(), scope.clone());
        ObjectMeta::new(&NamespacedName::new(scope, name))
            .with_labels(labels)
            .with_annotations(self.record.annotations.clone())
    }

    fn object(&self, name: impl Into<String>, spec: impl Into<ObjectSpec>) -> ApiObject {
        ApiObject::new(self.meta(name), spec)
    }

    fn add_deploy_target(
        &self,
        set: &mut DesiredObjectSet,
        manifest: &Manifest,
        source: Option<&DisableSource>,
    ) {
        let name = manifest.name.as_str();
        match &manifest.deploy_target {
            Some(DeployTarget::Kubernetes(k8s)) => {
                let spec = KubernetesApplySpec {
                    yaml: k8s.yaml.clone(),
                    image_maps: k8s.image_refs.iter().map(|r| sanitize_name(r)).collect(),
                    disable_source: source.cloned(),
                };
                set.insert(self.object(name, spec));
            }
            Some(DeployTarget::DockerCompose(compose)) => {
                let spec = DockerComposeServiceSpec {
                    project: compose.project.clone(),
                    service: compose.service.clone(),
                    config_paths: compose.config_paths.clone(),
                    image_maps: image_map_names(manifest),
                    disable_source: source.cloned(),
                };
                set.insert(self.object(name, spec));
            }
            Some(DeployTarget::Local(_)) | None => {}
        }
    }

    fn add_local_target(
        &self,
        set: &mut DesiredObjectSet,
        manifest: &Manifest,
        mode: EngineMode,
        source: Option<&DisableSource>,
    ) {
        let Some(local) = manifest.local_target() else {
            return;
        };
        let name = manifest.name.as_str();

        if !local.deps.is_empty() {
            let spec = FileWatchSpec {
                watched_paths: local.deps.clone(),
                ignores: local.ignores.clone(),
                disable_source: source.cloned(),
            };
            set.insert(self.object(format!("local:{name}"), spec));
        }

        let commands = [("update", &local.update_cmd), ("serve", &local.serve_cmd)];
        for (suffix, cmd) in commands {
            if let Some(cmd) = cmd.as_ref().filter(|c| !c.is_empty()) {
                let spec = cmd_spec(cmd, mode, source);
                set.insert(self.object(format!("{name}:{suffix}"), spec));
            }
        }
    }

    fn add_ui_resource(
        &self,
        set: &mut DesiredObjectSet,
        manifest: &Manifest,
        source: Option<&DisableSource>,
    ) {
        let spec = UiResourceSpec {
            disable_status: DisableResourceStatus {
                sources: source.into_iter().cloned().collect(),
            },
            engine_mode: None,
        };
        let meta = self.meta_with_labels(manifest.name.as_str(), manifest.labels.clone());
        set.insert(ApiObject::new(meta, spec));
    }

    /// Emits one set of build objects per distinct image ref, however many
    /// manifests reference it. The first manifest's target wins if two
    /// manifests describe the same ref differently.
    fn add_image_targets(
        &self,
        set: &mut DesiredObjectSet,
        result: &LoadResult,
        disable_sources: &DisableSourceMap,
    ) {
        let mut targets: BTreeMap<String, (&ImageTarget, Vec<&ManifestName>)> = BTreeMap::new();
        for manifest in &result.manifests {
            for target in &manifest.image_targets {
                let (_, users) = targets
                    .entry(sanitize_name(&target.image_ref))
                    .or_insert_with(|| (target, Vec::new()));
                users.push(&manifest.name);
            }
        }

        for (name, (target, users)) in targets {
            let source = combine_sources(users.iter().filter_map(|m| disable_sources.get(*m)));

            set.insert(self.object(
                name.clone(),
                ImageMapSpec {
                    selector: target.image_ref.clone(),
                    disable_source: source.clone(),
                },
            ));

            let build: ObjectSpec = match &target.build {
                BuildDetails::Docker(docker) => DockerImageSpec {
                    image_ref: target.image_ref.clone(),
                    image_map: name.clone(),
                    context: docker.context.clone(),
                    dockerfile_contents: docker.dockerfile_contents.clone(),
                    build_args: docker.build_args.clone(),
                    target: docker.target.clone(),
                    ssh_specs: docker.ssh_specs.clone(),
                    secret_specs: docker.secret_specs.clone(),
                    network: docker.network.clone(),
                    cache_from: docker.cache_from.clone(),
                    pull: docker.pull_parent,
                    platform: docker.platform.clone(),
                    extra_tags: docker.extra_tags.clone(),
                }
                .into(),
                BuildDetails::Custom(custom) => CmdImageSpec {
                    image_ref: target.image_ref.clone(),
                    image_map: name.clone(),
                    args: custom.argv.clone(),
                    dir: custom.dir.clone(),
                    output_tag: custom.output_tag.clone(),
                }
                .into(),
            };
            set.insert(self.object(name.clone(), build));

            if !target.deps.is_empty() {
                let spec = FileWatchSpec {
                    watched_paths: target.deps.clone(),
                    ignores: target.ignores.clone(),
                    disable_source: source,
                };
                set.insert(self.object(sanitize_name(&format!("image:{name}")), spec));
            }
        }
    }

    /// Emits the ConfigMap backing `source`, plus the button flipping it
    /// when toggles are shown.
    fn add_toggle(
        &self,
        set: &mut DesiredObjectSet,
        manifest: &ManifestName,
        source: &DisableSource,
        show_toggles: bool,
    ) {
        for cm in source.config_maps() {
            let spec = ConfigMapSpec::default().with_entry(cm.key.clone(), "false");
            set.insert(self.object(cm.name.clone(), spec));
        }

        if !show_toggles {
            return;
        }
        let Some(cm) = source.config_maps().first() else {
            return;
        };
        let spec = ToggleButtonSpec {
            location: UiComponentLocation {
                component_id: manifest.to_string(),
                component_type: ObjectKind::UiResource.to_string(),
            },
            on: ButtonStateSpec {
                text: "Enable Resource".into(),
                icon_name: Some("play_arrow".into()),
            },
            off: ButtonStateSpec {
                text: "Disable Resource".into(),
                icon_name: Some("stop".into()),
            },
            default_on: false,
            state_source: StateSource {
                config_map: ConfigMapStateSource {
                    name: cm.name.clone(),
                    key: cm.key.clone(),
                    on_value: "true".into(),
                    off_value: "false".into(),
                },
            },
        };
        set.insert(self.object(disable_object_name(manifest), spec));
    }

    /// The owner's own summary. Inserted last, so it takes precedence over a
    /// manifest of the same name.
    fn add_owner_summary(&self, set: &mut DesiredObjectSet, mode: EngineMode) {
        let spec = UiResourceSpec {
            disable_status: DisableResourceStatus::default(),
            engine_mode: Some(mode),
        };
        let meta = self.meta(self.owner.name.clone());
        if let Some(replaced) = set.insert(ApiObject::new(meta, spec)) {
            tracing::warn!(
                owner = %self.owner,
                name = %replaced.name(),
                "manifest shares its name with the owner; owner summary wins"
            );
        }
    }
}

fn image_map_names(manifest: &Manifest) -> Vec<String> {
    manifest
        .image_targets
        .iter()
        .map(|t| sanitize_name(&t.image_ref))
        .collect()
}

fn cmd_spec(cmd: &Command, mode: EngineMode, source: Option<&DisableSource>) -> CmdSpec {
    CmdSpec {
        args: cmd.argv.clone(),
        dir: cmd.dir.clone(),
        env: cmd.env.clone(),
        engine_mode: mode,
        disable_source: source.cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::disable::to_disable_sources;
    use keel_core::{CustomBuild, DockerBuild, DockerComposeTarget, LocalTarget};

    fn build(owner: &str, result: &LoadResult) -> DesiredObjectSet {
        let sources = to_disable_sources(result);
        to_api_objects(
            &NamespacedName::named(owner),
            &OwnerRecord::default(),
            result,
            EngineMode::Up,
            &sources,
        )
    }

    fn docker(context: &str) -> DockerBuild {
        DockerBuild {
            context: context.into(),
            dockerfile_contents: "FROM alpine".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_k8s_manifest_with_image() {
        let fe = Manifest::new("fe")
            .with_image_target(ImageTarget::docker(
                "gcr.io/some-project-162817/sancho",
                docker("./fe"),
            ))
            .with_k8s_yaml("kind: Deployment");
        let set = build("tf", &LoadResult::new(vec![fe]));

        let image_name = "gcr.io_some-project-162817_sancho";
        let ka = set.get(ObjectKind::KubernetesApply, "fe").unwrap();
        match &ka.spec {
            ObjectSpec::KubernetesApply(spec) => {
                assert_eq!(spec.yaml, "kind: Deployment");
                assert_eq!(spec.image_maps, vec![image_name.to_string()]);
            }
            other => panic!("unexpected spec: {other:?}"),
        }

        let im = set.get(ObjectKind::ImageMap, image_name).unwrap();
        match &im.spec {
            ObjectSpec::ImageMap(spec) => {
                assert_eq!(spec.selector, "gcr.io/some-project-162817/sancho")
            }
            other => panic!("unexpected spec: {other:?}"),
        }
        assert!(set.get(ObjectKind::DockerImage, image_name).is_some());
        assert!(
            set.get(ObjectKind::FileWatch, &format!("image:{image_name}"))
                .is_some()
        );
        assert!(set.get(ObjectKind::UiResource, "fe").is_some());
        assert!(set.get(ObjectKind::UiResource, "tf").is_some());
        assert!(set.get(ObjectKind::ConfigMap, "fe-disable").is_some());
        assert!(set.get(ObjectKind::ToggleButton, "fe-disable").is_none());
    }

    #[test]
    fn test_local_manifest() {
        let be = Manifest::new("be").with_deploy_target(DeployTarget::Local(LocalTarget {
            update_cmd: Some(Command::shell("make be")),
            serve_cmd: Some(Command::shell("./be")),
            deps: vec!["./be".into()],
            ignores: vec!["*.tmp".into()],
        }));
        let set = build("tf", &LoadResult::new(vec![be]));

        let fw = set.get(ObjectKind::FileWatch, "local:be").unwrap();
        match &fw.spec {
            ObjectSpec::FileWatch(spec) => {
                assert_eq!(spec.watched_paths, vec![std::path::PathBuf::from("./be")]);
                assert_eq!(spec.ignores, vec!["*.tmp".to_string()]);
            }
            other => panic!("unexpected spec: {other:?}"),
        }
        let update = set.get(ObjectKind::Cmd, "be:update").unwrap();
        match &update.spec {
            ObjectSpec::Cmd(spec) => assert_eq!(spec.args, vec!["sh", "-c", "make be"]),
            other => panic!("unexpected spec: {other:?}"),
        }
        assert!(set.get(ObjectKind::Cmd, "be:serve").is_some());
        assert!(set.of_kind(ObjectKind::KubernetesApply).is_none());
    }

    #[test]
    fn test_compose_and_custom_build() {
        let db = Manifest::new("db")
            .with_image_target(ImageTarget::custom(
                "db-image",
                CustomBuild {
                    argv: vec!["./build.sh".into()],
                    dir: None,
                    output_tag: Some("dev".into()),
                },
            ))
            .with_deploy_target(DeployTarget::DockerCompose(DockerComposeTarget {
                project: "stack".into(),
                service: "db".into(),
                config_paths: vec!["docker-compose.yml".into()],
            }));
        let set = build("tf", &LoadResult::new(vec![db]));

        let svc = set.get(ObjectKind::DockerComposeService, "db").unwrap();
        match &svc.spec {
            ObjectSpec::DockerComposeService(spec) => {
                assert_eq!(spec.service, "db");
                assert_eq!(spec.image_maps, vec!["db-image".to_string()]);
            }
            other => panic!("unexpected spec: {other:?}"),
        }
        assert!(set.get(ObjectKind::CmdImage, "db-image").is_some());
        // Custom builds have no deps by default, so nothing to watch.
        assert!(set.get(ObjectKind::FileWatch, "image:db-image").is_none());
    }

    #[test]
    fn test_every_object_labeled_and_namespaced() {
        let fe = Manifest::new("fe")
            .with_image_target(ImageTarget::docker("fe-image", docker("./fe")))
            .with_k8s_yaml("kind: Deployment")
            .with_label("tier", "frontend");
        let result =
            LoadResult::new(vec![fe]).with_feature_flag(feature::DISABLE_RESOURCES, true);
        let owner = NamespacedName::new("team", "tf");
        let record = OwnerRecord::new()
            .with_annotation("keel.dev/source", "Keelfile")
            .with_label("tier", "any")
            .with_label("team", "web");
        let set = to_api_objects(
            &owner,
            &record,
            &result,
            EngineMode::Ci,
            &to_disable_sources(&result),
        );

        assert!(!set.is_empty());
        for obj in set.iter() {
            assert_eq!(obj.metadata.namespace, "team/tf");
            assert_eq!(obj.metadata.labels[OWNER_LABEL], "team/tf");
            assert_eq!(obj.metadata.labels["team"], "web");
            assert_eq!(obj.metadata.annotations["keel.dev/source"], "Keelfile");
            assert!(obj.resource_version().is_none());
        }

        let fe_ui = set.get(ObjectKind::UiResource, "fe").unwrap();
        assert_eq!(fe_ui.metadata.labels["tier"], "frontend");
        let owner_ui = set.get(ObjectKind::UiResource, "tf").unwrap();
        assert_eq!(owner_ui.metadata.labels["tier"], "any");
    }

    #[test]
    fn test_owner_label_cannot_be_overridden() {
        let fe = Manifest::new("fe")
            .with_k8s_yaml("a")
            .with_label(OWNER_LABEL, "someone-else");
        let record = OwnerRecord::new().with_label(OWNER_LABEL, "someone-else");
        let result = LoadResult::new(vec![fe]);
        let set = to_api_objects(
            &NamespacedName::named("tf"),
            &record,
            &result,
            EngineMode::Up,
            &to_disable_sources(&result),
        );
        assert!(set.iter().all(|o| o.metadata.labels[OWNER_LABEL] == "tf"));
    }

    #[test]
    fn test_owners_get_separate_scopes() {
        let result = LoadResult::new(vec![Manifest::new("fe").with_k8s_yaml("a")]);
        let a = build("owner-a", &result);
        let b = build("owner-b", &result);

        let fe_a = a.get(ObjectKind::KubernetesApply, "fe").unwrap();
        let fe_b = b.get(ObjectKind::KubernetesApply, "fe").unwrap();
        assert_ne!(fe_a.object_ref(), fe_b.object_ref());
        assert_eq!(fe_a.metadata.namespace, "owner-a");
        assert_eq!(fe_b.metadata.namespace, "owner-b");
        assert_eq!(
            owner_scope(&NamespacedName::new("team", "tf")),
            "team/tf"
        );
    }

    #[test]
    fn test_long_image_ref_names_stay_within_limit() {
        let long_ref = format!("registry.example.com/{}", "a".repeat(300));
        let fe = Manifest::new("fe")
            .with_image_target(ImageTarget::docker(long_ref, docker("./fe")))
            .with_k8s_yaml("a");
        let set = build("tf", &LoadResult::new(vec![fe]));

        let watches = set.of_kind(ObjectKind::FileWatch).unwrap();
        assert_eq!(watches.len(), 1);
        for name in watches.keys() {
            assert!(name.starts_with("image:"));
            assert_eq!(name.len(), keel_core::name::MAX_NAME_LEN);
        }
        for object in set.iter() {
            assert!(object.name().len() <= keel_core::name::MAX_NAME_LEN);
        }
    }

    #[test]
    fn test_toggle_buttons_follow_flag() {
        let result = LoadResult::new(vec![Manifest::new("fe").with_k8s_yaml("a")])
            .with_feature_flag(feature::DISABLE_RESOURCES, true);
        let set = build("tf", &result);

        let tb = set.get(ObjectKind::ToggleButton, "fe-disable").unwrap();
        match &tb.spec {
            ObjectSpec::ToggleButton(spec) => {
                assert_eq!(spec.location.component_id, "fe");
                assert_eq!(spec.state_source.config_map.name, "fe-disable");
                assert_eq!(spec.state_source.config_map.key, "isDisabled");
            }
            other => panic!("unexpected spec: {other:?}"),
        }
    }

    #[test]
    fn test_engine_mode_threaded() {
        let be = Manifest::new("be").with_local_resource("make", ["./be"]);
        let result = LoadResult::new(vec![be]);
        let sources = to_disable_sources(&result);
        let up = to_api_objects(
            &NamespacedName::named("tf"),
            &OwnerRecord::default(),
            &result,
            EngineMode::Up,
            &sources,
        );
        let ci = to_api_objects(
            &NamespacedName::named("tf"),
            &OwnerRecord::default(),
            &result,
            EngineMode::Ci,
            &sources,
        );

        let names = |set: &DesiredObjectSet| {
            set.iter()
                .map(|o| o.object_ref())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&up), names(&ci));

        match &ci.get(ObjectKind::Cmd, "be:update").unwrap().spec {
            ObjectSpec::Cmd(spec) => assert_eq!(spec.engine_mode, EngineMode::Ci),
            other => panic!("unexpected spec: {other:?}"),
        }
        match &ci.get(ObjectKind::UiResource, "tf").unwrap().spec {
            ObjectSpec::UiResource(spec) => assert_eq!(spec.engine_mode, Some(EngineMode::Ci)),
            other => panic!("unexpected spec: {other:?}"),
        }
    }

    #[test]
    fn test_shared_image_collapses() {
        let a = Manifest::new("a")
            .with_image_target(ImageTarget::docker("shared", docker(".")))
            .with_k8s_yaml("a");
        let b = Manifest::new("b")
            .with_image_target(ImageTarget::docker("shared", docker(".")))
            .with_k8s_yaml("b");
        let set = build("tf", &LoadResult::new(vec![a, b]));

        assert_eq!(set.of_kind(ObjectKind::ImageMap).unwrap().len(), 1);
        assert_eq!(set.of_kind(ObjectKind::DockerImage).unwrap().len(), 1);

        let im = set.get(ObjectKind::ImageMap, "shared").unwrap();
        match im.spec.disable_source() {
            Some(DisableSource::EveryConfigMap(cms)) => assert_eq!(cms.len(), 2),
            other => panic!("unexpected disable source: {other:?}"),
        }
    }

    #[test]
    fn test_empty_result_still_has_owner_summary() {
        let set = build("tf", &LoadResult::default());
        assert_eq!(set.len(), 1);
        assert_eq!(set.kinds().collect::<Vec<_>>(), vec![ObjectKind::UiResource]);
    }
}
