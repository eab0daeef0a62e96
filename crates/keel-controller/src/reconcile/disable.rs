//! Per-manifest disable toggles.

use std::collections::BTreeMap;

use keel_core::{LoadResult, ManifestName};
use keel_storage::{ConfigMapDisableSource, DISABLE_KEY, DisableSource};

/// The toggle governing each manifest of a load result.
pub type DisableSourceMap = BTreeMap<ManifestName, DisableSource>;

/// Name of the ConfigMap (and toggle button) backing a manifest's toggle.
pub fn disable_object_name(manifest: &ManifestName) -> String {
    format!("{manifest}-disable")
}

/// Derives one `ConfigMap` disable source per manifest.
///
/// Sources are derived whether or not the `disable_resources` flag is on;
/// the flag only controls whether toggle buttons are shown for them.
pub fn to_disable_sources(result: &LoadResult) -> DisableSourceMap {
    result
        .manifests
        .iter()
        .map(|m| {
            let source = DisableSource::config_map(disable_object_name(&m.name), DISABLE_KEY);
            (m.name.clone(), source)
        })
        .collect()
}

/// Combines the sources of every manifest sharing one target.
///
/// A single source is returned as-is. Several collapse into
/// `EveryConfigMap`, so the shared target is disabled only once every
/// manifest using it is.
pub(crate) fn combine_sources<'a, I>(sources: I) -> Option<DisableSource>
where
    I: IntoIterator<Item = &'a DisableSource>,
{
    let mut config_maps: Vec<ConfigMapDisableSource> = sources
        .into_iter()
        .flat_map(|s| s.config_maps().iter().cloned())
        .collect();
    config_maps.sort();
    config_maps.dedup();

    match config_maps.len() {
        0 => None,
        1 => config_maps.pop().map(DisableSource::ConfigMap),
        _ => Some(DisableSource::EveryConfigMap(config_maps)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::Manifest;

    #[test]
    fn test_one_source_per_manifest() {
        let result = LoadResult::new(vec![Manifest::new("fe"), Manifest::new("be")]);
        let sources = to_disable_sources(&result);

        assert_eq!(sources.len(), 2);
        assert_eq!(
            sources[&ManifestName::from("fe")],
            DisableSource::config_map("fe-disable", "isDisabled")
        );
    }

    #[test]
    fn test_sources_ignore_feature_flag() {
        let on = LoadResult::new(vec![Manifest::new("fe")]).with_feature_flag("disable_resources", true);
        let off = LoadResult::new(vec![Manifest::new("fe")]);
        assert_eq!(to_disable_sources(&on), to_disable_sources(&off));
    }

    #[test]
    fn test_combine_sources() {
        let fe = DisableSource::config_map("fe-disable", DISABLE_KEY);
        let be = DisableSource::config_map("be-disable", DISABLE_KEY);

        assert_eq!(combine_sources([&fe]), Some(fe.clone()));
        assert_eq!(combine_sources([&fe, &fe]), Some(fe.clone()));
        assert_eq!(combine_sources(std::iter::empty()), None);

        let combined = combine_sources([&fe, &be]).unwrap();
        let names: Vec<_> = combined
            .config_maps()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert!(matches!(combined, DisableSource::EveryConfigMap(_)));
        assert_eq!(names, vec!["be-disable", "fe-disable"]);
    }
}
