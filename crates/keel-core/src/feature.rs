//! Feature flags recognised by the reconciler.
//!
//! Flags arrive as a plain `name -> enabled` map on the load result. Unknown
//! names are carried through untouched.

use std::collections::BTreeMap;

/// Enables the user-facing toggle buttons for disabling resources.
pub const DISABLE_RESOURCES: &str = "disable_resources";

/// Flags known to this build, with their default values.
pub const KNOWN_FLAGS: &[(&str, bool)] = &[(DISABLE_RESOURCES, false)];

/// Returns whether `name` is enabled in `flags`, falling back to its default.
pub fn is_enabled(flags: &BTreeMap<String, bool>, name: &str) -> bool {
    flags.get(name).copied().unwrap_or_else(|| default_for(name))
}

fn default_for(name: &str) -> bool {
    KNOWN_FLAGS
        .iter()
        .find(|(flag, _)| *flag == name)
        .map(|(_, default)| *default)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_overrides() {
        let mut flags = BTreeMap::new();
        assert!(!is_enabled(&flags, DISABLE_RESOURCES));
        assert!(!is_enabled(&flags, "unknown"));

        flags.insert(DISABLE_RESOURCES.to_string(), true);
        assert!(is_enabled(&flags, DISABLE_RESOURCES));
    }
}
