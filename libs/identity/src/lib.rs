//! # flotilla-identity
//!
//! Stable instance naming for flotilla fleets.
//!
//! ## Design Principles
//!
//! - An instance name is a pure function of its fleet ordinal: any caller
//!   recomputes the mapping from the ordinal alone, no shared counter.
//! - The mapping is injective, so two ordinals can never collide on a name.
//! - Derived resource names embed the application name, the fleet name, and
//!   the instance name, making them unique across fleets in a namespace.
//!
//! ## Naming Format
//!
//! Instance names use bijective base-26 over lowercase letters, the same
//! scheme spreadsheets use for column headers:
//!
//! - `0 → "a"`, `25 → "z"`, `26 → "aa"`, `51 → "az"`, `52 → "ba"`
//! - `701 → "zz"`, `702 → "aaa"`
//!
//! Derived resource names are `{app}-{fleet}-{instance}`, e.g.
//! `flotilla-gateway-shared-a`.

use std::collections::BTreeMap;

/// Label key for the owning application.
pub const APP_LABEL: &str = "app";

/// Label key for the cluster namespace.
pub const CLUSTER_LABEL: &str = "cluster";

/// Label key for the fleet (parent resource) name.
pub const FLEET_LABEL: &str = "fleet";

/// Label key for the per-instance name.
pub const INSTANCE_LABEL: &str = "instance";

/// Returns the stable instance name for a fleet ordinal.
///
/// Bijective base-26: there is no zero digit, so every ordinal maps to a
/// unique letter sequence and every letter sequence maps back to exactly
/// one ordinal. The name assigned to an ordinal never changes between
/// reconciliation passes.
#[must_use]
pub fn instance_name(ordinal: u32) -> String {
    // Shift to 1-based: bijective numeration has digits 1..=26 ("a".."z").
    let mut n = u64::from(ordinal) + 1;
    let mut name = String::new();
    while n > 0 {
        n -= 1;
        name.push(char::from(b'a' + (n % 26) as u8));
        n /= 26;
    }
    name.chars().rev().collect()
}

/// Returns the derived resource name for one instance of a fleet.
///
/// All substrate resources belonging to the instance (config artifact,
/// workload, endpoint) share this name.
#[must_use]
pub fn resource_name(app: &str, fleet: &str, instance: &str) -> String {
    format!("{}-{}-{}", app, fleet, instance)
}

/// Returns the label set attached to every resource of one instance.
///
/// The selector of an instance's network endpoint is this same map, so the
/// labels must be stable across reconciliation passes.
#[must_use]
pub fn instance_labels(
    app: &str,
    cluster: &str,
    fleet: &str,
    instance: &str,
) -> BTreeMap<String, String> {
    BTreeMap::from([
        (APP_LABEL.to_string(), app.to_string()),
        (CLUSTER_LABEL.to_string(), cluster.to_string()),
        (FLEET_LABEL.to_string(), fleet.to_string()),
        (INSTANCE_LABEL.to_string(), instance.to_string()),
    ])
}

/// Sanitizes a host path into a valid volume name.
///
/// `/mnt/data` becomes `mnt-data`. Characters outside `[a-z0-9-]` are
/// replaced with `-` so the result is usable as a substrate object name.
#[must_use]
pub fn volume_name_for_path(path: &str) -> String {
    let mut name = String::with_capacity(path.len());
    for c in path.trim_matches('/').chars() {
        match c {
            'a'..='z' | '0'..='9' | '-' => name.push(c),
            'A'..='Z' => name.push(c.to_ascii_lowercase()),
            _ => name.push('-'),
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_letter_names() {
        assert_eq!(instance_name(0), "a");
        assert_eq!(instance_name(1), "b");
        assert_eq!(instance_name(25), "z");
    }

    #[test]
    fn two_letter_names() {
        assert_eq!(instance_name(26), "aa");
        assert_eq!(instance_name(27), "ab");
        assert_eq!(instance_name(51), "az");
        assert_eq!(instance_name(52), "ba");
        assert_eq!(instance_name(701), "zz");
    }

    #[test]
    fn three_letter_names() {
        assert_eq!(instance_name(702), "aaa");
        assert_eq!(instance_name(703), "aab");
    }

    #[test]
    fn names_are_injective_in_tested_range() {
        let mut seen = std::collections::BTreeSet::new();
        for ordinal in 0..1000 {
            assert!(
                seen.insert(instance_name(ordinal)),
                "ordinal {} collided",
                ordinal
            );
        }
    }

    #[test]
    fn resource_name_embeds_all_parts() {
        assert_eq!(
            resource_name("flotilla-gateway", "shared", "a"),
            "flotilla-gateway-shared-a"
        );
    }

    #[test]
    fn labels_carry_instance_identity() {
        let labels = instance_labels("flotilla-gateway", "tenant-a", "shared", "b");
        assert_eq!(labels[APP_LABEL], "flotilla-gateway");
        assert_eq!(labels[CLUSTER_LABEL], "tenant-a");
        assert_eq!(labels[FLEET_LABEL], "shared");
        assert_eq!(labels[INSTANCE_LABEL], "b");
    }

    #[test]
    fn volume_names_strip_path_separators() {
        assert_eq!(volume_name_for_path("/mnt/data"), "mnt-data");
        assert_eq!(volume_name_for_path("/var/lib/flotilla"), "var-lib-flotilla");
        assert_eq!(volume_name_for_path("/mnt/Disk_1/"), "mnt-disk-1");
    }

    proptest! {
        #[test]
        fn distinct_ordinals_never_collide(o1 in 0u32..1000, o2 in 0u32..1000) {
            prop_assume!(o1 != o2);
            prop_assert_ne!(instance_name(o1), instance_name(o2));
        }

        #[test]
        fn names_are_lowercase_ascii(ordinal in 0u32..100_000) {
            let name = instance_name(ordinal);
            prop_assert!(!name.is_empty());
            prop_assert!(name.bytes().all(|b| b.is_ascii_lowercase()));
        }
    }
}
