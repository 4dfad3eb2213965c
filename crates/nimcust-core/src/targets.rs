//! Target specification expansion

use std::collections::BTreeSet;

use nimcust_api::DiagnosticSink;
use nimcust_inventory::InventorySnapshot;
use regex::Regex;
use tracing::debug;

use crate::error::CoreError;

/// Compile one comma-separated segment into an anchored matcher
///
/// `*` matches any run of characters (non-greedy); the rest of the segment
/// is a regular expression.
fn pattern_regex(pattern: &str) -> Result<Regex, CoreError> {
    let body = pattern.replace('*', ".*?");

    Regex::new(&format!("^(?:{body})$")).map_err(|e| CoreError::InvalidTargetPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Expand a target specification against the inventory
///
/// An unset or blank spec selects every known client. The result is sorted,
/// deduplicated and never empty.
///
/// # Errors
/// Returns `CoreError::NoTargetsResolved` when nothing matches and
/// `CoreError::InvalidTargetPattern` if a segment is not a valid regex.
pub fn resolve(
    spec: Option<&str>,
    inventory: &InventorySnapshot,
    sink: &dyn DiagnosticSink,
) -> Result<Vec<String>, CoreError> {
    let spec = spec.map(str::trim).unwrap_or_default();

    let selected: Vec<String> = if spec.is_empty() {
        sink.warn("No targets specified, consider all nim standalone machines as targets");
        inventory.machine_names().map(str::to_string).collect()
    } else {
        let mut matched = BTreeSet::new();
        for pattern in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let re = pattern_regex(pattern)?;
            matched.extend(
                inventory
                    .machine_names()
                    .filter(|m| re.is_match(m))
                    .map(str::to_string),
            );
        }
        matched.into_iter().collect()
    };

    debug!(targets = ?selected, "target list expanded");
    sink.debug(&format!("List of targets expanded to {selected:?}"));

    if selected.is_empty() {
        return Err(CoreError::NoTargetsResolved {
            spec: spec.to_string(),
        });
    }

    Ok(selected)
}

#[cfg(test)]
mod tests {
    use nimcust_api::{EventLevel, MemorySink, NullSink};

    use super::*;

    fn inventory(machines: &[&str]) -> InventorySnapshot {
        machines
            .iter()
            .fold(InventorySnapshot::new(), |inv, m| {
                inv.with_client(*m, "2023-01-01-0001")
            })
    }

    #[test]
    fn test_empty_spec_selects_all_sorted_with_warning() {
        let inv = inventory(&["hostC", "hostA", "hostB"]);
        let sink = MemorySink::new();

        let targets = resolve(None, &inv, &sink).unwrap();
        assert_eq!(targets, vec!["hostA", "hostB", "hostC"]);
        assert_eq!(sink.messages(EventLevel::Warn).len(), 1);

        let targets = resolve(Some(""), &inv, &NullSink).unwrap();
        assert_eq!(targets, vec!["hostA", "hostB", "hostC"]);
    }

    #[test]
    fn test_explicit_names() {
        let inv = inventory(&["hostA", "hostB", "hostC"]);
        let sink = MemorySink::new();

        let targets = resolve(Some("hostA,hostB"), &inv, &sink).unwrap();
        assert_eq!(targets, vec!["hostA", "hostB"]);
        assert!(sink.messages(EventLevel::Warn).is_empty());
    }

    #[test]
    fn test_wildcard() {
        let inv = inventory(&["host1", "host2", "other"]);

        let targets = resolve(Some("host*"), &inv, &NullSink).unwrap();
        assert_eq!(targets, vec!["host1", "host2"]);
    }

    #[test]
    fn test_wildcard_in_the_middle_is_anchored() {
        let inv = inventory(&["quimby01", "quimby01-old", "xquimby01"]);

        let targets = resolve(Some("q*01"), &inv, &NullSink).unwrap();
        assert_eq!(targets, vec!["quimby01"]);
    }

    #[test]
    fn test_overlapping_patterns_are_deduplicated() {
        let inv = inventory(&["host1", "host2", "other"]);

        let targets = resolve(Some("host2,host*, host1 ,,"), &inv, &NullSink).unwrap();
        assert_eq!(targets, vec!["host1", "host2"]);
    }

    #[test]
    fn test_character_class_and_alternation() {
        let inv = inventory(&["host1", "host2", "host3"]);

        let targets = resolve(Some("host[12]"), &inv, &NullSink).unwrap();
        assert_eq!(targets, vec!["host1", "host2"]);

        let targets = resolve(Some("host(1|3)"), &inv, &NullSink).unwrap();
        assert_eq!(targets, vec!["host1", "host3"]);
    }

    #[test]
    fn test_alternation_stays_anchored() {
        let inv = inventory(&["host1", "xhost1", "host10"]);

        let targets = resolve(Some("host1|xhost1"), &inv, &NullSink).unwrap();
        assert_eq!(targets, vec!["host1", "xhost1"]);
    }

    #[test]
    fn test_invalid_pattern() {
        let inv = inventory(&["host1"]);

        let err = resolve(Some("host1,host["), &inv, &NullSink).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidTargetPattern { ref pattern, .. } if pattern == "host["
        ));
        assert_eq!(err.step(), "target resolution");
    }

    #[test]
    fn test_no_match() {
        let inv = inventory(&["host1"]);

        let err = resolve(Some("nomatch*"), &inv, &NullSink).unwrap_err();
        assert!(matches!(err, CoreError::NoTargetsResolved { ref spec } if spec == "nomatch*"));
    }

    #[test]
    fn test_empty_inventory() {
        let err = resolve(None, &InventorySnapshot::new(), &NullSink).unwrap_err();
        assert!(matches!(err, CoreError::NoTargetsResolved { .. }));
    }
}
