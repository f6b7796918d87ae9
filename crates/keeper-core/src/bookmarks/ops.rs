//! Pure list transforms behind add and delete.
//!
//! Kept free of I/O so the store's read-modify-write loop can re-run them
//! against a freshly loaded list after a conflicting write.

use std::collections::HashSet;

/// Result of applying a batch to a bookmark list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListChange {
    /// The list to persist.
    pub list: Vec<String>,
    /// Entries appended or removed.
    pub applied: Vec<String>,
    /// Entries requested but not applied.
    pub skipped: Vec<String>,
}

/// Append the entries of `items` that are not yet in `current`.
///
/// Membership is checked against the current list plus everything already
/// accepted from this batch, so a batch never introduces duplicates.
/// Relative order of both `current` and `items` is preserved.
pub fn merge_additions(current: &[String], items: &[String]) -> ListChange {
    let mut seen: HashSet<&str> = current.iter().map(String::as_str).collect();
    let mut applied = Vec::new();
    let mut skipped = Vec::new();

    for item in items {
        if seen.insert(item.as_str()) {
            applied.push(item.clone());
        } else {
            tracing::warn!(bookmark = %item, "bookmark was not added as it already exists");
            skipped.push(item.clone());
        }
    }

    let mut list = Vec::with_capacity(current.len() + applied.len());
    list.extend_from_slice(current);
    list.extend(applied.iter().cloned());

    ListChange {
        list,
        applied,
        skipped,
    }
}

/// Drop every entry of `current` whose value appears in `items`.
///
/// Entries of `items` that are not in `current` are reported as skipped
/// (once each) and otherwise ignored.
pub fn remove_entries(current: &[String], items: &[String]) -> ListChange {
    let doomed: HashSet<&str> = items.iter().map(String::as_str).collect();
    let (applied, list): (Vec<String>, Vec<String>) = current
        .iter()
        .cloned()
        .partition(|entry| doomed.contains(entry.as_str()));

    let present: HashSet<&str> = current.iter().map(String::as_str).collect();
    let mut reported = HashSet::new();
    let skipped = items
        .iter()
        .filter(|item| !present.contains(item.as_str()) && reported.insert(item.as_str()))
        .cloned()
        .collect();

    ListChange {
        list,
        applied,
        skipped,
    }
}
