//! Facet filtering over loaded records.

use std::collections::BTreeSet;

use crate::types::{FacetField, FilterSelection, Record};

/// True when `record` satisfies every non-empty constraint in `selection`.
pub fn matches(record: &Record, selection: &FilterSelection) -> bool {
    FacetField::ALL.iter().all(|field| {
        let accepted = selection.values(*field);
        accepted.is_empty() || accepted.contains(record.field(*field).trim())
    })
}

/// Records matching `selection`, in their original order.
///
/// An unrestricted selection returns every record unchanged.
pub fn apply(records: &[Record], selection: &FilterSelection) -> Vec<Record> {
    if selection.is_unrestricted() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| matches(r, selection))
        .cloned()
        .collect()
}

/// Sorted distinct non-blank values of `field`, for filter controls.
pub fn facet_options(records: &[Record], field: FacetField) -> Vec<String> {
    records
        .iter()
        .map(|r| r.field(field).trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
