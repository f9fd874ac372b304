use std::collections::{BTreeMap, BTreeSet};

use crate::atom::event::LogEvent;
use crate::uid::HostUidResolver;

use super::{MergeError, MergeStats, UidMergeAggregator};

/// Merges a pull result that may contain several atoms.
///
/// Events are grouped by tag (ascending) and each group is merged with the
/// additive fields registered for its tag; tags without an entry merge
/// with no additive fields. The returned stats are summed over all groups.
pub fn merge_batch(
    events: Vec<LogEvent>,
    resolver: &dyn HostUidResolver,
    additive_fields: &BTreeMap<i32, BTreeSet<i32>>,
) -> Result<(Vec<LogEvent>, MergeStats), MergeError> {
    let total = events.len();
    let mut by_tag: BTreeMap<i32, Vec<LogEvent>> = BTreeMap::new();
    for event in events {
        by_tag.entry(event.tag_id()).or_default().push(event);
    }

    let none = BTreeSet::new();
    let mut out = Vec::with_capacity(total);
    let mut stats = MergeStats::default();
    for (tag, mut group) in by_tag {
        let fields = additive_fields.get(&tag).unwrap_or(&none);
        stats += UidMergeAggregator::new(resolver, fields).merge(&mut group)?;
        out.append(&mut group);
    }

    Ok((out, stats))
}
