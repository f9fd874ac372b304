//! Folds events recorded under isolated uids into their host uid.
//!
//! Pulled atoms may carry sandboxed uids that belong to a host app. After
//! rewriting those uids, records that became identical except for additive
//! counters are collapsed into one record carrying the summed counters.

pub mod batch;

use std::cmp::Ordering;
use std::collections::BTreeSet;

use thiserror::Error;

use crate::atom::event::LogEvent;
use crate::atom::field::{is_attribution_uid_field, Value, ATTRIBUTION_FIELD};
use crate::diag::{Diagnostics, TracingDiagnostics};
use crate::uid::HostUidResolver;

pub use batch::merge_batch;

static TRACING_DIAGNOSTICS: TracingDiagnostics = TracingDiagnostics;

/// Errors that abort a merge.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("event {index} has tag {found}, expected {expected}")]
    TagMismatch {
        expected: i32,
        found: i32,
        index: usize,
    },
}

/// Summary of one merge call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub input_events: usize,
    pub output_events: usize,
    /// Number of uid values that resolved to a different host uid.
    pub rewritten_uids: usize,
    /// Events that had neither a uid field nor an attribution chain.
    pub malformed_events: usize,
}

impl std::ops::AddAssign for MergeStats {
    fn add_assign(&mut self, other: Self) {
        self.input_events += other.input_events;
        self.output_events += other.output_events;
        self.rewritten_uids += other.rewritten_uids;
        self.malformed_events += other.malformed_events;
    }
}

/// Rewrites isolated uids to host uids and merges the resulting duplicates.
///
/// Holds only borrowed collaborators; nothing is retained between calls.
pub struct UidMergeAggregator<'a> {
    resolver: &'a dyn HostUidResolver,
    additive_fields: &'a BTreeSet<i32>,
    diagnostics: &'a dyn Diagnostics,
}

impl<'a> UidMergeAggregator<'a> {
    /// Creates an aggregator that reports through `tracing`.
    ///
    /// `additive_fields` holds depth-0 positions whose values are summed
    /// when records are merged.
    pub fn new(resolver: &'a dyn HostUidResolver, additive_fields: &'a BTreeSet<i32>) -> Self {
        Self {
            resolver,
            additive_fields,
            diagnostics: &TRACING_DIAGNOSTICS,
        }
    }

    /// Replaces the diagnostics sink.
    pub fn with_diagnostics(mut self, diagnostics: &'a dyn Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Merges `events` in place.
    ///
    /// All events must share the first event's tag. On a tag mismatch the
    /// call stops early and `events` is left partially rewritten and
    /// unsorted; callers should discard it.
    pub fn merge(&self, events: &mut Vec<LogEvent>) -> Result<MergeStats, MergeError> {
        let mut stats = MergeStats {
            input_events: events.len(),
            ..MergeStats::default()
        };

        let Some(first) = events.first() else {
            return Ok(stats);
        };
        let tag_id = first.tag_id();

        if first.attribution_chain_index().is_none() && first.uid_field_index().is_none() {
            self.diagnostics
                .debug(&format!("atom {tag_id} has no uid field, nothing to merge"));
            stats.output_events = events.len();
            return Ok(stats);
        }

        self.rewrite_uids(events, tag_id, &mut stats)?;

        events.sort_by(canonical_order);

        let mut merged = Vec::with_capacity(events.len());
        let mut iter = std::mem::take(events).into_iter().peekable();
        while let Some(current) = iter.next() {
            // Runs accumulate forward: only the last record of a run is kept.
            if let Some(next) = iter.peek_mut() {
                if self.can_merge(&current, next) {
                    self.accumulate_into(&current, next);
                    continue;
                }
            }
            merged.push(current);
        }
        *events = merged;

        stats.output_events = events.len();
        self.diagnostics.debug(&format!(
            "atom {tag_id}: merged isolated uids, input={} output={} rewritten={} malformed={}",
            stats.input_events, stats.output_events, stats.rewritten_uids, stats.malformed_events,
        ));

        Ok(stats)
    }

    fn rewrite_uids(
        &self,
        events: &mut [LogEvent],
        tag_id: i32,
        stats: &mut MergeStats,
    ) -> Result<(), MergeError> {
        for (index, event) in events.iter_mut().enumerate() {
            if event.tag_id() != tag_id {
                let err = MergeError::TagMismatch {
                    expected: tag_id,
                    found: event.tag_id(),
                    index,
                };
                self.diagnostics.error(&err.to_string());
                return Err(err);
            }

            if let Some(start) = event.attribution_chain_index() {
                for value in event.values_mut().iter_mut().skip(start) {
                    if value.field.pos_at_depth(0) > ATTRIBUTION_FIELD {
                        break;
                    }
                    if !is_attribution_uid_field(value) {
                        continue;
                    }
                    if let Some(uid) = value.value.as_int() {
                        stats.rewritten_uids += self.rewrite(&mut value.value, uid);
                    }
                }
            } else if let Some(uid_index) = event.uid_field_index() {
                let value = &mut event.values_mut()[uid_index].value;
                if let Some(uid) = value.as_int() {
                    stats.rewritten_uids += self.rewrite(value, uid);
                }
            } else {
                stats.malformed_events += 1;
                self.diagnostics.error(&format!(
                    "malformed log: attribution chain or uid field index missing: {event}"
                ));
            }
        }

        Ok(())
    }

    /// Replaces `value` with the host uid of `uid`. Returns 1 if it changed.
    fn rewrite(&self, value: &mut Value, uid: i32) -> usize {
        let host = self.resolver.host_uid_or_self(uid);
        *value = Value::Int(host);
        usize::from(host != uid)
    }

    /// Two records merge when they have the same shape and differ only in
    /// additive fields.
    fn can_merge(&self, lhs: &LogEvent, rhs: &LogEvent) -> bool {
        if lhs.size() != rhs.size() {
            return false;
        }
        lhs.values()
            .iter()
            .zip(rhs.values())
            .filter(|(l, r)| l != r)
            .all(|(l, _)| self.additive_fields.contains(&l.field.pos_at_depth(0)))
    }

    /// Adds every additive field of `from` into the matching field of `into`.
    fn accumulate_into(&self, from: &LogEvent, into: &mut LogEvent) {
        for (src, dst) in from.values().iter().zip(into.values_mut().iter_mut()) {
            if self.additive_fields.contains(&src.field.pos_at_depth(0)) {
                dst.value.accumulate(&src.value);
            }
        }
    }
}

/// Orders events by field count, then field values lexicographically.
fn canonical_order(lhs: &LogEvent, rhs: &LogEvent) -> Ordering {
    lhs.size()
        .cmp(&rhs.size())
        .then_with(|| lhs.values().cmp(rhs.values()))
}

/// Merges `events` with `resolver`, logging through `tracing`.
pub fn map_and_merge_isolated_uids_to_host_uid(
    events: &mut Vec<LogEvent>,
    resolver: &dyn HostUidResolver,
    additive_fields: &BTreeSet<i32>,
) -> Result<MergeStats, MergeError> {
    UidMergeAggregator::new(resolver, additive_fields).merge(events)
}
