//! Pass 9: milestones become textpart divisions.
//!
//! A milestone is a zero-width boundary; its scope is every following
//! sibling up to the next milestone of the same unit. Converting one wraps
//! that run in `<div type="textpart" subtype="{unit}" n="{n}">` at the
//! milestone's position.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use super::{PAGE_LINE_UNIT, has_attr, textpart};
use crate::tree::{Document, NodeId};

/// Following siblings of `milestone` up to (not including) the next
/// milestone with the same `unit`.
pub(crate) fn collect_run(doc: &Document, milestone: NodeId, unit: &str) -> Vec<NodeId> {
    doc.following_siblings(milestone)
        .take_while(|&sibling| !(doc.is_tei(sibling, "milestone") && has_attr(doc, sibling, "unit", unit)))
        .collect()
}

/// Build a division from `milestone` and its run.
///
/// The milestone's tail becomes the division's leading text, so no
/// character content is lost. The division is detached; callers place it.
pub(crate) fn wrap_run(doc: &mut Document, milestone: NodeId, run: &[NodeId], subtype: &str, n: &str) -> NodeId {
    let tail = doc.take_tail(milestone);
    let mut element = textpart(subtype, n);
    element.text = tail;
    let div = doc.create_element(element);
    for &node in run {
        doc.append(div, node);
    }
    div
}

/// Convert every milestone whose unit is in `units`, in document order.
///
/// Milestones without a `unit`, with the `pg_l` unit, or with a unit that
/// isn't referenceable are left alone. A milestone whose run is empty is
/// logged and left in place rather than producing an empty division.
pub fn milestones_to_textparts(doc: &mut Document, units: &BTreeSet<String>) {
    for milestone in doc.find_tei("milestone") {
        let Some(unit) = doc.get_attr(milestone, "unit").map(str::to_string) else {
            continue;
        };
        if unit == PAGE_LINE_UNIT || !units.contains(&unit) {
            continue;
        }
        let n = doc.get_attr(milestone, "n").unwrap_or_default().to_string();

        let run = collect_run(doc, milestone, &unit);
        if run.is_empty() {
            warn!(%unit, %n, "milestone has no following siblings; not converting");
            continue;
        }

        debug!(%unit, %n, len = run.len(), "wrapping milestone run");
        let div = wrap_run(doc, milestone, &run, &unit, &n);
        doc.replace(milestone, div);
    }
}
