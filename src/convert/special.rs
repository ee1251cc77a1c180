//! Pass 10: subsection repair for Cicero, *Pro Lege Manilia*.
//!
//! The source edition of this one work marks subsections with `pg_l`
//! milestones, some of them buried inside paragraphs. The rule is keyed on
//! the exact work identifier and does nothing for any other document.

use tracing::{debug, warn};

use super::milestones::{collect_run, wrap_run};
use super::{PAGE_LINE_UNIT, has_attr};
use crate::tree::{Document, NodeId};

/// Text group and work components of the work identifier.
const WORK_ID: [&str; 2] = ["sec00009", "sec004"];

/// Whether `urn` names *Pro Lege Manilia*.
///
/// The final `:`-separated segment of the URN must start with the
/// components `sec00009.sec004`; edition and passage suffixes are allowed.
pub fn is_pro_lege_manilia(urn: &str) -> bool {
    let work = urn.rsplit(':').next().unwrap_or(urn);
    let mut components = work.split('.');
    WORK_ID.iter().all(|expected| components.next() == Some(*expected))
}

fn is_page_line_milestone(doc: &Document, id: NodeId) -> bool {
    doc.is_tei(id, "milestone") && has_attr(doc, id, "unit", PAGE_LINE_UNIT)
}

/// Regroup each `div[@subtype='section']` into `subsection` divisions.
///
/// First every nested `pg_l` milestone is lifted until it is a direct child
/// of the section (its tail stays where it was). Then each milestone's run
/// of following siblings is wrapped in
/// `<div type="textpart" subtype="subsection" n="{n with . -> _}">` and
/// appended to the section, and the milestones are removed.
pub fn pro_lege_manilia(doc: &mut Document) {
    let sections = doc.find_all(|d, id| d.is_tei(id, "div") && has_attr(d, id, "subtype", "section"));
    for section in sections {
        lift_milestones(doc, section);
        group_subsections(doc, section);
    }
}

fn lift_milestones(doc: &mut Document, section: NodeId) {
    let nested: Vec<NodeId> = doc
        .descendants(section)
        .filter(|&id| is_page_line_milestone(doc, id) && doc.parent(id) != Some(section))
        .collect();

    // Reverse document order keeps milestones that share an ancestor in order.
    for milestone in nested.into_iter().rev() {
        doc.lift_tail(milestone);
        let mut ancestor = doc.parent(milestone);
        while let Some(current) = ancestor {
            if doc.parent(current) == Some(section) {
                debug!(n = doc.get_attr(milestone, "n").unwrap_or(""), "lifting pg_l milestone");
                doc.insert_after(current, milestone);
                break;
            }
            ancestor = doc.parent(current);
        }
    }
}

fn group_subsections(doc: &mut Document, section: NodeId) {
    let milestones: Vec<NodeId> = doc
        .children(section)
        .filter(|&id| is_page_line_milestone(doc, id))
        .collect();

    // Runs are fixed before anything moves.
    let runs: Vec<(NodeId, Vec<NodeId>)> = milestones
        .into_iter()
        .map(|m| (m, collect_run(doc, m, PAGE_LINE_UNIT)))
        .collect();

    for (milestone, run) in runs {
        let n = doc.get_attr(milestone, "n").unwrap_or_default().replace('.', "_");
        if run.is_empty() {
            warn!(%n, "pg_l milestone has no following siblings; dropping it");
            doc.lift_tail(milestone);
        } else {
            let div = wrap_run(doc, milestone, &run, "subsection", &n);
            doc.append(section, div);
        }
        doc.detach(milestone);
    }
}
