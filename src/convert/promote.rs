//! Pass 12: summary-child promotion.
//!
//! Inside an overview division, sections nested in a summary are pulled up
//! one level to become the summary's following siblings.

use super::is_div_of_type;
use super::rename::is_overview;
use crate::tree::{Document, NodeId};

/// For each overview's summary children, move their `section` children to
/// directly after the summary, keeping their order (and tails).
///
/// Runs on the unrelabeled `type` values, so it must come before the overview,
/// summary and section relabels.
pub fn summary_children_to_siblings(doc: &mut Document) {
    for overview in doc.find_all(is_overview) {
        let summaries: Vec<NodeId> = doc
            .children(overview)
            .filter(|&id| is_div_of_type(doc, id, "summary"))
            .collect();

        for summary in summaries {
            let sections: Vec<NodeId> = doc
                .children(summary)
                .filter(|&id| is_div_of_type(doc, id, "section"))
                .collect();

            let mut previous = summary;
            for section in sections {
                doc.insert_after(previous, section);
                previous = section;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::parse_document;

    #[test]
    fn test_sections_follow_summary_in_order() {
        let mut doc = parse_document(
            r#"<div xmlns="http://www.tei-c.org/ns/1.0" type="overv"><div type="summary" n="S"><head/><div type="section" n="1"/>t1<div type="section" n="2"/><div type="section" n="3"/></div><div type="summary" n="T"/></div>"#,
        )
        .unwrap();
        summary_children_to_siblings(&mut doc);

        let root = doc.root();
        let ns: Vec<_> = doc
            .children(root)
            .map(|c| doc.get_attr(c, "n").unwrap_or(""))
            .collect();
        assert_eq!(ns, vec!["S", "1", "2", "3", "T"]);

        let summary = doc.children(root).next().unwrap();
        let left: Vec<_> = doc.children(summary).collect();
        assert_eq!(left.len(), 1);
        assert!(doc.is_tei(left[0], "head"));

        let second = doc.children(root).nth(1).unwrap();
        assert_eq!(doc.tail(second), Some("t1"));
    }

    #[test]
    fn test_only_overview_summaries() {
        let mut doc = parse_document(
            r#"<body xmlns="http://www.tei-c.org/ns/1.0"><div type="summary"><div type="section"/></div></body>"#,
        )
        .unwrap();
        summary_children_to_siblings(&mut doc);
        let summary = doc.children(doc.root()).next().unwrap();
        assert_eq!(doc.children(summary).count(), 1);
    }
}
