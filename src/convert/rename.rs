//! Passes 6, 11 and 13: tag and attribute renames.
//!
//! Each rename is independent of the others. Renamed elements stay in the
//! TEI namespace.

use super::is_div_of_type;
use crate::tree::{Document, NodeId, QName};

/// Type values that mark an overview division.
const OVERVIEW_TYPES: &[&str] = &["overv", "overview"];

/// `argument` -> `<div type="textpart" subtype="chapter" n="Argument">`.
pub fn convert_arguments(doc: &mut Document) {
    for argument in doc.find_tei("argument") {
        doc.rename(argument, "div");
        doc.set_attr(argument, QName::plain("type"), "textpart");
        doc.set_attr(argument, QName::plain("subtype"), "chapter");
        doc.set_attr(argument, QName::plain("n"), "Argument");
    }
}

/// `byline` -> `docAuthor`.
pub fn convert_bylines(doc: &mut Document) {
    for byline in doc.find_tei("byline") {
        doc.rename(byline, "docAuthor");
    }
}

/// Zero-pad a year: width 5 for negative numbers (sign included), else 4.
///
/// Anything that isn't an integer is returned unchanged.
pub fn fix_date(value: &str) -> String {
    let Ok(year) = value.parse::<i128>() else {
        return value.to_string();
    };
    let width = if year < 0 { 5 } else { 4 };
    zero_fill(value, width)
}

/// Left-pad with zeros after any leading sign, up to `width` characters.
fn zero_fill(value: &str, width: usize) -> String {
    let len = value.chars().count();
    if len >= width {
        return value.to_string();
    }
    let zeros = "0".repeat(width - len);
    match value.strip_prefix(['-', '+']) {
        Some(digits) => format!("{}{zeros}{digits}", &value[..1]),
        None => format!("{zeros}{value}"),
    }
}

/// Normalize `date/@when` and rename `dateRange` to `date`.
///
/// On `date`, an explicit `value` wins over `when`, is removed, and its
/// padded form is written to `when`. On `dateRange`, `from` and `to` are
/// padded independently.
pub fn convert_dates(doc: &mut Document) {
    for date in doc.find_tei("date") {
        let when = doc
            .get_attr(date, "value")
            .or_else(|| doc.get_attr(date, "when"))
            .map(fix_date);
        let Some(when) = when else {
            continue;
        };
        doc.remove_attr(date, None, "value");
        doc.set_attr(date, QName::plain("when"), when);
    }

    for range in doc.find_tei("dateRange") {
        doc.rename(range, "date");
        for bound in ["from", "to"] {
            if let Some(fixed) = doc.get_attr(range, bound).map(fix_date) {
                doc.set_attr(range, QName::plain(bound), fixed);
            }
        }
    }
}

fn relabel(doc: &mut Document, types: &[&str], new_type: &str, subtype: &str) {
    let divs = doc.find_all(|d, id| types.iter().any(|t| is_div_of_type(d, id, t)));
    for div in divs {
        doc.set_attr(div, QName::plain("type"), new_type);
        doc.set_attr(div, QName::plain("subtype"), subtype);
    }
}

/// `div[@type='speech']` -> `type="commentary" subtype="speech"`.
pub fn convert_speeches(doc: &mut Document) {
    relabel(doc, &["speech"], "commentary", "speech");
}

/// `div[@type='overv']` -> `type="textpart" subtype="chapter"`.
pub fn convert_overviews(doc: &mut Document) {
    relabel(doc, OVERVIEW_TYPES, "textpart", "chapter");
}

/// `div[@type='summary']` -> `type="textpart" subtype="section"`.
pub fn convert_summaries(doc: &mut Document) {
    relabel(doc, &["summary"], "textpart", "section");
}

/// `div[@type='section']` -> `type="textpart" subtype="section"`.
pub fn convert_sections(doc: &mut Document) {
    relabel(doc, &["section"], "textpart", "section");
}

/// Whether `id` is an overview division (before relabeling).
pub(crate) fn is_overview(doc: &Document, id: NodeId) -> bool {
    OVERVIEW_TYPES.iter().any(|t| is_div_of_type(doc, id, t))
}

/// Drop `targOrder` from every element.
pub fn remove_targ_order(doc: &mut Document) {
    for id in doc.find_all(|d, id| d.get_attr(id, "targOrder").is_some()) {
        doc.remove_attr(id, None, "targOrder");
    }
}
