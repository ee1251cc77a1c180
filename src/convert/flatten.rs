//! Pass 5: collapse `pg_l` wrappers.

use super::{PAGE_LINE_UNIT, has_attr};
use crate::tree::{Document, TEI_NS};

/// Unwrap every TEI element with `subtype="pg_l"`, splicing its children
/// (and its text) into the parent at the wrapper's position.
pub fn collapse_page_line_wrappers(doc: &mut Document) {
    let wrappers = doc.find_all(|d, id| {
        d.name(id).is_some_and(|name| name.ns.as_deref() == Some(TEI_NS))
            && has_attr(d, id, "subtype", PAGE_LINE_UNIT)
    });
    for wrapper in wrappers {
        doc.unwrap(wrapper);
    }
}
