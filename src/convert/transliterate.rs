//! Pass 8: Betacode -> Unicode inside Greek-scoped elements.
//!
//! Activation is keyed on the normalized `xml:lang`, so this must run after
//! language normalization. Only text inside a Greek element is touched; the
//! Greek element's own tail belongs to its parent and is left alone.
//!
//! Language boundaries are checked one level up only: a descendant is treated
//! as foreign when it, or its immediate parent, declares a non-Greek
//! `xml:lang`. A foreign quotation nested deeper than that falls through to
//! forward transliteration.

use std::collections::HashSet;

use tracing::debug;

use super::GREEK;
use crate::betacode::{beta_to_uni, uni_to_beta};
use crate::tree::{Document, NodeId};

type Transliterate = fn(&str) -> String;

/// A declared language other than Greek. Undeclared inherits the Greek scope.
fn is_foreign(lang: Option<&str>) -> bool {
    lang.is_some_and(|lang| lang != GREEK)
}

/// Transliterate every `*[@xml:lang='grc']` below the root.
pub fn betacode_to_unicode(doc: &mut Document) {
    let root = doc.root();
    let greek = doc.find_all(|d, id| id != root && d.xml_lang(id) == Some(GREEK));

    let mut texts_done: HashSet<NodeId> = HashSet::new();
    let mut tails_done: HashSet<NodeId> = HashSet::new();

    for el in greek {
        debug!(?el, "transliterating Greek element");
        if texts_done.insert(el) {
            convert_text(doc, el, beta_to_uni);
        }

        let descendants: Vec<NodeId> = doc.descendants(el).collect();
        for node in descendants {
            let (text_direction, tail_direction) = directions(doc, node);

            if let Some(direction) = text_direction
                && texts_done.insert(node)
            {
                convert_text(doc, node, direction);
            }

            if let Some(direction) = tail_direction
                && doc.tail(node).is_some()
                && tails_done.insert(node)
            {
                convert_tail(doc, node, direction);
            }
        }
    }

    for gap in doc.find_tei("gap") {
        let parent_is_greek = doc
            .parent(gap)
            .is_some_and(|p| doc.xml_lang(p) == Some(GREEK));
        if parent_is_greek && doc.tail(gap).is_some() && tails_done.insert(gap) {
            debug!("transliterating tail of <gap>");
            convert_tail(doc, gap, beta_to_uni);
        }
    }
}

/// Directions for a descendant's own text and for its tail.
///
/// Nested Greek elements get no text direction here; they convert their own
/// text when their turn comes.
fn directions(doc: &Document, node: NodeId) -> (Option<Transliterate>, Option<Transliterate>) {
    let own_lang = doc.xml_lang(node);
    let parent_lang = doc.parent(node).and_then(|p| doc.xml_lang(p));

    let text = if doc.element(node).is_none() || own_lang == Some(GREEK) {
        None
    } else if is_foreign(own_lang) || is_foreign(parent_lang) {
        Some(uni_to_beta as Transliterate)
    } else {
        Some(beta_to_uni as Transliterate)
    };

    let tail = match parent_lang {
        Some(GREEK) => Some(beta_to_uni as Transliterate),
        lang if is_foreign(lang) => Some(uni_to_beta as Transliterate),
        _ => None,
    };

    (text, tail)
}

fn convert_text(doc: &mut Document, id: NodeId, direction: Transliterate) {
    if let Some(text) = doc.text(id).map(direction) {
        doc.set_text(id, Some(text));
    }
}

fn convert_tail(doc: &mut Document, id: NodeId, direction: Transliterate) {
    if let Some(tail) = doc.tail(id).map(direction) {
        doc.set_tail(id, Some(tail));
    }
}
