//! Passes 3 and 4: lemmas and gloss notes become critical apparatus.

use tracing::debug;

use super::{has_attr, tei_element};
use crate::tables::Tables;
use crate::tree::{Document, QName, XML_NS};

/// Replace every `lemma` with `<app><lem xml:lang="..">text</lem></app>`.
///
/// The reading keeps the lemma's text and its language (from `xml:lang`, or
/// a plain `lang`), normalized through the language table. The lemma itself
/// is discarded; the new `app` takes its place and tail.
pub fn lemmas_to_app(doc: &mut Document, tables: &Tables) {
    for lemma in doc.find_tei("lemma") {
        let lang = doc
            .attr_ns(lemma, XML_NS, "lang")
            .or_else(|| doc.get_attr(lemma, "lang"))
            .map(|code| tables.normalize_lang(code).to_string());
        let text = doc.text(lemma).unwrap_or_default().to_string();

        let mut lem = tei_element("lem").with_text(text);
        if let Some(lang) = lang {
            lem = lem.with_attr(QName::xml("lang"), lang);
        }

        let app = doc.create_element(tei_element("app"));
        let lem = doc.create_element(lem);
        doc.append(app, lem);
        doc.replace(lemma, app);
    }
}

/// Replace every `note[@type='gloss']` with an `app` that adopts its content.
pub fn gloss_notes_to_app(doc: &mut Document) {
    let notes = doc.find_all(|d, id| d.is_tei(id, "note") && has_attr(d, id, "type", "gloss"));
    for note in notes {
        debug!("converting gloss note");
        let text = doc.element_mut(note).and_then(|el| el.text.take());
        let mut app = tei_element("app");
        app.text = text;
        let app = doc.create_element(app);

        let children: Vec<_> = doc.children(note).collect();
        for child in children {
            doc.append(app, child);
        }
        doc.replace(note, app);
    }
}
