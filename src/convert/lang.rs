//! Pass 7: language attribute normalization.

use tracing::{debug, warn};

use crate::tables::Tables;
use crate::tree::{Document, QName};

/// Move every plain `lang` to `xml:lang`, normalize every `xml:lang`, and
/// normalize `langUsage/language/@ident`.
///
/// A `language` with no `ident` but an `id` has the `id` replaced by an
/// `ident`. Running the pass again changes nothing.
pub fn normalize_langs(doc: &mut Document, tables: &Tables) {
    for id in doc.find_all(|d, id| d.get_attr(id, "lang").is_some()) {
        if let Some(lang) = doc.remove_attr(id, None, "lang") {
            doc.set_attr(id, QName::xml("lang"), tables.normalize_lang(&lang));
        }
    }

    for id in doc.find_all(|d, id| d.xml_lang(id).is_some()) {
        if let Some(lang) = doc.xml_lang(id).map(|code| tables.normalize_lang(code).to_string()) {
            doc.set_attr(id, QName::xml("lang"), lang);
        }
    }

    let languages = doc.find_all(|d, id| d.is_tei(id, "language") && d.parent(id).is_some_and(|p| d.is_tei(p, "langUsage")));
    for id in languages {
        let ident = match doc.get_attr(id, "ident") {
            Some(ident) => Some(ident.to_string()),
            None => doc.remove_attr(id, None, "id"),
        };
        match ident {
            Some(ident) => {
                let normalized = tables.normalize_lang(&ident).to_string();
                debug!(%ident, %normalized, "language declaration");
                doc.set_attr(id, QName::plain("ident"), normalized);
            }
            None => warn!("<language> has neither @ident nor @id"),
        }
    }
}
