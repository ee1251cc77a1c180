//! Entity preprocessing.
//!
//! Legacy TEI sources use custom named entities (`&amacr;`, `&Perseus.publish;`, ...)
//! that are not declared anywhere, so the raw file is not well-formed XML. This
//! pass expands them by plain substring substitution before the document is parsed.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use memchr::memmem;
use tracing::{debug, info};

use crate::error::Result;
use crate::tables::Tables;
use crate::util::{declare_utf8, decode_document};

/// Replace every entity token in `text` with its expansion.
///
/// Each table entry is applied once over the whole text. No entry's expansion
/// contains another entry's token, so the order of entries does not matter.
/// Tokens need not look like `&name;`; table overlays may add any literal.
/// Returns the input unallocated when no token occurs in it.
pub fn replace_entities<'a>(text: &'a str, tables: &Tables) -> Cow<'a, str> {
    let mut out = Cow::Borrowed(text);
    for (token, replacement) in tables.entities() {
        if memmem::find(out.as_bytes(), token.as_bytes()).is_some() {
            debug!(token, "replacing entity");
            out = Cow::Owned(out.replace(token, replacement));
        }
    }
    out
}

/// Expand entities in the file at `path`, overwrite it, and return the new text.
///
/// The overwrite is committed before any parsing happens; a later parse failure
/// leaves the file in its preprocessed state.
pub fn preconvert<P: AsRef<Path>>(path: P, tables: &Tables) -> Result<String> {
    let path = path.as_ref();
    info!(path = %path.display(), "expanding character entities");

    let raw = fs::read(path)?;
    let decoded = decode_document(&raw);
    let decoded = declare_utf8(&decoded);
    let expanded = replace_entities(&decoded, tables).into_owned();

    fs::write(path, expanded.as_bytes())?;
    Ok(expanded)
}
