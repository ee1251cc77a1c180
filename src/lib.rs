//! # epidoc-convert
//!
//! Normalizes legacy TEI/EpiDoc XML editions of classical texts into the
//! canonical CTS textpart structure.
//!
//! ## Features
//!
//! - Expands undeclared legacy entities (`&amacr;`, `&Perseus.publish;`, ...)
//! - Transliterates Betacode to polytonic Greek inside Greek-scoped elements
//! - Turns referenceable milestones into nested `textpart` divisions
//! - Rewrites legacy elements (`lemma`, `argument`, `byline`, `date`, ...)
//! - Resolves free-text citations to CTS URNs
//!
//! ## Quick Start
//!
//! ```no_run
//! use epidoc_convert::{ConvertOptions, Tables, convert_file};
//!
//! // Preprocess, convert, and overwrite the file in place
//! let tables = Tables::default();
//! convert_file("phi0474.phi013.perseus-lat1.xml", &tables, ConvertOptions::default()).unwrap();
//! ```
//!
//! ## Working with Documents
//!
//! The passes operate on an in-memory [`Document`]; the file helpers are a
//! thin layer over [`parse_document`], [`Converter`] and [`to_bytes`]:
//!
//! ```
//! use epidoc_convert::{ConvertOptions, Converter, Tables, parse_document};
//!
//! let doc = parse_document(r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><text><body>
//!     <p><lemma xml:lang="gr">mh=nin</lemma></p>
//! </body></text></TEI>"#).unwrap();
//!
//! let tables = Tables::default();
//! let mut converter = Converter::new(doc, "tlg0012.tlg001", &tables, ConvertOptions::default());
//! converter.convert().unwrap();
//!
//! let doc = converter.document();
//! let lem = doc.find_tei("lem")[0];
//! assert_eq!(doc.text(lem), Some("μῆνιν"));
//! ```

pub mod betacode;
pub mod convert;
pub mod error;
pub mod preprocess;
pub mod tables;
pub mod tree;
pub(crate) mod util;

use std::fs;
use std::path::Path;

use tracing::info;

pub use betacode::{beta_to_uni, uni_to_beta};
pub use convert::{ConvertOptions, Converter, convert_citation, fix_date};
pub use error::{Error, Result};
pub use preprocess::{preconvert, replace_entities};
pub use tables::Tables;
pub use tree::{Document, NodeId, parse_document, to_bytes, write_file};

/// Convert the file at `path` in place.
///
/// Entities are expanded and written back first; the converted tree then
/// replaces the file. A parse failure leaves the file in its preprocessed
/// state.
pub fn convert_file<P: AsRef<Path>>(path: P, tables: &Tables, options: ConvertOptions) -> Result<()> {
    let path = path.as_ref();
    convert_file_to(path, path, tables, options, true)
}

/// Convert `input` and write the result to `output`.
///
/// With `expand_entities`, `input` is preprocessed and overwritten before
/// parsing, as [`convert_file`] does. Without it, `input` is read as is and
/// never modified. The work identifier is always taken from `input`'s name.
pub fn convert_file_to<P, Q>(
    input: P,
    output: Q,
    tables: &Tables,
    options: ConvertOptions,
    expand_entities: bool,
) -> Result<()>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let input = input.as_ref();
    let output = output.as_ref();

    let text = if expand_entities {
        preconvert(input, tables)?
    } else {
        let raw = fs::read(input)?;
        util::decode_document(&raw).into_owned()
    };

    let doc = parse_document(&text)?;
    let mut converter = Converter::for_path(doc, input, tables, options);
    converter.convert()?;

    info!(path = %output.display(), "writing converted document");
    write_file(converter.document(), output)
}
