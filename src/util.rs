//! Byte decoding and small name helpers shared by the preprocessor and parser.

use std::borrow::Cow;
use std::ops::Range;
use std::path::Path;

/// Decode bytes to a string, handling various encodings.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the hint encoding (from `<?xml encoding="..."?>`)
/// 3. Falls back to Windows-1252 (common in legacy TEI exports)
///
/// Uses `Cow<str>` to avoid allocation when the input is valid UTF-8.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Decode a whole file's bytes, using the XML declaration as encoding hint.
pub fn decode_document(bytes: &[u8]) -> Cow<'_, str> {
    decode_text(bytes, extract_xml_encoding(bytes))
}

/// Extract the encoding name from an XML declaration, if present.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let span = xml_encoding_span(bytes)?;
    std::str::from_utf8(&bytes[span]).ok()
}

/// Point the XML declaration's encoding label at UTF-8.
///
/// Decoded text is UTF-8 whatever the source declared, so anything written
/// back from it must say so. Text without a label is returned as is.
pub fn declare_utf8(text: &str) -> Cow<'_, str> {
    let Some(span) = xml_encoding_span(text.as_bytes()) else {
        return Cow::Borrowed(text);
    };
    if text[span.clone()].eq_ignore_ascii_case("UTF-8") {
        return Cow::Borrowed(text);
    }
    Cow::Owned(format!("{}UTF-8{}", &text[..span.start], &text[span.end..]))
}

/// Byte range of the `encoding="..."` value in a leading XML declaration.
fn xml_encoding_span(bytes: &[u8]) -> Option<Range<usize>> {
    // Only check the first 100 bytes for the XML declaration
    let check_len = bytes.len().min(100);
    let prefix = &bytes[..check_len];

    let xml_start = prefix.windows(5).position(|w| w == b"<?xml")?;
    let enc_pos = prefix[xml_start..]
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let value_start = xml_start + enc_pos + 9;

    let quote = *prefix.get(value_start)?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let len = prefix[value_start + 1..].iter().position(|&b| b == quote)?;
    Some(value_start + 1..value_start + 1 + len)
}

/// Split a raw qualified name into `(prefix, local)` (e.g., "xml:lang" -> (Some("xml"), "lang")).
pub fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

/// File name without directory and without a trailing `.xml`.
///
/// Mirrors how CTS work identifiers are recovered from corpus file names:
/// `data/tlg0011/tlg007/tlg0011.tlg007.perseus-grc2.xml` -> `tlg0011.tlg007.perseus-grc2`.
pub fn work_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.replace(".xml", "")
}

/// Check whether a string is empty or whitespace-only.
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8_with_bom() {
        let bytes = b"\xEF\xBB\xBF<TEI/>";
        assert_eq!(decode_text(bytes, None), "<TEI/>");
    }

    #[test]
    fn test_decode_falls_back_to_hint() {
        // 0xE9 is 'é' in Latin-1 but invalid as a lone UTF-8 byte
        let bytes = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><p>caf\xE9</p>";
        let decoded = decode_document(bytes);
        assert!(decoded.ends_with("<p>caf\u{e9}</p>"));
    }

    #[test]
    fn test_extract_xml_encoding() {
        assert_eq!(
            extract_xml_encoding(b"<?xml version='1.0' encoding='UTF-8'?>"),
            Some("UTF-8")
        );
        assert_eq!(extract_xml_encoding(b"<?xml version=\"1.0\"?>"), None);
        assert_eq!(extract_xml_encoding(b"<TEI/>"), None);
    }

    #[test]
    fn test_declare_utf8() {
        assert_eq!(
            declare_utf8("<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<p>caf\u{e9}</p>"),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<p>caf\u{e9}</p>"
        );
        assert_eq!(declare_utf8("<?xml version='1.0' encoding='windows-1252'?><a/>"), "<?xml version='1.0' encoding='UTF-8'?><a/>");
        assert!(matches!(declare_utf8("<?xml version=\"1.0\" encoding=\"utf-8\"?><a/>"), Cow::Borrowed(_)));
        assert!(matches!(declare_utf8("<a/>"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_split_qname() {
        assert_eq!(split_qname("xml:lang"), (Some("xml"), "lang"));
        assert_eq!(split_qname("div"), (None, "div"));
    }

    #[test]
    fn test_work_stem() {
        let path = Path::new("/data/tlg0011/tlg007/tlg0011.tlg007.perseus-grc2.xml");
        assert_eq!(work_stem(path), "tlg0011.tlg007.perseus-grc2");
        assert_eq!(work_stem(Path::new("plain")), "plain");
    }
}
