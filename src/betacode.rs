//! Betacode <-> Unicode transliteration for polytonic Greek.
//!
//! Betacode spells Greek in ASCII: letters are case-insensitive, a leading `*`
//! marks a capital, and diacritics follow the letter (or sit between `*` and
//! the letter for capitals):
//!
//! | Betacode | Mark                  |
//! |----------|-----------------------|
//! | `)`      | smooth breathing      |
//! | `(`      | rough breathing       |
//! | `/`      | acute                 |
//! | `\`      | grave                 |
//! | `=`      | circumflex            |
//! | `+`      | diaeresis             |
//! | `\|`     | iota subscript        |
//! | `?`      | dot below             |
//!
//! Sigma takes its final form at the end of a word unless spelled explicitly
//! as `s1` (medial), `s2` (final) or `s3` (lunate).
//!
//! Both functions leave characters they don't recognise untouched, so
//! `beta_to_uni` is a no-op on text that is already Unicode Greek and
//! `uni_to_beta` is a no-op on text with no Greek in it.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

const SMOOTH: char = '\u{0313}';
const ROUGH: char = '\u{0314}';
const ACUTE: char = '\u{0301}';
const GRAVE: char = '\u{0300}';
const CIRCUMFLEX: char = '\u{0342}';
const DIAERESIS: char = '\u{0308}';
const IOTA_SUBSCRIPT: char = '\u{0345}';
const DOT_BELOW: char = '\u{0323}';

const MEDIAL_SIGMA: char = '\u{03C3}';
const FINAL_SIGMA: char = '\u{03C2}';
const LUNATE_SIGMA: char = '\u{03F2}';
const ANO_TELEIA: char = '\u{00B7}';

/// Betacode letter (either case) -> lowercase Greek letter.
fn beta_letter(c: char) -> Option<char> {
    let greek = match c.to_ascii_lowercase() {
        'a' => 'α',
        'b' => 'β',
        'g' => 'γ',
        'd' => 'δ',
        'e' => 'ε',
        'z' => 'ζ',
        'h' => 'η',
        'q' => 'θ',
        'i' => 'ι',
        'k' => 'κ',
        'l' => 'λ',
        'm' => 'μ',
        'n' => 'ν',
        'c' => 'ξ',
        'o' => 'ο',
        'p' => 'π',
        'r' => 'ρ',
        's' => MEDIAL_SIGMA,
        't' => 'τ',
        'u' => 'υ',
        'f' => 'φ',
        'x' => 'χ',
        'y' => 'ψ',
        'w' => 'ω',
        'v' => 'ϝ',
        _ => return None,
    };
    Some(greek)
}

fn beta_mark(c: char) -> Option<char> {
    let mark = match c {
        ')' => SMOOTH,
        '(' => ROUGH,
        '/' => ACUTE,
        '\\' => GRAVE,
        '=' => CIRCUMFLEX,
        '+' => DIAERESIS,
        '|' => IOTA_SUBSCRIPT,
        '?' => DOT_BELOW,
        _ => return None,
    };
    Some(mark)
}

/// Lowercase Greek letter -> Betacode letter.
fn greek_letter(c: char) -> Option<&'static str> {
    let beta = match c {
        'α' => "a",
        'β' => "b",
        'γ' => "g",
        'δ' => "d",
        'ε' => "e",
        'ζ' => "z",
        'η' => "h",
        'θ' => "q",
        'ι' => "i",
        'κ' => "k",
        'λ' => "l",
        'μ' => "m",
        'ν' => "n",
        'ξ' => "c",
        'ο' => "o",
        'π' => "p",
        'ρ' => "r",
        MEDIAL_SIGMA | FINAL_SIGMA => "s",
        LUNATE_SIGMA => "s3",
        'τ' => "t",
        'υ' => "u",
        'φ' => "f",
        'χ' => "x",
        'ψ' => "y",
        'ω' => "w",
        'ϝ' => "v",
        _ => return None,
    };
    Some(beta)
}

fn greek_mark(c: char) -> Option<char> {
    let mark = match c {
        SMOOTH => ')',
        ROUGH => '(',
        ACUTE => '/',
        GRAVE => '\\',
        CIRCUMFLEX => '=',
        DIAERESIS => '+',
        IOTA_SUBSCRIPT => '|',
        DOT_BELOW => '?',
        _ => return None,
    };
    Some(mark)
}

/// Convert Betacode text to NFC-normalized Unicode Greek.
pub fn beta_to_uni(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '*' {
            // Capital: marks may sit between the asterisk and the letter.
            let mut j = i + 1;
            let mut marks = Vec::new();
            while let Some(mark) = chars.get(j).copied().and_then(beta_mark) {
                marks.push(mark);
                j += 1;
            }
            match chars.get(j).copied().and_then(beta_letter) {
                Some(letter) => {
                    j += 1;
                    if letter == MEDIAL_SIGMA && matches!(chars.get(j), Some('1' | '2' | '3')) {
                        j += 1;
                    }
                    while let Some(mark) = chars.get(j).copied().and_then(beta_mark) {
                        marks.push(mark);
                        j += 1;
                    }
                    out.extend(letter.to_uppercase());
                    out.extend(marks);
                    i = j;
                }
                None => {
                    out.push(c);
                    i += 1;
                }
            }
            continue;
        }

        if let Some(mut letter) = beta_letter(c) {
            let mut j = i + 1;
            let mut explicit_sigma = false;
            if letter == MEDIAL_SIGMA {
                match chars.get(j) {
                    Some('1') => explicit_sigma = true,
                    Some('2') => {
                        letter = FINAL_SIGMA;
                        explicit_sigma = true;
                    }
                    Some('3') => {
                        letter = LUNATE_SIGMA;
                        explicit_sigma = true;
                    }
                    _ => {}
                }
                if explicit_sigma {
                    j += 1;
                }
            }

            let mut marks = Vec::new();
            while let Some(mark) = chars.get(j).copied().and_then(beta_mark) {
                marks.push(mark);
                j += 1;
            }

            if letter == MEDIAL_SIGMA && !explicit_sigma {
                let continues_word = chars.get(j).is_some_and(|&next| beta_letter(next).is_some());
                if !continues_word {
                    letter = FINAL_SIGMA;
                }
            }

            out.push(letter);
            out.extend(marks);
            i = j;
            continue;
        }

        match c {
            ':' => out.push(ANO_TELEIA),
            '\'' => out.push('\u{2019}'),
            _ => out.push(c),
        }
        i += 1;
    }

    out.nfc().collect()
}

/// Convert Unicode Greek back to Betacode.
///
/// Non-Greek characters are preserved (and re-composed), so Latin-script text
/// passes through unchanged.
pub fn uni_to_beta(text: &str) -> String {
    let chars: Vec<char> = text.nfd().collect();
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let mut j = i + 1;
        while chars.get(j).is_some_and(|&m| is_combining_mark(m)) {
            j += 1;
        }
        let marks = &chars[i + 1..j];

        let lower = c.to_lowercase().next().unwrap_or(c);
        match greek_letter(lower) {
            Some(letter) if marks.iter().all(|&m| greek_mark(m).is_some()) => {
                if lower != c {
                    out.push('*');
                    push_marks(&mut out, marks);
                    out.push_str(letter);
                    push_trailing_marks(&mut out, marks);
                } else {
                    out.push_str(letter);
                    push_marks(&mut out, marks);
                    push_trailing_marks(&mut out, marks);
                }
            }
            _ => {
                match c {
                    ANO_TELEIA => out.push(':'),
                    _ => out.push(c),
                }
                out.extend(marks);
            }
        }
        i = j;
    }

    out.nfc().collect()
}

/// Breathing, diaeresis and accent, in Betacode order.
fn push_marks(out: &mut String, marks: &[char]) {
    for wanted in [SMOOTH, ROUGH, DIAERESIS, ACUTE, GRAVE, CIRCUMFLEX] {
        if marks.contains(&wanted) {
            out.extend(greek_mark(wanted));
        }
    }
}

/// Iota subscript and dot below always follow the letter.
fn push_trailing_marks(out: &mut String, marks: &[char]) {
    for wanted in [IOTA_SUBSCRIPT, DOT_BELOW] {
        if marks.contains(&wanted) {
            out.extend(greek_mark(wanted));
        }
    }
}
