// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP string literal decoding (ISO 10303-21 §6.4.3)
//!
//! Raw string tokens keep their escape sequences so tokenization stays
//! zero-copy. Decoding happens once, when a token becomes an
//! [`AttributeValue`](crate::AttributeValue).
//!
//! Supported escapes:
//! - `''` → `'` and `\\` → `\`
//! - `\S\c` → the character `c` shifted into the upper half of ISO 8859-1
//! - `\X\hh` → one ISO 8859-1 byte
//! - `\X2\hhhh…\X0\` → UTF-16 code units
//! - `\X4\hhhhhhhh…\X0\` → UTF-32 code points
//! - `\Px\` code page switches are dropped
//!
//! Malformed escapes are kept verbatim.

use std::borrow::Cow;

/// Decode a raw STEP string body (without the enclosing quotes).
pub fn decode_step_string(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\\') && !raw.contains("''") {
        return Cow::Borrowed(raw);
    }

    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' if bytes.get(i + 1) == Some(&b'\'') => {
                out.push('\'');
                i += 2;
            }
            b'\\' => match decode_escape(raw, i) {
                Some((decoded, consumed)) => {
                    if let Some(text) = decoded {
                        out.push_str(&text);
                    }
                    i += consumed;
                }
                None => {
                    out.push('\\');
                    i += 1;
                }
            },
            _ => {
                // Copy one UTF-8 character
                let ch_len = utf8_len(bytes[i]);
                let end = (i + ch_len).min(bytes.len());
                out.push_str(&raw[i..end]);
                i = end;
            }
        }
    }

    Cow::Owned(out)
}

/// Try to decode the escape starting at `start` (which is a backslash).
/// Returns the decoded text (None for directives that produce nothing) and
/// the number of bytes consumed.
fn decode_escape(raw: &str, start: usize) -> Option<(Option<String>, usize)> {
    let rest = &raw[start..];

    if rest.starts_with("\\\\") {
        return Some((Some("\\".to_string()), 2));
    }

    if let Some(body) = rest.strip_prefix("\\X2\\") {
        let end = body.find("\\X0\\")?;
        let hex = &body[..end];
        if hex.len() % 4 != 0 {
            return None;
        }
        let units = hex
            .as_bytes()
            .chunks(4)
            .map(|c| std::str::from_utf8(c).ok().and_then(|s| u16::from_str_radix(s, 16).ok()))
            .collect::<Option<Vec<u16>>>()?;
        let text = char::decode_utf16(units)
            .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
        return Some((Some(text), 4 + end + 4));
    }

    if let Some(body) = rest.strip_prefix("\\X4\\") {
        let end = body.find("\\X0\\")?;
        let hex = &body[..end];
        if hex.len() % 8 != 0 {
            return None;
        }
        let text = hex
            .as_bytes()
            .chunks(8)
            .map(|c| {
                std::str::from_utf8(c)
                    .ok()
                    .and_then(|s| u32::from_str_radix(s, 16).ok())
                    .map(|cp| char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER))
            })
            .collect::<Option<String>>()?;
        return Some((Some(text), 4 + end + 4));
    }

    if let Some(body) = rest.strip_prefix("\\X\\") {
        let hex = body.get(..2)?;
        let byte = u8::from_str_radix(hex, 16).ok()?;
        return Some((Some(char::from(byte).to_string()), 5));
    }

    if let Some(body) = rest.strip_prefix("\\S\\") {
        let c = *body.as_bytes().first()?;
        if !c.is_ascii() {
            return None;
        }
        return Some((Some(char::from(c + 0x80).to_string()), 4));
    }

    // \PA\ .. \PI\ code page directive
    let b = rest.as_bytes();
    if b.len() >= 4 && b[1] == b'P' && b[2].is_ascii_uppercase() && b[3] == b'\\' {
        return Some((None, 4));
    }

    None
}

#[inline]
fn utf8_len(first: u8) -> usize {
    match first {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_string_is_borrowed() {
        assert!(matches!(decode_step_string("Beam-01"), Cow::Borrowed("Beam-01")));
    }

    #[test]
    fn test_utf16_japanese() {
        // 重量 / 長さ
        assert_eq!(decode_step_string("\\X2\\91CD91CF\\X0\\"), "重量");
        assert_eq!(decode_step_string("\\X2\\95773055\\X0\\"), "長さ");
        assert_eq!(decode_step_string("Pset_\\X2\\91CD91CF\\X0\\_A"), "Pset_重量_A");
    }

    #[test]
    fn test_utf32_and_latin1() {
        assert_eq!(decode_step_string("\\X4\\0001F600\\X0\\"), "😀");
        assert_eq!(decode_step_string("Stra\\X\\DFe"), "Straße");
        assert_eq!(decode_step_string("\\S\\D"), "Ä");
    }

    #[test]
    fn test_quotes_and_backslash() {
        assert_eq!(decode_step_string("it''s"), "it's");
        assert_eq!(decode_step_string("a\\\\b"), "a\\b");
    }

    #[test]
    fn test_malformed_escape_kept() {
        assert_eq!(decode_step_string("\\X2\\91C\\X0\\"), "\\X2\\91C\\X0\\");
        assert_eq!(decode_step_string("C:\\tmp"), "C:\\tmp");
    }

    #[test]
    fn test_code_page_directive_dropped() {
        assert_eq!(decode_step_string("\\PA\\abc"), "abc");
    }
}
