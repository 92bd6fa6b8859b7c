//! Escaping and hex coding of string content
//!
//! Content is always handled without its framing delimiters: a literal
//! string's payload excludes the outer parentheses, a hex string's payload
//! excludes the angle brackets.

/// Escape bytes for a literal string, returning the payload between `(` and `)`
pub fn escape_literal(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + bytes.len() / 8);
    for &b in bytes {
        match b {
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x08 => out.extend_from_slice(b"\\b"),
            0x0C => out.extend_from_slice(b"\\f"),
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(b);
            }
            _ => out.push(b),
        }
    }
    out
}

/// Escape bytes as a complete literal string including delimiters
pub fn write_literal(bytes: &[u8], output: &mut Vec<u8>) {
    output.push(b'(');
    output.extend_from_slice(&escape_literal(bytes));
    output.push(b')');
}

/// Encode bytes as lowercase hex digits
pub fn encode_hex(bytes: &[u8]) -> Vec<u8> {
    hex::encode(bytes).into_bytes()
}

/// Decode hex digits, skipping whitespace; an odd trailing digit is padded with 0
pub fn decode_hex(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() / 2);
    let mut high: Option<u8> = None;

    for &c in content {
        let nibble = match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            b'A'..=b'F' => c - b'A' + 10,
            // whitespace and stray bytes carry no digits
            _ => continue,
        };
        match high.take() {
            Some(h) => out.push((h << 4) | nibble),
            None => high = Some(nibble),
        }
    }

    if let Some(h) = high {
        out.push(h << 4);
    }
    out
}

/// Undo literal-string escaping
pub fn unescape_literal(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len());
    let mut i = 0;

    while i < content.len() {
        let ch = content[i];
        i += 1;

        if ch == b'\r' {
            // bare CR and CRLF both read as LF
            if content.get(i) == Some(&b'\n') {
                i += 1;
            }
            out.push(b'\n');
            continue;
        }
        if ch != b'\\' {
            out.push(ch);
            continue;
        }

        let Some(&escaped) = content.get(i) else {
            // lone trailing backslash
            break;
        };
        i += 1;

        match escaped {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'\r' => {
                // line continuation
                if content.get(i) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'\n' => {}
            b'0'..=b'7' => {
                let mut octal = u32::from(escaped - b'0');
                for _ in 0..2 {
                    match content.get(i) {
                        Some(&d @ b'0'..=b'7') => {
                            octal = (octal << 3) + u32::from(d - b'0');
                            i += 1;
                        }
                        _ => break,
                    }
                }
                out.push((octal & 0xFF) as u8);
            }
            // `\(`, `\)`, `\\` and unknown escapes yield the byte itself
            other => out.push(other),
        }
    }

    out
}

/// Strip hex or literal encoding from string content
pub fn decode_string_content(content: &[u8], hex_writing: bool) -> Vec<u8> {
    if hex_writing {
        decode_hex(content)
    } else {
        unescape_literal(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_excludes_delimiters() {
        assert_eq!(escape_literal(b"a(b)c"), b"a\\(b\\)c".to_vec());

        let mut full = Vec::new();
        write_literal(b"x", &mut full);
        assert_eq!(full, b"(x)".to_vec());
    }

    #[test]
    fn test_escape_control_characters() {
        assert_eq!(
            escape_literal(b"line\nnext\r\ttab\x08\x0c\\"),
            b"line\\nnext\\r\\ttab\\b\\f\\\\".to_vec()
        );
    }

    #[rstest]
    #[case(b"\\101\\102", b"AB")]
    #[case(b"\\0053", b"\x053")]
    #[case(b"\\7", b"\x07")]
    #[case(b"a\\\r\nb", b"ab")]
    #[case(b"a\\\nb", b"ab")]
    #[case(b"a\r\nb\rc", b"a\nb\nc")]
    #[case(b"\\q", b"q")]
    #[case(b"end\\", b"end")]
    fn test_unescape(#[case] input: &[u8], #[case] expected: &[u8]) {
        assert_eq!(unescape_literal(input), expected.to_vec());
    }

    #[test]
    fn test_unescape_reverses_escape() {
        let original: Vec<u8> = (0u8..=255).collect();
        assert_eq!(unescape_literal(&escape_literal(&original)), original);
    }

    #[rstest]
    #[case(b"48656C6C6F", b"Hello")]
    #[case(b"48 65\n6c 6c\t6f", b"Hello")]
    #[case(b"901FA", b"\x90\x1f\xa0")]
    #[case(b"", b"")]
    fn test_decode_hex(#[case] input: &[u8], #[case] expected: &[u8]) {
        assert_eq!(decode_hex(input), expected.to_vec());
    }

    #[test]
    fn test_encode_hex_is_lowercase() {
        assert_eq!(encode_hex(&[0xAB, 0x01]), b"ab01".to_vec());
    }

    #[test]
    fn test_decode_string_content_dispatch() {
        assert_eq!(decode_string_content(b"4142", true), b"AB".to_vec());
        assert_eq!(decode_string_content(b"4142", false), b"4142".to_vec());
    }
}
