//! Lexer over raw PDF bytes
//!
//! String tokens keep their encoded payload: escapes and hex digits are
//! decoded later, when the string's value is first asked for.

use log::trace;

use crate::error::{PDFObjectError, PDFObjectResult};

/// Lexical token
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Integer(i64),
    Real(f64),
    Name(String),
    /// Literal string payload without the outer parentheses
    LiteralString(Vec<u8>),
    /// Hex string payload without the angle brackets
    HexString(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    DictStart,
    DictEnd,
    Keyword(String),
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\0' | b'\t' | b'\n' | 0x0C | b'\r' | b' ')
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// Find `needle` in `data` at or after `from`
pub(crate) fn find(data: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= data.len() {
        return None;
    }
    data[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|idx| from + idx)
}

/// Find the last occurrence of `needle` in `data`
pub(crate) fn rfind(data: &[u8], needle: &[u8]) -> Option<usize> {
    data.windows(needle.len()).rposition(|window| window == needle)
}

/// PDF tokenizer
pub(crate) struct Tokenizer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(b) = self.peek_byte() {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while let Some(c) = self.peek_byte() {
                    if c == b'\r' || c == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    /// Next token, or `None` at end of input
    pub fn next_token(&mut self) -> PDFObjectResult<Option<Token>> {
        self.skip_whitespace_and_comments();
        let start = self.pos;
        let Some(b) = self.peek_byte() else {
            return Ok(None);
        };

        let token = match b {
            b'[' => {
                self.pos += 1;
                Token::ArrayStart
            }
            b']' => {
                self.pos += 1;
                Token::ArrayEnd
            }
            b'<' if self.data.get(self.pos + 1) == Some(&b'<') => {
                self.pos += 2;
                Token::DictStart
            }
            b'>' if self.data.get(self.pos + 1) == Some(&b'>') => {
                self.pos += 2;
                Token::DictEnd
            }
            b'<' => self.read_hex_string()?,
            b'(' => self.read_literal_string()?,
            b'/' => self.read_name(),
            b'{' | b'}' => {
                self.pos += 1;
                Token::Keyword((b as char).to_string())
            }
            b')' | b'>' => return Err(PDFObjectError::syntax(start, format!("unexpected '{}'", b as char))),
            _ => self.read_regular(start)?,
        };

        trace!("Token at {}: {:?}", start, token);
        Ok(Some(token))
    }

    fn read_hex_string(&mut self) -> PDFObjectResult<Token> {
        let start = self.pos;
        self.pos += 1;
        let end = find(self.data, b">", self.pos)
            .ok_or_else(|| PDFObjectError::syntax(start, "unterminated hex string"))?;
        let payload = self.data[self.pos..end].to_vec();
        self.pos = end + 1;
        Ok(Token::HexString(payload))
    }

    fn read_literal_string(&mut self) -> PDFObjectResult<Token> {
        let start = self.pos;
        self.pos += 1;
        let payload_start = self.pos;
        let mut depth = 1usize;

        while let Some(b) = self.peek_byte() {
            match b {
                b'\\' => {
                    // the escaped byte never opens or closes
                    self.pos += 2;
                    continue;
                }
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        let payload = self.data[payload_start..self.pos].to_vec();
                        self.pos += 1;
                        return Ok(Token::LiteralString(payload));
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }

        Err(PDFObjectError::syntax(start, "unterminated literal string"))
    }

    fn read_name(&mut self) -> Token {
        self.pos += 1;
        let mut name = Vec::new();
        while let Some(b) = self.peek_byte() {
            if !is_regular(b) {
                break;
            }
            self.pos += 1;
            if b == b'#' {
                let digits = self.data.get(self.pos..self.pos + 2);
                if let Some(Ok(code)) = digits.map(|d| u8::from_str_radix(&String::from_utf8_lossy(d), 16)) {
                    name.push(code);
                    self.pos += 2;
                    continue;
                }
            }
            name.push(b);
        }
        Token::Name(String::from_utf8_lossy(&name).into_owned())
    }

    fn read_regular(&mut self, start: usize) -> PDFObjectResult<Token> {
        while let Some(b) = self.peek_byte() {
            if !is_regular(b) {
                break;
            }
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.data[start..self.pos])
            .map_err(|_| PDFObjectError::syntax(start, "non-ASCII token"))?;

        if let Ok(value) = text.parse::<i64>() {
            return Ok(Token::Integer(value));
        }
        let numeric = text
            .bytes()
            .all(|c| c.is_ascii_digit() || matches!(c, b'+' | b'-' | b'.'));
        if numeric {
            return text
                .parse::<f64>()
                .map(Token::Real)
                .map_err(|_| PDFObjectError::syntax(start, format!("invalid number '{}'", text)));
        }
        Ok(Token::Keyword(text.to_string()))
    }

    /// Skip a stream body; the position must be just after the `stream` keyword
    ///
    /// Uses `length` when it lands on `endstream`, otherwise searches for it.
    pub fn skip_stream(&mut self, length: Option<usize>) -> PDFObjectResult<()> {
        let start = self.pos;
        if self.data.get(self.pos) == Some(&b'\r') {
            self.pos += 1;
        }
        if self.data.get(self.pos) == Some(&b'\n') {
            self.pos += 1;
        }
        let body = self.pos;

        if let Some(length) = length {
            let mut lookahead = Tokenizer::at(self.data, body.saturating_add(length));
            if matches!(lookahead.next_token(), Ok(Some(Token::Keyword(ref k))) if k == "endstream") {
                self.pos = lookahead.position();
                return Ok(());
            }
        }

        let end = find(self.data, b"endstream", body)
            .ok_or_else(|| PDFObjectError::syntax(start, "stream without endstream"))?;
        self.pos = end + b"endstream".len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens(data: &[u8]) -> Vec<Token> {
        let mut tokenizer = Tokenizer::new(data);
        let mut out = Vec::new();
        while let Some(token) = tokenizer.next_token().unwrap() {
            out.push(token);
        }
        out
    }

    #[test]
    fn test_object_header_and_dictionary() {
        assert_eq!(
            tokens(b"12 0 obj\n<< /Type /Sig /Len -3.5 >> % comment\nendobj"),
            vec![
                Token::Integer(12),
                Token::Integer(0),
                Token::Keyword("obj".into()),
                Token::DictStart,
                Token::Name("Type".into()),
                Token::Name("Sig".into()),
                Token::Name("Len".into()),
                Token::Real(-3.5),
                Token::DictEnd,
                Token::Keyword("endobj".into()),
            ]
        );
    }

    #[test]
    fn test_strings_keep_encoded_payload() {
        assert_eq!(
            tokens(b"(a (nested) \\) str) <48 65>"),
            vec![
                Token::LiteralString(b"a (nested) \\) str".to_vec()),
                Token::HexString(b"48 65".to_vec()),
            ]
        );
    }

    #[test]
    fn test_name_hex_escapes() {
        assert_eq!(tokens(b"/A#20B"), vec![Token::Name("A B".into())]);
    }

    #[test]
    fn test_unterminated_string() {
        let mut tokenizer = Tokenizer::new(b"(open");
        assert!(matches!(
            tokenizer.next_token(),
            Err(PDFObjectError::SyntaxError { offset: 0, .. })
        ));
    }

    #[test]
    fn test_skip_stream_with_length() {
        let data = b"stream\r\n0123456789\nendstream endobj";
        let mut tokenizer = Tokenizer::new(data);
        tokenizer.next_token().unwrap();
        tokenizer.skip_stream(Some(10)).unwrap();
        assert_eq!(tokenizer.next_token().unwrap(), Some(Token::Keyword("endobj".into())));
    }

    #[test]
    fn test_skip_stream_with_wrong_length() {
        let data = b"stream\nendstream inside?\nendstream endobj";
        let mut tokenizer = Tokenizer::new(data);
        tokenizer.next_token().unwrap();
        tokenizer.skip_stream(Some(1000)).unwrap();
        // falls back to the first endstream
        assert_eq!(tokenizer.next_token().unwrap(), Some(Token::Keyword("inside?".into())));
    }

    #[test]
    fn test_find_helpers() {
        let data = b"startxref 10 startxref 20";
        assert_eq!(find(data, b"startxref", 1), Some(13));
        assert_eq!(rfind(data, b"startxref"), Some(13));
        assert_eq!(find(data, b"missing", 0), None);
    }
}
