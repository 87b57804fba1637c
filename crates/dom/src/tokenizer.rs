//! Streaming HTML tokenizer with a constrained, practical character set.
//!
//! Tag names accept ASCII `[A-Za-z0-9:_-]`; attribute names additionally
//! accept `$`. Names are canonicalized to ASCII lowercase. Each token carries
//! the byte range of its source slice, so callers can cut the original input
//! around a token (the server template compiler depends on this).
//!
//! Known limitations (intentional):
//! - Not a spec-complete HTML5 state machine; no parse-error recovery beyond
//!   the bogus-comment path for `<!...>` / `<?...>`.
//! - Rawtext close-tag scanning (`</script>`, `</style>`) accepts only ASCII
//!   whitespace before `>`.

use crate::entities::decode_entities;
use memchr::memchr;
use std::ops::Range;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Doctype(String),
    StartTag {
        name: String,
        attributes: Vec<(String, Option<String>)>,
        self_closing: bool,
    },
    EndTag(String),
    Comment(String),
    Text(String),
}

/// A token plus the byte range it was cut from.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenAt {
    pub token: Token,
    pub range: Range<usize>,
}

const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";

pub(crate) fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_tag_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

fn is_attr_name_byte(b: u8) -> bool {
    is_tag_name_byte(b) || b == b'$'
}

pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    // Set after a <script>/<style> start tag; the next token is its rawtext
    // body followed by a synthesized end tag.
    rawtext: Option<String>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            rawtext: None,
        }
    }

    fn bytes(&self) -> &'a [u8] {
        self.input.as_bytes()
    }

    fn emit(&mut self, token: Token, range: Range<usize>) -> Option<TokenAt> {
        self.pos = range.end;
        Some(TokenAt { token, range })
    }

    fn next_rawtext(&mut self, name: String) -> Option<TokenAt> {
        let start = self.pos;
        let close = format!("</{name}");
        let rest = &self.input[start..];
        let (body_end, tag_end) = match find_rawtext_close(rest, close.as_bytes()) {
            Some((rel_start, rel_end)) => (start + rel_start, start + rel_end),
            None => (self.input.len(), self.input.len()),
        };
        if body_end > start {
            // Leave the end tag for the following next() call.
            self.rawtext = Some(name);
            self.pos = body_end;
            return Some(TokenAt {
                token: Token::Text(self.input[start..body_end].to_string()),
                range: start..body_end,
            });
        }
        self.emit(Token::EndTag(name), body_end..tag_end)
    }

    fn next_comment(&mut self) -> Option<TokenAt> {
        let start = self.pos;
        let body_start = start + COMMENT_OPEN.len();
        match self.input[body_start..].find(COMMENT_CLOSE) {
            Some(rel) => {
                let body_end = body_start + rel;
                let end = body_end + COMMENT_CLOSE.len();
                self.emit(
                    Token::Comment(self.input[body_start..body_end].to_string()),
                    start..end,
                )
            }
            None => self.emit(
                Token::Comment(self.input[body_start..].to_string()),
                start..self.input.len(),
            ),
        }
    }

    /// `<!x ...>` and `<?x ...>` constructs become comment tokens, mirroring
    /// the HTML bogus-comment state. For `<?` the `?` is part of the data.
    fn next_bogus_comment(&mut self, body_start: usize) -> Option<TokenAt> {
        let start = self.pos;
        match memchr(b'>', &self.bytes()[body_start..]) {
            Some(rel) => {
                let body_end = body_start + rel;
                self.emit(
                    Token::Comment(self.input[body_start..body_end].to_string()),
                    start..body_end + 1,
                )
            }
            None => self.emit(
                Token::Comment(self.input[body_start..].to_string()),
                start..self.input.len(),
            ),
        }
    }

    fn next_end_tag(&mut self) -> Option<TokenAt> {
        let bytes = self.bytes();
        let start = self.pos;
        let mut j = start + 2;
        let name_start = j;
        while j < bytes.len() && is_tag_name_byte(bytes[j]) {
            j += 1;
        }
        let name = self.input[name_start..j].to_ascii_lowercase();
        while j < bytes.len() && bytes[j] != b'>' {
            j += 1;
        }
        let end = (j + 1).min(self.input.len());
        self.emit(Token::EndTag(name), start..end)
    }

    fn next_start_tag(&mut self) -> Option<TokenAt> {
        let bytes = self.bytes();
        let len = bytes.len();
        let start = self.pos;
        let mut j = start + 1;
        let name_start = j;
        while j < len && is_tag_name_byte(bytes[j]) {
            j += 1;
        }
        let name = self.input[name_start..j].to_ascii_lowercase();

        let mut attributes: Vec<(String, Option<String>)> = Vec::new();
        let mut self_closing = false;
        loop {
            while j < len && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            if j >= len {
                break;
            }
            if bytes[j] == b'>' {
                j += 1;
                break;
            }
            if bytes[j] == b'/' {
                if j + 1 < len && bytes[j + 1] == b'>' {
                    self_closing = true;
                    j += 2;
                    break;
                }
                j += 1;
                continue;
            }
            let attr_start = j;
            while j < len && is_attr_name_byte(bytes[j]) {
                j += 1;
            }
            if attr_start == j {
                // Not an attribute-name byte; skip it rather than loop forever.
                j += 1;
                continue;
            }
            let attr_name = self.input[attr_start..j].to_ascii_lowercase();

            while j < len && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            let value = if j < len && bytes[j] == b'=' {
                j += 1;
                while j < len && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                if j < len && (bytes[j] == b'"' || bytes[j] == b'\'') {
                    let quote = bytes[j];
                    j += 1;
                    let value_start = j;
                    while j < len && bytes[j] != quote {
                        j += 1;
                    }
                    let raw = &self.input[value_start..j];
                    if j < len {
                        j += 1;
                    }
                    Some(decode_entities(raw))
                } else {
                    let value_start = j;
                    while j < len && !bytes[j].is_ascii_whitespace() && bytes[j] != b'>' {
                        if bytes[j] == b'/' && j + 1 < len && bytes[j + 1] == b'>' {
                            break;
                        }
                        j += 1;
                    }
                    Some(decode_entities(&self.input[value_start..j]))
                }
            } else {
                None
            };
            attributes.push((attr_name, value));
        }

        let self_closing = self_closing || is_void_element(&name);
        if !self_closing && (name == "script" || name == "style") {
            self.rawtext = Some(name.clone());
        }
        self.emit(
            Token::StartTag {
                name,
                attributes,
                self_closing,
            },
            start..j,
        )
    }
}

fn starts_with_ignore_case(haystack: &[u8], at: usize, needle: &[u8]) -> bool {
    haystack.len() >= at + needle.len()
        && haystack[at..at + needle.len()].eq_ignore_ascii_case(needle)
}

/// Locate `</name`, allowing only ASCII whitespace before the closing `>`.
/// Returns (body_end, tag_end) relative offsets.
fn find_rawtext_close(haystack: &str, close: &[u8]) -> Option<(usize, usize)> {
    let bytes = haystack.as_bytes();
    let len = bytes.len();
    let n = close.len();
    let mut i = 0;
    while i + n <= len {
        let rel = memchr(b'<', &bytes[i..])?;
        i += rel;
        if i + n > len {
            return None;
        }
        if starts_with_ignore_case(bytes, i, close) {
            let mut k = i + n;
            while k < len && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < len && bytes[k] == b'>' {
                return Some((i, k + 1));
            }
        }
        i += 1;
    }
    None
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = TokenAt;

    fn next(&mut self) -> Option<TokenAt> {
        if let Some(name) = self.rawtext.take() {
            return self.next_rawtext(name);
        }
        let bytes = self.bytes();
        let len = bytes.len();
        while self.pos < len {
            let i = self.pos;
            if bytes[i] != b'<' {
                let text_end = match memchr(b'<', &bytes[i..]) {
                    Some(rel) => i + rel,
                    None => len,
                };
                let decoded = decode_entities(&self.input[i..text_end]);
                if decoded.is_empty() {
                    self.pos = text_end;
                    continue;
                }
                return self.emit(Token::Text(decoded), i..text_end);
            }
            if self.input[i..].starts_with(COMMENT_OPEN) {
                return self.next_comment();
            }
            if starts_with_ignore_case(bytes, i, b"<!doctype") {
                let rest = &self.input[i + 2..];
                return match rest.find('>') {
                    Some(rel) => {
                        let body = rest[..rel].trim().to_string();
                        self.emit(Token::Doctype(body), i..i + 2 + rel + 1)
                    }
                    None => None,
                };
            }
            if i + 1 < len && bytes[i + 1] == b'!' {
                return self.next_bogus_comment(i + 2);
            }
            if i + 1 < len && bytes[i + 1] == b'?' {
                return self.next_bogus_comment(i + 1);
            }
            if i + 1 < len && bytes[i + 1] == b'/' {
                return self.next_end_tag();
            }
            if i + 1 < len && bytes[i + 1].is_ascii_alphabetic() {
                return self.next_start_tag();
            }
            // Lone '<' in text position.
            let text_end = match memchr(b'<', &bytes[i + 1..]) {
                Some(rel) => i + 1 + rel,
                None => len,
            };
            return self.emit(Token::Text(self.input[i..text_end].to_string()), i..text_end);
        }
        None
    }
}

pub fn tokenize(input: &str) -> Vec<Token> {
    Tokenizer::new(input).map(|t| t.token).collect()
}
