//! Placeholder-position classifier.
//!
//! A character-level state machine over the template statics joined with a
//! `'\0'` placeholder per dynamic slot. It follows the HTML tokenizer's
//! attribute/tag/comment states just far enough to answer two questions:
//! which syntactic context each placeholder sits in (text, comment,
//! attribute name, attribute value and its quoting), and which static
//! characters belong to an attribute name (those need case-escaping before
//! the real parse).
//!
//! This is deliberately not a tokenizer: the rewritten string is handed to
//! the real parser right after. Real comments (`<!--`) and bogus comments
//! (`<!x`, `<?x`) are distinguished so that `--`/`>` sequences inside a real
//! comment classify correctly.
//!
//! Pure and restartable: one call lexes one statics array, no state escapes.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    Data,
    TagOpen,
    EndTagOpen,
    TagName,
    SelfClosingStartTag,
    BeforeAttrName,
    AttrName,
    AfterAttrName,
    BeforeAttrValue,
    AttrValueDouble,
    AttrValueSingle,
    AttrValueUnquoted,
    AfterAttrValueQuoted,
    /// After `<!`, before we know whether a real comment follows.
    Exclaim,
    /// Inside `<!-- ... -->`.
    Comment,
    /// Bogus comment: `<!x ... >` or `<?x ... >`.
    Comment2,
}

pub(crate) const PLACEHOLDER: char = '\0';

/// Classify every character of the joined statics. Placeholders appear as
/// `'\0'` entries tagged with the state they would be consumed in.
pub(crate) fn lex(statics: &[&str]) -> Vec<(char, State)> {
    let mut out = Vec::new();
    let mut state = State::Data;
    // Consecutive '-' seen inside a comment, for spotting `-->`.
    let mut comment_dashes = 0usize;
    // '-' count right after `<!`, for spotting `<!--`.
    let mut exclaim_dashes = 0usize;

    let mut emit = |ch: char, state: State| out.push((ch, state));

    for (i, chunk) in statics.iter().enumerate() {
        let chars = chunk.chars().map(Some).chain(if i + 1 < statics.len() {
            Some(None)
        } else {
            None
        });
        for slot in chars {
            let ch = slot.unwrap_or(PLACEHOLDER);
            // A char may be reconsumed after a state change, as in the HTML
            // tokenizer's "reconsume in state X" steps.
            loop {
                match state {
                    State::Data => {
                        if ch == '<' {
                            state = State::TagOpen;
                        }
                        emit(ch, state);
                    }
                    State::TagOpen => match ch {
                        '!' => {
                            state = State::Exclaim;
                            exclaim_dashes = 0;
                            emit(ch, state);
                        }
                        '/' => {
                            state = State::EndTagOpen;
                            emit(ch, state);
                        }
                        '?' => {
                            state = State::Comment2;
                            emit(ch, state);
                        }
                        c if c.is_ascii_alphabetic() || c == PLACEHOLDER => {
                            state = State::TagName;
                            continue;
                        }
                        _ => {
                            state = State::Data;
                            continue;
                        }
                    },
                    State::EndTagOpen => match ch {
                        '>' => {
                            state = State::Data;
                            emit(ch, state);
                        }
                        c if c.is_ascii_alphabetic() || c == PLACEHOLDER => {
                            state = State::TagName;
                            continue;
                        }
                        _ => {
                            state = State::Comment2;
                            continue;
                        }
                    },
                    State::TagName => match ch {
                        c if c.is_ascii_whitespace() => {
                            state = State::BeforeAttrName;
                            emit(ch, state);
                        }
                        '/' => {
                            state = State::SelfClosingStartTag;
                            emit(ch, state);
                        }
                        '>' => {
                            state = State::Data;
                            emit(ch, state);
                        }
                        _ => emit(ch, State::TagName),
                    },
                    State::SelfClosingStartTag => match ch {
                        '>' => {
                            state = State::Data;
                            emit(ch, state);
                        }
                        _ => {
                            state = State::BeforeAttrName;
                            continue;
                        }
                    },
                    State::BeforeAttrName => match ch {
                        c if c.is_ascii_whitespace() => emit(ch, State::BeforeAttrName),
                        '/' => {
                            state = State::SelfClosingStartTag;
                            emit(ch, state);
                        }
                        '>' => {
                            state = State::Data;
                            emit(ch, state);
                        }
                        _ => {
                            state = State::AttrName;
                            continue;
                        }
                    },
                    State::AttrName => match ch {
                        c if c.is_ascii_whitespace() => {
                            state = State::AfterAttrName;
                            emit(ch, state);
                        }
                        '=' => {
                            state = State::BeforeAttrValue;
                            emit(ch, state);
                        }
                        '/' => {
                            state = State::SelfClosingStartTag;
                            emit(ch, state);
                        }
                        '>' => {
                            state = State::Data;
                            emit(ch, state);
                        }
                        _ => emit(ch, State::AttrName),
                    },
                    State::AfterAttrName => match ch {
                        c if c.is_ascii_whitespace() => emit(ch, State::AfterAttrName),
                        '=' => {
                            state = State::BeforeAttrValue;
                            emit(ch, state);
                        }
                        '/' => {
                            state = State::SelfClosingStartTag;
                            emit(ch, state);
                        }
                        '>' => {
                            state = State::Data;
                            emit(ch, state);
                        }
                        _ => {
                            state = State::AttrName;
                            continue;
                        }
                    },
                    State::BeforeAttrValue => match ch {
                        c if c.is_ascii_whitespace() => emit(ch, State::BeforeAttrValue),
                        '"' => {
                            state = State::AttrValueDouble;
                            emit(ch, state);
                        }
                        '\'' => {
                            state = State::AttrValueSingle;
                            emit(ch, state);
                        }
                        '>' => {
                            state = State::Data;
                            emit(ch, state);
                        }
                        _ => {
                            state = State::AttrValueUnquoted;
                            continue;
                        }
                    },
                    State::AttrValueDouble => match ch {
                        '"' => {
                            state = State::AfterAttrValueQuoted;
                            emit(ch, state);
                        }
                        _ => emit(ch, State::AttrValueDouble),
                    },
                    State::AttrValueSingle => match ch {
                        '\'' => {
                            state = State::AfterAttrValueQuoted;
                            emit(ch, state);
                        }
                        _ => emit(ch, State::AttrValueSingle),
                    },
                    State::AttrValueUnquoted => match ch {
                        c if c.is_ascii_whitespace() => {
                            state = State::BeforeAttrName;
                            emit(ch, state);
                        }
                        '>' => {
                            state = State::Data;
                            emit(ch, state);
                        }
                        _ => emit(ch, State::AttrValueUnquoted),
                    },
                    State::AfterAttrValueQuoted => match ch {
                        c if c.is_ascii_whitespace() => {
                            state = State::BeforeAttrName;
                            emit(ch, state);
                        }
                        '/' => {
                            state = State::SelfClosingStartTag;
                            emit(ch, state);
                        }
                        '>' => {
                            state = State::Data;
                            emit(ch, state);
                        }
                        _ => {
                            state = State::BeforeAttrName;
                            continue;
                        }
                    },
                    State::Exclaim => match ch {
                        '-' if exclaim_dashes == 0 => {
                            exclaim_dashes = 1;
                            emit(ch, State::Exclaim);
                        }
                        '-' if exclaim_dashes == 1 => {
                            state = State::Comment;
                            comment_dashes = 0;
                            emit(ch, State::Comment);
                        }
                        _ => {
                            state = State::Comment2;
                            continue;
                        }
                    },
                    State::Comment => match ch {
                        '-' => {
                            comment_dashes += 1;
                            emit(ch, State::Comment);
                        }
                        '>' if comment_dashes >= 2 => {
                            state = State::Data;
                            comment_dashes = 0;
                            emit(ch, state);
                        }
                        _ => {
                            comment_dashes = 0;
                            emit(ch, State::Comment);
                        }
                    },
                    State::Comment2 => match ch {
                        '>' => {
                            state = State::Data;
                            emit(ch, state);
                        }
                        _ => emit(ch, State::Comment2),
                    },
                }
                break;
            }
        }
    }
    out
}
