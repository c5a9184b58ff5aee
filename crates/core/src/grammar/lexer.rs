//! The tokenizer: splits raw input into a flat sequence of borrowed tokens.
//!
//! Tokens carry no semantics. Structure (commands, arguments, commented-out
//! commands) is the parser's job; the lexer only guarantees that the token
//! sequence tiles the input byte-for-byte.

use thiserror::Error;

/// Classification of a lexer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokKind {
    /// A run of bare text: a command name or an unquoted argument.
    Word,
    /// A quoted argument including its surrounding `"` characters.
    Quoted,
    /// A bracket argument including its `[[`/`]]` (or `[=[`/`]=]`) delimiters.
    Bracket,
    /// An opening parenthesis.
    OpenParen,
    /// A closing parenthesis.
    CloseParen,
    /// One or more spaces/tabs (never crossing a line ending).
    Whitespace,
    /// A `#` line comment, up to but not including the line ending.
    Comment,
    /// A line terminator. CRLF is folded into a single token.
    Newline,
}

/// A token that borrows its text directly from the source input — zero
/// allocation.
///
/// `text` is always exactly `&input[start..end]`. The `start`/`end` byte
/// offsets are stored alongside for consumers that need numeric positions
/// (spans, slicing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    /// The classification of this token.
    pub kind: TokKind,
    /// Borrowed slice of the source input for this token.
    pub text: &'a str,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

/// Lexical error. The only fatal lexical conditions are unterminated
/// literals — everything else lexes permissively, because configuration
/// files in the wild are not always well-formed and the engine must still
/// round-trip what it can read.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LexError {
    /// A quoted argument was never closed before end of input.
    #[error("unterminated quoted argument starting at byte {offset}")]
    UnterminatedQuote {
        /// Byte offset of the opening quote.
        offset: usize,
    },
    /// A bracket argument was never closed before end of input.
    #[error("unterminated bracket argument starting at byte {offset}")]
    UnterminatedBracket {
        /// Byte offset of the opening bracket.
        offset: usize,
    },
}

impl LexError {
    /// Byte offset of the offending opening delimiter.
    pub fn offset(&self) -> usize {
        match self {
            LexError::UnterminatedQuote { offset } | LexError::UnterminatedBracket { offset } => {
                *offset
            }
        }
    }

    /// The diagnostic code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            LexError::UnterminatedQuote { .. } => cmakedit_diagnostics::codes::LEX_UNTERMINATED_QUOTE,
            LexError::UnterminatedBracket { .. } => {
                cmakedit_diagnostics::codes::LEX_UNTERMINATED_BRACKET
            }
        }
    }
}

/// Tokenize command-file input into a sequence of borrowed tokens.
///
/// Every token's `text` field borrows directly from `input`, so the returned
/// `Vec<Token<'_>>` is valid for as long as `input` is alive. No heap
/// allocations are made for token text.
///
/// # Safety of `b[i] as char`
///
/// All delimiter tests below compare against ASCII values (0x00–0x7F). UTF-8
/// continuation bytes are in the range 0x80–0xBF, so they never match any of
/// these tests. This makes the `b[i] as char` cast safe for delimiter
/// detection without full UTF-8 decoding; multi-byte characters simply fall
/// into `Word` runs.
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, LexError> {
    let mut toks = Vec::new();
    let mut i = 0usize;
    let b = input.as_bytes();
    while i < b.len() {
        let c = b[i] as char;
        let start = i;
        match c {
            '(' => {
                i += 1;
                push(&mut toks, TokKind::OpenParen, input, start, i);
            }
            ')' => {
                i += 1;
                push(&mut toks, TokKind::CloseParen, input, start, i);
            }
            '\n' | '\r' => {
                // Fold CRLF into a single Newline token.
                if c == '\r' && i + 1 < b.len() && b[i + 1] as char == '\n' {
                    i += 2;
                } else {
                    i += 1;
                }
                push(&mut toks, TokKind::Newline, input, start, i);
            }
            ' ' | '\t' => {
                i += 1;
                while i < b.len() && matches!(b[i] as char, ' ' | '\t') {
                    i += 1;
                }
                push(&mut toks, TokKind::Whitespace, input, start, i);
            }
            '#' => {
                // Line comment: up to but not including the line ending, so
                // Newline tokens stay uniform across the file.
                i += 1;
                while i < b.len() && !matches!(b[i] as char, '\n' | '\r') {
                    i += 1;
                }
                push(&mut toks, TokKind::Comment, input, start, i);
            }
            '"' => {
                i += 1;
                let mut closed = false;
                while i < b.len() {
                    match b[i] as char {
                        // Escapes are preserved verbatim, not interpreted;
                        // the lexer only needs to know `\"` does not close.
                        '\\' if i + 1 < b.len() => i += 2,
                        '"' => {
                            i += 1;
                            closed = true;
                            break;
                        }
                        _ => i += 1,
                    }
                }
                if !closed {
                    return Err(LexError::UnterminatedQuote { offset: start });
                }
                push(&mut toks, TokKind::Quoted, input, start, i);
            }
            '[' if bracket_open_len(&b[i..]).is_some() => {
                let eq_count = bracket_open_len(&b[i..]).unwrap_or(0);
                i += eq_count + 2;
                match find_bracket_close(b, i, eq_count) {
                    Some(end) => {
                        i = end;
                        push(&mut toks, TokKind::Bracket, input, start, i);
                    }
                    None => return Err(LexError::UnterminatedBracket { offset: start }),
                }
            }
            _ => {
                // Word run: anything up to the next structural delimiter.
                // Unknown characters become bare-argument text on purpose.
                i += 1;
                while i < b.len()
                    && !matches!(b[i] as char, '(' | ')' | '"' | '#' | ' ' | '\t' | '\n' | '\r')
                {
                    i += 1;
                }
                push(&mut toks, TokKind::Word, input, start, i);
            }
        }
    }
    Ok(toks)
}

fn push<'a>(toks: &mut Vec<Token<'a>>, kind: TokKind, input: &'a str, start: usize, end: usize) {
    toks.push(Token {
        kind,
        text: &input[start..end],
        start,
        end,
    });
}

/// If `rest` starts a bracket argument (`[[` or `[=[`, `[==[`, …), return the
/// number of `=` characters in the opener.
fn bracket_open_len(rest: &[u8]) -> Option<usize> {
    if rest.first() != Some(&b'[') {
        return None;
    }
    let mut eq = 0usize;
    while rest.get(1 + eq) == Some(&b'=') {
        eq += 1;
    }
    (rest.get(1 + eq) == Some(&b'[')).then_some(eq)
}

/// Find the end offset (exclusive) of a bracket argument's closing
/// `]=*]` with exactly `eq_count` equals signs, scanning from `from`.
fn find_bracket_close(b: &[u8], from: usize, eq_count: usize) -> Option<usize> {
    let mut i = from;
    while i < b.len() {
        if b[i] == b']' {
            let mut eq = 0usize;
            while b.get(i + 1 + eq) == Some(&b'=') {
                eq += 1;
            }
            if eq == eq_count && b.get(i + 1 + eq) == Some(&b']') {
                return Some(i + eq + 2);
            }
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokKind> {
        tokenize(input).unwrap().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn simple_command_tokens() {
        assert_eq!(
            kinds("set(X 1)"),
            vec![
                TokKind::Word,
                TokKind::OpenParen,
                TokKind::Word,
                TokKind::Whitespace,
                TokKind::Word,
                TokKind::CloseParen,
            ]
        );
    }

    #[test]
    fn tokens_cover_every_byte() {
        let input = "set(X \"a b\")  # note\r\n\r\nproject(p)\n";
        let toks = tokenize(input).unwrap();
        let mut pos = 0;
        for t in &toks {
            assert_eq!(t.start, pos, "gap before token {:?}", t);
            assert_eq!(t.text, &input[t.start..t.end]);
            pos = t.end;
        }
        assert_eq!(pos, input.len());
    }

    #[test]
    fn crlf_is_one_token() {
        let toks = tokenize("a\r\nb").unwrap();
        assert_eq!(toks[1].kind, TokKind::Newline);
        assert_eq!(toks[1].text, "\r\n");
    }

    #[test]
    fn comment_excludes_newline() {
        let toks = tokenize("# hello\nset(X)").unwrap();
        assert_eq!(toks[0].kind, TokKind::Comment);
        assert_eq!(toks[0].text, "# hello");
        assert_eq!(toks[1].kind, TokKind::Newline);
    }

    #[test]
    fn quoted_with_escape() {
        let toks = tokenize(r#"set(X "a\"b")"#).unwrap();
        let quoted = toks.iter().find(|t| t.kind == TokKind::Quoted).unwrap();
        assert_eq!(quoted.text, r#""a\"b""#);
    }

    #[test]
    fn unterminated_quote_is_error() {
        assert_eq!(
            tokenize("set(X \"oops"),
            Err(LexError::UnterminatedQuote { offset: 6 })
        );
    }

    #[test]
    fn bracket_argument() {
        let toks = tokenize("set(X [[multi\nline]])").unwrap();
        let bracket = toks.iter().find(|t| t.kind == TokKind::Bracket).unwrap();
        assert_eq!(bracket.text, "[[multi\nline]]");
    }

    #[test]
    fn bracket_with_equals_level() {
        let toks = tokenize("set(X [=[a]]b]=])").unwrap();
        let bracket = toks.iter().find(|t| t.kind == TokKind::Bracket).unwrap();
        assert_eq!(bracket.text, "[=[a]]b]=]");
    }

    #[test]
    fn unterminated_bracket_is_error() {
        assert_eq!(
            tokenize("set(X [[oops)"),
            Err(LexError::UnterminatedBracket { offset: 6 })
        );
    }

    #[test]
    fn lone_open_bracket_is_word() {
        // '[' not followed by a bracket opener is ordinary word text.
        let toks = tokenize("set(X a[0])").unwrap();
        assert!(toks.iter().all(|t| t.kind != TokKind::Bracket));
    }

    #[test]
    fn variable_reference_is_single_word() {
        let toks = tokenize("${CMAKE_PROJECT_NAME}_BOARD").unwrap();
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].kind, TokKind::Word);
    }

    #[test]
    fn multibyte_utf8_in_word() {
        let toks = tokenize("set(X héllo)").unwrap();
        let words: Vec<&str> = toks
            .iter()
            .filter(|t| t.kind == TokKind::Word)
            .map(|t| t.text)
            .collect();
        assert_eq!(words, vec!["set", "X", "héllo"]);
    }
}
