//! Permissive, lossless parser for command files.
//!
//! The parser produces a [`Document`] whose nodes tile the input exactly:
//! every byte of the source belongs to exactly one node. Malformed input is
//! preserved as [`Node::Opaque`] and reported through diagnostics instead of
//! aborting, unless [`ParseOptions::strict`] is set.

use cmakedit_diagnostics::{Diagnostic, Span, codes};
use thiserror::Error;

use super::ast::{
    Argument, Command, Document, LineEndingStyle, Node, NodeText, QuoteStyle,
};
use super::lexer::{LexError, TokKind, Token, tokenize};

/// How the document's line-ending convention is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEndingPolicy {
    /// Use the style of the first line terminator in the input; `\n` when
    /// the input has none.
    #[default]
    Auto,
    /// Force a fixed style for synthesized lines. Existing terminators are
    /// still preserved verbatim.
    Fixed(LineEndingStyle),
}

/// Knobs controlling what the parser retains in the document model.
///
/// The defaults retain everything, which is what the round-trip guarantee
/// requires. Turning a `retain_*` flag off drops that category of content
/// from the model (and therefore from the rendered output).
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Keep comment lines in the model.
    pub retain_comments: bool,
    /// Keep blank lines in the model.
    pub retain_blank_lines: bool,
    /// Keep per-argument source spans, which lets the patcher splice a new
    /// value into a command without disturbing its original spacing. When
    /// off, patched commands are re-rendered from their template instead.
    pub retain_argument_separators: bool,
    /// Recognize comment lines whose body is a complete command and track
    /// them as inactive instances of that command.
    pub retain_commented_out: bool,
    /// Line-ending convention for synthesized lines.
    pub line_ending: LineEndingPolicy,
    /// Abort on the first structural error instead of salvaging the rest of
    /// the input as opaque text.
    pub strict: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            retain_comments: true,
            retain_blank_lines: true,
            retain_argument_separators: true,
            retain_commented_out: true,
            line_ending: LineEndingPolicy::Auto,
            strict: false,
        }
    }
}

/// A parsed document together with the diagnostics collected while parsing.
#[derive(Debug)]
pub struct ParseResult {
    /// The document model.
    pub document: Document,
    /// Diagnostics collected during parsing. Never contains `Error`
    /// severity entries unless permissive salvage kicked in.
    pub diagnostics: Vec<Diagnostic>,
}

/// Fatal parse failure.
///
/// Lexical errors are always fatal: an unterminated quote or bracket makes
/// the rest of the input unreadable, so there is nothing safe to salvage.
/// Structural errors are fatal only in strict mode.
#[derive(Debug, Error)]
pub enum SyntaxError {
    /// The input could not be tokenized.
    #[error(transparent)]
    Lex(#[from] LexError),
    /// A command's argument list was never closed (strict mode only).
    #[error("unbalanced parenthesis: argument list opened at byte {offset} is never closed")]
    Unbalanced {
        /// Byte offset of the opening parenthesis.
        offset: usize,
    },
}

/// Parse with default options.
pub fn parse_str(input: &str) -> Result<ParseResult, SyntaxError> {
    parse_with_options(input, &ParseOptions::default())
}

/// Parse with explicit options.
pub fn parse_with_options(
    input: &str,
    opts: &ParseOptions,
) -> Result<ParseResult, SyntaxError> {
    let toks = tokenize(input)?;
    let parser = Parser {
        src: input,
        toks,
        pos: 0,
        nodes: Vec::new(),
        diags: Vec::new(),
    };
    parser.run(opts)
}

struct Parser<'a> {
    src: &'a str,
    toks: Vec<Token<'a>>,
    pos: usize,
    nodes: Vec<Node>,
    diags: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    fn run(mut self, opts: &ParseOptions) -> Result<ParseResult, SyntaxError> {
        let line_ending = match opts.line_ending {
            LineEndingPolicy::Fixed(style) => style,
            LineEndingPolicy::Auto => self
                .toks
                .iter()
                .find(|t| t.kind == TokKind::Newline)
                .map_or(LineEndingStyle::Lf, |t| ending_style(t.text)),
        };

        // Whitespace waiting to become a node's leading text or a blank line.
        let mut pending_ws: Option<Span> = None;
        // Whether the current line produced a retained node.
        let mut line_has_content = false;
        // Set when a line's content was dropped by a retain_* flag, so its
        // terminator is dropped too.
        let mut drop_line_ending = false;

        while self.pos < self.toks.len() {
            let tok = self.toks[self.pos].clone();
            match tok.kind {
                TokKind::Whitespace => {
                    self.pos += 1;
                    pending_ws = Some(match pending_ws {
                        Some(prev) => Span::new(prev.start, tok.end),
                        None => Span::new(tok.start, tok.end),
                    });
                }
                TokKind::Newline => {
                    self.pos += 1;
                    if line_has_content {
                        self.nodes.push(Node::LineEnding {
                            text: NodeText::Source(Span::new(tok.start, tok.end)),
                            style: ending_style(tok.text),
                        });
                    } else if drop_line_ending {
                        // Content on this line was suppressed; swallow the
                        // terminator as well so no empty line remains.
                        pending_ws = None;
                    } else {
                        let text = pending_ws
                            .take()
                            .unwrap_or_else(|| Span::empty(tok.start));
                        if opts.retain_blank_lines {
                            self.nodes.push(Node::BlankLine {
                                text: NodeText::Source(text),
                            });
                            self.nodes.push(Node::LineEnding {
                                text: NodeText::Source(Span::new(tok.start, tok.end)),
                                style: ending_style(tok.text),
                            });
                        }
                    }
                    pending_ws = None;
                    line_has_content = false;
                    drop_line_ending = false;
                }
                TokKind::Comment => {
                    self.pos += 1;
                    let leading = take_leading(&mut pending_ws, tok.start);
                    let inline = opts
                        .retain_commented_out
                        .then(|| commented_out_command(self.src, &tok, opts))
                        .flatten();
                    if let Some((marker_end, command, cmd_end)) = inline {
                        self.nodes.push(Node::CommentedOut {
                            leading,
                            marker: NodeText::Source(Span::new(tok.start, marker_end)),
                            command,
                            trailing: NodeText::Source(Span::new(cmd_end, tok.end)),
                        });
                        line_has_content = true;
                    } else if opts.retain_comments {
                        self.nodes.push(Node::Comment {
                            leading,
                            text: NodeText::Source(Span::new(tok.start, tok.end)),
                        });
                        line_has_content = true;
                    } else {
                        drop_line_ending = true;
                    }
                }
                TokKind::Word if self.peek_open_paren() => {
                    let lead_span = pending_ws
                        .take()
                        .unwrap_or_else(|| Span::empty(tok.start));
                    match self.consume_command(&tok, lead_span.start, opts)? {
                        Some((command, trailing)) => {
                            self.nodes.push(Node::Command {
                                leading: NodeText::Source(lead_span),
                                command,
                                trailing,
                            });
                            line_has_content = true;
                        }
                        None => {
                            // Permissive salvage consumed to end of input.
                            line_has_content = true;
                        }
                    }
                }
                _ => {
                    // A word without an argument list, or stray structural
                    // characters. Preserve the rest of the line verbatim.
                    let (code, msg) = if tok.kind == TokKind::Word {
                        (
                            codes::PARSE_MISSING_PAREN,
                            format!(
                                "`{}` is not followed by an argument list; preserving the line as opaque text",
                                tok.text
                            ),
                        )
                    } else {
                        (
                            codes::PARSE_STRAY_CONTENT,
                            "content outside of any command; preserving it as opaque text"
                                .to_string(),
                        )
                    };
                    let start = pending_ws.take().map_or(tok.start, |w| w.start);
                    let end = self.consume_rest_of_line();
                    self.diags.push(Diagnostic::warn(
                        code,
                        msg,
                        Some(Span::new(tok.start, end)),
                    ));
                    self.nodes.push(Node::Opaque {
                        text: NodeText::Source(Span::new(start, end)),
                    });
                    line_has_content = true;
                }
            }
        }

        // Trailing whitespace with no final newline.
        if let Some(ws) = pending_ws.take()
            && opts.retain_blank_lines
        {
            self.nodes.push(Node::BlankLine {
                text: NodeText::Source(ws),
            });
        }

        if !self.nodes.iter().any(|n| n.as_command().is_some()) {
            self.diags.push(Diagnostic::info(
                codes::PARSE_EMPTY_DOCUMENT,
                "input contains no commands",
                None,
            ));
        }

        Ok(ParseResult {
            document: Document {
                source: self.src.to_string(),
                line_ending,
                nodes: self.nodes,
            },
            diagnostics: self.diags,
        })
    }

    /// True if the tokens after the current word form the start of an
    /// argument list (optional whitespace, then `(`).
    fn peek_open_paren(&self) -> bool {
        let mut j = self.pos + 1;
        while let Some(t) = self.toks.get(j) {
            match t.kind {
                TokKind::Whitespace => j += 1,
                TokKind::OpenParen => return true,
                _ => return false,
            }
        }
        false
    }

    /// Consume a command starting at the name token `name_tok`, through its
    /// closing parenthesis and any same-line trailing whitespace/comment.
    ///
    /// Returns `Ok(None)` if the command was unbalanced and permissive
    /// salvage emitted an opaque node instead.
    #[allow(clippy::type_complexity)]
    fn consume_command(
        &mut self,
        name_tok: &Token<'a>,
        lead_start: usize,
        opts: &ParseOptions,
    ) -> Result<Option<(Command, NodeText)>, SyntaxError> {
        self.pos += 1; // name
        while self.toks[self.pos].kind == TokKind::Whitespace {
            self.pos += 1;
        }
        let open = self.toks[self.pos].clone();
        self.pos += 1; // '('

        let mut depth = 1usize;
        let mut args = Vec::new();
        let close_end = loop {
            let Some(t) = self.toks.get(self.pos) else {
                // Ran off the end of input with the list still open.
                if opts.strict {
                    return Err(SyntaxError::Unbalanced { offset: open.start });
                }
                self.diags.push(Diagnostic::error(
                    codes::PARSE_UNBALANCED_PAREN,
                    format!(
                        "argument list of `{}` opened at byte {} is never closed",
                        name_tok.text, open.start
                    ),
                    Some(Span::new(open.start, self.src.len())),
                ));
                self.nodes.push(Node::Opaque {
                    text: NodeText::Source(Span::new(lead_start, self.src.len())),
                });
                return Ok(None);
            };
            match t.kind {
                TokKind::OpenParen => depth += 1,
                TokKind::CloseParen => {
                    depth -= 1;
                    if depth == 0 {
                        let end = t.end;
                        self.pos += 1;
                        break end;
                    }
                }
                TokKind::Word | TokKind::Quoted | TokKind::Bracket if depth == 1 => {
                    args.push(argument_from(t, 0, opts.retain_argument_separators));
                }
                _ => {}
            }
            self.pos += 1;
        };

        // Same-line trailing whitespace and comment belong to the command.
        let mut trail_end = close_end;
        while let Some(t) = self.toks.get(self.pos) {
            match t.kind {
                TokKind::Whitespace | TokKind::Comment => {
                    trail_end = t.end;
                    self.pos += 1;
                }
                _ => break,
            }
        }

        let command = Command {
            name: name_tok.text.to_string(),
            args,
            text: NodeText::Source(Span::new(name_tok.start, close_end)),
        };
        Ok(Some((
            command,
            NodeText::Source(Span::new(close_end, trail_end)),
        )))
    }

    /// Consume every token up to (not including) the next line terminator.
    /// Returns the end offset of the consumed text.
    fn consume_rest_of_line(&mut self) -> usize {
        let mut end = self.toks[self.pos].end;
        while let Some(t) = self.toks.get(self.pos) {
            if t.kind == TokKind::Newline {
                break;
            }
            end = t.end;
            self.pos += 1;
        }
        end
    }
}

fn take_leading(pending: &mut Option<Span>, at: usize) -> NodeText {
    NodeText::Source(pending.take().unwrap_or_else(|| Span::empty(at)))
}

fn ending_style(text: &str) -> LineEndingStyle {
    if text == "\r\n" {
        LineEndingStyle::CrLf
    } else {
        LineEndingStyle::Lf
    }
}

/// Build an [`Argument`] from a lexer token, rebasing its span by `base`.
fn argument_from(tok: &Token<'_>, base: usize, retain_span: bool) -> Argument {
    let (value, style) = match tok.kind {
        TokKind::Quoted => (
            tok.text[1..tok.text.len() - 1].to_string(),
            QuoteStyle::Quoted,
        ),
        TokKind::Bracket => {
            let eq = tok.text[1..].bytes().take_while(|&b| b == b'=').count();
            let open = eq + 2;
            (
                tok.text[open..tok.text.len() - open].to_string(),
                QuoteStyle::Bracketed,
            )
        }
        _ => (tok.text.to_string(), QuoteStyle::Bare),
    };
    Argument {
        value,
        style,
        span: retain_span.then(|| Span::new(base + tok.start, base + tok.end)),
    }
}

/// If a comment token's body is exactly one complete command (optionally
/// surrounded by whitespace), parse it.
///
/// Returns `(marker_end, command, command_end)`: the marker covers the `#`
/// and the spaces before the command name; `command_end` is the offset just
/// past the closing parenthesis, so the caller can keep any trailing
/// whitespace separate.
fn commented_out_command(
    src: &str,
    tok: &Token<'_>,
    opts: &ParseOptions,
) -> Option<(usize, Command, usize)> {
    let bytes = tok.text.as_bytes();
    let mut j = 1; // '#'
    while j < bytes.len() && matches!(bytes[j], b' ' | b'\t') {
        j += 1;
    }
    let body_start = tok.start + j;
    let body = &src[body_start..tok.end];
    let (command, rel_end) =
        parse_inline_command(body, body_start, opts.retain_argument_separators)?;
    Some((body_start, command, body_start + rel_end))
}

/// Parse a standalone synthesized command string into a [`Command`] whose
/// text is [`NodeText::Synth`]. Returns `None` if `text` is not exactly one
/// complete command.
pub(crate) fn parse_command_text(text: &str) -> Option<Command> {
    let (mut command, _) = parse_inline_command(text, 0, false)?;
    command.text = NodeText::Synth(text.to_string());
    Some(command)
}

/// Parse `text` as exactly one command followed only by whitespace and an
/// optional trailing comment.
///
/// Spans inside the returned command are rebased by `base` so they index
/// into the enclosing document's source.
fn parse_inline_command(
    text: &str,
    base: usize,
    retain_arg_spans: bool,
) -> Option<(Command, usize)> {
    let toks = tokenize(text).ok()?;
    let mut i = 0;
    let name = match toks.first() {
        Some(t) if t.kind == TokKind::Word => t.clone(),
        _ => return None,
    };
    i += 1;
    while toks.get(i).is_some_and(|t| t.kind == TokKind::Whitespace) {
        i += 1;
    }
    if toks.get(i).map(|t| t.kind) != Some(TokKind::OpenParen) {
        return None;
    }
    i += 1;
    let mut depth = 1usize;
    let mut args = Vec::new();
    let close_end = loop {
        let t = toks.get(i)?;
        match t.kind {
            TokKind::OpenParen => depth += 1,
            TokKind::CloseParen => {
                depth -= 1;
                if depth == 0 {
                    break t.end;
                }
            }
            TokKind::Word | TokKind::Quoted | TokKind::Bracket if depth == 1 => {
                args.push(argument_from(t, base, retain_arg_spans));
            }
            TokKind::Newline | TokKind::Comment => return None,
            _ => {}
        }
        i += 1;
    };
    // After the close, only whitespace and an optional trailing comment may
    // remain (a command commented out together with its own trailing
    // comment). Anything else means this is prose, not a command.
    let mut rest = toks[i + 1..]
        .iter()
        .filter(|t| t.kind != TokKind::Whitespace);
    match rest.next() {
        None => {}
        Some(t) if t.kind == TokKind::Comment => {
            if rest.next().is_some() {
                return None;
            }
        }
        _ => return None,
    }
    let command = Command {
        name: name.text.to_string(),
        args,
        text: NodeText::Source(Span::new(base + name.start, base + close_end)),
    };
    Some((command, close_end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> ParseResult {
        parse_str(input).unwrap()
    }

    #[test]
    fn single_command() {
        let r = parse("set(BOARD uno)\n");
        let cmds: Vec<_> = r.document.commands().collect();
        assert_eq!(cmds.len(), 1);
        let (_, cmd) = cmds[0];
        assert_eq!(cmd.name, "set");
        assert_eq!(cmd.args.len(), 2);
        assert_eq!(cmd.args[0].value, "BOARD");
        assert_eq!(cmd.args[1].value, "uno");
    }

    #[test]
    fn quoted_argument_value_strips_quotes() {
        let r = parse("set(X \"a b\")\n");
        let (_, cmd) = r.document.commands().next().unwrap();
        assert_eq!(cmd.args[1].value, "a b");
        assert_eq!(cmd.args[1].style, QuoteStyle::Quoted);
    }

    #[test]
    fn bracket_argument_value_strips_delimiters() {
        let r = parse("set(X [=[a]=])\n");
        let (_, cmd) = r.document.commands().next().unwrap();
        assert_eq!(cmd.args[1].value, "a");
        assert_eq!(cmd.args[1].style, QuoteStyle::Bracketed);
    }

    #[test]
    fn blank_lines_and_comments_are_nodes() {
        let r = parse("# header\n\nset(X 1)\n");
        let kinds: Vec<_> = r
            .document
            .nodes
            .iter()
            .map(|n| match n {
                Node::Comment { .. } => "comment",
                Node::BlankLine { .. } => "blank",
                Node::LineEnding { .. } => "eol",
                Node::Command { .. } => "command",
                _ => "other",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["comment", "eol", "blank", "eol", "command", "eol"]
        );
    }

    #[test]
    fn commented_out_command_is_recognized() {
        let r = parse("# set(BOARD mega)\n");
        let inactive = r
            .document
            .nodes
            .iter()
            .find_map(Node::as_commented_out)
            .unwrap();
        assert_eq!(inactive.name, "set");
        assert_eq!(inactive.args[1].value, "mega");
    }

    #[test]
    fn commented_out_command_keeps_its_trailing_comment() {
        let r = parse("# set(BOARD uno) # why\n");
        let Node::CommentedOut {
            command, trailing, ..
        } = &r.document.nodes[0]
        else {
            panic!("expected commented-out command node");
        };
        assert_eq!(command.name, "set");
        assert_eq!(command.args[1].value, "uno");
        assert_eq!(r.document.text_of(trailing), " # why");
    }

    #[test]
    fn prose_comment_is_not_a_command() {
        let r = parse("# set the board below\n");
        assert!(r.document.nodes.iter().all(|n| n.as_commented_out().is_none()));
    }

    #[test]
    fn comment_with_trailing_text_after_paren_is_prose() {
        let r = parse("# set(BOARD uno) old value\n");
        assert!(r.document.nodes.iter().all(|n| n.as_commented_out().is_none()));
    }

    #[test]
    fn trailing_comment_stays_with_command() {
        let r = parse("set(X 1) # why\n");
        let Node::Command { trailing, .. } = &r.document.nodes[0] else {
            panic!("expected command node");
        };
        assert_eq!(r.document.text_of(trailing), " # why");
    }

    #[test]
    fn multi_line_command() {
        let r = parse("set(SRCS\n  a.c\n  b.c)\n");
        let (_, cmd) = r.document.commands().next().unwrap();
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.args[2].value, "b.c");
    }

    #[test]
    fn nested_parens_stay_in_one_command() {
        let r = parse("if(NOT (A AND B))\n");
        assert_eq!(r.document.commands().count(), 1);
    }

    #[test]
    fn unbalanced_paren_is_salvaged() {
        let r = parse("set(X 1\nproject(p)\n");
        // Everything from `set` onward becomes opaque.
        assert!(r
            .diagnostics
            .iter()
            .any(|d| d.id == codes::PARSE_UNBALANCED_PAREN));
        assert!(matches!(r.document.nodes.last(), Some(Node::Opaque { .. })));
    }

    #[test]
    fn unbalanced_paren_strict_is_fatal() {
        let opts = ParseOptions {
            strict: true,
            ..ParseOptions::default()
        };
        let err = parse_with_options("set(X 1", &opts).unwrap_err();
        assert!(matches!(err, SyntaxError::Unbalanced { offset: 3 }));
    }

    #[test]
    fn word_without_parens_is_opaque() {
        let r = parse("orphan\nset(X 1)\n");
        assert!(r
            .diagnostics
            .iter()
            .any(|d| d.id == codes::PARSE_MISSING_PAREN));
        assert!(matches!(r.document.nodes[0], Node::Opaque { .. }));
        assert_eq!(r.document.commands().count(), 1);
    }

    #[test]
    fn empty_document_info() {
        let r = parse("# only a comment\n");
        assert!(r
            .diagnostics
            .iter()
            .any(|d| d.id == codes::PARSE_EMPTY_DOCUMENT));
    }

    #[test]
    fn line_ending_auto_detects_crlf() {
        let r = parse("set(X 1)\r\n");
        assert_eq!(r.document.line_ending, LineEndingStyle::CrLf);
    }

    #[test]
    fn line_ending_fixed_overrides_detection() {
        let opts = ParseOptions {
            line_ending: LineEndingPolicy::Fixed(LineEndingStyle::CrLf),
            ..ParseOptions::default()
        };
        let r = parse_with_options("set(X 1)\n", &opts).unwrap();
        assert_eq!(r.document.line_ending, LineEndingStyle::CrLf);
    }

    #[test]
    fn retain_comments_off_drops_comment_lines() {
        let opts = ParseOptions {
            retain_comments: false,
            ..ParseOptions::default()
        };
        let r = parse_with_options("# gone\nset(X 1)\n", &opts).unwrap();
        assert!(r
            .document
            .nodes
            .iter()
            .all(|n| !matches!(n, Node::Comment { .. })));
        // The comment's line terminator is dropped with it.
        assert_eq!(
            r.document
                .nodes
                .iter()
                .filter(|n| matches!(n, Node::LineEnding { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn retain_blank_lines_off_drops_blanks() {
        let opts = ParseOptions {
            retain_blank_lines: false,
            ..ParseOptions::default()
        };
        let r = parse_with_options("set(X 1)\n\n\nset(Y 2)\n", &opts).unwrap();
        assert!(r
            .document
            .nodes
            .iter()
            .all(|n| !matches!(n, Node::BlankLine { .. })));
    }

    #[test]
    fn retain_commented_out_off_keeps_plain_comment() {
        let opts = ParseOptions {
            retain_commented_out: false,
            ..ParseOptions::default()
        };
        let r = parse_with_options("# set(BOARD uno)\n", &opts).unwrap();
        assert!(matches!(r.document.nodes[0], Node::Comment { .. }));
    }

    #[test]
    fn retain_argument_separators_off_clears_spans() {
        let opts = ParseOptions {
            retain_argument_separators: false,
            ..ParseOptions::default()
        };
        let r = parse_with_options("set(X 1)\n", &opts).unwrap();
        let (_, cmd) = r.document.commands().next().unwrap();
        assert!(cmd.args.iter().all(|a| a.span.is_none()));
    }

    #[test]
    fn unterminated_quote_is_fatal() {
        let err = parse_str("set(X \"oops\n").unwrap_err();
        assert!(matches!(err, SyntaxError::Lex(LexError::UnterminatedQuote { .. })));
    }

    #[test]
    fn file_without_final_newline() {
        let r = parse("set(X 1)");
        assert_eq!(r.document.commands().count(), 1);
        assert!(!matches!(r.document.nodes.last(), Some(Node::LineEnding { .. })));
    }

    #[test]
    fn indentation_is_leading_text() {
        let r = parse("    set(X 1)\n");
        let Node::Command { leading, .. } = &r.document.nodes[0] else {
            panic!("expected command node");
        };
        assert_eq!(r.document.text_of(leading), "    ");
    }
}
