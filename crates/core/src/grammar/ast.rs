//! Document model for round-trip editing.
//!
//! The model is an arena of slices: every node holds either a [`Span`] into
//! the original source text or a synthesized string. Rendering a freshly
//! parsed document concatenates the original slices back together, which
//! makes the unmodified round trip byte-exact by construction. Only nodes
//! touched by a patch carry [`NodeText::Synth`] text.

use cmakedit_diagnostics::Span;
use serde::Serialize;

/// Line-ending convention of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEndingStyle {
    /// Unix `\n`.
    Lf,
    /// Windows `\r\n`.
    CrLf,
}

impl LineEndingStyle {
    /// The literal line-terminator text for this style.
    pub fn as_str(self) -> &'static str {
        match self {
            LineEndingStyle::Lf => "\n",
            LineEndingStyle::CrLf => "\r\n",
        }
    }
}

/// How an argument was written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    /// Bare word, no delimiters.
    Bare,
    /// Surrounded by double quotes.
    Quoted,
    /// A `[[...]]` (or `[=[...]=]`) bracket argument.
    Bracketed,
}

/// The backing text of a node: either a slice of the original source or a
/// synthesized replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeText {
    /// Byte range in the document's source string.
    Source(Span),
    /// Replacement text produced by a patch.
    Synth(String),
}

impl NodeText {
    /// True if this text was synthesized by a patch rather than taken from
    /// the source.
    pub fn is_synth(&self) -> bool {
        matches!(self, NodeText::Synth(_))
    }
}

/// One argument of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    /// The argument's semantic value, without quote or bracket delimiters
    /// and without unescaping (escape sequences are preserved verbatim).
    pub value: String,
    /// How the argument was delimited in the source.
    pub style: QuoteStyle,
    /// Byte span of the argument in the source, delimiters included.
    /// `None` when separator retention is disabled or the argument was
    /// synthesized.
    pub span: Option<Span>,
}

impl Argument {
    /// A bare synthesized argument with no source span.
    pub fn bare(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            style: QuoteStyle::Bare,
            span: None,
        }
    }
}

/// A parsed command: a name plus its argument list, with the full original
/// text (name through closing parenthesis) kept for verbatim re-emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name exactly as written (case preserved).
    pub name: String,
    /// Arguments in source order.
    pub args: Vec<Argument>,
    /// Full text of the command from the first byte of the name through the
    /// closing parenthesis.
    pub text: NodeText,
}

/// One element of a document, in source order.
///
/// Concatenating every node's text (leading whitespace, body, trailing
/// whitespace, line endings) reproduces the source byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// An active command, with the indentation before it and any trailing
    /// same-line whitespace or comment after it.
    Command {
        /// Indentation and other whitespace preceding the command on its line.
        leading: NodeText,
        /// The command itself.
        command: Command,
        /// Same-line text after the closing parenthesis (spaces, a trailing
        /// comment), excluding the line ending.
        trailing: NodeText,
    },
    /// A comment line whose body parses as a complete command. The command
    /// is semantically inactive but tracked so a slot can recognize its
    /// commented-out instances.
    CommentedOut {
        /// Indentation preceding the comment marker.
        leading: NodeText,
        /// The `#` marker and any spaces between it and the command text.
        marker: NodeText,
        /// The parsed inactive command.
        command: Command,
        /// Same-line text after the command, excluding the line ending.
        trailing: NodeText,
    },
    /// A comment line that does not contain a command.
    Comment {
        /// Indentation preceding the `#`.
        leading: NodeText,
        /// The comment text from `#` to end of line (line ending excluded).
        text: NodeText,
    },
    /// A line containing only whitespace (possibly none). The line ending
    /// itself is a separate [`Node::LineEnding`].
    BlankLine {
        /// The whitespace content of the line, possibly empty.
        text: NodeText,
    },
    /// A line terminator.
    LineEnding {
        /// The terminator text (`"\n"` or `"\r\n"`).
        text: NodeText,
        /// Which convention this terminator uses.
        style: LineEndingStyle,
    },
    /// Text the parser could not interpret. Preserved verbatim, never
    /// matched to a slot, never patched.
    Opaque {
        /// The raw text.
        text: NodeText,
    },
}

impl Node {
    /// The active command carried by this node, if any.
    pub fn as_command(&self) -> Option<&Command> {
        match self {
            Node::Command { command, .. } => Some(command),
            _ => None,
        }
    }

    /// The commented-out command carried by this node, if any.
    pub fn as_commented_out(&self) -> Option<&Command> {
        match self {
            Node::CommentedOut { command, .. } => Some(command),
            _ => None,
        }
    }
}

/// A parsed document: the original source plus the node list that tiles it.
#[derive(Debug, Clone)]
pub struct Document {
    /// The original source text. Spans in [`NodeText::Source`] index into
    /// this string.
    pub source: String,
    /// The dominant line-ending convention, used when synthesizing new
    /// lines.
    pub line_ending: LineEndingStyle,
    /// Nodes in source order.
    pub nodes: Vec<Node>,
}

impl Document {
    /// Resolve a [`NodeText`] to its string content.
    pub fn text_of<'a>(&'a self, text: &'a NodeText) -> &'a str {
        match text {
            NodeText::Source(span) => &self.source[span.start..span.end],
            NodeText::Synth(s) => s,
        }
    }

    /// Iterate over the active commands in source order together with their
    /// node indices.
    pub fn commands(&self) -> impl Iterator<Item = (usize, &Command)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_command().map(|c| (i, c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_ending_text() {
        assert_eq!(LineEndingStyle::Lf.as_str(), "\n");
        assert_eq!(LineEndingStyle::CrLf.as_str(), "\r\n");
    }

    #[test]
    fn text_of_resolves_both_variants() {
        let doc = Document {
            source: "set(X 1)".into(),
            line_ending: LineEndingStyle::Lf,
            nodes: vec![],
        };
        assert_eq!(doc.text_of(&NodeText::Source(Span::new(0, 3))), "set");
        assert_eq!(doc.text_of(&NodeText::Synth("hi".into())), "hi");
    }

    #[test]
    fn synth_detection() {
        assert!(NodeText::Synth(String::new()).is_synth());
        assert!(!NodeText::Source(Span::empty(0)).is_synth());
    }
}
