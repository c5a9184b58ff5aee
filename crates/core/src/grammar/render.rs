//! Document rendering.
//!
//! Rendering concatenates node text in order. Nodes that still carry their
//! original source spans reproduce the input byte for byte; only nodes a
//! patch replaced with synthesized text differ from the source. Locality is
//! therefore structural, not best-effort.

use cmakedit_diagnostics::{Diagnostic, codes};

use super::ast::{Document, Node, NodeText};

/// Rendering conventions checked on synthesized output.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Maximum line length before a [`codes::RENDER_LINE_TOO_LONG`] warning
    /// is raised. Only synthesized lines are checked; original lines are
    /// the author's business.
    pub max_line_len: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { max_line_len: 120 }
    }
}

/// Rendered text plus any convention warnings.
#[derive(Debug)]
pub struct RenderResult {
    /// The rendered document.
    pub text: String,
    /// Warnings about synthesized output (overlong lines).
    pub warnings: Vec<Diagnostic>,
}

/// Render a document to text.
pub fn render(doc: &Document) -> String {
    let mut out = String::with_capacity(doc.source.len());
    for node in &doc.nodes {
        emit(doc, node, &mut out, None);
    }
    out
}

/// Render with convention checks on synthesized lines.
pub fn render_with_config(doc: &Document, config: &RenderConfig) -> RenderResult {
    let mut out = String::with_capacity(doc.source.len());
    // Byte ranges of the output that came from synthesized text.
    let mut synth_ranges: Vec<(usize, usize)> = Vec::new();
    for node in &doc.nodes {
        emit(doc, node, &mut out, Some(&mut synth_ranges));
    }

    let mut warnings = Vec::new();
    let mut line_start = 0usize;
    for line in out.split_inclusive('\n') {
        let line_end = line_start + line.len();
        let touched = synth_ranges
            .iter()
            .any(|&(s, e)| s < line_end && e > line_start);
        if touched {
            let visible = line.trim_end_matches(['\n', '\r']);
            let len = visible.chars().count();
            if len > config.max_line_len {
                warnings.push(Diagnostic::warn(
                    codes::RENDER_LINE_TOO_LONG,
                    format!(
                        "synthesized line is {len} characters, over the {}-character convention",
                        config.max_line_len
                    ),
                    None,
                ));
            }
        }
        line_start = line_end;
    }

    RenderResult {
        text: out,
        warnings,
    }
}

fn emit(
    doc: &Document,
    node: &Node,
    out: &mut String,
    mut synth_ranges: Option<&mut Vec<(usize, usize)>>,
) {
    let mut push = |text: &NodeText| {
        let start = out.len();
        out.push_str(doc.text_of(text));
        if text.is_synth()
            && let Some(ranges) = synth_ranges.as_deref_mut()
        {
            ranges.push((start, out.len()));
        }
    };
    match node {
        Node::Command {
            leading,
            command,
            trailing,
        } => {
            push(leading);
            push(&command.text);
            push(trailing);
        }
        Node::CommentedOut {
            leading,
            marker,
            command,
            trailing,
        } => {
            push(leading);
            push(marker);
            push(&command.text);
            push(trailing);
        }
        Node::Comment { leading, text } => {
            push(leading);
            push(text);
        }
        Node::BlankLine { text }
        | Node::LineEnding { text, .. }
        | Node::Opaque { text } => push(text),
    }
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse_str;
    use super::*;

    #[test]
    fn untouched_document_renders_byte_identical() {
        let input = "# header\r\n\r\nset(BOARD uno)  # board\r\nproject(${PROJECT_NAME})\r\n";
        let doc = parse_str(input).unwrap().document;
        assert_eq!(render(&doc), input);
    }

    #[test]
    fn opaque_salvage_renders_byte_identical() {
        let input = "orphan word line\nset(X 1)\n";
        let doc = parse_str(input).unwrap().document;
        assert_eq!(render(&doc), input);
    }

    #[test]
    fn no_warning_for_long_original_lines() {
        let long = format!("set(X {})\n", "a".repeat(200));
        let doc = parse_str(&long).unwrap().document;
        let result = render_with_config(&doc, &RenderConfig::default());
        assert!(result.warnings.is_empty());
        assert_eq!(result.text, long);
    }

    #[test]
    fn warning_for_long_synthesized_line() {
        use crate::grammar::ast::{Node, NodeText};
        let mut doc = parse_str("set(X 1)\n").unwrap().document;
        let long = format!("set(X {})", "a".repeat(200));
        if let Node::Command { command, .. } = &mut doc.nodes[0] {
            command.text = NodeText::Synth(long);
        }
        let result = render_with_config(&doc, &RenderConfig::default());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].id, codes::RENDER_LINE_TOO_LONG);
    }

    #[test]
    fn short_synthesized_line_passes() {
        use crate::grammar::ast::{Node, NodeText};
        let mut doc = parse_str("set(X 1)\n").unwrap().document;
        if let Node::Command { command, .. } = &mut doc.nodes[0] {
            command.text = NodeText::Synth("set(X 2)".into());
        }
        let result = render_with_config(&doc, &RenderConfig::default());
        assert!(result.warnings.is_empty());
        assert_eq!(result.text, "set(X 2)\n");
    }
}
