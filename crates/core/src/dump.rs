//! Debug dumps of the document model.
//!
//! Dumps are JSON snapshots meant for troubleshooting a patch run: the node
//! list before or after patching (with slot annotations), or the variable
//! map alone. They are diagnostic artifacts, never re-parsed.

use std::collections::BTreeMap;

use cmakedit_catalog::SlotCatalog;
use serde::Serialize;

use crate::classify::{classify, match_slot, slot_value};
use crate::grammar::{Document, Node};

/// Which dump to produce around a patch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DumpMode {
    /// No dump.
    #[default]
    None,
    /// Dump the node list before patching.
    ElementsBefore,
    /// Dump the node list after patching.
    ElementsAfter,
    /// Dump the variable map (slot id → current value).
    VariableMap,
}

/// One entry in an elements dump.
#[derive(Debug, Serialize)]
pub struct ElementDump {
    /// Node index in document order.
    pub index: usize,
    /// Node kind name.
    pub kind: &'static str,
    /// The node's full text as it would render.
    pub text: String,
    /// Slot id this node's command matched, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
    /// Current slot value carried by the command, if it matched a slot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// True when the node carries synthesized (patched) text.
    pub synthesized: bool,
}

/// Dump every node of the document with slot annotations.
pub fn dump_elements(doc: &Document, catalog: &SlotCatalog) -> Vec<ElementDump> {
    let classification = classify(doc, catalog);
    doc.nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let (kind, text, synthesized) = describe(doc, node);
            let slot = classification.slot_of(index).map(str::to_string);
            let value = node
                .as_command()
                .or_else(|| node.as_commented_out())
                .and_then(|cmd| match_slot(catalog, cmd).map(|s| slot_value(cmd, s)));
            ElementDump {
                index,
                kind,
                text,
                slot,
                value,
                synthesized,
            }
        })
        .collect()
}

/// Dump the variable map: slot id → current value of the last active
/// instance.
pub fn dump_variable_map(doc: &Document, catalog: &SlotCatalog) -> BTreeMap<String, String> {
    crate::classify::variable_map(doc, catalog)
}

/// Serialize a dump payload as pretty-printed JSON.
pub fn to_pretty_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

fn describe(doc: &Document, node: &Node) -> (&'static str, String, bool) {
    match node {
        Node::Command {
            leading,
            command,
            trailing,
        } => (
            "command",
            format!(
                "{}{}{}",
                doc.text_of(leading),
                doc.text_of(&command.text),
                doc.text_of(trailing)
            ),
            command.text.is_synth(),
        ),
        Node::CommentedOut {
            leading,
            marker,
            command,
            trailing,
        } => (
            "commented_out",
            format!(
                "{}{}{}{}",
                doc.text_of(leading),
                doc.text_of(marker),
                doc.text_of(&command.text),
                doc.text_of(trailing)
            ),
            marker.is_synth() || command.text.is_synth(),
        ),
        Node::Comment { leading, text } => (
            "comment",
            format!("{}{}", doc.text_of(leading), doc.text_of(text)),
            text.is_synth(),
        ),
        Node::BlankLine { text } => ("blank_line", doc.text_of(text).to_string(), text.is_synth()),
        Node::LineEnding { text, .. } => (
            "line_ending",
            doc.text_of(text).to_string(),
            text.is_synth(),
        ),
        Node::Opaque { text } => ("opaque", doc.text_of(text).to_string(), text.is_synth()),
    }
}
