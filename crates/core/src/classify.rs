//! Slot classification.
//!
//! Walks a parsed document and maps each command (active or commented-out)
//! to the catalog slot it encodes. Catalog order is matching priority: the
//! first entry whose command name and anchor patterns accept the command
//! wins, so more specific catalog entries must precede broader ones.

use std::collections::BTreeMap;

use cmakedit_catalog::{SlotCatalog, SlotEntry};
use cmakedit_diagnostics::{Diagnostic, Span, codes};

use crate::grammar::{Command, Document, Node, NodeText};

/// Node indices of the commands matched to one slot.
#[derive(Debug, Default, Clone)]
pub struct SlotMatches {
    /// Active command nodes, in source order.
    pub active: Vec<usize>,
    /// Commented-out command nodes, in source order.
    pub inactive: Vec<usize>,
}

/// The result of classifying a document against a catalog.
#[derive(Debug, Default)]
pub struct Classification {
    /// Matches per slot id. Slots with no matching command are absent.
    pub by_slot: BTreeMap<String, SlotMatches>,
    /// Slot id per matched node index.
    node_slots: BTreeMap<usize, String>,
    /// Diagnostics raised while classifying (duplicate active matches).
    pub diagnostics: Vec<Diagnostic>,
}

impl Classification {
    /// The slot id the node at `index` was matched to, if any.
    pub fn slot_of(&self, index: usize) -> Option<&str> {
        self.node_slots.get(&index).map(String::as_str)
    }

    /// The matches for one slot, if any command matched it.
    pub fn matches_for(&self, slot_id: &str) -> Option<&SlotMatches> {
        self.by_slot.get(slot_id)
    }
}

/// Find the first catalog slot that accepts this command.
pub fn match_slot<'c>(catalog: &'c SlotCatalog, command: &Command) -> Option<&'c SlotEntry> {
    let args: Vec<&str> = command.args.iter().map(|a| a.value.as_str()).collect();
    catalog
        .slots()
        .iter()
        .find(|slot| slot.matches(&command.name, &args))
}

/// The current value a command carries for its slot: the arguments past the
/// anchors, joined with single spaces.
pub fn slot_value(command: &Command, slot: &SlotEntry) -> String {
    command.args[slot.value_index()..]
        .iter()
        .map(|a| a.value.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Classify every command in the document against the catalog.
pub fn classify(doc: &Document, catalog: &SlotCatalog) -> Classification {
    let mut result = Classification::default();
    for (index, node) in doc.nodes.iter().enumerate() {
        let (command, active) = match node {
            Node::Command { command, .. } => (command, true),
            Node::CommentedOut { command, .. } => (command, false),
            _ => continue,
        };
        let Some(slot) = match_slot(catalog, command) else {
            continue;
        };
        let matches = result.by_slot.entry(slot.id.clone()).or_default();
        if active {
            matches.active.push(index);
        } else {
            matches.inactive.push(index);
        }
        result.node_slots.insert(index, slot.id.clone());
    }

    for (slot_id, matches) in &result.by_slot {
        if matches.active.len() > 1 {
            let span = first_source_span(doc, matches.active[0]);
            result.diagnostics.push(
                Diagnostic::warn(
                    codes::CLASSIFY_DUPLICATE_SLOT,
                    format!(
                        "{} active commands match slot {slot_id}; the last one wins",
                        matches.active.len()
                    ),
                    span,
                )
                .with_context(BTreeMap::from([
                    ("slot".to_string(), slot_id.clone()),
                    ("count".to_string(), matches.active.len().to_string()),
                ])),
            );
        }
    }
    result
}

/// The variable map: slot id → current value, taken from the *last* active
/// command of each slot (matching the duplicate-resolution rule).
pub fn variable_map(doc: &Document, catalog: &SlotCatalog) -> BTreeMap<String, String> {
    let classification = classify(doc, catalog);
    let mut map = BTreeMap::new();
    for (slot_id, matches) in &classification.by_slot {
        let Some(&index) = matches.active.last() else {
            continue;
        };
        let Some(command) = doc.nodes[index].as_command() else {
            continue;
        };
        let Some(slot) = catalog.slot_by_id(slot_id) else {
            continue;
        };
        map.insert(slot_id.clone(), slot_value(command, slot));
    }
    map
}

fn first_source_span(doc: &Document, index: usize) -> Option<Span> {
    let command = doc.nodes[index].as_command()?;
    match &command.text {
        NodeText::Source(span) => Some(*span),
        NodeText::Synth(_) => None,
    }
}
