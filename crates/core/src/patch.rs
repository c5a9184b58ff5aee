//! The patcher: applies a settings map to a document under a policy.
//!
//! Patching is local by construction. Each slot named in the settings map is
//! located via the classifier; its command's value arguments are spliced in
//! place using the original source slices, so bytes outside the touched
//! region are never re-rendered. Slots with no active command are
//! synthesized from their catalog template and inserted next to their group.

use std::collections::{BTreeMap, BTreeSet};

use cmakedit_catalog::{CatalogError, SlotCatalog, SlotEntry, SlotGroup};
use cmakedit_diagnostics::{Diagnostic, codes};
use thiserror::Error;

use crate::classify::{Classification, classify, slot_value};
use crate::grammar::parser::parse_command_text;
use crate::grammar::{Argument, Command, Document, Node, NodeText, QuoteStyle};

/// Desired slot values, keyed by slot id.
pub type SettingsMap = BTreeMap<String, String>;

/// Policy knobs controlling how the settings map is applied.
#[derive(Debug, Clone)]
pub struct PatchPolicy {
    /// Insert a synthesized command for slots that have no active instance.
    /// When off, only existing commands are updated.
    pub set_or_add: bool,
    /// Comment out (or remove, see `suppress_commented`) active commands
    /// whose slot is absent from the settings map. Slots with a catalog
    /// default are set to that default instead.
    pub reset_to_defaults: bool,
    /// Slot ids whose unwanted commands are deleted outright during a reset
    /// instead of being commented out.
    pub suppress_commented: BTreeSet<String>,
    /// Bypass patching entirely and leave the document untouched.
    pub use_unmodified_original: bool,
}

impl Default for PatchPolicy {
    fn default() -> Self {
        Self {
            set_or_add: true,
            reset_to_defaults: false,
            suppress_commented: BTreeSet::new(),
            use_unmodified_original: false,
        }
    }
}

/// Fatal patch failure.
///
/// Everything recoverable is reported through diagnostics instead; these
/// variants mean the catalog itself is unusable.
#[derive(Debug, Error)]
pub enum PatchError {
    /// The catalog failed validation.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// A slot's template rendered to text that does not parse as a command.
    #[error("template for slot {id} does not render to a parseable command")]
    Template {
        /// The offending slot id.
        id: String,
    },
}

/// Apply a settings map to the document.
///
/// Returns the diagnostics describing every change made (and every change
/// skipped), in a deterministic order: classification warnings and duplicate
/// collapses first, then unknown-key warnings, then per-slot changes in
/// catalog order, then reset actions.
pub fn apply_patch(
    doc: &mut Document,
    settings: &SettingsMap,
    policy: &PatchPolicy,
    catalog: &SlotCatalog,
) -> Result<Vec<Diagnostic>, PatchError> {
    catalog.validate()?;
    if policy.use_unmodified_original {
        return Ok(Vec::new());
    }

    let mut diags = Vec::new();
    diags.extend(classify(doc, catalog).diagnostics);
    collapse_duplicates(doc, catalog, &mut diags);

    for key in settings.keys() {
        if catalog.slot_by_id(key).is_none() {
            diags.push(
                Diagnostic::warn(
                    codes::PATCH_UNKNOWN_SLOT,
                    format!("settings key {key} does not name a catalog slot; ignored"),
                    None,
                )
                .with_context(BTreeMap::from([("key".to_string(), key.clone())])),
            );
        }
    }

    // Catalog order keeps multi-slot insertions in canonical command order.
    for slot in catalog.slots() {
        let Some(value) = settings.get(&slot.id) else {
            continue;
        };
        apply_slot(doc, slot, value, policy, catalog, &mut diags)?;
    }

    if policy.reset_to_defaults {
        reset_unlisted(doc, settings, policy, catalog, &mut diags)?;
    }

    Ok(diags)
}

/// Collapse duplicate active matches for every classified slot: the last
/// instance in source order stays active, earlier ones are commented out.
/// Runs before any settings are applied, so untouched slots end up with at
/// most one active instance too.
fn collapse_duplicates(doc: &mut Document, catalog: &SlotCatalog, diags: &mut Vec<Diagnostic>) {
    let duplicated: Vec<(String, Vec<usize>)> = classify(doc, catalog)
        .by_slot
        .into_iter()
        .filter(|(_, m)| m.active.len() > 1)
        .map(|(id, m)| (id, m.active))
        .collect();
    for (slot_id, active) in duplicated {
        if let Some((_, earlier)) = active.split_last() {
            for &index in earlier {
                comment_out(doc, index, &slot_id, "duplicate", diags);
            }
        }
    }
}

/// Apply one slot's desired value: update the active instance (duplicates
/// were already collapsed) or synthesize a new command.
fn apply_slot(
    doc: &mut Document,
    slot: &SlotEntry,
    value: &str,
    policy: &PatchPolicy,
    catalog: &SlotCatalog,
    diags: &mut Vec<Diagnostic>,
) -> Result<(), PatchError> {
    let target = classify(doc, catalog)
        .matches_for(&slot.id)
        .and_then(|m| m.active.last().copied());

    if let Some(target) = target {
        update_value(doc, target, slot, value, diags)
    } else if policy.set_or_add {
        insert_command(doc, catalog, slot, value, diags)
    } else {
        Ok(())
    }
}

/// Comment out or delete active commands for slots the settings map does not
/// mention. Slots with a catalog default are set to it instead.
fn reset_unlisted(
    doc: &mut Document,
    settings: &SettingsMap,
    policy: &PatchPolicy,
    catalog: &SlotCatalog,
    diags: &mut Vec<Diagnostic>,
) -> Result<(), PatchError> {
    let unlisted: Vec<String> = classify(doc, catalog)
        .by_slot
        .iter()
        .filter(|(id, m)| !m.active.is_empty() && !settings.contains_key(*id))
        .map(|(id, _)| id.clone())
        .collect();

    for slot_id in unlisted {
        let Some(slot) = catalog.slot_by_id(&slot_id) else {
            continue;
        };
        if let Some(default) = slot.default.clone() {
            let slot = slot.clone();
            let target = classify(doc, catalog)
                .matches_for(&slot_id)
                .and_then(|m| m.active.last().copied());
            if let Some(target) = target {
                update_value(doc, target, &slot, &default, diags)?;
            }
            continue;
        }
        // Descending order keeps indices valid across removals.
        let mut active = classify(doc, catalog)
            .matches_for(&slot_id)
            .map(|m| m.active.clone())
            .unwrap_or_default();
        active.reverse();
        let suppress = policy.suppress_commented.contains(&slot_id);
        for index in active {
            if suppress {
                remove_node(doc, index, &slot_id, diags);
            } else {
                comment_out(doc, index, &slot_id, "reset", diags);
            }
        }
    }
    Ok(())
}

/// Splice a new value into the command at `index`, preserving every byte
/// outside the value region.
fn update_value(
    doc: &mut Document,
    index: usize,
    slot: &SlotEntry,
    value: &str,
    diags: &mut Vec<Diagnostic>,
) -> Result<(), PatchError> {
    let Some(command) = doc.nodes[index].as_command() else {
        return Ok(());
    };
    if slot_value(command, slot) == value {
        // Already the desired value; leave the bytes alone.
        return Ok(());
    }

    let vi = slot.value_index();
    let multi = command.args.len() > vi + 1;
    let style = command.args.get(vi).map(|a| a.style);
    let (rendered, new_args, upgraded) = format_value(value, style, multi);

    let spliced = splice_value(doc, command, vi, &rendered);
    let replacement = match spliced {
        Some(text) => {
            let mut args = command.args[..vi].to_vec();
            for arg in &mut args {
                arg.span = None;
            }
            args.extend(new_args);
            let mut cmd = command.clone();
            cmd.args = args;
            cmd.text = NodeText::Synth(text);
            cmd
        }
        None => {
            // No usable spans; fall back to the slot template.
            let text = slot.template.render(&rendered);
            parse_command_text(&text).ok_or_else(|| PatchError::Template {
                id: slot.id.clone(),
            })?
        }
    };

    if upgraded {
        diags.push(
            Diagnostic::warn(
                codes::PATCH_QUOTE_UPGRADED,
                format!("value for slot {} was quoted to keep it a single argument", slot.id),
                None,
            )
            .with_context(BTreeMap::from([
                ("slot".to_string(), slot.id.clone()),
                ("value".to_string(), value.to_string()),
            ])),
        );
    }

    if let Node::Command { command, .. } = &mut doc.nodes[index] {
        *command = replacement;
    }
    Ok(())
}

/// Build the replacement command text by splicing `rendered` over the value
/// region of the original source. Returns `None` when the spans needed for
/// splicing are unavailable.
fn splice_value(doc: &Document, command: &Command, vi: usize, rendered: &str) -> Option<String> {
    let NodeText::Source(cmd_span) = &command.text else {
        return None;
    };
    let (value_start, value_end, pad) = match command.args.get(vi) {
        Some(first) => {
            let first_span = first.span?;
            let last_span = command.args.last()?.span?;
            (first_span.start, last_span.end, false)
        }
        None => {
            // No value arguments yet: splice just before the ')'.
            let close = cmd_span.end - 1;
            let before = doc.source.as_bytes()[close - 1];
            (close, close, !matches!(before, b'(' | b' ' | b'\t'))
        }
    };
    let mut text = String::with_capacity(cmd_span.len() + rendered.len());
    text.push_str(&doc.source[cmd_span.start..value_start]);
    if pad {
        text.push(' ');
    }
    text.push_str(rendered);
    text.push_str(&doc.source[value_end..cmd_span.end]);
    Some(text)
}

/// Synthesize a command for the slot from its template and insert it next to
/// its group.
fn insert_command(
    doc: &mut Document,
    catalog: &SlotCatalog,
    slot: &SlotEntry,
    value: &str,
    diags: &mut Vec<Diagnostic>,
) -> Result<(), PatchError> {
    let rendered = if needs_quoting(value) {
        quote(value)
    } else {
        value.to_string()
    };
    let text = slot.template.render(&rendered);
    let command = parse_command_text(&text).ok_or_else(|| PatchError::Template {
        id: slot.id.clone(),
    })?;

    let classification = classify(doc, catalog);
    let at = insertion_index(doc, &classification, catalog, slot.group);

    let ending = || Node::LineEnding {
        text: NodeText::Synth(doc.line_ending.as_str().to_string()),
        style: doc.line_ending,
    };
    let mut inserted = Vec::with_capacity(3);
    if at > 0 && !matches!(doc.nodes[at - 1], Node::LineEnding { .. }) {
        // The previous line has no terminator (end of file without newline).
        inserted.push(ending());
    }
    inserted.push(Node::Command {
        leading: NodeText::Synth(String::new()),
        command,
        trailing: NodeText::Synth(String::new()),
    });
    inserted.push(ending());
    doc.nodes.splice(at..at, inserted);

    diags.push(
        Diagnostic::info(
            codes::PATCH_INSERTED,
            format!("inserted {} for slot {}", text.trim(), slot.id),
            None,
        )
        .with_context(BTreeMap::from([
            ("slot".to_string(), slot.id.clone()),
            ("value".to_string(), value.to_string()),
        ])),
    );
    Ok(())
}

/// Node index at which a new command for `group` should be inserted:
/// after the last command of the same group, else after the last command of
/// an earlier group, else before the first command of a later group, else at
/// the end of the document.
fn insertion_index(
    doc: &Document,
    classification: &Classification,
    catalog: &SlotCatalog,
    group: SlotGroup,
) -> usize {
    let mut last_same_or_earlier: Option<usize> = None;
    let mut last_same: Option<usize> = None;
    let mut first_later: Option<usize> = None;
    for index in 0..doc.nodes.len() {
        let Some(slot_id) = classification.slot_of(index) else {
            continue;
        };
        let Some(slot) = catalog.slot_by_id(slot_id) else {
            continue;
        };
        use std::cmp::Ordering;
        match slot.group.cmp(&group) {
            Ordering::Equal => {
                last_same = Some(index);
                last_same_or_earlier = Some(index);
            }
            Ordering::Less => last_same_or_earlier = Some(index),
            Ordering::Greater => {
                if first_later.is_none() {
                    first_later = Some(index);
                }
            }
        }
    }
    if let Some(index) = last_same.or(last_same_or_earlier) {
        after_line(doc, index)
    } else if let Some(index) = first_later {
        index
    } else {
        doc.nodes.len()
    }
}

/// The node index just past the line terminator following `index`.
fn after_line(doc: &Document, index: usize) -> usize {
    let next = index + 1;
    if matches!(doc.nodes.get(next), Some(Node::LineEnding { .. })) {
        next + 1
    } else {
        next
    }
}

/// Turn the active command at `index` into a commented-out one, in place.
fn comment_out(
    doc: &mut Document,
    index: usize,
    slot_id: &str,
    reason: &str,
    diags: &mut Vec<Diagnostic>,
) {
    let node = std::mem::replace(
        &mut doc.nodes[index],
        Node::BlankLine {
            text: NodeText::Synth(String::new()),
        },
    );
    let (leading, mut command, trailing) = match node {
        Node::Command {
            leading,
            command,
            trailing,
        } => (leading, command, trailing),
        other => {
            doc.nodes[index] = other;
            return;
        }
    };
    let summary = doc.text_of(&command.text).to_string();
    if summary.contains('\n') {
        // A single leading marker would leave continuation lines active;
        // every line of the command needs its own.
        command.text = NodeText::Synth(summary.replace('\n', "\n# "));
    }
    doc.nodes[index] = Node::CommentedOut {
        leading,
        marker: NodeText::Synth("# ".to_string()),
        command,
        trailing,
    };
    diags.push(
        Diagnostic::info(
            codes::PATCH_COMMENTED_OUT,
            format!("commented out {summary} ({reason})"),
            None,
        )
        .with_context(BTreeMap::from([
            ("slot".to_string(), slot_id.to_string()),
            ("reason".to_string(), reason.to_string()),
        ])),
    );
}

/// Delete the command node at `index` together with its line terminator.
fn remove_node(doc: &mut Document, index: usize, slot_id: &str, diags: &mut Vec<Diagnostic>) {
    let removed = doc.nodes.remove(index);
    if matches!(doc.nodes.get(index), Some(Node::LineEnding { .. })) {
        doc.nodes.remove(index);
    }
    let summary = match &removed {
        Node::Command { command, .. } => doc.text_of(&command.text).to_string(),
        _ => String::new(),
    };
    diags.push(
        Diagnostic::info(
            codes::PATCH_REMOVED,
            format!("removed {summary}"),
            None,
        )
        .with_context(BTreeMap::from([(
            "slot".to_string(),
            slot_id.to_string(),
        )])),
    );
}

/// Format a value for its destination argument position.
///
/// Returns the rendered text, the replacement argument list, and whether the
/// quoting style had to be upgraded from bare.
fn format_value(
    value: &str,
    style: Option<QuoteStyle>,
    multi: bool,
) -> (String, Vec<Argument>, bool) {
    if multi {
        // The original value was an argument list; keep it one.
        let args = value.split_whitespace().map(Argument::bare).collect();
        return (value.to_string(), args, false);
    }
    match style {
        Some(QuoteStyle::Quoted) => (
            quote(value),
            vec![Argument {
                value: value.to_string(),
                style: QuoteStyle::Quoted,
                span: None,
            }],
            false,
        ),
        Some(QuoteStyle::Bracketed) => (
            bracket(value),
            vec![Argument {
                value: value.to_string(),
                style: QuoteStyle::Bracketed,
                span: None,
            }],
            false,
        ),
        Some(QuoteStyle::Bare) | None => {
            if needs_quoting(value) {
                (
                    quote(value),
                    vec![Argument {
                        value: value.to_string(),
                        style: QuoteStyle::Quoted,
                        span: None,
                    }],
                    true,
                )
            } else {
                (value.to_string(), vec![Argument::bare(value)], false)
            }
        }
    }
}

/// True if a bare rendition of `value` would change the command's argument
/// structure.
fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '#' | '"' | '\\' | '[' | ']'))
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn bracket(value: &str) -> String {
    let mut eq = 0usize;
    while value.contains(&format!("]{}]", "=".repeat(eq))) {
        eq += 1;
    }
    let fence = "=".repeat(eq);
    format!("[{fence}[{value}]{fence}]")
}
