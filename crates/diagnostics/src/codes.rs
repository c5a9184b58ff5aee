//! Diagnostic ID constants.
//!
//! Every diagnostic produced by the parser, classifier, patcher, or renderer
//! carries one of these stable IDs. Use the constants instead of string
//! literals to get compile-time typo detection and IDE autocomplete.
//!
//! ID ranges:
//! - `CMK01xx` — lexer
//! - `CMK11xx` — parser
//! - `CMK12xx` — classifier
//! - `CMK13xx` — patcher
//! - `CMK14xx` — renderer

/// Unterminated quoted argument at end of input.
pub const LEX_UNTERMINATED_QUOTE: &str = "CMK0101";
/// Unterminated bracket argument (`[[...]]`) at end of input.
pub const LEX_UNTERMINATED_BRACKET: &str = "CMK0102";

/// Command with an unbalanced parenthesis.
pub const PARSE_UNBALANCED_PAREN: &str = "CMK1101";
/// Text outside of any command, comment, or blank line.
pub const PARSE_STRAY_CONTENT: &str = "CMK1102";
/// Input contained no commands at all.
pub const PARSE_EMPTY_DOCUMENT: &str = "CMK1103";
/// Command name is not followed by an argument list.
pub const PARSE_MISSING_PAREN: &str = "CMK1104";

/// More than one active command matched the same slot.
pub const CLASSIFY_DUPLICATE_SLOT: &str = "CMK1201";

/// A settings key did not name any slot in the catalog.
pub const PATCH_UNKNOWN_SLOT: &str = "CMK1301";
/// A new command was inserted for a slot with no active instance.
pub const PATCH_INSERTED: &str = "CMK1302";
/// An existing command was commented out.
pub const PATCH_COMMENTED_OUT: &str = "CMK1303";
/// An existing command was deleted under the suppress-commented policy.
pub const PATCH_REMOVED: &str = "CMK1304";
/// An argument's quoting style was upgraded to fit the new value.
pub const PATCH_QUOTE_UPGRADED: &str = "CMK1305";

/// A synthesized line exceeds the configured line-length convention.
pub const RENDER_LINE_TOO_LONG: &str = "CMK1401";

/// Returns the human-readable explanation for a diagnostic code, if known.
pub(crate) fn explain_code(id: &str) -> Option<&'static str> {
    let text = match id {
        LEX_UNTERMINATED_QUOTE => {
            "A quoted argument was opened with '\"' but the closing quote was never \
             found before the end of the file. The file cannot be round-tripped safely."
        }
        LEX_UNTERMINATED_BRACKET => {
            "A bracket argument (e.g. [[...]] or [=[...]=]) was opened but its matching \
             closing bracket was never found before the end of the file."
        }
        PARSE_UNBALANCED_PAREN => {
            "A command's argument list was opened with '(' but never closed. In strict \
             mode this aborts parsing; in permissive mode the remainder of the file is \
             preserved as opaque text."
        }
        PARSE_STRAY_CONTENT => {
            "Text was found outside of any command, comment, or blank line. It is \
             preserved verbatim but will never be matched to a slot or patched."
        }
        PARSE_EMPTY_DOCUMENT => {
            "The input contained no commands. Patching with set-or-add enabled will \
             synthesize commands from the catalog templates."
        }
        PARSE_MISSING_PAREN => {
            "A word at the start of a line was not followed by a parenthesized argument \
             list, so it cannot be a command. It is preserved as opaque text."
        }
        CLASSIFY_DUPLICATE_SLOT => {
            "Two or more active commands matched the same slot. The patcher keeps the \
             last one in source order and comments out the earlier ones."
        }
        PATCH_UNKNOWN_SLOT => {
            "A key in the settings map does not name any slot in the catalog, so it was \
             ignored. Check the slot id against the catalog."
        }
        PATCH_INSERTED => {
            "No active command existed for this slot, so a new command was synthesized \
             from the catalog template and inserted next to its group."
        }
        PATCH_COMMENTED_OUT => {
            "This slot is present in the document but absent from the settings map \
             under reset-to-defaults, so its command was commented out in place."
        }
        PATCH_REMOVED => {
            "This slot is listed in the suppress-commented set, so its unwanted command \
             was deleted outright instead of being commented out."
        }
        PATCH_QUOTE_UPGRADED => {
            "The new value does not fit the argument's original quoting style (for \
             example it contains whitespace), so the argument was minimally re-quoted."
        }
        RENDER_LINE_TOO_LONG => {
            "A synthesized command line exceeds the configured line-length convention. \
             The output is still valid; consider a shorter value."
        }
        _ => return None,
    };
    Some(text)
}
