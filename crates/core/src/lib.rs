//! Round-trip document engine for CMake-style command files.
//!
//! The engine parses a command file into a lossless document model, maps
//! commands to named configuration slots via a catalog, applies a settings
//! map under a policy, and renders the result so that only the touched
//! commands differ from the input.
//!
//! The pipeline stages live in their own modules:
//!
//! - [`grammar`] — lexer, parser, document model, renderer;
//! - [`classify`] — slot classification against a [`cmakedit_catalog::SlotCatalog`];
//! - [`patch`] — the patcher (settings map + policy);
//! - [`dump`] — JSON debug dumps of the model.
//!
//! ```
//! use cmakedit_core::{apply_patch, parse_str, render, PatchPolicy, SettingsMap};
//! use cmakedit_catalog::SlotCatalog;
//!
//! let mut doc = parse_str("set(BOARD uno)\n").unwrap().document;
//! let settings = SettingsMap::from([("SET_BOARD".to_string(), "mega".to_string())]);
//! let catalog = SlotCatalog::arduino();
//! apply_patch(&mut doc, &settings, &PatchPolicy::default(), &catalog).unwrap();
//! assert_eq!(render(&doc), "set(BOARD mega)\n");
//! ```

#![warn(missing_docs)]

pub mod classify;
pub mod dump;
pub mod grammar;
pub mod patch;

pub use classify::{
    Classification, SlotMatches, classify, match_slot, slot_value, variable_map,
};
pub use dump::{DumpMode, ElementDump, dump_elements, dump_variable_map, to_pretty_json};
pub use grammar::{
    Argument, Command, Document, LexError, LineEndingPolicy, LineEndingStyle, Node, NodeText,
    ParseOptions, ParseResult, QuoteStyle, RenderConfig, RenderResult, SyntaxError, parse_str,
    parse_with_options, render, render_with_config,
};
pub use patch::{PatchError, PatchPolicy, SettingsMap, apply_patch};
