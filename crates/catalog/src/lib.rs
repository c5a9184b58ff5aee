//! Slot catalog for cmakedit.
//!
//! A *slot* is a named semantic configuration point (board, CPU, upload port,
//! project name, …) mapped to one specific command pattern in a CMake-style
//! file. The catalog is static configuration data: an ordered list of
//! [`SlotEntry`] values, each pairing a matcher rule (command name plus
//! anchor-argument patterns) with a render template and an insertion group.
//! Catalog order encodes matching priority — the classifier tries entries in
//! declaration order and the first match wins.
//!
//! The built-in [`SlotCatalog::arduino`] table covers Arduino CMake projects;
//! alternative catalogs can be loaded from JSON via [`SlotCatalog::from_json`].

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use thiserror::Error;

/// Current format version for the catalog JSON schema.
pub const CATALOG_FORMAT_VERSION: &str = "1.0.0";

/// Errors raised by catalog loading and validation.
///
/// These are configuration/programmer errors: a catalog that fails
/// validation must never be handed to the patcher, so validation runs at
/// load time, before any document is processed.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// JSON deserialization failed.
    #[error("invalid catalog JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The catalog contains no slots.
    #[error("catalog contains no slots")]
    Empty,

    /// Two slots share the same id.
    #[error("duplicate slot id: {id}")]
    DuplicateSlot {
        /// The offending slot id.
        id: String,
    },

    /// A slot has an empty command name.
    #[error("slot {id} has an empty command name")]
    EmptyCommandName {
        /// The offending slot id.
        id: String,
    },

    /// A slot's anchor pattern has empty match text.
    #[error("slot {id} has an anchor pattern with empty text")]
    EmptyAnchorText {
        /// The offending slot id.
        id: String,
    },

    /// A slot's template has no `{value}` placeholder, so a synthesized
    /// command could never carry the desired value.
    #[error("slot {id} template {template:?} has no {{value}} placeholder")]
    MissingValuePlaceholder {
        /// The offending slot id.
        id: String,
        /// The template text.
        template: String,
    },
}

/// Logical insertion group for a slot.
///
/// Commands belonging to the same group cluster together in a well-formed
/// file; the patcher inserts a synthesized command after the last existing
/// member of its group. Variant order is the canonical group order within a
/// document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SlotGroup {
    /// Toolchain and language setup (`cmake_minimum_required`, toolchain file).
    Preamble,
    /// Project identity (`set(PROJECT_NAME …)`, `project(…)`).
    Project,
    /// Board hardware selection (board, CPU).
    Board,
    /// Sketch and source lists.
    Build,
    /// Upload transport (programmer, port, flags, speed).
    Upload,
    /// Library declarations and subdirectories.
    Libraries,
    /// Target generation commands.
    Generate,
}

impl std::fmt::Display for SlotGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SlotGroup::Preamble => "preamble",
            SlotGroup::Project => "project",
            SlotGroup::Board => "board",
            SlotGroup::Build => "build",
            SlotGroup::Upload => "upload",
            SlotGroup::Libraries => "libraries",
            SlotGroup::Generate => "generate",
        };
        write!(f, "{s}")
    }
}

/// Pattern matched against one anchor argument of a command.
///
/// Anchor arguments are the leading arguments that identify *which* slot a
/// command encodes (e.g. the variable name in `set(CMAKE_CXX_STANDARD 11)`);
/// the arguments after the anchors carry the slot's value. Anchors match
/// exactly (argument text is case-sensitive — CMake variable names are).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArgPattern {
    /// Argument must equal the given text.
    Exact(String),
    /// Argument must start with the given text.
    Prefix(String),
    /// Argument must end with the given text.
    Suffix(String),
    /// Any argument matches.
    Any,
}

impl ArgPattern {
    /// Test whether `arg` satisfies this pattern.
    pub fn matches(&self, arg: &str) -> bool {
        match self {
            ArgPattern::Exact(text) => arg == text,
            ArgPattern::Prefix(text) => arg.starts_with(text.as_str()),
            ArgPattern::Suffix(text) => arg.ends_with(text.as_str()),
            ArgPattern::Any => true,
        }
    }

    /// The pattern's match text, if it has one.
    fn text(&self) -> Option<&str> {
        match self {
            ArgPattern::Exact(t) | ArgPattern::Prefix(t) | ArgPattern::Suffix(t) => Some(t),
            ArgPattern::Any => None,
        }
    }
}

/// Render template for synthesizing a slot's command text.
///
/// The template is the full command text with a `{value}` placeholder, e.g.
/// `set(${CMAKE_PROJECT_NAME}_BOARD {value})`. Rendering substitutes the
/// desired value; quoting is the caller's concern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Template(pub String);

/// Placeholder substituted with the slot value when rendering a template.
pub const VALUE_PLACEHOLDER: &str = "{value}";

impl Template {
    /// Create a template from its text.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Substitute the `{value}` placeholder with `value`.
    pub fn render(&self, value: &str) -> String {
        self.0.replace(VALUE_PLACEHOLDER, value)
    }

    /// True if the template carries a `{value}` placeholder.
    pub fn has_value_placeholder(&self) -> bool {
        self.0.contains(VALUE_PLACEHOLDER)
    }
}

/// One slot: matcher rule plus render template plus insertion group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotEntry {
    /// Stable slot identifier (e.g. `"SET_BOARD"`). Settings maps are keyed
    /// by these ids.
    pub id: String,
    /// Command name this slot matches. CMake command names are
    /// case-insensitive, so matching ignores ASCII case.
    pub command: String,
    /// Patterns for the leading (anchor) arguments. A command matches only
    /// if it has at least `anchors.len()` arguments and each anchor pattern
    /// accepts the argument at its position. Arguments past the anchors are
    /// the slot's value.
    #[serde(default)]
    pub anchors: Vec<ArgPattern>,
    /// Template for synthesizing a new command for this slot.
    pub template: Template,
    /// Insertion group.
    pub group: SlotGroup,
    /// Default value used by reset-to-defaults policies, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl SlotEntry {
    /// Test whether a command with `name` and `args` encodes this slot.
    pub fn matches(&self, name: &str, args: &[&str]) -> bool {
        if !name.eq_ignore_ascii_case(&self.command) {
            return false;
        }
        if args.len() < self.anchors.len() {
            return false;
        }
        self.anchors
            .iter()
            .zip(args.iter())
            .all(|(pat, arg)| pat.matches(arg))
    }

    /// Number of leading anchor arguments; the value starts at this index.
    pub fn value_index(&self) -> usize {
        self.anchors.len()
    }
}

/// The ordered slot catalog.
///
/// Slot order is matching priority (first match wins), so more specific
/// entries must precede broader ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotCatalog {
    /// Catalog format version for compatibility checks.
    #[serde(default = "default_format_version")]
    pub format_version: String,
    /// All slots, in priority order.
    pub slots: Vec<SlotEntry>,

    /// Cached map from slot id → index into `slots` (lazily initialized).
    #[serde(skip)]
    slot_map: OnceLock<HashMap<String, usize>>,
}

fn default_format_version() -> String {
    CATALOG_FORMAT_VERSION.to_string()
}

impl SlotCatalog {
    /// Create a catalog from a slot list and validate it.
    pub fn new(slots: Vec<SlotEntry>) -> Result<Self, CatalogError> {
        let catalog = Self {
            format_version: default_format_version(),
            slots,
            slot_map: OnceLock::new(),
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load and validate a catalog from JSON text.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Validate catalog invariants.
    ///
    /// Rejects empty catalogs, duplicate slot ids, empty command names,
    /// empty anchor-pattern text, and templates without a `{value}`
    /// placeholder. Run once at load time; the patcher assumes a validated
    /// catalog.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.slots.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen: HashSet<&str> = HashSet::new();
        for slot in &self.slots {
            if !seen.insert(&slot.id) {
                return Err(CatalogError::DuplicateSlot {
                    id: slot.id.clone(),
                });
            }
            if slot.command.trim().is_empty() {
                return Err(CatalogError::EmptyCommandName {
                    id: slot.id.clone(),
                });
            }
            if slot
                .anchors
                .iter()
                .any(|a| a.text().is_some_and(str::is_empty))
            {
                return Err(CatalogError::EmptyAnchorText {
                    id: slot.id.clone(),
                });
            }
            if !slot.template.has_value_placeholder() {
                return Err(CatalogError::MissingValuePlaceholder {
                    id: slot.id.clone(),
                    template: slot.template.0.clone(),
                });
            }
        }
        Ok(())
    }

    /// Slots in priority order.
    pub fn slots(&self) -> &[SlotEntry] {
        &self.slots
    }

    /// Look up a slot by id. Uses a cached map for O(1) lookup.
    pub fn slot_by_id(&self, id: &str) -> Option<&SlotEntry> {
        self.slot_map().get(id).map(|&i| &self.slots[i])
    }

    fn slot_map(&self) -> &HashMap<String, usize> {
        self.slot_map.get_or_init(|| {
            self.slots
                .iter()
                .enumerate()
                .map(|(i, s)| (s.id.clone(), i))
                .collect()
        })
    }

    /// The built-in catalog for Arduino CMake projects.
    ///
    /// Slot ids follow the historical names used by Arduino project
    /// generators (`SET_BOARD`, `SET_CPU`, `PROJECT`, …). Entry order is
    /// both matching priority and the canonical command order within a
    /// generated file.
    pub fn arduino() -> Self {
        let exact = |t: &str| ArgPattern::Exact(t.to_string());
        let suffix = |t: &str| ArgPattern::Suffix(t.to_string());
        let slot = |id: &str,
                    command: &str,
                    anchors: Vec<ArgPattern>,
                    template: &str,
                    group: SlotGroup| SlotEntry {
            id: id.to_string(),
            command: command.to_string(),
            anchors,
            template: Template::new(template),
            group,
            default: None,
        };

        let slots = vec![
            slot(
                "CMAKE_MINIMUM_REQUIRED_VERSION",
                "cmake_minimum_required",
                vec![exact("VERSION")],
                "cmake_minimum_required(VERSION {value})",
                SlotGroup::Preamble,
            ),
            slot(
                "SET_CMAKE_TOOLCHAIN_FILE",
                "set",
                vec![exact("CMAKE_TOOLCHAIN_FILE")],
                "set(CMAKE_TOOLCHAIN_FILE {value})",
                SlotGroup::Preamble,
            ),
            slot(
                "SET_CMAKE_CXX_STANDARD",
                "set",
                vec![exact("CMAKE_CXX_STANDARD")],
                "set(CMAKE_CXX_STANDARD {value})",
                SlotGroup::Preamble,
            ),
            slot(
                "SET_PROJECT_NAME",
                "set",
                vec![exact("PROJECT_NAME")],
                "set(PROJECT_NAME {value})",
                SlotGroup::Project,
            ),
            slot(
                "PROJECT",
                "project",
                Vec::new(),
                "project({value})",
                SlotGroup::Project,
            ),
            slot(
                "SET_BOARD",
                "set",
                vec![suffix("BOARD")],
                "set(${CMAKE_PROJECT_NAME}_BOARD {value})",
                SlotGroup::Board,
            ),
            slot(
                "SET_CPU",
                "set",
                vec![exact("ARDUINO_CPU")],
                "set(ARDUINO_CPU {value})",
                SlotGroup::Board,
            ),
            slot(
                "SET_SKETCH",
                "set",
                vec![suffix("SKETCH")],
                "set(${CMAKE_PROJECT_NAME}_SKETCH {value})",
                SlotGroup::Build,
            ),
            slot(
                "SET_HDRS",
                "set",
                vec![suffix("HDRS")],
                "set(${CMAKE_PROJECT_NAME}_HDRS {value})",
                SlotGroup::Build,
            ),
            slot(
                "SET_SRCS",
                "set",
                vec![suffix("SRCS")],
                "set(${CMAKE_PROJECT_NAME}_SRCS {value})",
                SlotGroup::Build,
            ),
            slot(
                "SET_PROGRAMMER",
                "set",
                vec![suffix("PROGRAMMER")],
                "set(${CMAKE_PROJECT_NAME}_PROGRAMMER {value})",
                SlotGroup::Upload,
            ),
            slot(
                "SET_PORT",
                "set",
                vec![suffix("PORT")],
                "set(${CMAKE_PROJECT_NAME}_PORT {value})",
                SlotGroup::Upload,
            ),
            slot(
                "SET_AFLAGS",
                "set",
                vec![suffix("AFLAGS")],
                "set(${CMAKE_PROJECT_NAME}_AFLAGS {value})",
                SlotGroup::Upload,
            ),
            slot(
                "SET_UPLOAD_SPEED",
                "set",
                vec![suffix(".upload_speed")],
                "set(${CMAKE_PROJECT_NAME}.upload_speed {value})",
                SlotGroup::Upload,
            ),
            slot(
                "LIB_NAME",
                "set",
                vec![exact("LIB_NAME")],
                "set(LIB_NAME {value})",
                SlotGroup::Libraries,
            ),
            slot(
                "SET_LIB_NAME_RECURSE",
                "set",
                vec![suffix("_RECURSE")],
                "set(${LIB_NAME}_RECURSE {value})",
                SlotGroup::Libraries,
            ),
            slot(
                "LINK_DIRECTORIES",
                "link_directories",
                Vec::new(),
                "link_directories({value})",
                SlotGroup::Libraries,
            ),
            slot(
                "ADD_SUBDIRECTORY",
                "add_subdirectory",
                Vec::new(),
                "add_subdirectory({value})",
                SlotGroup::Libraries,
            ),
            slot(
                "GENERATE_ARDUINO_LIBRARY",
                "generate_arduino_library",
                Vec::new(),
                "generate_arduino_library({value})",
                SlotGroup::Generate,
            ),
            slot(
                "GENERATE_ARDUINO_FIRMWARE",
                "generate_arduino_firmware",
                Vec::new(),
                "generate_arduino_firmware({value})",
                SlotGroup::Generate,
            ),
        ];

        Self::new(slots).expect("built-in arduino catalog must validate")
    }
}
