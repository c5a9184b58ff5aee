//! `cmakedit` — command-line round-trip editor for CMake-style command
//! files. Parses a file without losing a byte, applies slot-level settings
//! changes, and writes back output in which only the touched commands
//! differ.

mod render;

use std::fs;

use std::process;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use cmakedit_catalog::SlotCatalog;
use cmakedit_core::{
    Document, DumpMode, ParseOptions, ParseResult, PatchPolicy, RenderConfig, SettingsMap,
    SyntaxError, apply_patch, dump_elements, dump_variable_map, parse_with_options,
    render_with_config, to_pretty_json,
};
use cmakedit_diagnostics::{self as diag, Diagnostic, Severity, Span, codes};

use crate::render::{Format, print_summary, render_diagnostics};

// ── CLI definition ──────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "cmakedit",
    version,
    about = "Round-trip editor for CMake-style command files — change settings, keep every other byte"
)]
struct Cli {
    /// Output mode: "pretty" for coloured terminal output, "json" for
    /// machine-readable JSON. Defaults to "pretty" when stdout is a TTY,
    /// "json" otherwise.
    #[arg(long, global = true, value_parser = ["pretty", "json"])]
    output: Option<String>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    // ── File analysis ───────────────────────────────────────────────
    /// Parse a command file and print its node list with slot annotations.
    Parse {
        file: String,
        /// Path to a catalog JSON file. When omitted, the built-in Arduino
        /// catalog is used.
        #[arg(long)]
        catalog: Option<String>,
    },

    /// Syntax-check a command file.
    SyntaxCheck {
        file: String,
        /// Fail on the first structural error instead of salvaging.
        #[arg(long)]
        strict: bool,
    },

    // ── File transformation ─────────────────────────────────────────
    /// Apply slot values to a command file, touching only the named slots.
    Apply {
        file: String,
        /// A slot assignment, SLOT=VALUE. Repeatable.
        #[arg(long = "set", value_name = "SLOT=VALUE")]
        set: Vec<String>,
        /// Path to a catalog JSON file (see `parse --help`).
        #[arg(long)]
        catalog: Option<String>,
        /// Only update existing commands; never insert new ones.
        #[arg(long)]
        update_only: bool,
        /// Comment out commands for slots not named by --set.
        #[arg(long)]
        reset: bool,
        /// With --reset, delete this slot's commands outright instead of
        /// commenting them out. Repeatable.
        #[arg(long = "suppress", value_name = "SLOT")]
        suppress: Vec<String>,
        /// Leave the file untouched (dry pipeline; useful with --dump).
        #[arg(long)]
        keep_original: bool,
        /// Write the result back to the file instead of stdout.
        #[arg(long, short)]
        write: bool,
        /// Print a debug dump around the patch.
        #[arg(long, value_enum)]
        dump: Option<DumpWhat>,
    },

    // ── Reference / informational ───────────────────────────────────
    /// Dump the document model or the variable map as JSON.
    Dump {
        file: String,
        /// Path to a catalog JSON file (see `parse --help`).
        #[arg(long)]
        catalog: Option<String>,
        /// What to dump.
        #[arg(long, value_enum, default_value_t = DumpWhat::Elements)]
        what: DumpWhat,
    },

    /// Print the active catalog as JSON (a starting point for custom ones).
    Catalog {
        /// Path to a catalog JSON file. When omitted, prints the built-in
        /// Arduino catalog.
        #[arg(long)]
        catalog: Option<String>,
    },

    /// Explain a diagnostic ID (e.g. CMK1301).
    Explain { id: String },
}

/// What `apply --dump` and `dump --what` produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DumpWhat {
    /// The node list before patching.
    Before,
    /// The node list after patching.
    After,
    /// The variable map (slot id → current value).
    Variables,
    /// Alias for the node list (standalone `dump`).
    Elements,
}

impl From<DumpWhat> for DumpMode {
    fn from(w: DumpWhat) -> Self {
        match w {
            DumpWhat::Before | DumpWhat::Elements => DumpMode::ElementsBefore,
            DumpWhat::After => DumpMode::ElementsAfter,
            DumpWhat::Variables => DumpMode::VariableMap,
        }
    }
}

// ── Main ────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let format = Format::resolve_or_detect(cli.output.as_deref());

    match cli.cmd {
        Cmd::Parse { file, catalog } => cmd_parse(&file, catalog.as_deref(), format)?,
        Cmd::SyntaxCheck { file, strict } => cmd_syntax_check(&file, strict, format)?,
        Cmd::Apply {
            file,
            set,
            catalog,
            update_only,
            reset,
            suppress,
            keep_original,
            write,
            dump,
        } => {
            let policy = PatchPolicy {
                set_or_add: !update_only,
                reset_to_defaults: reset,
                suppress_commented: suppress.into_iter().collect(),
                use_unmodified_original: keep_original,
            };
            cmd_apply(&file, &set, catalog.as_deref(), &policy, write, dump, format)?;
        }
        Cmd::Dump {
            file,
            catalog,
            what,
        } => cmd_dump(&file, catalog.as_deref(), what, format)?,
        Cmd::Catalog { catalog } => cmd_catalog(catalog.as_deref())?,
        Cmd::Explain { id } => cmd_explain(&id, format)?,
    }

    Ok(())
}

// ── Commands ────────────────────────────────────────────────────────────

fn cmd_parse(file: &str, catalog_path: Option<&str>, format: Format) -> Result<()> {
    let input = fs::read_to_string(file)?;
    let catalog = resolve_catalog(catalog_path);
    let res = parse_or_report(&input, file, false, format);
    let nodes = dump_elements(&res.document, &catalog);

    match format {
        Format::Json => {
            // Single valid JSON object to stdout.
            let out = serde_json::json!({
                "nodes": nodes,
                "diagnostics": res.diagnostics,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Pretty => {
            // Node dump to stdout, diagnostics to stderr.
            println!("{}", to_pretty_json(&nodes)?);
            if !res.diagnostics.is_empty() {
                render_diagnostics(&input, file, &res.diagnostics, format);
                print_summary(&res.diagnostics);
            }
        }
    }

    exit_on_errors(&res.diagnostics);
    Ok(())
}

fn cmd_syntax_check(file: &str, strict: bool, format: Format) -> Result<()> {
    let input = fs::read_to_string(file)?;
    let res = parse_or_report(&input, file, strict, format);
    let ok = !res
        .diagnostics
        .iter()
        .any(|d| matches!(d.severity, Severity::Error));

    match format {
        Format::Json => {
            let out = serde_json::json!({
                "ok": ok,
                "diagnostics": res.diagnostics,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Pretty => {
            render_diagnostics(&input, file, &res.diagnostics, format);
            print_summary(&res.diagnostics);
            if ok {
                eprintln!("syntax ok");
            }
        }
    }

    exit_on_errors(&res.diagnostics);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_apply(
    file: &str,
    set: &[String],
    catalog_path: Option<&str>,
    policy: &PatchPolicy,
    write: bool,
    dump: Option<DumpWhat>,
    format: Format,
) -> Result<()> {
    let input = fs::read_to_string(file)?;
    let catalog = resolve_catalog(catalog_path);
    let settings = parse_settings(set)?;

    let dump = dump.map(DumpMode::from);
    let mut res = parse_or_report(&input, file, false, format);
    if dump == Some(DumpMode::ElementsBefore) {
        print_dump(&res.document, &catalog, DumpMode::ElementsBefore)?;
    }

    let patch_diags = apply_patch(&mut res.document, &settings, policy, &catalog)
        .with_context(|| format!("failed to apply settings to '{file}'"))?;
    res.diagnostics.extend(patch_diags);

    let rendered = render_with_config(&res.document, &RenderConfig::default());
    res.diagnostics.extend(rendered.warnings);

    match dump {
        Some(mode @ (DumpMode::ElementsAfter | DumpMode::VariableMap)) => {
            print_dump(&res.document, &catalog, mode)?;
        }
        _ => {}
    }

    let changed = rendered.text != input;
    if write {
        if changed {
            fs::write(file, &rendered.text)?;
        }
        let status = if changed { "patched" } else { "unchanged" };
        match format {
            Format::Json => {
                let out = serde_json::json!({
                    "status": status,
                    "file": file,
                    "changed": changed,
                    "diagnostics": res.diagnostics,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            }
            Format::Pretty => {
                render_diagnostics(&input, file, &res.diagnostics, format);
                print_summary(&res.diagnostics);
                eprintln!("{status}: {file}");
            }
        }
    } else {
        match format {
            Format::Json => {
                let out = serde_json::json!({
                    "changed": changed,
                    "output": rendered.text,
                    "diagnostics": res.diagnostics,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            }
            Format::Pretty => {
                // Patched document to stdout, diagnostics to stderr.
                print!("{}", rendered.text);
                render_diagnostics(&input, file, &res.diagnostics, format);
                print_summary(&res.diagnostics);
            }
        }
    }

    exit_on_errors(&res.diagnostics);
    Ok(())
}

fn cmd_dump(
    file: &str,
    catalog_path: Option<&str>,
    what: DumpWhat,
    format: Format,
) -> Result<()> {
    let input = fs::read_to_string(file)?;
    let catalog = resolve_catalog(catalog_path);
    let res = parse_or_report(&input, file, false, format);

    let json = match DumpMode::from(what) {
        DumpMode::VariableMap => to_pretty_json(&dump_variable_map(&res.document, &catalog))?,
        _ => to_pretty_json(&dump_elements(&res.document, &catalog))?,
    };
    println!("{json}");

    exit_on_errors(&res.diagnostics);
    Ok(())
}

fn cmd_catalog(catalog_path: Option<&str>) -> Result<()> {
    let catalog = resolve_catalog(catalog_path);
    println!("{}", serde_json::to_string_pretty(&catalog)?);
    Ok(())
}

fn cmd_explain(id: &str, format: Format) -> Result<()> {
    match format {
        Format::Json => {
            let text = diag::explain(id);
            let out = serde_json::json!({
                "id": id,
                "explanation": text,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Pretty => {
            // Explanation is the expected output — write to stdout, not stderr.
            if let Some(text) = diag::explain(id) {
                use ariadne::Fmt;
                println!("{}: {}", id.fg(ariadne::Color::Cyan), text);
            } else {
                println!("{}: (no explanation available)", id);
            }
        }
    }
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────────────

/// Exit with code 1 if any diagnostic is an error.
/// Warnings and info do not cause a non-zero exit.
fn exit_on_errors(diagnostics: &[Diagnostic]) {
    if diagnostics
        .iter()
        .any(|d| matches!(d.severity, Severity::Error))
    {
        process::exit(1);
    }
}

/// Resolve the catalog from an explicit `--catalog` path, or fall back to
/// the built-in Arduino catalog.
fn resolve_catalog(explicit_path: Option<&str>) -> SlotCatalog {
    let Some(path) = explicit_path else {
        return SlotCatalog::arduino();
    };
    let json = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("error: failed to read catalog file '{}': {}", path, e);
        process::exit(1);
    });
    SlotCatalog::from_json(&json).unwrap_or_else(|e| {
        eprintln!("error: invalid catalog file '{}': {}", path, e);
        process::exit(1);
    })
}

/// Parse repeated `--set SLOT=VALUE` arguments into a settings map.
fn parse_settings(pairs: &[String]) -> Result<SettingsMap> {
    let mut settings = SettingsMap::new();
    for pair in pairs {
        let Some((slot, value)) = pair.split_once('=') else {
            bail!("invalid --set argument '{pair}': expected SLOT=VALUE");
        };
        if slot.is_empty() {
            bail!("invalid --set argument '{pair}': empty slot id");
        }
        settings.insert(slot.to_string(), value.to_string());
    }
    Ok(settings)
}

/// Parse input, or render the fatal syntax error and exit 1.
fn parse_or_report(input: &str, file: &str, strict: bool, format: Format) -> ParseResult {
    let opts = ParseOptions {
        strict,
        ..ParseOptions::default()
    };
    match parse_with_options(input, &opts) {
        Ok(res) => res,
        Err(err) => {
            let d = syntax_error_diagnostic(&err);
            render_diagnostics(input, file, &[d], format);
            process::exit(1);
        }
    }
}

fn syntax_error_diagnostic(err: &SyntaxError) -> Diagnostic {
    match err {
        SyntaxError::Lex(lex) => {
            Diagnostic::error(lex.code(), lex.to_string(), Some(Span::empty(lex.offset())))
        }
        SyntaxError::Unbalanced { offset } => Diagnostic::error(
            codes::PARSE_UNBALANCED_PAREN,
            err.to_string(),
            Some(Span::empty(*offset)),
        ),
    }
}

/// Debug dumps go to stderr so they never mix with the patched document on
/// stdout.
fn print_dump(doc: &Document, catalog: &SlotCatalog, mode: DumpMode) -> Result<()> {
    let (label, json) = match mode {
        DumpMode::VariableMap => (
            "variables",
            to_pretty_json(&dump_variable_map(doc, catalog))?,
        ),
        DumpMode::ElementsAfter => (
            "elements (after)",
            to_pretty_json(&dump_elements(doc, catalog))?,
        ),
        _ => (
            "elements (before)",
            to_pretty_json(&dump_elements(doc, catalog))?,
        ),
    };
    eprintln!("--- dump: {label} ---");
    eprintln!("{json}");
    Ok(())
}
