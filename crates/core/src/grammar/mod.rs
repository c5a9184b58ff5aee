//! Lexing, parsing, the document model, and rendering.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod render;

pub use ast::{
    Argument, Command, Document, LineEndingStyle, Node, NodeText, QuoteStyle,
};
pub use lexer::{LexError, TokKind, Token, tokenize};
pub use parser::{
    LineEndingPolicy, ParseOptions, ParseResult, SyntaxError, parse_str, parse_with_options,
};
pub use render::{RenderConfig, RenderResult, render, render_with_config};
