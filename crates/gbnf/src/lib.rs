//! Compiler for GBNF grammars, the BNF dialect used to constrain sampling in llama.cpp.
//!
//! [`Grammar::parse`] turns source text into a table of rules indexed by [`RuleId`] in which
//! every reference is resolved. Repetition operators and groups with several alternatives are
//! expanded into generated helper rules named `_<rule>_<n>`. The table can then be printed
//! back to source with [`Grammar::print`] or flattened for a matcher with [`Grammar::flatten`]
//! and [`Grammar::to_raw`].

mod check;
pub mod error;
mod flatten;
mod grammar;
mod lexer;
pub mod linemap;
mod literal;
mod options;
mod parser;
mod printer;
pub mod span;
mod symbols;

pub use error::{Error, LexErrorKind, Location, ParseErrorKind};
pub use flatten::{FlatRules, RawRules};
pub use grammar::{Grammar, Rule, RuleOrigin, Symbol, Synthesized};
pub use options::{LeftRecursion, ParseOptions};
pub use symbols::{SymbolTable, RESERVED_PREFIX};

pub use gbnf_runtime::{CharRange, CharSet, Element, ElementType, RawElement, RuleId};
