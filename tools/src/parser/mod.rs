//! Parsers turning raw tool output into [`CheckResult`]s.
//!
//! The assembler and linker print unrelated grammars, so each gets its own
//! [`OutputParser`] implementation rather than sharing a base.

mod assembler;
mod linker;

pub use assembler::AssemblerParser;
pub use linker::LinkerParser;

use asmbuild_types::CheckResult;

/// Converts captured tool text into diagnostics. Must be pure.
pub trait OutputParser: Send + Sync {
    fn parse(&self, text: &str) -> Vec<CheckResult>;
}

/// Split on `\n`, dropping a trailing `\r` left by tools that print CRLF.
fn output_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line))
}
