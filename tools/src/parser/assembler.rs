//! Parser for `vasm`-style assembler output.
//!
//! One diagnostic per line, no state carried between lines:
//!
//! ```text
//! error 2 in line 12 of "src/main.s": unknown mnemonic <mvoe>
//! >        mvoe.l d0,d1
//! fatal error 13 : could not open <hardware/custom.i> for input
//! ```

use std::sync::OnceLock;

use asmbuild_types::{CheckResult, Severity};
use regex::Regex;

use super::{OutputParser, output_lines};

fn located_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(error|warning|message)\s(\d+)\sin\sline\s(\d+)\sof\s"(.+)":\s*(.*)"#)
            .expect("located pattern is valid")
    })
}

fn unlocated_error_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"error\s(\d+)\s*:\s*(.*)").expect("error pattern is valid"))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AssemblerParser;

impl AssemblerParser {
    fn parse_line(line: &str) -> Option<CheckResult> {
        if let Some(caps) = located_pattern().captures(line) {
            let kind = &caps[1];
            let line_number: i64 = caps[3].parse().ok()?;
            return Some(CheckResult::located(
                &caps[4],
                line_number,
                format!("{kind} {}: {}", &caps[2], &caps[5]),
                Severity::from_label(kind),
            ));
        }
        if unlocated_error_pattern().is_match(line) {
            return Some(CheckResult::global(line, Severity::Error));
        }
        None
    }
}

impl OutputParser for AssemblerParser {
    fn parse(&self, text: &str) -> Vec<CheckResult> {
        output_lines(text)
            // Short lines are noise; `>` lines echo the offending source.
            .filter(|line| line.len() > 1 && !line.starts_with('>'))
            .filter_map(Self::parse_line)
            .collect()
    }
}
