//! Parser for `vlink`-style linker output.
//!
//! The linker interleaves diagnostics with banners, blank lines and section
//! listings, and may wrap a long message onto indented follow-up lines:
//!
//! ```text
//! error 21 : main.o (CODE+0x12): Reference to undefined symbol
//!     _custom.
//! warning 5 in line 2 of "main.s": oh no
//! ```
//!
//! A recognized header opens a message; indented lines extend it; a blank
//! line or any other text closes it. Unrecognized lines never stop the scan.

use std::sync::OnceLock;

use asmbuild_types::{CheckResult, Severity};
use regex::Regex;

use super::{OutputParser, output_lines};

fn located_warning_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\bwarning\s+(\d+)\s+in\s+line\s+(\d+)\s+of\s+"(.+)":\s*(.*)"#)
            .expect("warning pattern is valid")
    })
}

fn error_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\berror\s+(\d+)\s*:\s*(.*)").expect("error pattern is valid"))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LinkerParser;

impl LinkerParser {
    fn parse_header(line: &str) -> Option<CheckResult> {
        if let Some(caps) = located_warning_pattern().captures(line) {
            let line_number: i64 = caps[2].parse().ok()?;
            return Some(CheckResult::located(
                &caps[3],
                line_number,
                format!("warning {}: {}", &caps[1], &caps[4]),
                Severity::Warning,
            ));
        }
        if error_pattern().is_match(line) {
            return Some(CheckResult::global(line.trim_end(), Severity::Error));
        }
        None
    }
}

impl OutputParser for LinkerParser {
    fn parse(&self, text: &str) -> Vec<CheckResult> {
        let mut results = Vec::new();
        let mut open: Option<CheckResult> = None;

        for line in output_lines(text) {
            if let Some(header) = Self::parse_header(line) {
                results.extend(open.replace(header));
                continue;
            }
            if line.trim().is_empty() {
                results.extend(open.take());
                continue;
            }
            if line.starts_with(char::is_whitespace)
                && let Some(current) = open.as_mut()
            {
                current.msg.push(' ');
                current.msg.push_str(line.trim());
                continue;
            }
            // Noise closes the current message but the scan goes on.
            results.extend(open.take());
        }

        results.extend(open);
        results
    }
}

#[cfg(test)]
mod tests {
    use asmbuild_types::Severity;

    use super::{LinkerParser, OutputParser};

    #[test]
    fn empty_string_has_no_errors() {
        assert!(LinkerParser.parse("").is_empty());
    }

    #[test]
    fn parses_errors_between_noise() {
        let errors = LinkerParser.parse(
            "error 3 : This is not good\n\nnothing\nerror 5 : This is not good too\nwarning 5 in line 2 of \"myfile\": oh no",
        );
        assert_eq!(errors.len(), 3);

        assert_eq!(errors[0].msg, "error 3 : This is not good");
        assert_eq!(errors[0].severity, Severity::Error);

        assert_eq!(errors[1].msg, "error 5 : This is not good too");
        assert_eq!(errors[1].severity, Severity::Error);

        assert_eq!(errors[2].msg, "warning 5: oh no");
        assert_eq!(errors[2].severity, Severity::Warning);
        assert_eq!(errors[2].line, 2);
        assert_eq!(errors[2].file, "myfile");
    }

    #[test]
    fn indented_lines_continue_the_open_message() {
        let errors = LinkerParser.parse(
            "error 21 : main.o (CODE+0x12): Reference to undefined symbol\n    _custom.\nvlink done\n    stray indent",
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].msg,
            "error 21 : main.o (CODE+0x12): Reference to undefined symbol _custom."
        );
    }

    #[test]
    fn blank_line_closes_message() {
        let errors = LinkerParser.parse("error 1 : first\n\n    not a continuation\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].msg, "error 1 : first");
    }

    #[test]
    fn noise_only_yields_nothing() {
        let text = "vlink 0.16c (c)1997-2019 by Frank Wille\nCreating Amiga hunk executable\n\n";
        assert!(LinkerParser.parse(text).is_empty());
    }

    #[test]
    fn consecutive_headers_each_emit() {
        let errors = LinkerParser.parse("Error 8 : a\nError 9 : b");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1].msg, "Error 9 : b");
        assert_eq!(errors[1].severity, Severity::Error);
    }
}
