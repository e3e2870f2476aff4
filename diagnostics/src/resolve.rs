//! Locating line-less diagnostics inside the document that was built.

use std::sync::OnceLock;

use asmbuild_types::{CheckResult, Document};
use regex::{Regex, RegexBuilder};

fn bracketed_name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r".*<(.+)>").expect("bracketed name pattern is valid"))
}

/// Matches an `include "<name>` directive at the start of a line.
fn include_directive(name: &str) -> Option<Regex> {
    RegexBuilder::new(&format!(r#"^\s*include\s+"{}"#, regex::escape(name)))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Anchor global results to the `include` line that caused them.
///
/// A global result whose message names a file in angle brackets (typically
/// "could not open <hardware/custom.i>") gets the 1-based line of the first
/// matching `include` directive in `doc`. Results with an empty `file` are
/// attributed to `doc`. Anything still unresolved stays global.
pub fn resolve_global_errors(doc: &dyn Document, results: &mut [CheckResult]) {
    for result in results.iter_mut() {
        if result.is_global()
            && let Some(caps) = bracketed_name_pattern().captures(&result.msg)
            && let Some(directive) = include_directive(&caps[1])
        {
            let found = (0..doc.line_count())
                .find(|&index| doc.line(index).is_some_and(|text| directive.is_match(text)));
            if let Some(index) = found {
                result.line = i64::try_from(index + 1).unwrap_or(i64::MAX);
                tracing::debug!(line = result.line, "Resolved global diagnostic to include");
            }
        }
        if result.file.is_empty() {
            result.file = doc.path().display().to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use asmbuild_types::{CheckResult, Severity, TextDocument};

    use super::resolve_global_errors;

    fn doc() -> TextDocument {
        TextDocument::new(
            "/work/main.s",
            "\tINCLUDE \"exec/types.i\"\n  include \"hardware/custom.i\"\nstart:\n\tinclude \"hardware/custom.i\"\n",
        )
    }

    #[test]
    fn finds_first_matching_include_line() {
        let mut results = [CheckResult::global(
            "fatal error 13 : could not open <hardware/custom.i> for input",
            Severity::Error,
        )];
        resolve_global_errors(&doc(), &mut results);
        assert_eq!(results[0].line, 2);
        assert_eq!(results[0].file, "/work/main.s");
    }

    #[test]
    fn match_is_case_insensitive() {
        let mut results = [CheckResult::global(
            "could not open <exec/types.i>",
            Severity::Error,
        )];
        resolve_global_errors(&doc(), &mut results);
        assert_eq!(results[0].line, 1);
    }

    #[test]
    fn metacharacters_in_name_are_literal() {
        let doc = TextDocument::new("/work/a.s", " include \"a+b.i\"\n include \"aab.i\"\n");
        let mut results = [CheckResult::global("could not open <a+b.i>", Severity::Error)];
        resolve_global_errors(&doc, &mut results);
        assert_eq!(results[0].line, 1);

        let mut results = [CheckResult::global("could not open <a.b.i>", Severity::Error)];
        resolve_global_errors(&doc, &mut results);
        assert_eq!(results[0].line, 0);
    }

    #[test]
    fn unmatched_stays_global_but_gets_file() {
        let mut results = [
            CheckResult::global("could not open <missing.i>", Severity::Error),
            CheckResult::global("error 9 : out of memory", Severity::Error),
        ];
        resolve_global_errors(&doc(), &mut results);
        assert!(results.iter().all(CheckResult::is_global));
        assert!(results.iter().all(|r| r.file == "/work/main.s"));
    }

    #[test]
    fn located_results_are_untouched() {
        let mut results = [CheckResult::located(
            "other.s",
            7,
            "see <hardware/custom.i>",
            Severity::Warning,
        )];
        resolve_global_errors(&doc(), &mut results);
        assert_eq!(results[0].line, 7);
        assert_eq!(results[0].file, "other.s");
    }
}
