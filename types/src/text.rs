//! Small pure text helpers.

/// Number of leading whitespace characters (not bytes).
#[must_use]
pub fn leading_whitespace(s: &str) -> usize {
    s.chars().take_while(|c| c.is_whitespace()).count()
}

/// Number of trailing whitespace characters (not bytes).
#[must_use]
pub fn trailing_whitespace(s: &str) -> usize {
    s.chars().rev().take_while(|c| c.is_whitespace()).count()
}
