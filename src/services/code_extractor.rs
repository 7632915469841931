//! Verification-code extraction from retrieved email bodies.
//!
//! The upstream sender gives no markup guarantees, so recovery runs a fixed
//! priority order of pattern rules: an explicit "verification code is"
//! phrase, the character-spaced digit style one known template uses, a
//! six-digit run that is an element's sole text content, and finally any
//! standalone six-digit number.

use once_cell::sync::Lazy;
use regex::Regex;

/// Compiled rules, tried in order; the first capture wins.
static CODE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"验证码[是为：:]\s*(\d{6})").expect("regex: code phrase"),
        Regex::new(r"letter-spacing:\s*2px[^>]*>(\d{6})<").expect("regex: spaced digits"),
        Regex::new(r">(\d{6})<").expect("regex: element text"),
        Regex::new(r"\b(\d{6})\b").expect("regex: bare digits"),
    ]
});

/// Recover a six-digit verification code from an email body.
///
/// Pure function of its input, no I/O. Returns `None` when no rule matches.
pub fn extract_code(body: &str) -> Option<String> {
    CODE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(body)
            .and_then(|caps| caps.get(1))
            .map(|code| code.as_str().to_string())
    })
}
