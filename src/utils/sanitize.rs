// Identifier sanitization
//
// Values coming from the CI environment (actor names, workflow names, refs)
// end up in session names, tags and log lines. Anything outside the allowed
// set is replaced with `_`. The replacement is not reversible.

use regex::{NoExpand, Regex};
use std::sync::LazyLock;

/// Character substituted for every disallowed character
pub const SANITIZATION_CHARACTER: char = '_';

/// Maximum length of an STS session tag value
pub const MAX_TAG_VALUE_LENGTH: usize = 256;

/// Anything that is not a letter (L), separator (Z), number (N) or one of the
/// allowed punctuation characters
static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\p{L}\p{Z}\p{N}_.:/=+\-@]").expect("sanitization pattern is valid")
});

/// Replace every character that is not a letter, number, separator or one
/// of `_ . : / = + - @` with [`SANITIZATION_CHARACTER`].
pub fn sanitize(input: &str) -> String {
    let mut buf = [0u8; 4];
    let replacement: &str = SANITIZATION_CHARACTER.encode_utf8(&mut buf);
    DISALLOWED
        .replace_all(input, NoExpand(replacement))
        .into_owned()
}

/// Sanitize and truncate to [`MAX_TAG_VALUE_LENGTH`] characters.
pub fn sanitize_tag_value(input: &str) -> String {
    let truncated: String = input.chars().take(MAX_TAG_VALUE_LENGTH).collect();
    sanitize(&truncated)
}
