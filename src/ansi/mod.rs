use std::borrow::Cow;

const ESC: char = '\u{1b}';
const CSI: char = '\u{9b}';

/// Remove ANSI escape sequences from a line of terminal output.
///
/// Colourised `git diff` / `hg diff` output wraps the `+`, `-` and `@@`
/// prefixes in SGR sequences, which defeats plain prefix matching. Text
/// without escapes is returned unchanged and without allocating.
pub fn strip(s: &str) -> Cow<'_, str> {
    if !has_escapes(s) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(strip_ansi_escapes::strip_str(s))
}

/// Whether `s` contains anything that could start an escape sequence.
pub fn has_escapes(s: &str) -> bool {
    s.contains([ESC, CSI])
}
