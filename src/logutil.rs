//! Log helpers for values that come from outside the process: identity ids,
//! catalog names typed on the command line, profile contents.

/// Characters kept before an identifier is cut off.
pub const MAX_LOGGED_CHARS: usize = 96;

/// Render `s` on a single line: backslashes and control characters are
/// escaped Rust-style and anything past [`MAX_LOGGED_CHARS`] becomes `…`.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_LOGGED_CHARS) + 4);
    for (count, ch) in s.chars().enumerate() {
        if count == MAX_LOGGED_CHARS {
            out.push('…');
            break;
        }
        if ch == '\\' || ch.is_control() {
            out.extend(ch.escape_default());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_characters_stay_on_one_line() {
        assert_eq!(escape_log("amira\n42\t"), "amira\\n42\\t");
        assert_eq!(escape_log("a\\b"), "a\\\\b");
        assert_eq!(escape_log("\u{1b}[31m"), "\\u{1b}[31m");
    }

    #[test]
    fn long_values_are_cut() {
        let long = "x".repeat(MAX_LOGGED_CHARS + 10);
        let escaped = escape_log(&long);
        assert!(escaped.ends_with('…'));
        assert_eq!(escaped.chars().count(), MAX_LOGGED_CHARS + 1);
    }

    #[test]
    fn plain_ids_pass_through() {
        assert_eq!(escape_log("Sumerian"), "Sumerian");
    }
}
