use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Terminal columns `s` occupies.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Cuts `s` to at most `max_width` columns, ending in "..." when cut.
///
/// Widths too narrow for the ellipsis get as many whole characters as fit.
/// Wide (CJK, emoji) characters are never split.
///
/// # Examples
///
/// ```
/// use feedtree::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Short", 10), "Short");
/// assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
/// assert_eq!(truncate_to_width("Test", 2), "Te");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    let (budget, suffix) = if max_width > ELLIPSIS_WIDTH {
        (max_width - ELLIPSIS_WIDTH, ELLIPSIS)
    } else {
        (max_width, "")
    };

    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let width = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + width > budget {
            break;
        }
        used += width;
        end = idx + c.len_utf8();
    }
    Cow::Owned(format!("{}{}", &s[..end], suffix))
}

/// Flattens feed text onto one terminal-safe line.
///
/// ANSI escape sequences (CSI and OSC) and other control characters are
/// dropped; runs of whitespace, newlines included, become one space; the
/// ends are trimmed. Feed titles are attacker-controlled, so everything the
/// binary prints goes through here.
pub fn sanitize_line(s: &str) -> Cow<'_, str> {
    let clean = s.trim();
    let needs_work = clean.chars().any(|c| c.is_control())
        || clean
            .as_bytes()
            .windows(2)
            .any(|pair| pair[0] == b' ' && pair[1] == b' ');
    if !needs_work {
        return Cow::Borrowed(clean);
    }

    let mut out = String::with_capacity(clean.len());
    let mut chars = clean.chars().peekable();
    let mut pending_space = false;
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            match chars.peek() {
                // CSI: parameters then a final byte in @..~
                Some('[') => {
                    chars.next();
                    for c in chars.by_ref() {
                        if ('@'..='~').contains(&c) {
                            break;
                        }
                    }
                }
                // OSC: until BEL or ESC \
                Some(']') => {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '\x07' {
                            break;
                        }
                        if c == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            }
            continue;
        }
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if c.is_control() {
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_display_width_counts_wide_chars() {
        assert_eq!(display_width("Hello"), 5);
        assert_eq!(display_width("你好"), 4);
    }

    #[test]
    fn test_truncate_fits_is_borrowed() {
        assert!(matches!(truncate_to_width("Short", 10), Cow::Borrowed("Short")));
    }

    #[test]
    fn test_truncate_adds_ellipsis() {
        assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
        assert_eq!(truncate_to_width("你好世界", 7), "你好...");
    }

    #[test]
    fn test_truncate_narrow_widths() {
        assert_eq!(truncate_to_width("Test", 0), "");
        assert_eq!(truncate_to_width("Test", 1), "T");
        assert_eq!(truncate_to_width("Test", 3), "Tes");
        assert_eq!(truncate_to_width("你好", 1), "");
    }

    #[test]
    fn test_sanitize_collapses_whitespace() {
        assert_eq!(sanitize_line("  How do\n\t Americans  "), "How do Americans");
        assert!(matches!(sanitize_line("clean"), Cow::Borrowed("clean")));
    }

    #[test]
    fn test_sanitize_strips_escape_sequences() {
        assert_eq!(sanitize_line("\x1b[31mred\x1b[0m text"), "red text");
        assert_eq!(sanitize_line("a\x1b]0;title\x07b"), "ab");
        assert_eq!(sanitize_line("a\x1b]8;;http://x\x1b\\b"), "ab");
        assert_eq!(sanitize_line("bell\x07 and\x00 nul"), "bell and nul");
    }

    proptest! {
        #[test]
        fn prop_truncate_never_exceeds_width(s in "[a-zA-Z0-9 你好世界]{0,40}", width in 0usize..30) {
            prop_assert!(display_width(&truncate_to_width(&s, width)) <= width);
        }

        #[test]
        fn prop_sanitize_output_has_no_controls(s in "[\\x00-\\x7f]{0,60}") {
            let line = sanitize_line(&s);
            prop_assert!(!line.chars().any(|c| c.is_control()));
            prop_assert!(!line.contains("  "));
        }
    }
}
