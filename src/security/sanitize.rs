//! Text sanitization for untrusted input.
//!
//! Both sanitizers trim, truncate to a character budget, strip control
//! characters other than `\n` and `\t`, then trim again. Truncation happens
//! before stripping and a final trim closes the pass, so applying a sanitizer
//! to its own output is a no-op.

use std::sync::LazyLock;

use regex::Regex;

/// `<script ...> ... </script>`, case-insensitive, shortest match.
static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<\s*script\b[^>]*>.*?<\s*/\s*script\s*>").expect("valid script block pattern")
});

/// Unpaired opening or closing script tags left after block removal.
static SCRIPT_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*/?\s*script\b[^>]*>").expect("valid script tag pattern")
});

/// Everything from a `<` up to the next `>` (or the end of the text).
///
/// A stray `<` inside a tag does not end it: browsers read `<img onerror=x <b>`
/// as one `img` tag.
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*(?:>|$)").expect("valid tag pattern"));

/// Inline event handlers: `onclick="..."`, `onload='...'`, `onerror=x`.
static EVENT_HANDLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bon[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#)
        .expect("valid event handler pattern")
});

fn is_disallowed_control(c: char) -> bool {
    c.is_control() && c != '\n' && c != '\t'
}

fn truncate_chars(input: &str, max_len: usize) -> &str {
    match input.char_indices().nth(max_len) {
        Some((idx, _)) => &input[..idx],
        None => input,
    }
}

/// Plain-text sanitizer: no markup survives.
///
/// Absent input yields an empty string.
pub fn sanitize_text(input: Option<&str>, max_len: usize) -> String {
    let Some(input) = input else {
        return String::new();
    };

    let cleaned: String = truncate_chars(input.trim(), max_len)
        .chars()
        .filter(|c| *c != '<' && *c != '>' && !is_disallowed_control(*c))
        .collect();

    cleaned.trim().to_string()
}

/// Sanitizer for multi-line fields that may carry light formatting.
///
/// Removes script blocks and inline event handlers but keeps other markup.
pub fn sanitize_text_with_formatting(input: Option<&str>, max_len: usize) -> String {
    let Some(input) = input else {
        return String::new();
    };

    let mut text: String = truncate_chars(input.trim(), max_len)
        .chars()
        .filter(|c| !is_disallowed_control(*c))
        .collect();

    // Removing one construct can splice together another, e.g. `<scr<script></script>ipt>`.
    loop {
        let next = strip_scripts_once(&text);
        if next == text {
            break;
        }
        text = next;
    }

    text.trim().to_string()
}

fn strip_scripts_once(text: &str) -> String {
    let without_blocks = SCRIPT_BLOCK.replace_all(text, "");
    if without_blocks != text {
        return without_blocks.into_owned();
    }

    let without_tags = SCRIPT_TAG.replace_all(text, "");
    TAG.replace_all(&without_tags, |caps: &regex::Captures<'_>| {
        EVENT_HANDLER.replace_all(&caps[0], "").into_owned()
    })
    .into_owned()
}
