use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display width of a string; CJK characters count as two columns.
pub(crate) fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate to fit within `width` display columns, ending in ".." when cut.
pub(crate) fn truncate_display(s: &str, width: usize) -> String {
    if display_width(s) <= width {
        return s.to_string();
    }
    if width < 3 {
        return s
            .chars()
            .take_while(|ch| UnicodeWidthChar::width(*ch).unwrap_or(0) <= width)
            .take(1)
            .collect();
    }

    let budget = width - 2;
    let mut used = 0;
    let mut out = String::new();
    for ch in s.chars() {
        let cw = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + cw > budget {
            break;
        }
        used += cw;
        out.push(ch);
    }
    out.push_str("..");
    out
}

/// Left-align in exactly `width` columns, truncating when too long.
pub(crate) fn pad_right(s: &str, width: usize) -> String {
    let cut = truncate_display(s, width);
    let w = display_width(&cut);
    format!("{}{}", cut, " ".repeat(width.saturating_sub(w)))
}

/// Right-align in exactly `width` columns, truncating when too long.
pub(crate) fn pad_left(s: &str, width: usize) -> String {
    let cut = truncate_display(s, width);
    let w = display_width(&cut);
    format!("{}{}", " ".repeat(width.saturating_sub(w)), cut)
}

/// `abcd...wxyz`; short secrets are fully hidden.
pub(crate) fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
