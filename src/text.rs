//! Text shaping for Mermaid diagram labels: escaping, truncation and
//! display-width line wrapping.

/// Line break understood by Mermaid labels.
pub const LINE_BREAK: &str = "<br/>";

const OMISSION: &str = "...";

/// Escape characters Mermaid would otherwise interpret, as numeric entity
/// references. `<br/>` separators are preserved.
///
/// `#` and `;` are doubled first so the `#` and `;` of the entities written
/// afterwards are never escaped a second time.
pub fn escape(text: &str) -> String {
    text.split(LINE_BREAK)
        .map(escape_segment)
        .collect::<Vec<_>>()
        .join(LINE_BREAK)
}

fn escape_segment(segment: &str) -> String {
    segment
        .replace('#', "##")
        .replace(';', ";;")
        .replace(";;", "#59;")
        .replace("##", "#35;")
        .replace('&', "#38;")
        .replace('<', "#60;")
        .replace('>', "#62;")
        .replace('"', "#34;")
        .replace('\'', "#39;")
}

/// Cut `text` to `limit` characters, appending `...` when anything was cut.
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(limit).collect();
    cut.push_str(OMISSION);
    cut
}

/// Display width of a character: ASCII and half-width katakana take one
/// column, everything else two.
pub fn display_width(c: char) -> usize {
    match c as u32 {
        0x0000..=0x007E | 0xFF61..=0xFF9F => 1,
        _ => 2,
    }
}

/// Insert `<br/>` so that no line is wider than `width` columns. Newlines
/// already present in the text become `<br/>` as well.
pub fn wrap(text: &str, width: usize) -> String {
    let mut output = String::with_capacity(text.len());
    let mut line_width = 0;

    for c in text.chars() {
        if c == '\n' {
            output.push_str(LINE_BREAK);
            line_width = 0;
            continue;
        }
        if c == '\r' {
            continue;
        }

        let w = display_width(c);
        if line_width > 0 && line_width + w > width {
            output.push_str(LINE_BREAK);
            line_width = 0;
        }
        output.push(c);
        line_width += w;
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_doubles_and_entities() {
        assert_eq!(
            escape("aa##;;<<>>\"\"aa"),
            "aa#35;#35;#59;#59;#60;#60;#62;#62;#34;#34;aa"
        );
    }

    #[test]
    fn escape_adjacent_hash_and_semicolon() {
        assert_eq!(escape("#;"), "#35;#59;");
        assert_eq!(escape(";#"), "#59;#35;");
        assert_eq!(escape("a&b'c"), "a#38;b#39;c");
    }

    #[test]
    fn escape_keeps_line_breaks() {
        assert_eq!(escape("<a><br/>b;"), "#60;a#62;<br/>b#59;");
    }

    #[test]
    fn truncate_appends_omission() {
        assert_eq!(truncate("aaaaaaaaaaaaaaaaaaaaa", 20), "aaaaaaaaaaaaaaaaaaaa...");
        assert_eq!(truncate("aaaaaaaaaaaaaaaaaaaa", 20), "aaaaaaaaaaaaaaaaaaaa");
        assert_eq!(truncate("", 20), "");
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate("あいうえお", 3), "あいう...");
    }

    #[test]
    fn width_of_wide_and_half_width_chars() {
        assert_eq!(display_width('a'), 1);
        assert_eq!(display_width(' '), 1);
        assert_eq!(display_width('ｱ'), 1);
        assert_eq!(display_width('あ'), 2);
        assert_eq!(display_width('é'), 2);
    }

    #[test]
    fn wrap_ascii_every_width_columns() {
        assert_eq!(wrap("abcdefgh", 3), "abc<br/>def<br/>gh");
        assert_eq!(wrap("abc", 3), "abc");
    }

    #[test]
    fn wrap_wide_characters_count_double() {
        assert_eq!(wrap("あいうえ", 4), "あい<br/>うえ");
        assert_eq!(wrap("aあい", 4), "aあ<br/>い");
    }

    #[test]
    fn wrap_converts_newlines() {
        assert_eq!(wrap("ab\ncd", 16), "ab<br/>cd");
    }
}
