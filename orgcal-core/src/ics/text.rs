//! RFC 5545 text escaping and line folding.

/// Maximum content line length in octets.
const MAX_LINE_OCTETS: usize = 75;

/// Escape a TEXT value: `\`, `,` and `;` get a backslash, newlines become a
/// literal `\n` and whitespace just before a newline is dropped.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_ws = String::new();

    for c in s.chars() {
        match c {
            ' ' | '\t' | '\r' => pending_ws.push(c),
            '\n' => {
                pending_ws.clear();
                out.push_str("\\n");
            }
            _ => {
                out.push_str(&pending_ws);
                pending_ws.clear();
                match c {
                    '\\' => out.push_str("\\\\"),
                    ',' => out.push_str("\\,"),
                    ';' => out.push_str("\\;"),
                    _ => out.push(c),
                }
            }
        }
    }
    out.push_str(&pending_ws);
    out
}

/// Reverse of [`escape`] (whitespace dropped before newlines stays dropped).
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Fold every line of `s` to at most 75 octets.
///
/// Continuation lines start with a single space. Lines are joined with a
/// bare `\n` and trailing blank lines are dropped.
pub fn fold(s: &str) -> String {
    let mut lines: Vec<&str> = s.split('\n').collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines
        .into_iter()
        .map(fold_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fold a single line, cutting at UTF-8 character boundaries.
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut result = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 2);
    let mut current_len = 0;
    let mut first_segment = true;

    for c in line.chars() {
        let char_len = c.len_utf8();

        // Continuation lines lose one octet to the leading space
        let effective_max = if first_segment {
            MAX_LINE_OCTETS
        } else {
            MAX_LINE_OCTETS - 1
        };

        if current_len + char_len > effective_max {
            result.push_str("\n ");
            current_len = 0;
            first_segment = false;
        }

        result.push(c);
        current_len += char_len;
    }

    result
}

/// Join folded continuation lines back together.
pub fn unfold(s: &str) -> String {
    s.replace("\n ", "")
}

/// Translate bare `\n` line ends to CRLF for writers that need it.
pub fn to_crlf(s: &str) -> String {
    s.replace('\n', "\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_special_characters() {
        assert_eq!(escape(r"a\b"), r"a\\b");
        assert_eq!(escape("a,b;c"), r"a\,b\;c");
        assert_eq!(escape("a: b"), "a: b");
    }

    #[test]
    fn test_escape_newlines_drop_trailing_whitespace() {
        assert_eq!(escape("one  \t\ntwo"), r"one\ntwo");
        assert_eq!(escape("one\r\ntwo"), r"one\ntwo");
        assert_eq!(escape("keep inner  spaces "), "keep inner  spaces ");
    }

    #[test]
    fn test_short_line_unchanged() {
        let line = "SUMMARY:Meeting";
        assert_eq!(fold(line), line);
        let exact = "X".repeat(75);
        assert_eq!(fold(&exact), exact);
    }

    #[test]
    fn test_fold_at_75_then_74() {
        let line = "X".repeat(200);
        let folded = fold(&line);
        let parts: Vec<&str> = folded.split('\n').collect();
        assert_eq!(parts[0].len(), 75);
        assert_eq!(parts[1].len(), 75, "continuation = space + 74 octets");
        assert!(parts[1].starts_with(' '));
        assert_eq!(parts[2], format!(" {}", "X".repeat(200 - 75 - 74)));
    }

    #[test]
    fn test_fold_respects_utf8() {
        let line = format!("DESCRIPTION:{}", "日".repeat(40));
        let folded = fold(&line);
        for part in folded.split('\n') {
            assert!(part.len() <= 75, "line too long: {} octets", part.len());
        }
        assert_eq!(unfold(&folded), line);
    }

    #[test]
    fn test_fold_drops_trailing_blank_lines() {
        assert_eq!(fold("BEGIN:VEVENT\nEND:VEVENT\n\n"), "BEGIN:VEVENT\nEND:VEVENT");
    }

    #[test]
    fn test_fold_is_idempotent() {
        let text = format!("SUMMARY:{}\nDESCRIPTION:{}", "a".repeat(160), "é".repeat(90));
        let once = fold(&text);
        assert_eq!(fold(&once), once);
    }

    #[test]
    fn test_every_physical_line_fits() {
        let text = format!("A:{}\nB:{}\nC:short", "ü€".repeat(70), "z".repeat(300));
        for line in fold(&text).lines() {
            assert!(line.len() <= 75, "{} octets: {line}", line.len());
        }
    }

    #[test]
    fn test_round_trip_escape_fold() {
        let samples = [
            "plain",
            "comma, semicolon; backslash \\ colon:",
            "multi\nline\ntext with trailing words",
            &"long ".repeat(60),
            &"ünïcödé, ".repeat(30),
            "",
        ];
        for s in samples {
            let wire = fold(&escape(s));
            assert_eq!(unescape(&unfold(&wire)), s, "round trip failed for {s:?}");
        }
    }

    #[test]
    fn test_to_crlf() {
        assert_eq!(to_crlf("A\nB\n"), "A\r\nB\r\n");
    }
}
