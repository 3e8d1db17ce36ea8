//! Line-list representation of a file's content, preserving the original
//! line-ending style and trailing-newline policy across an edit.

pub struct FileLines {
    pub lines: Vec<String>,
    pub line_ending: String,
    pub trailing_newline: bool,
}

impl FileLines {
    pub fn parse(content: &str) -> Self {
        let line_ending = if content.contains("\r\n") { "\r\n" } else { "\n" };
        let normalized = content.replace("\r\n", "\n");
        let trailing_newline = normalized.ends_with('\n');

        let mut lines = if normalized.is_empty() {
            Vec::new()
        } else {
            normalized.split('\n').map(str::to_string).collect::<Vec<_>>()
        };
        if trailing_newline && !lines.is_empty() {
            lines.pop();
        }

        Self {
            lines,
            line_ending: line_ending.to_string(),
            trailing_newline,
        }
    }

    pub fn render(&self) -> String {
        if self.lines.is_empty() {
            return String::new();
        }
        let mut rendered = self.lines.join(&self.line_ending);
        if self.trailing_newline {
            rendered.push_str(&self.line_ending);
        }
        rendered
    }
}

/// Split new content into a line list the same way a parsed file's content
/// would be, for insertion into an existing `FileLines::lines`.
pub fn content_lines(content: &str) -> Vec<String> {
    let normalized = content.replace("\r\n", "\n");
    if normalized.is_empty() {
        return Vec::new();
    }
    let mut lines = normalized.split('\n').map(str::to_string).collect::<Vec<_>>();
    if normalized.ends_with('\n') {
        lines.pop();
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_preserves_crlf_and_trailing_newline() {
        let parsed = FileLines::parse("a\r\nb\r\n");
        assert_eq!(parsed.line_ending, "\r\n");
        assert!(parsed.trailing_newline);
        assert_eq!(parsed.lines, vec!["a", "b"]);
        assert_eq!(parsed.render(), "a\r\nb\r\n");
    }

    #[test]
    fn parse_handles_no_trailing_newline() {
        let parsed = FileLines::parse("a\nb");
        assert!(!parsed.trailing_newline);
        assert_eq!(parsed.render(), "a\nb");
    }
}
