//! Per-language function/class parsing used by C2's anchor resolution
//! (spec.md §4.2).

/// One function (or method) found in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSpan {
    pub class: Option<String>,
    pub name: String,
    /// 0-indexed, inclusive of the signature line.
    pub start_line: usize,
    /// 0-indexed, inclusive of the closing line.
    pub end_line: usize,
}

/// A capability set for one language family: find functions in a file,
/// and parse a `Class::name`-shaped signature string.
pub trait LanguageHandler: Send + Sync {
    fn language_name(&self) -> &str;

    /// The character that opens a block for this language, if brace-based.
    fn open_brace_char(&self) -> Option<char> {
        Some('{')
    }

    fn parse_signature(&self, sig: &str) -> (Option<String>, String);

    fn parse_functions(&self, lines: &[String]) -> Vec<FunctionSpan>;
}

/// C/C++/Java/Go-style brace-balanced handler. `scope_sep` distinguishes
/// `Class::name` (C++) from `(Receiver) Name` (Go), both resolved by the
/// default `parse_signature`.
pub struct BraceLanguageHandler {
    name: &'static str,
}

impl BraceLanguageHandler {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl LanguageHandler for BraceLanguageHandler {
    fn language_name(&self) -> &str {
        self.name
    }

    fn parse_signature(&self, sig: &str) -> (Option<String>, String) {
        let sig = sig.trim();
        if let Some((class, name)) = sig.split_once("::") {
            return (Some(class.trim().to_string()), name.trim().to_string());
        }
        // Go-style `(Receiver) Name`.
        if let Some(close) = sig.find(')') {
            if sig.trim_start().starts_with('(') {
                let receiver = sig[1..close].trim();
                let rest = sig[close + 1..].trim();
                let receiver_type = receiver
                    .rsplit(' ')
                    .next()
                    .unwrap_or(receiver)
                    .trim_start_matches('*');
                if !rest.is_empty() {
                    return (Some(receiver_type.to_string()), rest.to_string());
                }
            }
        }
        (None, sig.to_string())
    }

    fn parse_functions(&self, lines: &[String]) -> Vec<FunctionSpan> {
        let mut spans = Vec::new();
        let mut idx = 0;
        while idx < lines.len() {
            let line = &lines[idx];
            if let Some((class, name)) = find_brace_signature(line) {
                if let Some(open_idx) = find_opening_brace(lines, idx) {
                    if let Some(end) = balance_braces(lines, open_idx) {
                        spans.push(FunctionSpan {
                            class,
                            name,
                            start_line: idx,
                            end_line: end,
                        });
                        idx = end + 1;
                        continue;
                    }
                }
            }
            idx += 1;
        }
        spans
    }
}

fn find_brace_signature(line: &str) -> Option<(Option<String>, String)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.ends_with(';') {
        return None;
    }
    // Heuristic: a line containing `(` and not starting with a control
    // keyword or visibility-only token is treated as a declaration.
    let before_paren = trimmed.split('(').next()?.trim();
    if before_paren.is_empty() {
        return None;
    }
    let last_word = before_paren.rsplit(|c: char| c.is_whitespace() || c == '*' || c == '&').next()?;
    const KEYWORDS: &[&str] = &[
        "if", "for", "while", "switch", "catch", "return", "else", "do", "sizeof",
    ];
    if KEYWORDS.contains(&last_word) {
        return None;
    }
    if last_word.is_empty() {
        return None;
    }
    if let Some((class, name)) = last_word.split_once("::") {
        Some((Some(class.to_string()), name.to_string()))
    } else if last_word.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_') {
        // Go receiver form: `func (r *Type) Name(...)`.
        if before_paren.starts_with("func (") {
            let after_receiver = &before_paren["func (".len()..];
            if let Some(close) = after_receiver.find(')') {
                let receiver = after_receiver[..close].trim();
                let receiver_type = receiver
                    .rsplit(' ')
                    .next()
                    .unwrap_or(receiver)
                    .trim_start_matches('*');
                let name = after_receiver[close + 1..].trim();
                if !name.is_empty() {
                    return Some((Some(receiver_type.to_string()), name.to_string()));
                }
            }
        }
        Some((None, last_word.to_string()))
    } else {
        None
    }
}

fn find_opening_brace(lines: &[String], from: usize) -> Option<usize> {
    (from..lines.len()).find(|&i| lines[i].contains('{'))
}

fn balance_braces(lines: &[String], open_line: usize) -> Option<usize> {
    let mut depth = 0i64;
    for (offset, line) in lines[open_line..].iter().enumerate() {
        for ch in line.chars() {
            match ch {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
        }
        if depth == 0 {
            return Some(open_line + offset);
        }
    }
    None
}

/// Indentation-based handler for Python: a function ends at the last line
/// whose indent exceeds the `def` line's indent.
pub struct PythonHandler;

impl LanguageHandler for PythonHandler {
    fn language_name(&self) -> &str {
        "python"
    }

    fn open_brace_char(&self) -> Option<char> {
        None
    }

    fn parse_signature(&self, sig: &str) -> (Option<String>, String) {
        let sig = sig.trim();
        if let Some((class, name)) = sig.split_once("::") {
            return (Some(class.trim().to_string()), name.trim().to_string());
        }
        (None, sig.to_string())
    }

    fn parse_functions(&self, lines: &[String]) -> Vec<FunctionSpan> {
        let mut spans = Vec::new();
        let mut current_class: Vec<(usize, String)> = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            let indent = indent_of(line);
            let trimmed = line.trim_start();

            current_class.retain(|(class_indent, _)| indent > *class_indent || trimmed.is_empty());

            if let Some(rest) = trimmed.strip_prefix("class ") {
                let name = rest
                    .split(|c: char| c == '(' || c == ':')
                    .next()
                    .unwrap_or(rest)
                    .trim()
                    .to_string();
                current_class.push((indent, name));
                continue;
            }

            let def_rest = trimmed
                .strip_prefix("def ")
                .or_else(|| trimmed.strip_prefix("async def "));
            let Some(def_rest) = def_rest else { continue };
            let name = def_rest
                .split('(')
                .next()
                .unwrap_or(def_rest)
                .trim()
                .to_string();
            if name.is_empty() {
                continue;
            }

            let class = current_class.last().map(|(_, name)| name.clone());
            let mut end = idx;
            for (j, later) in lines.iter().enumerate().skip(idx + 1) {
                if later.trim().is_empty() {
                    end = j;
                    continue;
                }
                if indent_of(later) > indent {
                    end = j;
                } else {
                    break;
                }
            }
            spans.push(FunctionSpan {
                class,
                name,
                start_line: idx,
                end_line: end,
            });
        }
        spans
    }
}

fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ' || *c == '\t').count()
}

/// Resolve the right handler for a file path by extension; falls back to
/// a handler that refuses every anchor lookup (spec.md §9 remediation).
pub fn handler_for(path: &str) -> Box<dyn LanguageHandler> {
    let ext = path.rsplit('.').next().unwrap_or_default().to_lowercase();
    match ext.as_str() {
        "c" | "h" | "cpp" | "cc" | "cxx" | "hpp" | "java" => {
            Box::new(BraceLanguageHandler::new("c-family"))
        }
        "ts" | "tsx" | "js" | "jsx" => Box::new(BraceLanguageHandler::new("typescript")),
        "go" => Box::new(BraceLanguageHandler::new("go")),
        "py" => Box::new(PythonHandler),
        _ => Box::new(DefaultHandler),
    }
}

/// Refuses to resolve anchors for unrecognized extensions.
pub struct DefaultHandler;

impl LanguageHandler for DefaultHandler {
    fn language_name(&self) -> &str {
        "unknown"
    }

    fn open_brace_char(&self) -> Option<char> {
        None
    }

    fn parse_signature(&self, sig: &str) -> (Option<String>, String) {
        (None, sig.trim().to_string())
    }

    fn parse_functions(&self, _lines: &[String]) -> Vec<FunctionSpan> {
        Vec::new()
    }
}

/// Find the best match for `sig` among `spans`: exact class+name beats a
/// same-name-no-class fallback (spec.md §4.1).
pub fn best_match<'a>(
    spans: &'a [FunctionSpan],
    class: Option<&str>,
    name: &str,
) -> Option<&'a FunctionSpan> {
    if let Some(class) = class {
        if let Some(found) = spans
            .iter()
            .find(|s| s.name == name && s.class.as_deref() == Some(class))
        {
            return Some(found);
        }
    }
    spans.iter().find(|s| s.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brace_handler_parses_class_scoped_cpp_function() {
        let handler = BraceLanguageHandler::new("c-family");
        let lines: Vec<String> = vec![
            "#include <x>".to_string(),
            String::new(),
            "void ClassA::foo() {".to_string(),
            "    return;".to_string(),
            "}".to_string(),
        ];
        let spans = handler.parse_functions(&lines);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].class.as_deref(), Some("ClassA"));
        assert_eq!(spans[0].name, "foo");
        assert_eq!(spans[0].start_line, 2);
        assert_eq!(spans[0].end_line, 4);
    }

    #[test]
    fn python_handler_ends_function_at_dedent() {
        let handler = PythonHandler;
        let lines: Vec<String> = vec![
            "def foo():".to_string(),
            "    x = 1".to_string(),
            "    return x".to_string(),
            "".to_string(),
            "def bar():".to_string(),
            "    pass".to_string(),
        ];
        let spans = handler.parse_functions(&lines);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].name, "foo");
        assert_eq!(spans[0].end_line, 2);
        assert_eq!(spans[1].name, "bar");
    }

    #[test]
    fn default_handler_finds_nothing() {
        let handler = DefaultHandler;
        assert!(handler.parse_functions(&["anything".to_string()]).is_empty());
    }

    #[test]
    fn best_match_prefers_exact_class() {
        let spans = vec![
            FunctionSpan { class: None, name: "foo".into(), start_line: 0, end_line: 1 },
            FunctionSpan { class: Some("A".into()), name: "foo".into(), start_line: 5, end_line: 6 },
        ];
        let found = best_match(&spans, Some("A"), "foo").unwrap();
        assert_eq!(found.start_line, 5);
    }
}
