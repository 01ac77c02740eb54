use std::collections::HashMap;

/// Maps field paths of a block-style YAML document to 1-based source lines.
///
/// Flow-style nodes (`{..}`, `[..]`) are not descended into; lookups for paths inside them
/// resolve to the nearest enclosing key, which sits on the same line.
#[derive(Debug, Default, Clone)]
pub(crate) struct SourceMap {
    lines: HashMap<String, usize>,
}

#[derive(Debug)]
struct Frame {
    indent: usize,
    is_item: bool,
    path: String,
}

impl SourceMap {
    pub(crate) fn build(text: &str) -> Self {
        let mut lines = HashMap::new();
        let mut stack: Vec<Frame> = Vec::new();
        let mut counters: HashMap<String, usize> = HashMap::new();
        let mut block_scalar: Option<usize> = None;

        for (i, raw) in text.lines().enumerate() {
            let lineno = i + 1;
            let trimmed = raw.trim_end();
            let content = trimmed.trim_start();
            if content.is_empty() {
                continue;
            }
            let mut indent = trimmed.len() - content.len();
            if let Some(owner) = block_scalar {
                if indent > owner {
                    continue;
                }
                block_scalar = None;
            }
            if content.starts_with('#') || content == "---" || content == "..." {
                continue;
            }

            let mut rest = content;
            while rest == "-" || rest.starts_with("- ") {
                while stack
                    .last()
                    .is_some_and(|f| f.indent > indent || (f.is_item && f.indent == indent))
                {
                    stack.pop();
                }
                let parent = stack.last().map(|f| f.path.clone()).unwrap_or_default();
                let counter = counters.entry(parent.clone()).or_insert(0);
                let path = format!("{parent}[{counter}]");
                *counter += 1;
                lines.entry(path.clone()).or_insert(lineno);
                stack.push(Frame {
                    indent,
                    is_item: true,
                    path,
                });
                if rest == "-" {
                    rest = "";
                    break;
                }
                let after = &rest[2..];
                let item = after.trim_start();
                indent += 2 + (after.len() - item.len());
                rest = item;
            }
            if rest.is_empty() {
                continue;
            }

            let Some((key, value)) = split_key(rest) else {
                continue;
            };
            while stack.last().is_some_and(|f| f.indent >= indent) {
                stack.pop();
            }
            let path = match stack.last() {
                Some(parent) => format!("{}.{key}", parent.path),
                None => key.to_owned(),
            };
            lines.entry(path.clone()).or_insert(lineno);

            let value = strip_comment(value).trim();
            if value.is_empty() {
                stack.push(Frame {
                    indent,
                    is_item: false,
                    path,
                });
            } else if value.starts_with('|') || value.starts_with('>') {
                block_scalar = Some(indent);
            }
        }

        Self { lines }
    }

    /// Line of `path`, or of its nearest located ancestor.
    pub(crate) fn line_of(&self, path: &str) -> Option<usize> {
        let mut p = path;
        loop {
            if let Some(&line) = self.lines.get(p) {
                return Some(line);
            }
            let cut = p.rfind(['.', '['])?;
            p = &p[..cut];
            if p.is_empty() {
                return None;
            }
        }
    }
}

fn split_key(s: &str) -> Option<(&str, &str)> {
    if s.starts_with(['{', '[', '|', '>', '&', '*', '!']) {
        return None;
    }
    if let Some(quote) = s.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let close = s[1..].find(quote)? + 1;
        let key = &s[1..close];
        let after = &s[close + 1..];
        let value = after.strip_prefix(':')?;
        if !(value.is_empty() || value.starts_with(' ')) {
            return None;
        }
        return Some((key, value));
    }
    let bytes = s.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'#' && i > 0 && bytes[i - 1] == b' ' {
            return None;
        }
        if b == b':' && (i + 1 == bytes.len() || bytes[i + 1] == b' ') {
            let key = s[..i].trim_end();
            if key.is_empty() {
                return None;
            }
            return Some((key, &s[i + 1..]));
        }
    }
    None
}

fn strip_comment(value: &str) -> &str {
    let mut in_single = false;
    let mut in_double = false;
    let bytes = value.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'\'' if !in_double => in_single = !in_single,
            b'"' if !in_single => in_double = !in_double,
            b'#' if !in_single && !in_double && (i == 0 || bytes[i - 1] == b' ') => {
                return &value[..i];
            }
            _ => {}
        }
    }
    value
}

#[cfg(test)]
#[path = "../../tests/unit/spec/source.rs"]
mod tests;
