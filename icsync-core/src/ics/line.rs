//! Content-line handling: folding, unfolding, property parsing and text escaping.

/// Maximum octets per physical line, excluding the CRLF.
pub const MAX_LINE_OCTETS: usize = 75;

/// A parsed content line: `NAME;KEY=VALUE;...:value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Uppercased property name
    pub name: String,
    /// Parameters in order of appearance, keys uppercased
    pub params: Vec<(String, String)>,
    pub value: String,
}

impl Property {
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Property {
            name: name.to_ascii_uppercase(),
            params: Vec::new(),
            value: value.into(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((key.to_ascii_uppercase(), value.into()));
        self
    }

    /// First value of the parameter named `key` (case-insensitive).
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Whether `VALUE=DATE` is present.
    pub fn is_date_value(&self) -> bool {
        self.param("VALUE")
            .is_some_and(|v| v.eq_ignore_ascii_case("DATE"))
    }

    /// Render as a single (unfolded) logical line.
    pub fn to_line(&self) -> String {
        let mut line = self.name.clone();
        for (key, value) in &self.params {
            line.push(';');
            line.push_str(key);
            line.push('=');
            line.push_str(&escape_param_value(value));
        }
        line.push(':');
        line.push_str(&self.value);
        line
    }
}

/// Join continuation lines into logical lines.
///
/// A physical line starting with a space or tab continues the previous one;
/// that single whitespace character is dropped. Empty lines never produce
/// output.
pub fn unfold(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n");
    let mut lines = Vec::new();
    let mut current = String::new();

    for physical in normalized.split('\n') {
        if let Some(rest) = physical
            .strip_prefix(' ')
            .or_else(|| physical.strip_prefix('\t'))
        {
            current.push_str(rest);
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        current.push_str(physical);
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Fold one logical line into physical lines of at most 75 octets, joined
/// by CRLF. Never splits a UTF-8 sequence.
#[must_use]
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut rest = line;
    // The first physical line has the full budget, continuations lose one
    // octet to the leading space.
    let mut budget = MAX_LINE_OCTETS;

    while rest.len() > budget {
        let mut cut = budget;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        out.push_str(&rest[..cut]);
        out.push_str("\r\n ");
        rest = &rest[cut..];
        budget = MAX_LINE_OCTETS - 1;
    }
    out.push_str(rest);
    out
}

/// Fold every logical line and terminate each with CRLF.
pub fn fold<'a>(lines: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(&fold_line(line));
        out.push_str("\r\n");
    }
    out
}

/// Split a logical line into name, parameters and value.
///
/// Returns `None` when there is no `:` or the name is empty. Double-quoted
/// parameter values may contain `:` and `;`; the quotes are removed.
pub fn parse_property(line: &str) -> Option<Property> {
    let colon = find_unquoted(line, ':')?;
    let (head, value) = (&line[..colon], &line[colon + 1..]);

    let mut segments = split_unquoted(head, ';').into_iter();
    let name = segments.next()?.trim().to_ascii_uppercase();
    if name.is_empty() {
        return None;
    }

    let params = segments
        .filter_map(|segment| {
            let (key, value) = segment.split_once('=')?;
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some((key.trim().to_ascii_uppercase(), unescape_param_value(value)))
        })
        .collect();

    Some(Property {
        name,
        params,
        value: value.trim().to_string(),
    })
}

fn find_unquoted(s: &str, needle: char) -> Option<usize> {
    let mut quoted = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => quoted = !quoted,
            c if c == needle && !quoted => return Some(i),
            _ => {}
        }
    }
    None
}

fn split_unquoted(s: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = s;
    while let Some(i) = find_unquoted(rest, separator) {
        parts.push(&rest[..i]);
        rest = &rest[i + 1..];
    }
    parts.push(rest);
    parts
}

/// Quote a parameter value when it holds separators, caret-encoding
/// (RFC 6868) the characters a quoted value cannot carry.
#[must_use]
pub fn escape_param_value(value: &str) -> String {
    if !value.contains([':', ';', ',', '"', '\n']) {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '^' => out.push_str("^^"),
            '\n' => out.push_str("^n"),
            '"' => out.push_str("^'"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn unescape_param_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '^' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('^') => out.push('^'),
            Some('n' | 'N') => out.push('\n'),
            Some('\'') => out.push('"'),
            Some(other) => {
                out.push('^');
                out.push(other);
            }
            None => out.push('^'),
        }
    }
    out
}

/// Escape a TEXT value.
#[must_use]
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.replace("\r\n", "\n").chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

/// Reverse of [`escape_text`]. Unknown escapes keep the escaped character.
pub fn unescape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
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

/// Split a TEXT list on unescaped commas, unescaping each item.
pub fn split_text_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for c in value.chars() {
        if escaped {
            current.push('\\');
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == ',' {
            items.push(unescape_text(&current));
            current.clear();
        } else {
            current.push(c);
        }
    }
    if escaped {
        current.push('\\');
    }
    items.push(unescape_text(&current));

    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
