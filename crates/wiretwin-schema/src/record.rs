//! Parser for record-type schemas: `type Name struct { ... }` definitions.
//!
//! The first definition is the root; the others are emitted under `$defs`
//! and referenced with `$ref`.

use crate::error::SchemaError;
use crate::ir::{Schema, SchemaType};
use crate::types::ParsedSchema;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

static STRUCT_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\btype\s+([A-Za-z_][A-Za-z0-9_]*)\s+struct\s*\{")
        .expect("struct header pattern is valid")
});

static JSON_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:^|\s)json:"([^"]*)""#).expect("json tag pattern is valid"));

/// Parse one or more record definitions into a schema.
pub fn parse_record_types(text: &str) -> Result<ParsedSchema, SchemaError> {
    let cleaned = strip_comments(text);
    let records = find_records(&cleaned)?;
    let Some((root, rest)) = records.split_first() else {
        return Err(SchemaError::syntax(
            0,
            "no `type Name struct { ... }` definition found",
        ));
    };

    let mut parser = RecordParser {
        names: records.iter().map(|r| r.name.to_string()).collect(),
        root: root.name.to_string(),
        warnings: Vec::new(),
    };

    let mut schema = parser.parse_struct_body(root.name, root.body)?;
    for record in rest {
        let def = parser.parse_struct_body(record.name, record.body)?;
        schema.definitions.insert(record.name.to_string(), def);
    }
    debug!(
        "Parsed {} record type(s) with {} warning(s)",
        records.len(),
        parser.warnings.len()
    );

    Ok(ParsedSchema {
        schema,
        warnings: parser.warnings,
    })
}

struct RecordDef<'a> {
    name: &'a str,
    body: &'a str,
}

fn find_records(text: &str) -> Result<Vec<RecordDef<'_>>, SchemaError> {
    let mut records = Vec::new();
    let mut pos = 0;

    while let Some(caps) = STRUCT_HEADER.captures(&text[pos..]) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let open = pos + whole.end() - 1;
        let close = find_closing_brace(text, open).ok_or_else(|| {
            SchemaError::syntax(
                pos + whole.start(),
                format!("unterminated struct body for `{}`", name.as_str()),
            )
        })?;
        records.push(RecordDef {
            name: &text[pos + name.start()..pos + name.end()],
            body: &text[open + 1..close],
        });
        pos = close + 1;
    }

    Ok(records)
}

/// Replace comments with spaces, keeping byte offsets and newlines intact.
fn strip_comments(text: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Code,
        Quoted,
        Raw,
        Line,
        Block,
    }

    let mut out = String::with_capacity(text.len());
    let mut state = State::Code;
    let mut escaped = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    out.push_str("  ");
                    state = State::Line;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    out.push_str("  ");
                    state = State::Block;
                }
                '"' => {
                    out.push(c);
                    state = State::Quoted;
                }
                '`' => {
                    out.push(c);
                    state = State::Raw;
                }
                _ => out.push(c),
            },
            State::Quoted => {
                out.push(c);
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' || c == '\n' {
                    state = State::Code;
                }
            }
            State::Raw => {
                out.push(c);
                if c == '`' {
                    state = State::Code;
                }
            }
            State::Line => {
                if c == '\n' {
                    out.push('\n');
                    state = State::Code;
                } else {
                    blank(&mut out, c);
                }
            }
            State::Block => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    state = State::Code;
                } else if c == '\n' {
                    out.push('\n');
                } else {
                    blank(&mut out, c);
                }
            }
        }
    }
    out
}

fn blank(out: &mut String, c: char) {
    for _ in 0..c.len_utf8() {
        out.push(' ');
    }
}

/// Tracks whether a byte scan is inside a `"..."` or `` `...` `` literal.
#[derive(Default)]
struct QuoteState {
    quote: Option<u8>,
    escaped: bool,
}

impl QuoteState {
    /// Feed one byte; returns true when the byte is outside any literal.
    fn in_code(&mut self, b: u8) -> bool {
        match self.quote {
            Some(q) => {
                if self.escaped {
                    self.escaped = false;
                } else if q == b'"' && b == b'\\' {
                    self.escaped = true;
                } else if b == q || (q == b'"' && b == b'\n') {
                    self.quote = None;
                }
                false
            }
            None if b == b'"' || b == b'`' => {
                self.quote = Some(b);
                false
            }
            None => true,
        }
    }
}

fn find_closing_brace(text: &str, open: usize) -> Option<usize> {
    let mut quotes = QuoteState::default();
    let mut depth = 0usize;

    for (i, &b) in text.as_bytes().iter().enumerate().skip(open) {
        if !quotes.in_code(b) {
            continue;
        }
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split a struct body into field lines on newlines and `;` at brace depth 0.
fn split_fields(body: &str) -> Vec<&str> {
    let mut quotes = QuoteState::default();
    let mut depth = 0usize;
    let mut start = 0;
    let mut lines = Vec::new();

    for (i, &b) in body.as_bytes().iter().enumerate() {
        if !quotes.in_code(b) {
            continue;
        }
        match b {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b'\n' | b';' if depth == 0 => {
                lines.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    lines.push(&body[start..]);
    lines.retain(|l| !l.trim().is_empty());
    lines
}

#[derive(Debug, PartialEq)]
struct FieldDecl<'a> {
    names: Vec<&'a str>,
    type_expr: &'a str,
    tag: Option<&'a str>,
}

/// `A, B Type `tag``. Embedded fields and anything unrecognized yield `None`.
fn parse_field_line(line: &str) -> Option<FieldDecl<'_>> {
    let line = line.trim();
    let (decl, tag) = match line.strip_suffix('`') {
        Some(head) => {
            let start = head.rfind('`')?;
            (&head[..start], Some(&head[start + 1..]))
        }
        None => (line, None),
    };

    let mut names = Vec::new();
    let mut rest = decl.trim_start();
    loop {
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        let ident = &rest[..end];
        if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }
        names.push(ident);
        rest = rest[end..].trim_start();
        match rest.strip_prefix(',') {
            Some(more) => rest = more.trim_start(),
            None => break,
        }
    }

    let type_expr = rest.trim();
    if type_expr.is_empty() || type_expr.starts_with('.') || !brackets_balanced(type_expr) {
        return None;
    }
    Some(FieldDecl {
        names,
        type_expr,
        tag,
    })
}

fn brackets_balanced(expr: &str) -> bool {
    let mut stack = Vec::new();
    for c in expr.chars() {
        match c {
            '[' | '{' => stack.push(c),
            ']' if stack.pop() != Some('[') => return false,
            '}' if stack.pop() != Some('{') => return false,
            _ => {}
        }
    }
    stack.is_empty()
}

#[derive(Debug, Default, PartialEq)]
struct JsonTag {
    name: Option<String>,
    omitempty: bool,
    skip: bool,
}

fn parse_json_tag(tag: &str) -> JsonTag {
    let Some(value) = JSON_TAG.captures(tag).and_then(|c| c.get(1)) else {
        return JsonTag::default();
    };
    let mut parts = value.as_str().split(',');
    let name = parts.next().unwrap_or_default();
    let options: Vec<&str> = parts.collect();

    JsonTag {
        skip: name == "-" && options.is_empty(),
        omitempty: options.contains(&"omitempty"),
        name: (!name.is_empty()).then(|| name.to_string()),
    }
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_forbidden(expr: &str) -> bool {
    let compact: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
    compact == "any" || compact == "interface{}"
}

fn primitive(expr: &str) -> Option<SchemaType> {
    let t = match expr {
        "string" => SchemaType::String,
        "bool" => SchemaType::Boolean,
        "float32" | "float64" => SchemaType::Number,
        "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8" | "uint16" | "uint32"
        | "uint64" | "uintptr" | "byte" | "rune" => SchemaType::Integer,
        "time.Time" => SchemaType::String,
        _ => return None,
    };
    Some(t)
}

struct FieldContext<'a> {
    record: &'a str,
    field: &'a str,
}

struct RecordParser {
    names: HashSet<String>,
    root: String,
    warnings: Vec<String>,
}

impl RecordParser {
    fn parse_struct_body(&mut self, record: &str, body: &str) -> Result<Schema, SchemaError> {
        let mut properties = BTreeMap::new();
        let mut required: Vec<String> = Vec::new();

        for line in split_fields(body) {
            let Some(decl) = parse_field_line(line) else {
                debug!("Skipping unrecognized line in {}: {:?}", record, line.trim());
                continue;
            };
            let tag = decl.tag.map(parse_json_tag).unwrap_or_default();
            if tag.skip {
                continue;
            }

            let pointer = decl.type_expr.starts_with('*');
            for field in &decl.names {
                let ctx = FieldContext { record, field };
                let schema = self.parse_type(decl.type_expr, &ctx)?;
                let json_name = tag.name.clone().unwrap_or_else(|| lower_first(field));

                if !(tag.omitempty || pointer) && !required.contains(&json_name) {
                    required.push(json_name.clone());
                }
                properties.insert(json_name, schema);
            }
        }

        Ok(Schema::object(properties, required))
    }

    fn parse_type(&mut self, expr: &str, ctx: &FieldContext<'_>) -> Result<Schema, SchemaError> {
        let expr = expr.trim();

        if let Some(inner) = expr.strip_prefix('*') {
            return Ok(Schema::nullable(self.parse_type(inner, ctx)?));
        }
        if is_forbidden(expr) {
            return Err(SchemaError::forbidden(ctx.record, ctx.field, expr));
        }
        if expr == "[]byte" || expr == "json.RawMessage" {
            self.warn(ctx, format!("`{expr}` accepts any value"));
            return Ok(Schema::any());
        }
        if let Some(elem) = expr.strip_prefix("[]") {
            return Ok(Schema::array(self.parse_type(elem, ctx)?));
        }
        if expr.starts_with('[') {
            if let Some(close) = expr.find(']') {
                return Ok(Schema::array(self.parse_type(&expr[close + 1..], ctx)?));
            }
        }
        if let Some(rest) = expr.strip_prefix("map[") {
            if let Some(close) = rest.find(']') {
                return Ok(Schema::map(self.parse_type(&rest[close + 1..], ctx)?));
            }
        }
        if let Some(inline) = expr
            .strip_prefix("struct")
            .map(str::trim_start)
            .and_then(|s| s.strip_prefix('{'))
            .and_then(|s| s.strip_suffix('}'))
        {
            let name = format!("{}.{}", ctx.record, ctx.field);
            return self.parse_struct_body(&name, inline);
        }
        if let Some(t) = primitive(expr) {
            return Ok(Schema::of(t));
        }
        if expr == self.root {
            return Ok(Schema::reference("#"));
        }
        if self.names.contains(expr) {
            return Ok(Schema::reference(format!("#/$defs/{expr}")));
        }

        self.warn(ctx, format!("unknown type `{expr}` accepts any value"));
        Ok(Schema::any())
    }

    fn warn(&mut self, ctx: &FieldContext<'_>, message: String) {
        self.warnings
            .push(format!("{}.{}: {}", ctx.record, ctx.field, message));
    }
}
