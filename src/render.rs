//! Purpose: Human-readable rendering of derivations and JSON values for terminals.
//! Exports: `colorize_json`, `derivation_text`, `Style`.
//! Role: Pure formatters used by CLI emission paths; no I/O here.
//! Invariants: When color is disabled, JSON output equals `serde_json::to_string_pretty`.
//! Invariants: ANSI escapes appear only when explicitly enabled.
//! Invariants: Data accesses are listed only for expressions that validate.
use certlogic_fiddle::api::{Buffer, Derivation, EvaluationOutcome, ParseOutcome};
use serde_json::{Map, Value};
use url::Url;

const INDENT: &str = "  ";

#[derive(Clone, Copy, Debug)]
pub(crate) enum Style {
    Key,
    Text,
    Number,
    Literal,
    Punct,
    Heading,
    Problem,
}

impl Style {
    // 8/16-color codes only; bright variants wash out on light themes.
    fn code(self) -> &'static str {
        match self {
            Style::Key => "36",
            Style::Text => "32",
            Style::Number => "33",
            Style::Literal => "35",
            Style::Punct => "39",
            Style::Heading => "1",
            Style::Problem => "31",
        }
    }

    pub(crate) fn paint(self, text: &str, enabled: bool) -> String {
        if enabled {
            format!("\u{1b}[{}m{text}\u{1b}[0m", self.code())
        } else {
            text.to_string()
        }
    }
}

struct Painter {
    out: String,
    color: bool,
}

impl Painter {
    fn push(&mut self, text: &str, style: Style) {
        let painted = style.paint(text, self.color);
        self.out.push_str(&painted);
    }

    fn newline(&mut self, depth: usize) {
        self.out.push('\n');
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
    }

    fn value(&mut self, value: &Value, depth: usize) {
        match value {
            Value::Null => self.push("null", Style::Literal),
            Value::Bool(b) => self.push(if *b { "true" } else { "false" }, Style::Literal),
            Value::Number(n) => self.push(&n.to_string(), Style::Number),
            Value::String(s) => self.push(&quoted(s), Style::Text),
            Value::Array(items) if items.is_empty() => self.push("[]", Style::Punct),
            Value::Object(map) if map.is_empty() => self.push("{}", Style::Punct),
            Value::Array(items) => {
                self.push("[", Style::Punct);
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        self.push(",", Style::Punct);
                    }
                    self.newline(depth + 1);
                    self.value(item, depth + 1);
                }
                self.newline(depth);
                self.push("]", Style::Punct);
            }
            Value::Object(map) => self.object(map, depth),
        }
    }

    fn object(&mut self, map: &Map<String, Value>, depth: usize) {
        self.push("{", Style::Punct);
        for (idx, (key, value)) in map.iter().enumerate() {
            if idx > 0 {
                self.push(",", Style::Punct);
            }
            self.newline(depth + 1);
            self.push(&quoted(key), Style::Key);
            self.push(":", Style::Punct);
            self.out.push(' ');
            self.value(value, depth + 1);
        }
        self.newline(depth);
        self.push("}", Style::Punct);
    }
}

fn quoted(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

pub(crate) fn colorize_json(value: &Value, use_color: bool) -> String {
    let mut painter = Painter {
        out: String::new(),
        color: use_color,
    };
    painter.value(value, 0);
    painter.out
}

fn parse_hint(outcome: &ParseOutcome, buffer: Buffer) -> Option<String> {
    match outcome {
        ParseOutcome::Parsed(_) => None,
        ParseOutcome::MalformedText(malformed) => {
            Some(format!("{INDENT}({})", malformed.hint(buffer.label())))
        }
    }
}

/// Sections mirror the playground page: validation errors, result, share link, data accesses.
pub(crate) fn derivation_text(
    derivation: &Derivation,
    share: Option<&Url>,
    use_color: bool,
) -> String {
    let mut lines = Vec::new();

    lines.push(Style::Heading.paint("Validation errors", use_color));
    match derivation.validation_errors.as_slice() {
        [] => lines.push(format!("{INDENT}(None.)")),
        [only] => lines.push(format!("{INDENT}{}", only.message)),
        many => {
            for (idx, error) in many.iter().enumerate() {
                lines.push(format!("{INDENT}{}. {}", idx + 1, error.message));
            }
        }
    }
    lines.extend(parse_hint(&derivation.expression, Buffer::Expression));

    lines.push(Style::Heading.paint("Evaluation result", use_color));
    match &derivation.outcome {
        EvaluationOutcome::Success(value) => lines.push(colorize_json(value, use_color)),
        other => {
            let explanation = other.explanation().unwrap_or_default();
            let style = match other {
                EvaluationOutcome::ExpressionInvalid => Style::Punct,
                _ => Style::Problem,
            };
            lines.push(format!("{INDENT}{}", style.paint(&explanation, use_color)));
        }
    }
    lines.extend(parse_hint(&derivation.data, Buffer::Data));

    if let Some(url) = share {
        lines.push(Style::Heading.paint("Shareable URL", use_color));
        lines.push(format!("{INDENT}{url}"));
    }

    if derivation.expression_is_valid() {
        lines.push(Style::Heading.paint("Data accesses", use_color));
        if derivation.data_accesses.is_empty() {
            lines.push(format!("{INDENT}(None.)"));
        }
        for access in &derivation.data_accesses {
            lines.push(format!(
                "{INDENT}{} {} {}",
                Style::Key.paint(&quoted(&access.path), use_color),
                Style::Punct.paint("in", use_color),
                access.context
            ));
        }
    }

    lines.join("\n")
}
