/// Error classifier: maps raw failure text (worker tracebacks, screen
/// reasons, timeout notices) onto the stable taxonomy the caller consumes.
/// Deterministic ordered rule list, first match wins; total over all inputs.
use crate::types::{ErrorCategory, ErrorClassification};
use regex::Regex;
use std::sync::OnceLock;

struct Rules {
    syntax_desc: Regex,
    syntax_line: Regex,
    import_desc: Regex,
    name_desc: Regex,
    type_desc: Regex,
    value_desc: Regex,
    attribute_desc: Regex,
}

fn rules() -> &'static Rules {
    static RULES: OnceLock<Rules> = OnceLock::new();
    RULES.get_or_init(|| Rules {
        syntax_desc: Regex::new(r"(?m)^(?:SyntaxError|IndentationError|TabError): (.+)$")
            .expect("valid pattern"),
        syntax_line: Regex::new(r#"File "[^"]*", line (\d+)"#).expect("valid pattern"),
        import_desc: Regex::new(r"(?m)^(?:ImportError|ModuleNotFoundError): (.+)$")
            .expect("valid pattern"),
        name_desc: Regex::new(r"(?m)^NameError: (.+)$").expect("valid pattern"),
        type_desc: Regex::new(r"(?m)^TypeError: (.+)$").expect("valid pattern"),
        value_desc: Regex::new(r"(?m)^ValueError: (.+)$").expect("valid pattern"),
        attribute_desc: Regex::new(r"(?m)^AttributeError: (.+)$").expect("valid pattern"),
    })
}

/// Last captured group across the text; tracebacks report the innermost
/// frame last, which is the most specific fragment
fn last_capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures_iter(text)
        .last()
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Classify raw failure text. Never errors; unmatched or empty input falls
/// back to the generic runtime category with the raw text preserved.
pub fn classify(raw: &str) -> ErrorClassification {
    let r = rules();

    if raw.contains("forbidden function") {
        return ErrorClassification {
            category: ErrorCategory::ForbiddenFunction,
            message: format!("Security error: {}", raw.trim()),
        };
    }

    if raw.contains("suspicious pattern") {
        return ErrorClassification {
            category: ErrorCategory::SuspiciousPattern,
            message: format!("Security error: {}", raw.trim()),
        };
    }

    if raw.contains("timed out") {
        return ErrorClassification {
            category: ErrorCategory::Timeout,
            message: raw.trim().to_string(),
        };
    }

    if let Some(desc) = last_capture(&r.syntax_desc, raw) {
        let line = last_capture(&r.syntax_line, raw).unwrap_or("unknown");
        return ErrorClassification {
            category: ErrorCategory::Syntax,
            message: format!("Syntax error on line {}: {}", line, desc),
        };
    }

    if let Some(desc) = last_capture(&r.import_desc, raw) {
        return ErrorClassification {
            category: ErrorCategory::ImportRejected,
            message: format!("Import error: {}", desc),
        };
    }

    if let Some(desc) = last_capture(&r.name_desc, raw) {
        return ErrorClassification {
            category: ErrorCategory::Name,
            message: format!("Name error: {}", desc),
        };
    }

    if let Some(desc) = last_capture(&r.type_desc, raw) {
        return ErrorClassification {
            category: ErrorCategory::Type,
            message: format!("Type error: {}", desc),
        };
    }

    if let Some(desc) = last_capture(&r.value_desc, raw) {
        return ErrorClassification {
            category: ErrorCategory::Value,
            message: format!("Value error: {}", desc),
        };
    }

    if let Some(desc) = last_capture(&r.attribute_desc, raw) {
        return ErrorClassification {
            category: ErrorCategory::Attribute,
            message: format!("Attribute error: {}", desc),
        };
    }

    // Tracebacks put the exception line last; keep that, or the raw text
    // when there is nothing better
    let detail = raw
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or(raw);
    ErrorClassification {
        category: ErrorCategory::Runtime,
        message: format!("Error: {}", detail),
    }
}
