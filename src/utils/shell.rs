use serde_json::{Map, Value};

/// Escape a value for use inside single quotes.
/// Replaces `'` with `'\''` (end quote, escaped quote, start quote).
pub fn escape_single_quote_content(value: &str) -> String {
    value.replace('\'', "'\\''")
}

/// Quote a single argument for shell execution.
/// - Empty strings become `''`
/// - Strings with shell metacharacters are wrapped in single quotes
/// - Embedded single quotes are escaped
pub fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }

    const SHELL_META: &[char] = &[
        ' ', '\t', '\n', '\'', '"', '\\', '$', '`', '!', '*', '?', '[', ']', '(', ')', '{', '}',
        '<', '>', '|', '&', ';', '#', '~',
    ];

    if !arg.contains(SHELL_META) {
        return arg.to_string();
    }

    format!("'{}'", escape_single_quote_content(arg))
}

/// Quote a path for shell execution (always quotes).
pub fn quote_path(path: &str) -> String {
    format!("'{}'", escape_single_quote_content(path))
}

/// Render an option map as command-line flags.
///
/// `true` becomes `--key`, `false` and null are dropped, scalars become
/// `--key=value`, arrays are comma-joined. Keys starting with `#` are
/// internal and never rendered.
pub fn render_options(options: &Map<String, Value>) -> Vec<String> {
    options
        .iter()
        .filter(|(key, _)| !key.starts_with('#') && !key.is_empty())
        .filter_map(|(key, value)| {
            let rendered = match value {
                Value::Bool(true) => return Some(format!("--{}", key)),
                Value::Bool(false) | Value::Null => return None,
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(","),
                Value::Object(_) => return None,
            };
            Some(format!("--{}={}", key, quote_arg(&rendered)))
        })
        .collect()
}

/// Build one shell line from a program, positional args and option flags.
pub fn command_line(program: &str, args: &[String], options: &Map<String, Value>) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| quote_arg(a)));
    parts.extend(render_options(options));
    parts.join(" ")
}
