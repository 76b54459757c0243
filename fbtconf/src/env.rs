//! Environment placeholder expansion.
//!
//! Layer files cannot run code, so reading the environment is expressed with
//! `${env:NAME}` placeholders inside string values instead.

use toml::{Table, Value};

/// Replaces environment variable placeholders in a string.
///
/// Placeholders use the format `${env:VAR_NAME}`. An unset variable expands
/// to an empty string. Anything else that starts with `${` (incomplete, or
/// not an `env:` placeholder) is kept as written.
///
/// # Example
///
/// ```rust
/// use fbtconf::replace_env_placeholders;
///
/// unsafe { std::env::set_var("FBT_DOC_ORIGIN", "Custom"); }
/// assert_eq!(replace_env_placeholders("${env:FBT_DOC_ORIGIN}-fw"), "Custom-fw");
/// ```
pub fn replace_env_placeholders(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }

        chars.next();
        let mut placeholder = String::new();
        let mut depth = 1;
        let mut closed = false;

        for ch in chars.by_ref() {
            match ch {
                '{' => {
                    depth += 1;
                    placeholder.push(ch);
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        closed = true;
                        break;
                    }
                    placeholder.push(ch);
                }
                _ => placeholder.push(ch),
            }
        }

        match placeholder.strip_prefix("env:") {
            Some(name) if closed => match std::env::var(name) {
                Ok(value) => {
                    debug!("using {name}={value}");
                    result.push_str(&value);
                }
                Err(_) => debug!("{name} is not set, expanding to an empty string"),
            },
            _ => {
                result.push_str("${");
                result.push_str(&placeholder);
                if closed {
                    result.push('}');
                }
            }
        }
    }

    result
}

/// Expand placeholders in every string of `table`, at any depth.
pub fn expand_table(table: &mut Table) {
    for (_, value) in table.iter_mut() {
        expand_value(value);
    }
}

fn expand_value(value: &mut Value) {
    match value {
        Value::String(s) => {
            if s.contains("${") {
                *s = replace_env_placeholders(s);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(expand_value),
        Value::Table(table) => expand_table(table),
        _ => {}
    }
}
