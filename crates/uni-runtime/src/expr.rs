//! Restricted dotted-path expression evaluator.
//!
//! Resolves `$event.*` / `$returnValue.*` argument placeholders against
//! a JSON snapshot. The grammar is deliberately tiny: dotted property
//! access and zero-argument call syntax only (a trailing `()` resolves
//! like a property). No evaluation of arbitrary expressions, ever.
//!
//! Resolution failure is not an error; callers elide the argument and
//! move on.

use serde_json::Value;

/// Resolve `path` ("a.b.c" or "a.b()") against `root`. Returns `None`
/// as soon as any segment fails to resolve.
pub fn resolve_path(root: &Value, path: &str) -> Option<Value> {
    let mut current = root;
    for segment in path.split('.') {
        if segment.is_empty() {
            return None;
        }
        let name = segment.strip_suffix("()").unwrap_or(segment);
        current = match current {
            Value::Object(map) => map.get(name)?,
            Value::Array(items) => items.get(name.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current.clone())
}

/// Substitute one argument token. `$event...` resolves against the
/// event snapshot, `$returnValue...` against the last server return
/// value; anything else passes through verbatim. An unresolvable
/// placeholder becomes an empty string rather than aborting the action.
pub fn substitute_token(token: &str, event: &Value, return_value: &Value) -> String {
    let trimmed = token.trim();
    let resolved = if let Some(path) = trimmed.strip_prefix("$event.") {
        resolve_path(event, path)
    } else if trimmed == "$event" {
        Some(event.clone())
    } else if let Some(path) = trimmed.strip_prefix("$returnValue.") {
        resolve_path(return_value, path)
    } else if trimmed == "$returnValue" {
        Some(return_value.clone())
    } else {
        return trimmed.to_string();
    };

    match resolved {
        Some(Value::String(s)) => format!("\"{}\"", s.replace('"', "\\\"")),
        Some(value) => value.to_string(),
        None => {
            tracing::warn!(token = trimmed, "unresolvable action argument, eliding");
            String::new()
        }
    }
}

/// Substitute all placeholder arguments inside a method-call expression
/// like `save($event.target.value, 2)`.
pub fn substitute_args(expression: &str, event: &Value, return_value: &Value) -> String {
    let Some(open) = expression.find('(') else {
        return expression.to_string();
    };
    let Some(close) = expression.rfind(')') else {
        return expression.to_string();
    };
    if close < open {
        return expression.to_string();
    }

    let name = &expression[..open];
    let args = &expression[open + 1..close];
    if args.trim().is_empty() {
        return expression.to_string();
    }

    let substituted: Vec<String> = split_top_level_args(args)
        .iter()
        .map(|arg| substitute_token(arg, event, return_value))
        .filter(|arg| !arg.is_empty())
        .collect();

    format!("{name}({})", substituted.join(", "))
}

/// Split an argument list on commas that are not nested inside quotes,
/// brackets or braces.
fn split_top_level_args(args: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut in_string: Option<char> = None;
    let mut current = String::new();

    for c in args.chars() {
        match in_string {
            Some(quote) => {
                current.push(c);
                if c == quote {
                    in_string = None;
                }
            }
            None => match c {
                '\'' | '"' => {
                    in_string = Some(c);
                    current.push(c);
                }
                '(' | '[' | '{' => {
                    depth += 1;
                    current.push(c);
                }
                ')' | ']' | '}' => {
                    depth = depth.saturating_sub(1);
                    current.push(c);
                }
                ',' if depth == 0 => {
                    out.push(current.trim().to_string());
                    current.clear();
                }
                _ => current.push(c),
            },
        }
    }
    if !current.trim().is_empty() {
        out.push(current.trim().to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_paths() {
        let event = json!({"target": {"value": "Ada", "checked": true}});
        assert_eq!(
            resolve_path(&event, "target.value"),
            Some(json!("Ada"))
        );
        assert_eq!(resolve_path(&event, "target.missing"), None);
    }

    #[test]
    fn call_syntax_resolves_like_property() {
        let ret = json!({"items": {"first": 7}});
        assert_eq!(resolve_path(&ret, "items.first()"), Some(json!(7)));
    }

    #[test]
    fn substitutes_event_argument() {
        let event = json!({"target": {"value": "Ada"}});
        let out = substitute_args("save($event.target.value, 2)", &event, &Value::Null);
        assert_eq!(out, "save(\"Ada\", 2)");
    }

    #[test]
    fn unresolvable_argument_is_elided() {
        let event = json!({});
        let out = substitute_args("save($event.nope.deep, 2)", &event, &Value::Null);
        assert_eq!(out, "save(2)");
    }

    #[test]
    fn plain_arguments_pass_through() {
        let out = substitute_args("add(1, 'two', [3, 4])", &Value::Null, &Value::Null);
        assert_eq!(out, "add(1, 'two', [3, 4])");
    }

    #[test]
    fn no_arguments_is_untouched() {
        let out = substitute_args("refresh()", &Value::Null, &Value::Null);
        assert_eq!(out, "refresh()");
    }
}
