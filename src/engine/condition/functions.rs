//! Built-in functions callable from condition expressions

use super::evaluator::Value;
use crate::engine::error::ExpressionError;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

static ESCAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\(.)").expect("static pattern"));

/// Globals resolved before any item reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// `matches(subject, pattern, flags?)`
    Matches,
    /// `contains(subject, needle)`
    Contains,
}

impl Function {
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "matches" => Some(Function::Matches),
            "contains" => Some(Function::Contains),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Matches => "matches",
            Function::Contains => "contains",
        }
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, ExpressionError> {
        match (self, args) {
            (Function::Matches, [subject, pattern]) => matches(subject, pattern, None),
            (Function::Matches, [subject, pattern, flags]) => {
                matches(subject, pattern, Some(flags))
            }
            (Function::Contains, [subject, needle]) => Ok(Value::Bool(
                subject.to_text().contains(needle.to_text().as_str()),
            )),
            _ => Err(ExpressionError::evaluation(format!(
                "{}() called with {} argument(s)",
                self.name(),
                args.len()
            ))),
        }
    }
}

fn matches(subject: &Value, pattern: &Value, flags: Option<&Value>) -> Result<Value, ExpressionError> {
    let pattern = pattern.to_text();
    let mut builder = RegexBuilder::new(&pattern);
    if let Some(flags) = flags {
        for flag in flags.to_text().chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'u' => builder.unicode(true),
                // global matching makes no difference to a boolean test
                'g' => &mut builder,
                other => {
                    return Err(ExpressionError::evaluation(format!(
                        "unsupported regex flag '{other}'"
                    )))
                }
            };
        }
    }
    let regex = builder.build().map_err(|e| {
        ExpressionError::evaluation(format!("invalid pattern {pattern:?}: {e}"))
    })?;
    Ok(Value::Bool(regex.is_match(&subject.to_text())))
}

/// Strip the surrounding quotes of a string literal and resolve `\x` escapes.
pub fn unquote(literal: &str) -> String {
    let inner = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(literal);
    ESCAPE.replace_all(inner, "$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::Str(v.to_string())
    }

    #[test]
    fn test_lookup() {
        assert_eq!(Function::lookup("matches"), Some(Function::Matches));
        assert_eq!(Function::lookup("contains"), Some(Function::Contains));
        assert_eq!(Function::lookup("q1"), None);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote(r#""abc""#), "abc");
        assert_eq!(unquote(r#""a\"b""#), r#"a"b"#);
        assert_eq!(unquote(r#""a\\b""#), r"a\b");
        assert_eq!(unquote(r#""\d+""#), "d+");
        assert_eq!(unquote(r#""""#), "");
    }

    #[test]
    fn test_matches() {
        let result = Function::Matches.call(&[s("abc123"), s("^[a-z]+[0-9]+$")]);
        assert_eq!(result, Ok(Value::Bool(true)));

        let result = Function::Matches.call(&[s("ABC"), s("^abc$")]);
        assert_eq!(result, Ok(Value::Bool(false)));

        let result = Function::Matches.call(&[s("ABC"), s("^abc$"), s("gi")]);
        assert_eq!(result, Ok(Value::Bool(true)));
    }

    #[test]
    fn test_matches_rejects_bad_input() {
        assert!(Function::Matches.call(&[s("a"), s("(")]).is_err());
        assert!(Function::Matches.call(&[s("a"), s("a"), s("x")]).is_err());
        assert!(Function::Matches.call(&[s("a")]).is_err());
    }

    #[test]
    fn test_contains() {
        assert_eq!(
            Function::Contains.call(&[s("hello world"), s("world")]),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            Function::Contains.call(&[s("hello"), s("world")]),
            Ok(Value::Bool(false))
        );
        assert_eq!(
            Function::Contains.call(&[Value::Bool(true), s("ru")]),
            Ok(Value::Bool(true))
        );
    }
}
