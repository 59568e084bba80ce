use serde_json::Value;

use crate::error::ExpressionError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Tok {
    Literal(Value),
    Ident(String),
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Question,
    Colon,
    Not,
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
}

/// A token and the byte offset it starts at
pub(crate) type Spanned = (Tok, usize);

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

pub(crate) fn tokenize(src: &str) -> Result<Vec<Spanned>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '"' || c == '\'' {
            chars.next();
            let mut text = String::new();
            let mut closed = false;
            while let Some((_, c)) = chars.next() {
                match c {
                    '\\' => match chars.next() {
                        Some((_, 'n')) => text.push('\n'),
                        Some((_, 't')) => text.push('\t'),
                        Some((_, 'r')) => text.push('\r'),
                        Some((_, escaped)) => text.push(escaped),
                        None => break,
                    },
                    c if c == '"' || c == '\'' => {
                        if src[start..].starts_with(c) {
                            closed = true;
                            break;
                        }
                        text.push(c);
                    }
                    c => text.push(c),
                }
            }
            if !closed {
                return Err(ExpressionError::new("unterminated string", start, src));
            }
            tokens.push((Tok::Literal(Value::String(text)), start));
            continue;
        }
        if c.is_ascii_digit() {
            let mut end = start;
            let mut seen_dot = false;
            while let Some(&(i, c)) = chars.peek() {
                let fraction = c == '.'
                    && !seen_dot
                    && src[i + 1..].starts_with(|next: char| next.is_ascii_digit());
                if !(c.is_ascii_digit() || fraction) {
                    break;
                }
                seen_dot |= fraction;
                end = i + 1;
                chars.next();
            }
            let text = &src[start..end];
            let value = match text.parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => text
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| ExpressionError::new(format!("invalid number {text}"), start, src))?,
            };
            tokens.push((Tok::Literal(value), start));
            continue;
        }
        if is_ident_start(c) {
            let mut end = start;
            while let Some(&(i, c)) = chars.peek() {
                if !is_ident_continue(c) {
                    break;
                }
                end = i + c.len_utf8();
                chars.next();
            }
            let tok = match &src[start..end] {
                "true" => Tok::Literal(Value::Bool(true)),
                "false" => Tok::Literal(Value::Bool(false)),
                "null" | "undefined" => Tok::Literal(Value::Null),
                name => Tok::Ident(name.to_string()),
            };
            tokens.push((tok, start));
            continue;
        }
        let rest = &src[start..];
        let (tok, len) = if rest.starts_with("===") {
            (Tok::Eq, 3)
        } else if rest.starts_with("!==") {
            (Tok::NotEq, 3)
        } else if rest.starts_with("==") {
            (Tok::Eq, 2)
        } else if rest.starts_with("!=") {
            (Tok::NotEq, 2)
        } else if rest.starts_with("<=") {
            (Tok::LtEq, 2)
        } else if rest.starts_with(">=") {
            (Tok::GtEq, 2)
        } else if rest.starts_with("&&") {
            (Tok::And, 2)
        } else if rest.starts_with("||") {
            (Tok::Or, 2)
        } else {
            let tok = match c {
                '.' => Tok::Dot,
                '[' => Tok::LBracket,
                ']' => Tok::RBracket,
                '(' => Tok::LParen,
                ')' => Tok::RParen,
                '?' => Tok::Question,
                ':' => Tok::Colon,
                '!' => Tok::Not,
                '<' => Tok::Lt,
                '>' => Tok::Gt,
                '+' => Tok::Plus,
                '-' => Tok::Minus,
                '*' => Tok::Star,
                '/' => Tok::Slash,
                '%' => Tok::Percent,
                other => {
                    return Err(ExpressionError::new(format!("unexpected character `{other}`"), start, src));
                }
            };
            (tok, 1)
        };
        tokens.push((tok, start));
        for _ in 0..len {
            chars.next();
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn toks(src: &str) -> Vec<Tok> {
        tokenize(src).unwrap().into_iter().map(|(tok, _)| tok).collect()
    }

    #[test]
    fn literals_and_operators() {
        assert_eq!(
            toks("a.b >= 1.5 && 'x\\'y' != null"),
            vec![
                Tok::Ident("a".into()),
                Tok::Dot,
                Tok::Ident("b".into()),
                Tok::GtEq,
                Tok::Literal(json!(1.5)),
                Tok::And,
                Tok::Literal(json!("x'y")),
                Tok::NotEq,
                Tok::Literal(Value::Null),
            ]
        );
    }

    #[test]
    fn member_access_after_integer_is_not_a_fraction() {
        assert_eq!(toks("items[0].name"), vec![
            Tok::Ident("items".into()),
            Tok::LBracket,
            Tok::Literal(json!(0)),
            Tok::RBracket,
            Tok::Dot,
            Tok::Ident("name".into()),
        ]);
    }

    #[test]
    fn quotes_of_the_other_kind_are_text() {
        assert_eq!(toks(r#""it's""#), vec![Tok::Literal(json!("it's"))]);
    }

    #[test]
    fn reports_offsets() {
        let err = tokenize("a # b").unwrap_err();
        assert_eq!(err.offset, 2);
        assert_eq!(tokenize("'open").unwrap_err().message, "unterminated string");
    }
}
