use serde_json::Value;

use super::lexer::{Spanned, Tok, tokenize};
use crate::error::ExpressionError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    /// Bare name, looked up in the scope
    Name(String),
    /// `object.field`
    Member(Box<Expr>, String),
    /// `object[key]`
    Index(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    /// `condition ? then : otherwise`
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    fn from_tok(tok: &Tok) -> Option<Self> {
        Some(match tok {
            Tok::Or => BinOp::Or,
            Tok::And => BinOp::And,
            Tok::Eq => BinOp::Eq,
            Tok::NotEq => BinOp::NotEq,
            Tok::Lt => BinOp::Lt,
            Tok::LtEq => BinOp::LtEq,
            Tok::Gt => BinOp::Gt,
            Tok::GtEq => BinOp::GtEq,
            Tok::Plus => BinOp::Add,
            Tok::Minus => BinOp::Sub,
            Tok::Star => BinOp::Mul,
            Tok::Slash => BinOp::Div,
            Tok::Percent => BinOp::Rem,
            _ => return None,
        })
    }

    fn precedence(&self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Eq | BinOp::NotEq => 3,
            BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq => 4,
            BinOp::Add | BinOp::Sub => 5,
            BinOp::Mul | BinOp::Div | BinOp::Rem => 6,
        }
    }
}

/// Deepest tree a source may produce, counting nesting and operator chains
const MAX_DEPTH: usize = 256;

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

type Result<T> = std::result::Result<T, ExpressionError>;

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|(tok, _)| tok)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, offset)| *offset)
            .unwrap_or(self.src.len())
    }

    fn advance(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).map(|(tok, _)| tok.clone());
        self.pos += 1;
        tok
    }

    fn eat(&mut self, expected: &Tok) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, message: &str) -> ExpressionError {
        ExpressionError::new(message, self.offset(), self.src)
    }

    fn expect(&mut self, expected: &Tok, message: &str) -> Result<()> {
        if self.eat(expected) { Ok(()) } else { Err(self.error(message)) }
    }

    /// Runs `parse` one level deeper, `extra` counting the operators already chained
    /// above the subtree it produces
    fn nested<T>(&mut self, extra: usize, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth + extra >= MAX_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        self.depth += extra;
        let result = parse(self);
        self.depth -= extra;
        result
    }

    fn expression(&mut self) -> Result<Expr> {
        let condition = self.binary(1)?;
        if !self.eat(&Tok::Question) {
            return Ok(condition);
        }
        let then = self.nested(1, Self::expression)?;
        self.expect(&Tok::Colon, "expected `:` in conditional")?;
        let otherwise = self.nested(1, Self::expression)?;
        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn binary(&mut self, min_precedence: u8) -> Result<Expr> {
        let mut left = self.unary()?;
        let mut chained = 0;
        while let Some(op) = self.peek().and_then(BinOp::from_tok) {
            if op.precedence() < min_precedence {
                break;
            }
            self.pos += 1;
            chained += 1;
            let right = self.nested(chained, |parser| parser.binary(op.precedence() + 1))?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat(&Tok::Not) {
            return Ok(Expr::Not(Box::new(self.nested(1, Self::unary)?)));
        }
        if self.eat(&Tok::Minus) {
            return Ok(Expr::Neg(Box::new(self.nested(1, Self::unary)?)));
        }
        let primary = self.primary()?;
        self.postfix(primary)
    }

    fn primary(&mut self) -> Result<Expr> {
        let offset = self.offset();
        match self.advance() {
            Some(Tok::Literal(value)) => Ok(Expr::Literal(value)),
            Some(Tok::Ident(name)) => Ok(Expr::Name(name)),
            Some(Tok::LParen) => {
                let inner = self.nested(1, Self::expression)?;
                self.expect(&Tok::RParen, "expected `)`")?;
                Ok(inner)
            }
            Some(_) => Err(ExpressionError::new("unexpected token", offset, self.src)),
            None => Err(ExpressionError::new("unexpected end of expression", offset, self.src)),
        }
    }

    fn postfix(&mut self, mut target: Expr) -> Result<Expr> {
        let mut chained = 0;
        loop {
            if self.eat(&Tok::Dot) {
                chained += 1;
                self.nested(chained, |_| Ok(()))?;
                match self.advance() {
                    Some(Tok::Ident(field)) => target = Expr::Member(Box::new(target), field),
                    _ => {
                        self.pos -= 1;
                        return Err(self.error("expected field name after `.`"));
                    }
                }
            } else if self.eat(&Tok::LBracket) {
                chained += 1;
                let key = self.nested(chained, Self::expression)?;
                self.expect(&Tok::RBracket, "expected `]`")?;
                target = Expr::Index(Box::new(target), Box::new(key));
            } else {
                return Ok(target);
            }
        }
    }
}

pub(crate) fn parse(src: &str) -> Result<Expr> {
    let mut parser = Parser {
        src,
        tokens: tokenize(src)?,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expression()?;
    if parser.peek().is_some() {
        return Err(parser.error("unexpected token"));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn name(n: &str) -> Box<Expr> {
        Box::new(Expr::Name(n.to_string()))
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(
            parse("a - b - c * 2").unwrap(),
            Expr::Binary {
                left: Box::new(Expr::Binary {
                    left: name("a"),
                    op: BinOp::Sub,
                    right: name("b"),
                }),
                op: BinOp::Sub,
                right: Box::new(Expr::Binary {
                    left: name("c"),
                    op: BinOp::Mul,
                    right: Box::new(Expr::Literal(json!(2))),
                }),
            }
        );
    }

    #[test]
    fn paths_and_conditionals() {
        assert_eq!(
            parse("user ? user.names[0] : 'guest'").unwrap(),
            Expr::Conditional {
                condition: name("user"),
                then: Box::new(Expr::Index(
                    Box::new(Expr::Member(name("user"), "names".to_string())),
                    Box::new(Expr::Literal(json!(0))),
                )),
                otherwise: Box::new(Expr::Literal(json!("guest"))),
            }
        );
    }

    #[test]
    fn malformed_sources() {
        assert_eq!(parse("a +").unwrap_err().message, "unexpected end of expression");
        assert_eq!(parse("a b").unwrap_err().offset, 2);
        assert_eq!(parse("(a").unwrap_err().message, "expected `)`");
        assert_eq!(parse("a.1").unwrap_err().message, "expected field name after `.`");
        assert_eq!(parse("a ? b").unwrap_err().message, "expected `:` in conditional");
        assert!(parse("").is_err());
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let nested = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        assert_eq!(parse(&nested).unwrap_err().message, "expression nested too deeply");
        let chained = vec!["1"; 100_000].join(" + ");
        assert_eq!(parse(&chained).unwrap_err().message, "expression nested too deeply");
        let negated = "!".repeat(100_000) + "a";
        assert_eq!(parse(&negated).unwrap_err().message, "expression nested too deeply");
        let path = "a".to_string() + &".b".repeat(100_000);
        assert_eq!(parse(&path).unwrap_err().message, "expression nested too deeply");

        let shallow = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(parse(&shallow).unwrap(), Expr::Literal(json!(1)));
    }
}
