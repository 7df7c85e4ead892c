//! Recursive-descent parser producing the formula AST.
//!
//! Grammar:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | primary
//! primary := NUMBER | IDENT | IDENT '(' expr (',' expr)* ')' | '(' expr ')'
//! ```

use rust_decimal::Decimal;

use super::FormulaError;
use super::lexer::{Spanned, Token, tokenize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Built-in functions. Names are matched case-insensitively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Function {
    Min,
    Max,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Number(Decimal),
    Variable(String),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        function: Function,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Variable names referenced anywhere in the expression, in order of
    /// first appearance.
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Number(_) => {}
            Self::Variable(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Self::Neg(inner) => inner.collect_variables(out),
            Self::Binary { lhs, rhs, .. } => {
                lhs.collect_variables(out);
                rhs.collect_variables(out);
            }
            Self::Call { args, .. } => {
                for arg in args {
                    arg.collect_variables(out);
                }
            }
        }
    }
}

/// Deepest expression tree the parser accepts. Evaluation and drop recurse
/// once per level, so this also bounds their stack use.
pub const MAX_DEPTH: usize = 64;

/// Parses a complete formula.
pub fn parse(input: &str) -> Result<Expr, FormulaError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        cursor: 0,
        depth: 0,
    };
    let (expr, _) = parser.expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(spanned) => Err(unexpected(spanned)),
    }
}

/// A parsed subtree and its height.
type Parsed = (Expr, usize);

struct Parser {
    tokens: Vec<Spanned>,
    cursor: usize,
    /// Current recursion depth.
    depth: usize,
}

fn unexpected(spanned: &Spanned) -> FormulaError {
    FormulaError::UnexpectedToken {
        token: spanned.token.describe(),
        position: spanned.position,
    }
}

/// Height of a new node over children of the given heights.
fn grow(height: usize) -> Result<usize, FormulaError> {
    let height = height + 1;
    if height > MAX_DEPTH {
        return Err(FormulaError::TooDeep(MAX_DEPTH));
    }
    Ok(height)
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.cursor)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|s| &s.token)
    }

    fn advance(&mut self) -> Result<Spanned, FormulaError> {
        let spanned = self
            .tokens
            .get(self.cursor)
            .cloned()
            .ok_or(FormulaError::UnexpectedEnd)?;
        self.cursor += 1;
        Ok(spanned)
    }

    fn expect(&mut self, expected: &Token) -> Result<(), FormulaError> {
        let spanned = self.advance()?;
        if &spanned.token == expected {
            Ok(())
        } else {
            Err(unexpected(&spanned))
        }
    }

    /// Runs `f` one recursion level deeper.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, FormulaError>,
    ) -> Result<T, FormulaError> {
        if self.depth >= MAX_DEPTH {
            return Err(FormulaError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn expr(&mut self) -> Result<Parsed, FormulaError> {
        let (mut lhs, mut height) = self.term()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok((lhs, height)),
            };
            self.cursor += 1;
            let (rhs, rhs_height) = self.term()?;
            height = grow(height.max(rhs_height))?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn term(&mut self) -> Result<Parsed, FormulaError> {
        let (mut lhs, mut height) = self.unary()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok((lhs, height)),
            };
            self.cursor += 1;
            let (rhs, rhs_height) = self.unary()?;
            height = grow(height.max(rhs_height))?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Parsed, FormulaError> {
        match self.peek_token() {
            Some(Token::Minus) => {
                self.cursor += 1;
                let (inner, height) = self.nested(Self::unary)?;
                Ok((Expr::Neg(Box::new(inner)), grow(height)?))
            }
            Some(Token::Plus) => {
                self.cursor += 1;
                self.nested(Self::unary)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Parsed, FormulaError> {
        let spanned = self.advance()?;
        match spanned.token {
            Token::Number(n) => Ok((Expr::Number(n), 1)),
            Token::LParen => {
                let inner = self.nested(Self::expr)?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if self.peek_token() == Some(&Token::LParen) {
                    self.cursor += 1;
                    self.nested(|parser| parser.call(name))
                } else {
                    Ok((Expr::Variable(name), 1))
                }
            }
            _ => Err(unexpected(&spanned)),
        }
    }

    /// Parses the argument list after `name(`.
    fn call(&mut self, name: String) -> Result<Parsed, FormulaError> {
        let function: Function = name
            .parse()
            .map_err(|_| FormulaError::UnknownFunction(name.clone()))?;

        if self.peek_token() == Some(&Token::RParen) {
            return Err(FormulaError::EmptyArguments(name));
        }

        let (first, mut height) = self.expr()?;
        let mut args = vec![first];
        loop {
            let spanned = self.advance()?;
            match spanned.token {
                Token::Comma => {
                    let (arg, arg_height) = self.expr()?;
                    height = height.max(arg_height);
                    args.push(arg);
                }
                Token::RParen => break,
                _ => return Err(unexpected(&spanned)),
            }
        }
        Ok((Expr::Call { function, args }, grow(height)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: i64) -> Expr {
        Expr::Number(Decimal::from(n))
    }

    #[test]
    fn multiplication_binds_tighter() {
        let expr = parse("1+2*3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                lhs: Box::new(num(1)),
                rhs: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    lhs: Box::new(num(2)),
                    rhs: Box::new(num(3)),
                }),
            }
        );
    }

    #[test]
    fn calls_are_case_insensitive() {
        let expr = parse("MIN(4, STR)").unwrap();
        assert_eq!(
            expr,
            Expr::Call {
                function: Function::Min,
                args: vec![num(4), Expr::Variable("STR".into())],
            }
        );
    }

    #[test]
    fn variables_are_listed_once() {
        let expr = parse("STR + max(STR, {AGI}) / 2").unwrap();
        assert_eq!(expr.variables(), vec!["STR", "AGI"]);
    }

    #[test]
    fn reports_structural_errors() {
        assert_eq!(parse(""), Err(FormulaError::UnexpectedEnd));
        assert_eq!(parse("2+"), Err(FormulaError::UnexpectedEnd));
        assert_eq!(
            parse("avg(1,2)"),
            Err(FormulaError::UnknownFunction("avg".into()))
        );
        assert_eq!(parse("min()"), Err(FormulaError::EmptyArguments("min".into())));
        assert_eq!(
            parse("(1 2)"),
            Err(FormulaError::UnexpectedToken {
                token: "2".into(),
                position: 3
            })
        );
        assert!(matches!(
            parse("Special Grenade"),
            Err(FormulaError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn nesting_is_bounded() {
        let nested = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        assert_eq!(parse(&nested), Err(FormulaError::TooDeep(MAX_DEPTH)));

        let negations = format!("{}1", "-".repeat(100_000));
        assert_eq!(parse(&negations), Err(FormulaError::TooDeep(MAX_DEPTH)));

        let chain = vec!["1"; 100_000].join("+");
        assert_eq!(parse(&chain), Err(FormulaError::TooDeep(MAX_DEPTH)));

        let calls = format!("{}1{}", "max(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(parse(&calls), Err(FormulaError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn moderate_nesting_still_parses() {
        let nested = format!("{}STR{}", "(".repeat(40), ")".repeat(40));
        assert_eq!(parse(&nested), Ok(Expr::Variable("STR".into())));

        let chain = vec!["1"; 30].join(" + ");
        assert!(parse(&chain).is_ok());
    }
}
