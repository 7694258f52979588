//! Expression lexing and parsing.

use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Op(&'static str),
}

const OPERATORS: &[&str] = &[
    "==", "!=", "<=", ">=", "<", ">", "(", ")", "[", "]", ",", ".", "|", "~", "+", "-", "*", "=",
];

fn lex(src: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '\'' || c == '"' {
            let quote = c;
            let mut s = String::new();
            i += 1;
            loop {
                match chars.get(i) {
                    None => return Err("unterminated string literal".to_string()),
                    Some('\\') => {
                        match chars.get(i + 1) {
                            Some('n') => s.push('\n'),
                            Some('t') => s.push('\t'),
                            Some(&other) => s.push(other),
                            None => return Err("unterminated string literal".to_string()),
                        }
                        i += 2;
                    }
                    Some(&ch) if ch == quote => {
                        i += 1;
                        break;
                    }
                    Some(&ch) => {
                        s.push(ch);
                        i += 1;
                    }
                }
            }
            tokens.push(Token::Str(s));
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '_') {
                i += 1;
            }
            let is_float = chars.get(i) == Some(&'.')
                && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit());
            if is_float {
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().filter(|&&d| d != '_').collect();
            if is_float {
                let f = text.parse::<f64>().map_err(|e| format!("bad number '{}': {}", text, e))?;
                tokens.push(Token::Float(f));
            } else {
                let n = text.parse::<i64>().map_err(|e| format!("bad number '{}': {}", text, e))?;
                tokens.push(Token::Int(n));
            }
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else {
            let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
            let op = OPERATORS
                .iter()
                .find(|op| rest.starts_with(**op))
                .ok_or_else(|| format!("unexpected character '{}'", c))?;
            tokens.push(Token::Op(*op));
            i += op.chars().count();
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Add,
    Sub,
    Mul,
    Concat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Test {
    Defined,
    Undefined,
    None,
    String,
    Number,
    Sequence,
    Mapping,
}

impl Test {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "defined" => Test::Defined,
            "undefined" => Test::Undefined,
            "none" => Test::None,
            "string" => Test::String,
            "number" => Test::Number,
            "sequence" | "iterable" => Test::Sequence,
            "mapping" => Test::Mapping,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Filter {
    Default,
    Join,
    Length,
    Lower,
    Upper,
    Trim,
    ToJson,
    Int,
    String,
}

impl Filter {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "default" | "d" => Filter::Default,
            "join" => Filter::Join,
            "length" | "count" => Filter::Length,
            "lower" => Filter::Lower,
            "upper" => Filter::Upper,
            "trim" => Filter::Trim,
            "tojson" => Filter::ToJson,
            "int" => Filter::Int,
            "string" => Filter::String,
            _ => return None,
        })
    }

    /// Accepted argument counts.
    fn arity(self) -> (usize, usize) {
        match self {
            Filter::Default => (0, 2),
            Filter::Join => (0, 1),
            _ => (0, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Method {
    Items,
    Keys,
    Values,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    List(Vec<Expr>),
    Var(String),
    Attr(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Method),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Test {
        expr: Box<Expr>,
        test: Test,
        negated: bool,
    },
    Filter {
        expr: Box<Expr>,
        filter: Filter,
        args: Vec<Expr>,
    },
}

/// Parse a complete expression.
pub(crate) fn parse_expr(src: &str) -> Result<Expr, String> {
    let mut parser = Parser::new(src)?;
    let expr = parser.expression()?;
    parser.finish()?;
    Ok(expr)
}

/// Parse the header of a `for` tag: `targets in iterable`.
pub(crate) fn parse_for(src: &str) -> Result<(Vec<String>, Expr), String> {
    let mut parser = Parser::new(src)?;
    let mut targets = vec![parser.ident()?];
    while parser.eat_op(",") {
        targets.push(parser.ident()?);
    }
    if !parser.eat_keyword("in") {
        return Err("expected 'in' in for loop".to_string());
    }
    let iter = parser.expression()?;
    parser.finish()?;
    Ok((targets, iter))
}

/// Parse the body of a `set` tag: `name = expr`.
pub(crate) fn parse_set(src: &str) -> Result<(String, Expr), String> {
    let mut parser = Parser::new(src)?;
    let name = parser.ident()?;
    if !parser.eat_op("=") {
        return Err("expected '=' in set".to_string());
    }
    let expr = parser.expression()?;
    parser.finish()?;
    Ok((name, expr))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(src: &str) -> Result<Self, String> {
        Ok(Self {
            tokens: lex(src)?,
            pos: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn finish(&self) -> Result<(), String> {
        match self.peek() {
            None => Ok(()),
            Some(tok) => Err(format!("unexpected {}", describe(tok))),
        }
    }

    fn is_op(&self, op: &str) -> bool {
        matches!(self.peek(), Some(Token::Op(o)) if *o == op)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.is_op(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn is_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(name)) if name == kw)
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.is_keyword(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &str) -> Result<(), String> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(match self.peek() {
                Some(tok) => format!("expected '{}', found {}", op, describe(tok)),
                None => format!("expected '{}', found end of expression", op),
            })
        }
    }

    fn ident(&mut self) -> Result<String, String> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(name),
            Some(tok) => Err(format!("expected a name, found {}", describe(&tok))),
            None => Err("expected a name, found end of expression".to_string()),
        }
    }

    fn expression(&mut self) -> Result<Expr, String> {
        self.or()
    }

    fn or(&mut self) -> Result<Expr, String> {
        let mut left = self.and()?;
        while self.eat_keyword("or") {
            let right = self.and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, String> {
        let mut left = self.not()?;
        while self.eat_keyword("and") {
            let right = self.not()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not(&mut self) -> Result<Expr, String> {
        if self.eat_keyword("not") {
            return Ok(Expr::Not(Box::new(self.not()?)));
        }
        self.compare()
    }

    fn compare(&mut self) -> Result<Expr, String> {
        let mut left = self.add()?;
        loop {
            let (op, width) = match self.peek() {
                Some(Token::Op("==")) => (BinaryOp::Eq, 1),
                Some(Token::Op("!=")) => (BinaryOp::Ne, 1),
                Some(Token::Op("<")) => (BinaryOp::Lt, 1),
                Some(Token::Op("<=")) => (BinaryOp::Le, 1),
                Some(Token::Op(">")) => (BinaryOp::Gt, 1),
                Some(Token::Op(">=")) => (BinaryOp::Ge, 1),
                Some(Token::Ident(kw)) if kw == "in" => (BinaryOp::In, 1),
                Some(Token::Ident(kw)) if kw == "not" && self.followed_by_in() => (BinaryOp::NotIn, 2),
                _ => break,
            };
            self.pos += width;
            let right = self.add()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn followed_by_in(&self) -> bool {
        matches!(self.tokens.get(self.pos + 1), Some(Token::Ident(n)) if n == "in")
    }

    fn add(&mut self) -> Result<Expr, String> {
        let mut left = self.concat()?;
        loop {
            let op = if self.eat_op("+") {
                BinaryOp::Add
            } else if self.eat_op("-") {
                BinaryOp::Sub
            } else {
                break;
            };
            let right = self.concat()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn concat(&mut self) -> Result<Expr, String> {
        let mut left = self.mul()?;
        while self.eat_op("~") {
            let right = self.mul()?;
            left = Expr::Binary(BinaryOp::Concat, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn mul(&mut self) -> Result<Expr, String> {
        let mut left = self.unary()?;
        while self.eat_op("*") {
            let right = self.unary()?;
            left = Expr::Binary(BinaryOp::Mul, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.eat_op("-") {
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        let primary = self.primary()?;
        self.postfix(primary)
    }

    fn postfix(&mut self, mut expr: Expr) -> Result<Expr, String> {
        loop {
            if self.eat_op(".") {
                let name = match self.next() {
                    Some(Token::Ident(name)) => name,
                    Some(Token::Int(i)) => {
                        expr = Expr::Index(Box::new(expr), Box::new(Expr::Literal(Value::Int(i))));
                        continue;
                    }
                    Some(tok) => return Err(format!("expected attribute name, found {}", describe(&tok))),
                    None => return Err("expected attribute name".to_string()),
                };
                if self.eat_op("(") {
                    self.expect_op(")")?;
                    let method = match name.as_str() {
                        "items" => Method::Items,
                        "keys" => Method::Keys,
                        "values" => Method::Values,
                        other => return Err(format!("unknown method '{}'", other)),
                    };
                    expr = Expr::Call(Box::new(expr), method);
                } else {
                    expr = Expr::Attr(Box::new(expr), name);
                }
            } else if self.eat_op("[") {
                let index = self.expression()?;
                self.expect_op("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.eat_op("|") {
                let name = self.ident()?;
                let filter = Filter::from_name(&name).ok_or_else(|| format!("unknown filter '{}'", name))?;
                let args = if self.eat_op("(") { self.args()? } else { Vec::new() };
                let (min, max) = filter.arity();
                if args.len() < min || args.len() > max {
                    return Err(format!("filter '{}' takes at most {} argument(s)", name, max));
                }
                expr = Expr::Filter {
                    expr: Box::new(expr),
                    filter,
                    args,
                };
            } else if self.eat_keyword("is") {
                let negated = self.eat_keyword("not");
                let name = self.ident()?;
                let test = Test::from_name(&name).ok_or_else(|| format!("unknown test '{}'", name))?;
                expr = Expr::Test {
                    expr: Box::new(expr),
                    test,
                    negated,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Comma separated arguments after an opening parenthesis.
    fn args(&mut self) -> Result<Vec<Expr>, String> {
        let mut args = Vec::new();
        if self.eat_op(")") {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat_op(")") {
                return Ok(args);
            }
            self.expect_op(",")?;
        }
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::Str(s))),
            Some(Token::Int(i)) => Ok(Expr::Literal(Value::Int(i))),
            Some(Token::Float(f)) => Ok(Expr::Literal(Value::Float(f))),
            Some(Token::Ident(name)) => Ok(match name.as_str() {
                "true" | "True" => Expr::Literal(Value::Bool(true)),
                "false" | "False" => Expr::Literal(Value::Bool(false)),
                "none" | "None" => Expr::Literal(Value::Null),
                "and" | "or" | "not" | "in" | "is" => {
                    return Err(format!("unexpected keyword '{}'", name));
                }
                _ => Expr::Var(name),
            }),
            Some(Token::Op("(")) => {
                let inner = self.expression()?;
                self.expect_op(")")?;
                Ok(inner)
            }
            Some(Token::Op("[")) => {
                let mut items = Vec::new();
                if !self.eat_op("]") {
                    loop {
                        items.push(self.expression()?);
                        if self.eat_op("]") {
                            break;
                        }
                        self.expect_op(",")?;
                    }
                }
                Ok(Expr::List(items))
            }
            Some(tok) => Err(format!("unexpected {}", describe(&tok))),
            None => Err("expected an expression".to_string()),
        }
    }
}

fn describe(tok: &Token) -> String {
    match tok {
        Token::Ident(name) => format!("name '{}'", name),
        Token::Str(s) => format!("string '{}'", s),
        Token::Int(i) => format!("number {}", i),
        Token::Float(f) => format!("number {}", f),
        Token::Op(op) => format!("'{}'", op),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Box<Expr> {
        Box::new(Expr::Var(name.to_string()))
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expr("pair['index'] == 0 or not parallel").unwrap();
        let lhs = Expr::Binary(
            BinaryOp::Eq,
            Box::new(Expr::Index(var("pair"), Box::new(Expr::Literal(Value::Str("index".into()))))),
            Box::new(Expr::Literal(Value::Int(0))),
        );
        assert_eq!(
            expr,
            Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(Expr::Not(var("parallel"))))
        );
    }

    #[test]
    fn test_is_defined_binds_tighter_than_not() {
        let expr = parse_expr("not x.y is defined").unwrap();
        assert_eq!(
            expr,
            Expr::Not(Box::new(Expr::Test {
                expr: Box::new(Expr::Attr(var("x"), "y".into())),
                test: Test::Defined,
                negated: false,
            }))
        );
    }

    #[test]
    fn test_filters_and_methods() {
        assert!(parse_expr("selectors | join(', ')").is_ok());
        assert!(parse_expr("labels.items()").is_ok());
        assert!(parse_expr("x | default('a', true) | upper").is_ok());
        assert!(parse_expr("x | nosuchfilter").is_err());
        assert!(parse_expr("x | upper(1)").is_err());
        assert!(parse_expr("x.pop()").is_err());
    }

    #[test]
    fn test_malformed() {
        assert!(parse_expr("").is_err());
        assert!(parse_expr("a b").is_err());
        assert!(parse_expr("a[").is_err());
        assert!(parse_expr("'open").is_err());
        assert!(parse_expr("a ==").is_err());
    }

    #[test]
    fn test_for_header() {
        let (targets, iter) = parse_for("k, v in labels.items()").unwrap();
        assert_eq!(targets, vec!["k", "v"]);
        assert_eq!(iter, Expr::Call(var("labels"), Method::Items));
        assert!(parse_for("x of xs").is_err());
    }

    #[test]
    fn test_not_in() {
        let expr = parse_expr("'a' not in xs").unwrap();
        assert!(matches!(expr, Expr::Binary(BinaryOp::NotIn, _, _)));
    }
}
