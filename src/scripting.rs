//! Restricted expression evaluator for warzone loader conditions
//!
//! Scripts like `control > 50 and not contested` run against a flat fact
//! map; fact keys are the only visible names. There are no builtins, no
//! calls and no side effects. Callers treat every error as "do not run".
//!
//! Semantics follow the scripting conventions authors already know:
//! `and`/`or` short-circuit and yield one of their operands, `not` yields a
//! bool, and the final result is the truthiness of the last value. The whole
//! script is parsed up front, so a syntax error fails it even inside a
//! branch that would never run; name and type errors only surface when
//! their branch is actually reached.

use thiserror::Error;

use crate::core::types::FactMap;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("Unknown name: {0}")]
    UnknownName(String),

    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Type error: {0}")]
    Type(String),
}

/// Evaluate a fact script to a boolean.
pub fn eval_fact_script(script: &str, facts: &FactMap) -> Result<bool, ScriptError> {
    let tokens = lex(script)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
    };
    let expr = parser.or_expr()?;
    if parser.pos != tokens.len() {
        return Err(ScriptError::Syntax("trailing input".to_string()));
    }
    Ok(eval(&expr, facts)?.truthy())
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
        }
    }

    /// Numeric view; booleans count as 0/1 in numeric contexts.
    fn as_num(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    fn from_fact(name: &str, fact: &serde_json::Value) -> Result<Value, ScriptError> {
        match fact {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(Value::Num)
                .ok_or_else(|| ScriptError::Type(format!("fact '{}' is not a number", name))),
            serde_json::Value::String(s) => Ok(Value::Str(s.clone())),
            _ => Err(ScriptError::Type(format!("fact '{}' is not a scalar", name))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Num(f64),
    Str(String),
    And,
    Or,
    Not,
    True,
    False,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Open,
    Close,
}

fn lex(script: &str) -> Result<Vec<Tok>, ScriptError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = script.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\r' | '\n' => i += 1,
            '(' => {
                tokens.push(Tok::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Tok::Close);
                i += 1;
            }
            '+' => {
                tokens.push(Tok::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Tok::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Tok::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Tok::Slash);
                i += 1;
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::Eq);
                    i += 2;
                } else {
                    return Err(ScriptError::Syntax("assignment is not allowed".to_string()));
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::Ne);
                    i += 2;
                } else {
                    return Err(ScriptError::Syntax("unexpected '!'".to_string()));
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::Le);
                    i += 2;
                } else {
                    tokens.push(Tok::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::Ge);
                    i += 2;
                } else {
                    tokens.push(Tok::Gt);
                    i += 1;
                }
            }
            '\'' | '"' => {
                let quote = c;
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end] != quote {
                    end += 1;
                }
                if end == chars.len() {
                    return Err(ScriptError::Syntax("unterminated string".to_string()));
                }
                tokens.push(Tok::Str(chars[start..end].iter().collect()));
                i = end + 1;
            }
            _ if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let raw: String = chars[start..i].iter().collect();
                let num = raw
                    .parse()
                    .map_err(|_| ScriptError::Syntax(format!("bad number '{}'", raw)))?;
                tokens.push(Tok::Num(num));
            }
            _ if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.as_str() {
                    "and" => Tok::And,
                    "or" => Tok::Or,
                    "not" => Tok::Not,
                    "True" | "true" => Tok::True,
                    "False" | "false" => Tok::False,
                    _ => Tok::Ident(word),
                });
            }
            _ => {
                return Err(ScriptError::Syntax(format!("unexpected character '{}'", c)));
            }
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

/// Parsed script. Names are resolved at evaluation time, so a branch an
/// `and`/`or` never reaches can mention facts that are not set.
#[derive(Debug, Clone)]
enum Expr {
    Num(f64),
    Str(String),
    Bool(bool),
    Name(String),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
}

struct Parser<'a> {
    tokens: &'a [Tok],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Result<Tok, ScriptError> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| ScriptError::Syntax("unexpected end of script".to_string()))?;
        self.pos += 1;
        Ok(token)
    }

    fn or_expr(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.and_expr()?;
        while self.peek() == Some(&Tok::Or) {
            self.pos += 1;
            let rhs = self.and_expr()?;
            expr = Expr::Or(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn and_expr(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.not_expr()?;
        while self.peek() == Some(&Tok::And) {
            self.pos += 1;
            let rhs = self.not_expr()?;
            expr = Expr::And(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn not_expr(&mut self) -> Result<Expr, ScriptError> {
        if self.peek() == Some(&Tok::Not) {
            self.pos += 1;
            let inner = self.not_expr()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ScriptError> {
        let lhs = self.sum()?;
        let op = match self.peek() {
            Some(Tok::Eq) => CmpOp::Eq,
            Some(Tok::Ne) => CmpOp::Ne,
            Some(Tok::Lt) => CmpOp::Lt,
            Some(Tok::Le) => CmpOp::Le,
            Some(Tok::Gt) => CmpOp::Gt,
            Some(Tok::Ge) => CmpOp::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.sum()?;
        Ok(Expr::Cmp(op, Box::new(lhs), Box::new(rhs)))
    }

    fn sum(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Plus) => ArithOp::Add,
                Some(Tok::Minus) => ArithOp::Sub,
                _ => return Ok(expr),
            };
            self.pos += 1;
            let rhs = self.term()?;
            expr = Expr::Arith(op, Box::new(expr), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.factor()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Star) => ArithOp::Mul,
                Some(Tok::Slash) => ArithOp::Div,
                _ => return Ok(expr),
            };
            self.pos += 1;
            let rhs = self.factor()?;
            expr = Expr::Arith(op, Box::new(expr), Box::new(rhs));
        }
    }

    fn factor(&mut self) -> Result<Expr, ScriptError> {
        match self.bump()? {
            Tok::Num(n) => Ok(Expr::Num(n)),
            Tok::Str(s) => Ok(Expr::Str(s)),
            Tok::True => Ok(Expr::Bool(true)),
            Tok::False => Ok(Expr::Bool(false)),
            Tok::Minus => {
                let inner = self.factor()?;
                Ok(Expr::Neg(Box::new(inner)))
            }
            Tok::Ident(name) => Ok(Expr::Name(name)),
            Tok::Open => {
                let expr = self.or_expr()?;
                match self.bump()? {
                    Tok::Close => Ok(expr),
                    _ => Err(ScriptError::Syntax("expected ')'".to_string())),
                }
            }
            other => Err(ScriptError::Syntax(format!("unexpected token {:?}", other))),
        }
    }
}

fn eval(expr: &Expr, facts: &FactMap) -> Result<Value, ScriptError> {
    match expr {
        Expr::Num(n) => Ok(Value::Num(*n)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Name(name) => {
            let fact = facts
                .get(name)
                .ok_or_else(|| ScriptError::UnknownName(name.clone()))?;
            Value::from_fact(name, fact)
        }
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, facts)?.truthy())),
        Expr::Neg(inner) => {
            let n = eval(inner, facts)?
                .as_num()
                .ok_or_else(|| ScriptError::Type("cannot negate a non-number".to_string()))?;
            Ok(Value::Num(-n))
        }
        // A deciding lhs means the rhs is never touched.
        Expr::And(lhs, rhs) => {
            let left = eval(lhs, facts)?;
            if left.truthy() {
                eval(rhs, facts)
            } else {
                Ok(left)
            }
        }
        Expr::Or(lhs, rhs) => {
            let left = eval(lhs, facts)?;
            if left.truthy() {
                Ok(left)
            } else {
                eval(rhs, facts)
            }
        }
        Expr::Cmp(op, lhs, rhs) => {
            let lhs = eval(lhs, facts)?;
            let rhs = eval(rhs, facts)?;
            Ok(Value::Bool(compare(*op, &lhs, &rhs)?))
        }
        Expr::Arith(op, lhs, rhs) => {
            let lhs = eval(lhs, facts)?;
            let rhs = eval(rhs, facts)?;
            arith(*op, &lhs, &rhs)
        }
    }
}

fn arith(op: ArithOp, lhs: &Value, rhs: &Value) -> Result<Value, ScriptError> {
    if op == ArithOp::Add {
        if let (Value::Str(a), Value::Str(b)) = (lhs, rhs) {
            return Ok(Value::Str(format!("{}{}", a, b)));
        }
    }
    let (a, b) = num_pair(lhs, rhs, op.symbol())?;
    Ok(match op {
        ArithOp::Add => Value::Num(a + b),
        ArithOp::Sub => Value::Num(a - b),
        ArithOp::Mul => Value::Num(a * b),
        ArithOp::Div => {
            if b == 0.0 {
                return Err(ScriptError::Type("division by zero".to_string()));
            }
            Value::Num(a / b)
        }
    })
}

fn num_pair(a: &Value, b: &Value, op: &str) -> Result<(f64, f64), ScriptError> {
    match (a.as_num(), b.as_num()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(ScriptError::Type(format!(
            "'{}' requires numeric operands",
            op
        ))),
    }
}

fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<bool, ScriptError> {
    // Equality across mismatched types is false, never an error.
    if matches!(op, CmpOp::Eq | CmpOp::Ne) {
        let equal = match (lhs, rhs) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (a, b) => match (a.as_num(), b.as_num()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        };
        return Ok(if op == CmpOp::Eq { equal } else { !equal });
    }

    let ordering = match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
        (a, b) => match (a.as_num(), b.as_num()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => {
                return Err(ScriptError::Type(
                    "ordering requires operands of the same kind".to_string(),
                ))
            }
        },
    };
    let ordering =
        ordering.ok_or_else(|| ScriptError::Type("values cannot be ordered".to_string()))?;

    Ok(match op {
        CmpOp::Lt => ordering.is_lt(),
        CmpOp::Le => ordering.is_le(),
        CmpOp::Gt => ordering.is_gt(),
        CmpOp::Ge => ordering.is_ge(),
        _ => unreachable!(),
    })
}
