//! Boolean expression parser for evaluated condition tokens
//!
//! After every clause has been evaluated to a literal, the expression is a
//! fixed five-symbol grammar: `not`, `and`, `or`, parentheses and boolean
//! literals. `not` binds tightest, then `and`, then `or`, left-associative.
//! Any malformed expression evaluates to `None` (callers fail closed).

/// A token with its clause already evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolToken {
    Open,
    Close,
    And,
    Or,
    Not,
    Lit(bool),
}

/// Evaluate a token stream. `None` means the expression was malformed.
pub fn eval_tokens(tokens: &[BoolToken]) -> Option<bool> {
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.or_expr()?;
    if parser.pos != tokens.len() {
        return None; // trailing tokens
    }
    Some(value)
}

struct Parser<'a> {
    tokens: &'a [BoolToken],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<BoolToken> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<BoolToken> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn or_expr(&mut self) -> Option<bool> {
        let mut value = self.and_expr()?;
        while self.peek() == Some(BoolToken::Or) {
            self.pos += 1;
            let rhs = self.and_expr()?;
            value = value || rhs;
        }
        Some(value)
    }

    fn and_expr(&mut self) -> Option<bool> {
        let mut value = self.unary()?;
        while self.peek() == Some(BoolToken::And) {
            self.pos += 1;
            let rhs = self.unary()?;
            value = value && rhs;
        }
        Some(value)
    }

    fn unary(&mut self) -> Option<bool> {
        match self.bump()? {
            BoolToken::Not => Some(!self.unary()?),
            BoolToken::Lit(value) => Some(value),
            BoolToken::Open => {
                let value = self.or_expr()?;
                match self.bump()? {
                    BoolToken::Close => Some(value),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}
