//! Boolean predicate language for gating loaders, commands and dialogue
//!
//! Expressions chain predicate clauses with `and`, `or`, `not` and
//! parentheses, e.g. `level 5 and (has_weapon or has_shield)`. Evaluation
//! never fails: every failure mode degrades to a false result.

pub mod boolexpr;
pub mod predicates;
pub mod snapshot;
pub mod tokens;

pub use predicates::Evaluation;
pub use snapshot::{
    ActorSnapshot, CharKind, CharSnapshot, ConditionContext, ItemSnapshot, RoomSnapshot,
    TargetSnapshot, WorldSnapshot,
};

use boolexpr::BoolToken;
use tokens::Token;

/// Evaluate a condition expression against a context.
///
/// The detail string attributes failure to the first false clause, but only
/// while the expression is a pure conjunction: once an `or` or `not` appears,
/// blaming a single clause would be misleading, so the detail stays empty.
pub fn evaluate(ctx: &ConditionContext, text: &str) -> Evaluation {
    let mut bool_tokens = Vec::new();
    let mut complex_expression = false;
    let mut first_failure: Option<String> = None;

    for token in tokens::tokenize(text) {
        let mapped = match token {
            Token::Open => BoolToken::Open,
            Token::Close => BoolToken::Close,
            Token::And => BoolToken::And,
            Token::Or => {
                complex_expression = true;
                BoolToken::Or
            }
            Token::Not => {
                complex_expression = true;
                BoolToken::Not
            }
            Token::Clause(clause) => {
                let evaluated = predicates::evaluate_clause(ctx, &clause);
                if !evaluated.result && first_failure.is_none() {
                    first_failure = Some(evaluated.detail);
                }
                BoolToken::Lit(evaluated.result)
            }
        };
        bool_tokens.push(mapped);
    }

    // A malformed expression fails closed.
    let result = boolexpr::eval_tokens(&bool_tokens).unwrap_or(false);

    let detail = if complex_expression {
        String::new()
    } else {
        first_failure.unwrap_or_default()
    };

    Evaluation { result, detail }
}
