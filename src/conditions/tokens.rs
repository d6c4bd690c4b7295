//! Clause tokenization for condition expressions
//!
//! An expression like `(level 5 or has_weapon) and not is_mob` breaks into
//! structural tokens and clause strings. Runs of non-structural words between
//! structural tokens are re-joined, so a clause keeps its arguments:
//! `level_above 1 and level_above 2` tokenizes to
//! `["level_above 1", "and", "level_above 2"]`, never
//! `["level_above", "1", ...]`.

/// One token of a condition expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Open,
    Close,
    And,
    Or,
    Not,
    Clause(String),
}

impl Token {
    fn structural(word: &str) -> Option<Token> {
        match word {
            "(" => Some(Token::Open),
            ")" => Some(Token::Close),
            "and" => Some(Token::And),
            "or" => Some(Token::Or),
            "not" => Some(Token::Not),
            _ => None,
        }
    }
}

/// Break expression text into structural tokens and re-joined clause strings.
pub fn tokenize(text: &str) -> Vec<Token> {
    let text = text.to_lowercase().replace('(', " ( ").replace(')', " ) ");

    let mut tokens = Vec::new();
    let mut clause_words: Vec<&str> = Vec::new();

    for word in text.split_whitespace() {
        if let Some(token) = Token::structural(word) {
            if !clause_words.is_empty() {
                tokens.push(Token::Clause(clause_words.join(" ")));
                clause_words.clear();
            }
            tokens.push(token);
        } else {
            clause_words.push(word);
        }
    }

    if !clause_words.is_empty() {
        tokens.push(Token::Clause(clause_words.join(" ")));
    }

    tokens
}
