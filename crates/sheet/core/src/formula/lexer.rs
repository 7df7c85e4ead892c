//! Tokenizer for formula strings.

use std::str::FromStr;

use rust_decimal::Decimal;

use super::FormulaError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Number(Decimal),
    /// Bare (`STR`) or braced (`{STR}`) identifier, braces removed.
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Ident(name) => name.clone(),
            Self::Plus => "+".into(),
            Self::Minus => "-".into(),
            Self::Star => "*".into(),
            Self::Slash => "/".into(),
            Self::LParen => "(".into(),
            Self::RParen => ")".into(),
            Self::Comma => ",".into(),
        }
    }
}

/// A token and the byte offset it starts at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Splits `input` into tokens. Whitespace is ignored.
pub fn tokenize(input: &str) -> Result<Vec<Spanned>, FormulaError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(position, c)) = chars.peek() {
        let token = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '+' => single(&mut chars, Token::Plus),
            '-' => single(&mut chars, Token::Minus),
            '*' => single(&mut chars, Token::Star),
            '/' => single(&mut chars, Token::Slash),
            '(' => single(&mut chars, Token::LParen),
            ')' => single(&mut chars, Token::RParen),
            ',' => single(&mut chars, Token::Comma),
            '{' => {
                chars.next();
                let start = position + 1;
                let mut end = start;
                let mut closed = false;
                for (i, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    end = i + c.len_utf8();
                }
                let name = &input[start..end];
                if !closed {
                    return Err(FormulaError::UnexpectedEnd);
                }
                if name.is_empty() || !name.chars().all(is_ident_continue) {
                    return Err(FormulaError::UnexpectedCharacter { ch: '{', position });
                }
                Token::Ident(name.to_string())
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = position;
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        end = i + 1;
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &input[position..end];
                let number = Decimal::from_str(text)
                    .map_err(|_| FormulaError::InvalidNumber(text.to_string()))?;
                Token::Number(number)
            }
            c if is_ident_start(c) => {
                let mut end = position;
                while let Some(&(i, c)) = chars.peek() {
                    if is_ident_continue(c) {
                        end = i + 1;
                        chars.next();
                    } else {
                        break;
                    }
                }
                Token::Ident(input[position..end].to_string())
            }
            other => {
                return Err(FormulaError::UnexpectedCharacter {
                    ch: other,
                    position,
                });
            }
        };
        tokens.push(Spanned { token, position });
    }

    Ok(tokens)
}

fn single(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>, token: Token) -> Token {
    chars.next();
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn identifiers_are_whole_words() {
        assert_eq!(
            kinds("ASTRAL+STR"),
            vec![
                Token::Ident("ASTRAL".into()),
                Token::Plus,
                Token::Ident("STR".into())
            ]
        );
    }

    #[test]
    fn braces_delimit_identifiers() {
        assert_eq!(
            kinds("{STRBase}*2"),
            vec![
                Token::Ident("STRBase".into()),
                Token::Star,
                Token::Number(Decimal::from(2))
            ]
        );
    }

    #[test]
    fn decimals_and_positions() {
        let tokens = tokenize(" 1.5 / x").unwrap();
        assert_eq!(tokens[0].token, Token::Number(Decimal::new(15, 1)));
        assert_eq!(tokens[0].position, 1);
        assert_eq!(tokens[2].position, 7);
    }

    #[test]
    fn rejects_stray_characters() {
        assert_eq!(
            tokenize("2 # 3"),
            Err(FormulaError::UnexpectedCharacter { ch: '#', position: 2 })
        );
        assert_eq!(tokenize("{STR"), Err(FormulaError::UnexpectedEnd));
        assert!(matches!(
            tokenize("1.2.3"),
            Err(FormulaError::InvalidNumber(_))
        ));
    }
}
