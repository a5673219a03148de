//! Tokenizer for filter expressions.

use crate::query::ast::CompareOp;
use crate::query::errors::FilterSyntaxError;

/// Lexical token with its byte offset.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Op(CompareOp),
    Minus,
    LParen,
    RParen,
    And,
    Or,
    Not,
    Is,
    Null,
    True,
    False,
}

impl TokenKind {
    pub(crate) fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier '{name}'"),
            TokenKind::Str(value) => format!("string '{value}'"),
            TokenKind::Int(value) => format!("number {value}"),
            TokenKind::Float(value) => format!("number {value}"),
            TokenKind::Op(op) => format!("'{op}'"),
            TokenKind::Minus => "'-'".into(),
            TokenKind::LParen => "'('".into(),
            TokenKind::RParen => "')'".into(),
            TokenKind::And => "AND".into(),
            TokenKind::Or => "OR".into(),
            TokenKind::Not => "NOT".into(),
            TokenKind::Is => "IS".into(),
            TokenKind::Null => "NULL".into(),
            TokenKind::True => "TRUE".into(),
            TokenKind::False => "FALSE".into(),
        }
    }
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, FilterSyntaxError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }
        let kind = match ch {
            '(' => {
                chars.next();
                TokenKind::LParen
            }
            ')' => {
                chars.next();
                TokenKind::RParen
            }
            '-' => {
                chars.next();
                TokenKind::Minus
            }
            '=' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                }
                TokenKind::Op(CompareOp::Eq)
            }
            '!' => {
                chars.next();
                match chars.next() {
                    Some((_, '=')) => TokenKind::Op(CompareOp::Ne),
                    _ => return Err(FilterSyntaxError::new("expected '=' after '!'", offset)),
                }
            }
            '<' => {
                chars.next();
                match chars.peek() {
                    Some((_, '=')) => {
                        chars.next();
                        TokenKind::Op(CompareOp::Le)
                    }
                    Some((_, '>')) => {
                        chars.next();
                        TokenKind::Op(CompareOp::Ne)
                    }
                    _ => TokenKind::Op(CompareOp::Lt),
                }
            }
            '>' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    TokenKind::Op(CompareOp::Ge)
                } else {
                    TokenKind::Op(CompareOp::Gt)
                }
            }
            '\'' | '"' => {
                chars.next();
                TokenKind::Str(read_quoted(&mut chars, ch, offset)?)
            }
            '`' => {
                chars.next();
                let name = read_quoted(&mut chars, '`', offset)?;
                if name.is_empty() {
                    return Err(FilterSyntaxError::new("empty quoted identifier", offset));
                }
                TokenKind::Ident(name)
            }
            c if c.is_ascii_digit() || c == '.' => read_number(input, &mut chars, offset)?,
            c if c.is_alphabetic() || c == '_' => {
                let mut end = offset;
                while let Some(&(idx, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '.' {
                        end = idx + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                keyword_or_ident(&input[offset..end])
            }
            other => {
                return Err(FilterSyntaxError::new(
                    format!("unexpected character '{other}'"),
                    offset,
                ))
            }
        };
        tokens.push(Token { kind, offset });
    }

    Ok(tokens)
}

type Chars<'a> = std::iter::Peekable<std::str::CharIndices<'a>>;

/// Reads up to the closing `quote`. Backslash escapes the next character and
/// a doubled quote stands for one literal quote.
fn read_quoted(
    chars: &mut Chars<'_>,
    quote: char,
    start: usize,
) -> Result<String, FilterSyntaxError> {
    let mut out = String::new();
    while let Some((_, ch)) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, escaped)) => out.push(escaped),
                None => break,
            }
        } else if ch == quote {
            if matches!(chars.peek(), Some((_, c)) if *c == quote) {
                chars.next();
                out.push(quote);
            } else {
                return Ok(out);
            }
        } else {
            out.push(ch);
        }
    }
    Err(FilterSyntaxError::new("unterminated quoted text", start))
}

fn read_number(
    input: &str,
    chars: &mut Chars<'_>,
    start: usize,
) -> Result<TokenKind, FilterSyntaxError> {
    let mut end = start;
    let mut prev = '\0';
    while let Some(&(idx, c)) = chars.peek() {
        let exponent_sign = (c == '+' || c == '-') && (prev == 'e' || prev == 'E');
        if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || exponent_sign {
            end = idx + 1;
            prev = c;
            chars.next();
        } else {
            break;
        }
    }
    let text = &input[start..end];
    if let Ok(value) = text.parse::<i64>() {
        return Ok(TokenKind::Int(value));
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(TokenKind::Float(value)),
        _ => Err(FilterSyntaxError::new(
            format!("invalid number '{text}'"),
            start,
        )),
    }
}

fn keyword_or_ident(word: &str) -> TokenKind {
    match word.to_ascii_lowercase().as_str() {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "is" => TokenKind::Is,
        "null" => TokenKind::Null,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        _ => TokenKind::Ident(word.to_owned()),
    }
}
