//! Tokenizer for the rule DSL.

use std::fmt;

use super::ast::Span;
use crate::error::{ArchError, ArchResult};

/// Token kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tok {
    /// Identifier or keyword (letters, digits, `_`, `-`, `.`).
    Ident(String),
    /// Quoted string, escapes resolved.
    Str(String),
    /// Integer literal.
    Int(i64),
    /// `:`
    Colon,
    /// `;`
    Semi,
    /// `,`
    Comma,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `=` or `==`
    Eq,
    /// `!=`
    Ne,
    /// `=~`
    Tilde,
    /// End of input.
    Eof,
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(s) => write!(f, "`{s}`"),
            Self::Str(s) => write!(f, "string {s:?}"),
            Self::Int(i) => write!(f, "number {i}"),
            Self::Colon => f.write_str("`:`"),
            Self::Semi => f.write_str("`;`"),
            Self::Comma => f.write_str("`,`"),
            Self::LParen => f.write_str("`(`"),
            Self::RParen => f.write_str("`)`"),
            Self::LBracket => f.write_str("`[`"),
            Self::RBracket => f.write_str("`]`"),
            Self::Eq => f.write_str("`=`"),
            Self::Ne => f.write_str("`!=`"),
            Self::Tilde => f.write_str("`=~`"),
            Self::Eof => f.write_str("end of input"),
        }
    }
}

/// A token with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Kind and payload.
    pub tok: Tok,
    /// Start position.
    pub span: Span,
}

struct Cursor<'s> {
    chars: std::iter::Peekable<std::str::Chars<'s>>,
    line: usize,
    column: usize,
}

impl Cursor<'_> {
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn span(&self) -> Span {
        Span::new(self.line, self.column)
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Splits `text` into tokens. The last token is always [`Tok::Eof`].
///
/// # Errors
///
/// Returns a parse error for unterminated strings, bad escapes, numbers out
/// of range and characters that start no token.
pub fn tokenize(text: &str) -> ArchResult<Vec<Token>> {
    let mut cur = Cursor {
        chars: text.chars().peekable(),
        line: 1,
        column: 1,
    };
    let mut out = Vec::new();

    loop {
        // whitespace and comments
        while let Some(c) = cur.peek() {
            if c.is_whitespace() {
                cur.bump();
            } else if c == '#' {
                cur.skip_line();
            } else if c == '/' {
                let mut ahead = cur.chars.clone();
                ahead.next();
                if ahead.peek() == Some(&'/') {
                    cur.skip_line();
                } else {
                    break;
                }
            } else {
                break;
            }
        }

        let span = cur.span();
        let Some(c) = cur.bump() else {
            out.push(Token {
                tok: Tok::Eof,
                span,
            });
            return Ok(out);
        };

        let tok = match c {
            ':' => Tok::Colon,
            ';' => Tok::Semi,
            ',' => Tok::Comma,
            '(' => Tok::LParen,
            ')' => Tok::RParen,
            '[' => Tok::LBracket,
            ']' => Tok::RBracket,
            '=' => match cur.peek() {
                Some('=') => {
                    cur.bump();
                    Tok::Eq
                }
                Some('~') => {
                    cur.bump();
                    Tok::Tilde
                }
                _ => Tok::Eq,
            },
            '!' => {
                if cur.peek() == Some('=') {
                    cur.bump();
                    Tok::Ne
                } else {
                    return Err(ArchError::parse(
                        "expected `!=`",
                        span.line,
                        span.column,
                    ));
                }
            }
            '"' | '\'' => Tok::Str(lex_string(&mut cur, c, span)?),
            c if c.is_ascii_digit() || (c == '-' && cur.peek().is_some_and(|d| d.is_ascii_digit())) => {
                let mut digits = String::from(c);
                while let Some(d) = cur.peek().filter(char::is_ascii_digit) {
                    digits.push(d);
                    cur.bump();
                }
                let value = digits.parse::<i64>().map_err(|_| {
                    ArchError::parse(
                        format!("number `{digits}` is out of range"),
                        span.line,
                        span.column,
                    )
                })?;
                Tok::Int(value)
            }
            c if is_ident_start(c) => {
                let mut ident = String::from(c);
                while let Some(d) = cur.peek().filter(|d| is_ident_continue(*d)) {
                    ident.push(d);
                    cur.bump();
                }
                Tok::Ident(ident)
            }
            other => {
                return Err(ArchError::parse(
                    format!("unexpected character `{other}`"),
                    span.line,
                    span.column,
                ));
            }
        };
        out.push(Token { tok, span });
    }
}

fn lex_string(cur: &mut Cursor<'_>, quote: char, start: Span) -> ArchResult<String> {
    let mut out = String::new();
    loop {
        let Some(c) = cur.bump() else {
            return Err(ArchError::parse(
                "unterminated string",
                start.line,
                start.column,
            ));
        };
        match c {
            c if c == quote => return Ok(out),
            '\n' => {
                return Err(ArchError::parse(
                    "unterminated string",
                    start.line,
                    start.column,
                ));
            }
            '\\' => {
                let at = cur.span();
                let escaped = match cur.bump() {
                    Some('n') => '\n',
                    Some('t') => '\t',
                    Some('\\') => '\\',
                    Some('"') => '"',
                    Some('\'') => '\'',
                    Some(other) => {
                        return Err(ArchError::parse(
                            format!("unknown escape `\\{other}`"),
                            at.line,
                            at.column,
                        ));
                    }
                    None => {
                        return Err(ArchError::parse(
                            "unterminated string",
                            start.line,
                            start.column,
                        ));
                    }
                };
                out.push(escaped);
            }
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<Tok> {
        tokenize(text).unwrap().into_iter().map(|t| t.tok).collect()
    }

    #[test]
    fn tokenizes_rule_header() {
        assert_eq!(
            kinds("rule no-cycles: deny"),
            vec![
                Tok::Ident("rule".into()),
                Tok::Ident("no-cycles".into()),
                Tok::Colon,
                Tok::Ident("deny".into()),
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn tokenizes_operators() {
        assert_eq!(
            kinds("= == != =~"),
            vec![Tok::Eq, Tok::Eq, Tok::Ne, Tok::Tilde, Tok::Eof]
        );
    }

    #[test]
    fn dotted_fields_are_one_token() {
        assert_eq!(
            kinds("src.layer"),
            vec![Tok::Ident("src.layer".into()), Tok::Eof]
        );
    }

    #[test]
    fn strings_and_numbers() {
        assert_eq!(
            kinds(r#"'a\'b' "c\"d" -3 42"#),
            vec![
                Tok::Str("a'b".into()),
                Tok::Str("c\"d".into()),
                Tok::Int(-3),
                Tok::Int(42),
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn skips_both_comment_styles() {
        assert_eq!(
            kinds("# hash\n// slashes\nwhen"),
            vec![Tok::Ident("when".into()), Tok::Eof]
        );
    }

    #[test]
    fn tracks_positions() {
        let toks = tokenize("rule\n  x").unwrap();
        assert_eq!(toks[1].span, Span::new(2, 3));
    }

    #[test]
    fn unterminated_string_is_located() {
        let err = tokenize("when \"abc").unwrap_err();
        assert_eq!(err.location.as_ref().and_then(|l| l.column), Some(6));
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn stray_character_is_an_error() {
        let err = tokenize("rule x @").unwrap_err();
        assert_eq!(err.location.as_ref().and_then(|l| l.column), Some(8));
    }
}
