//! Lexical analysis
//!
//! Converts source text into a token stream. Scanning never aborts early:
//! invalid characters produce diagnostics and are skipped so later phases can
//! report as much as possible in one run.

use crate::diagnostic::Diagnostic;
use crate::token::{Token, TokenKind};

/// Hand-rolled scanner over the source character sequence
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl Lexer {
    /// Tokenize a complete source string
    pub fn tokenize(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut lexer = Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        };
        lexer.scan();
        (lexer.tokens, lexer.diagnostics)
    }

    fn scan(&mut self) {
        while let Some(c) = self.advance() {
            match c {
                ' ' | '\t' | '\r' => {}
                '\n' => self.line += 1,
                '(' => self.push(TokenKind::LeftParen),
                ')' => self.push(TokenKind::RightParen),
                '{' => self.push(TokenKind::LeftBrace),
                '}' => self.push(TokenKind::RightBrace),
                ',' => self.push(TokenKind::Comma),
                ';' => self.push(TokenKind::Semicolon),
                ':' => self.push(TokenKind::Colon),
                '+' => self.push(TokenKind::Plus),
                '*' => self.push(TokenKind::Star),
                '%' => self.push(TokenKind::Percent),
                '-' => {
                    if self.matches('>') {
                        self.push(TokenKind::Arrow);
                    } else {
                        self.push(TokenKind::Minus);
                    }
                }
                '/' => {
                    if self.matches('/') {
                        // Line comment
                        while let Some(&next) = self.peek() {
                            if next == '\n' {
                                break;
                            }
                            self.pos += 1;
                        }
                    } else {
                        self.push(TokenKind::Slash);
                    }
                }
                '!' => {
                    if self.matches('=') {
                        self.push(TokenKind::BangEqual);
                    } else {
                        self.push(TokenKind::Bang);
                    }
                }
                '=' => {
                    if self.matches('=') {
                        self.push(TokenKind::EqualEqual);
                    } else {
                        self.push(TokenKind::Equal);
                    }
                }
                '<' => {
                    if self.matches('=') {
                        self.push(TokenKind::LessEqual);
                    } else {
                        self.push(TokenKind::Less);
                    }
                }
                '>' => {
                    if self.matches('=') {
                        self.push(TokenKind::GreaterEqual);
                    } else {
                        self.push(TokenKind::Greater);
                    }
                }
                '&' => {
                    if self.matches('&') {
                        self.push(TokenKind::AndAnd);
                    } else {
                        self.error("RL1001", "unexpected character '&'", "did you mean '&&'?");
                    }
                }
                '|' => {
                    if self.matches('|') {
                        self.push(TokenKind::OrOr);
                    } else {
                        self.error("RL1001", "unexpected character '|'", "did you mean '||'?");
                    }
                }
                '"' => self.string(),
                c if c.is_ascii_digit() => self.number(c),
                c if c.is_ascii_alphabetic() || c == '_' => self.identifier(c),
                c => {
                    let msg = format!("unexpected character '{}'", c);
                    self.diagnostics
                        .push(Diagnostic::error_with_code("RL1001", msg, self.line));
                }
            }
        }
        self.tokens.push(Token::new(TokenKind::Eof, self.line));
    }

    fn string(&mut self) {
        let start_line = self.line;
        let mut text = String::new();
        loop {
            match self.advance() {
                Some('"') => {
                    self.tokens
                        .push(Token::new(TokenKind::Str(text), start_line));
                    return;
                }
                Some('\n') => {
                    self.line += 1;
                    text.push('\n');
                }
                Some(c) => text.push(c),
                None => {
                    self.diagnostics.push(
                        Diagnostic::error_with_code("RL1002", "unterminated string", start_line)
                            .with_help("add a closing '\"'"),
                    );
                    return;
                }
            }
        }
    }

    fn number(&mut self, first: char) {
        let start_line = self.line;
        let mut text = String::from(first);
        while let Some(&c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        // Fractional part requires a digit after the dot
        if self.peek() == Some(&'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            text.push('.');
            self.pos += 1;
            while let Some(&c) = self.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        match text.parse::<f64>() {
            Ok(n) => self.tokens.push(Token::new(TokenKind::Number(n), start_line)),
            Err(_) => self.diagnostics.push(Diagnostic::error_with_code(
                "RL1003",
                format!("invalid number literal '{}'", text),
                start_line,
            )),
        }
    }

    fn identifier(&mut self, first: char) {
        let mut text = String::from(first);
        while let Some(&c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                text.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        let kind = match text.as_str() {
            "let" => TokenKind::Let,
            "fn" => TokenKind::Fn,
            "print" => TokenKind::Print,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "return" => TokenKind::Return,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => TokenKind::Identifier(text),
        };
        self.push(kind);
    }

    fn push(&mut self, kind: TokenKind) {
        self.tokens.push(Token::new(kind, self.line));
    }

    fn error(&mut self, code: &str, message: &str, help: &str) {
        self.diagnostics
            .push(Diagnostic::error_with_code(code, message, self.line).with_help(help));
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn peek(&self) -> Option<&char> {
        self.chars.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&char> {
        self.chars.get(self.pos + offset)
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == Some(&expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, diags) = Lexer::tokenize(source);
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scans_declaration() {
        assert_eq!(
            kinds("let x = 5;"),
            vec![
                TokenKind::Let,
                TokenKind::Identifier("x".into()),
                TokenKind::Equal,
                TokenKind::Number(5.0),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn scans_two_char_operators() {
        assert_eq!(
            kinds("== != <= >= && || ->"),
            vec![
                TokenKind::EqualEqual,
                TokenKind::BangEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Arrow,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tracks_lines_across_comments() {
        let (tokens, diags) = Lexer::tokenize("// header\nlet x = 1;\nprint x;");
        assert!(diags.is_empty());
        assert_eq!(tokens[0].line, 2);
        let print = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Print)
            .expect("print token");
        assert_eq!(print.line, 3);
    }

    #[test]
    fn fractional_numbers_need_digits_after_dot() {
        assert_eq!(
            kinds("1.5 2"),
            vec![TokenKind::Number(1.5), TokenKind::Number(2.0), TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_string_reports_rl1002() {
        let (_, diags) = Lexer::tokenize("let s = \"oops;");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, "RL1002");
    }

    #[test]
    fn lone_ampersand_reports_rl1001() {
        let (_, diags) = Lexer::tokenize("1 & 2");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, "RL1001");
    }
}
