use crate::language::span::Span;
use crate::language::token::{Token, TokenKind};

#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub span: Span,
    pub line: usize,
}

pub fn lex(source: &str) -> Result<Vec<Token>, Vec<LexError>> {
    let lexer = Lexer::new(source);
    lexer.run()
}

struct Lexer<'a> {
    src: &'a str,
    chars: std::str::Chars<'a>,
    current: Option<char>,
    offset: usize,
    line: usize,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        let mut chars = src.chars();
        let current = chars.next();
        Self {
            src,
            chars,
            current,
            offset: 0,
            line: 1,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, Vec<LexError>> {
        while let Some(ch) = self.current {
            match ch {
                '/' if self.peek() == Some('/') => self.eat_line_comment(),
                '/' if self.peek() == Some('*') => self.eat_block_comment(),
                ch if ch.is_whitespace() => {
                    self.bump();
                }
                ch if ch.is_ascii_alphabetic() || ch == '_' => self.lex_identifier(),
                ch if ch.is_ascii_digit() => self.lex_number(),
                '"' => self.lex_string(),
                _ => self.lex_symbol(),
            }
        }
        self.push_token(TokenKind::Eof, self.offset, self.line);

        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }

    fn bump(&mut self) -> Option<char> {
        if let Some(ch) = self.current {
            self.offset += ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
            }
        }
        self.current = self.chars.next();
        self.current
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn push_token(&mut self, kind: TokenKind, start: usize, line: usize) {
        let lexeme = self.src[start..self.offset].to_string();
        self.tokens.push(Token {
            kind,
            lexeme,
            line,
            span: Span::new(start, self.offset),
        });
    }

    fn error(&mut self, start: usize, line: usize, message: impl Into<String>) {
        self.errors.push(LexError {
            message: message.into(),
            span: Span::new(start, self.offset.max(start)),
            line,
        });
    }

    fn eat_line_comment(&mut self) {
        while let Some(ch) = self.current {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn eat_block_comment(&mut self) {
        let start = self.offset;
        let line = self.line;
        self.bump();
        self.bump();
        loop {
            match self.current {
                Some('*') if self.peek() == Some('/') => {
                    self.bump();
                    self.bump();
                    return;
                }
                Some(_) => {
                    self.bump();
                }
                None => {
                    self.error(start, line, "Unterminated block comment");
                    return;
                }
            }
        }
    }

    fn lex_identifier(&mut self) {
        let start = self.offset;
        let line = self.line;
        while let Some(ch) = self.current {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let kind = keyword_kind(&self.src[start..self.offset]).unwrap_or(TokenKind::Identifier);
        self.push_token(kind, start, line);
    }

    fn lex_number(&mut self) {
        let start = self.offset;
        let line = self.line;
        while matches!(self.current, Some(ch) if ch.is_ascii_digit()) {
            self.bump();
        }
        if self.current == Some('.') && matches!(self.peek(), Some(ch) if ch.is_ascii_digit()) {
            self.bump();
            while matches!(self.current, Some(ch) if ch.is_ascii_digit()) {
                self.bump();
            }
        }
        match self.src[start..self.offset].parse::<f64>() {
            Ok(value) => self.push_token(TokenKind::Number(value), start, line),
            Err(_) => self.error(start, line, "Invalid number literal"),
        }
    }

    fn lex_string(&mut self) {
        let start = self.offset;
        let line = self.line;
        self.bump();
        let mut value = String::new();
        loop {
            match self.current {
                Some('"') => {
                    self.bump();
                    self.push_token(TokenKind::String(value), start, line);
                    return;
                }
                Some('\\') => {
                    self.bump();
                    match self.current {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('\\') => value.push('\\'),
                        Some('"') => value.push('"'),
                        Some(other) => {
                            self.error(self.offset, self.line, format!("Unknown escape '\\{other}'"));
                        }
                        None => break,
                    }
                    self.bump();
                }
                Some(ch) => {
                    value.push(ch);
                    self.bump();
                }
                None => break,
            }
        }
        self.error(start, line, "Unterminated string");
    }

    fn lex_symbol(&mut self) {
        let start = self.offset;
        let line = self.line;
        let Some(ch) = self.current else {
            return;
        };
        self.bump();
        let kind = match ch {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ';' => TokenKind::Semicolon,
            '?' => TokenKind::Question,
            ':' => TokenKind::Colon,
            '-' => TokenKind::Minus,
            '+' => TokenKind::Plus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '!' => self.with_equal(TokenKind::BangEqual, TokenKind::Bang),
            '=' => self.with_equal(TokenKind::EqualEqual, TokenKind::Equal),
            '<' => self.with_equal(TokenKind::LessEqual, TokenKind::Less),
            '>' => self.with_equal(TokenKind::GreaterEqual, TokenKind::Greater),
            other => {
                self.error(start, line, format!("Unexpected character '{other}'"));
                return;
            }
        };
        self.push_token(kind, start, line);
    }

    fn with_equal(&mut self, double: TokenKind, single: TokenKind) -> TokenKind {
        if self.current == Some('=') {
            self.bump();
            double
        } else {
            single
        }
    }
}

fn keyword_kind(text: &str) -> Option<TokenKind> {
    let kind = match text {
        "and" => TokenKind::And,
        "break" => TokenKind::Break,
        "class" => TokenKind::Class,
        "continue" => TokenKind::Continue,
        "else" => TokenKind::Else,
        "false" => TokenKind::False,
        "for" => TokenKind::For,
        "fun" => TokenKind::Fun,
        "if" => TokenKind::If,
        "nil" => TokenKind::Nil,
        "or" => TokenKind::Or,
        "print" => TokenKind::Print,
        "return" => TokenKind::Return,
        "super" => TokenKind::Super,
        "this" => TokenKind::This,
        "true" => TokenKind::True,
        "var" => TokenKind::Var,
        "while" => TokenKind::While,
        _ => return None,
    };
    Some(kind)
}
