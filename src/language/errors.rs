use crate::language::span::Span;
use crate::language::token::{Token, TokenKind};
use miette::SourceSpan;

#[derive(Clone, Debug)]
pub struct SyntaxError {
    pub message: String,
    /// `'lexeme'` or `end` for token-anchored errors; `None` for bare scan errors.
    pub at: Option<String>,
    pub line: usize,
    pub span: Span,
    pub help: Option<String>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span, line: usize) -> Self {
        Self {
            message: message.into(),
            at: None,
            line,
            span,
            help: None,
        }
    }

    pub fn at_token(token: &Token, message: impl Into<String>) -> Self {
        let at = if token.kind == TokenKind::Eof {
            "end".to_string()
        } else {
            format!("'{}'", token.lexeme)
        };
        Self {
            message: message.into(),
            at: Some(at),
            line: token.line,
            span: token.span,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn label(&self) -> &'static str {
        match self.at.as_deref() {
            Some("end") => "unexpected end of input",
            Some(_) => "unexpected token",
            None => "invalid syntax",
        }
    }

    pub fn to_source_span(&self) -> SourceSpan {
        (self.span.start, self.span.len()).into()
    }
}

#[derive(Clone, Debug)]
pub struct SyntaxErrors {
    pub errors: Vec<SyntaxError>,
}

impl SyntaxErrors {
    pub fn new(errors: Vec<SyntaxError>) -> Self {
        Self { errors }
    }
}
