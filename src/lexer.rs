//! Hand-rolled tokenizer. Tracks byte offset, line, and column as it walks
//! the source text; never aborts on an unexpected character, it emits an
//! [`TokenKind::Error`] token and keeps going so the parser can still recover
//! downstream statements.

use crate::token::{keyword_kind, Token, TokenKind};

/// Byte-position cursor over the source text with line/column bookkeeping.
pub struct Cursor<'a> {
    src: &'a [u8],
    text: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            src: text.as_bytes(),
            text,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn current_char(&self) -> Option<char> {
        self.char_at(self.pos)
    }

    pub fn peek_char(&self) -> Option<char> {
        self.char_at(self.pos + self.current_char_len())
    }

    fn current_char_len(&self) -> usize {
        self.current_char().map(char::len_utf8).unwrap_or(0)
    }

    pub fn char_at(&self, byte_pos: usize) -> Option<char> {
        self.text[byte_pos..].chars().next()
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    pub fn advance(&mut self) -> Option<char> {
        let c = self.current_char()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    pub fn slice_from(&self, start: usize) -> &'a str {
        &self.text[start..self.pos]
    }
}

pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    token_start_line: usize,
    token_start_column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            cursor: Cursor::new(text),
            token_start_line: 1,
            token_start_column: 1,
        }
    }

    /// Tokenizes the whole input, always ending with a trailing [`TokenKind::Eof`].
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments(&mut tokens);
            if self.cursor.is_eof() {
                tokens.push(Token::new(TokenKind::Eof, self.cursor.line, self.cursor.column));
                break;
            }
            self.token_start_line = self.cursor.line;
            self.token_start_column = self.cursor.column;
            let tok = self.next_token();
            tokens.push(tok);
        }
        tokens
    }

    fn emit(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.token_start_line, self.token_start_column)
    }

    fn skip_whitespace_and_comments(&mut self, tokens: &mut Vec<Token>) {
        loop {
            match self.cursor.current_char() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.cursor.advance();
                }
                Some('\n') => {
                    self.token_start_line = self.cursor.line;
                    self.token_start_column = self.cursor.column;
                    self.cursor.advance();
                    tokens.push(self.emit(TokenKind::Semi));
                }
                Some('#') => {
                    while let Some(c) = self.cursor.current_char() {
                        if c == '\n' {
                            break;
                        }
                        self.cursor.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Token {
        let c = match self.cursor.current_char() {
            Some(c) => c,
            None => return self.emit(TokenKind::Eof),
        };

        if c.is_ascii_digit() || (c == '.' && matches!(self.cursor.peek_char(), Some(d) if d.is_ascii_digit())) {
            return self.lex_number();
        }
        if c.is_alphabetic() || c == '_' {
            return self.lex_word();
        }
        if c == '"' || c == '\'' {
            return self.lex_string(c);
        }

        match c {
            '=' => {
                self.cursor.advance();
                if self.cursor.current_char() == Some('=') {
                    self.cursor.advance();
                    self.emit(TokenKind::RelOp("==".into()))
                } else {
                    self.emit(TokenKind::Assign)
                }
            }
            '!' => {
                self.cursor.advance();
                if self.cursor.current_char() == Some('=') {
                    self.cursor.advance();
                    self.emit(TokenKind::RelOp("!=".into()))
                } else {
                    self.emit(TokenKind::Error('!'))
                }
            }
            '<' => {
                self.cursor.advance();
                if self.cursor.current_char() == Some('=') {
                    self.cursor.advance();
                    self.emit(TokenKind::RelOp("<=".into()))
                } else {
                    self.emit(TokenKind::RelOp("<".into()))
                }
            }
            '>' => {
                self.cursor.advance();
                if self.cursor.current_char() == Some('=') {
                    self.cursor.advance();
                    self.emit(TokenKind::RelOp(">=".into()))
                } else {
                    self.emit(TokenKind::RelOp(">".into()))
                }
            }
            '+' | '-' | '*' | '/' => {
                self.cursor.advance();
                self.emit(TokenKind::Op(c.to_string()))
            }
            '(' => {
                self.cursor.advance();
                self.emit(TokenKind::LParen)
            }
            ')' => {
                self.cursor.advance();
                self.emit(TokenKind::RParen)
            }
            '[' => {
                self.cursor.advance();
                self.emit(TokenKind::LBracket)
            }
            ']' => {
                self.cursor.advance();
                self.emit(TokenKind::RBracket)
            }
            '{' => {
                self.cursor.advance();
                self.emit(TokenKind::LBrace)
            }
            '}' => {
                self.cursor.advance();
                self.emit(TokenKind::RBrace)
            }
            ':' => {
                self.cursor.advance();
                self.emit(TokenKind::Colon)
            }
            ',' => {
                self.cursor.advance();
                self.emit(TokenKind::Comma)
            }
            '.' => {
                self.cursor.advance();
                self.emit(TokenKind::Dot)
            }
            ';' => {
                self.cursor.advance();
                self.emit(TokenKind::Semi)
            }
            other => {
                self.cursor.advance();
                self.emit(TokenKind::Error(other))
            }
        }
    }

    fn lex_number(&mut self) -> Token {
        let start = self.cursor.pos;
        let mut is_float = false;
        if self.cursor.current_char() == Some('.') {
            // leading-dot float, e.g. `.5` — digits before the dot are optional.
            is_float = true;
            self.cursor.advance();
            while matches!(self.cursor.current_char(), Some(c) if c.is_ascii_digit()) {
                self.cursor.advance();
            }
        } else {
            while matches!(self.cursor.current_char(), Some(c) if c.is_ascii_digit()) {
                self.cursor.advance();
            }
            if self.cursor.current_char() == Some('.') {
                // trailing dot, e.g. `1.` — fractional digits are optional.
                is_float = true;
                self.cursor.advance();
                while matches!(self.cursor.current_char(), Some(c) if c.is_ascii_digit()) {
                    self.cursor.advance();
                }
            }
        }
        if matches!(self.cursor.current_char(), Some('e') | Some('E')) {
            let save = self.cursor.pos;
            self.cursor.advance();
            if matches!(self.cursor.current_char(), Some('+') | Some('-')) {
                self.cursor.advance();
            }
            if matches!(self.cursor.current_char(), Some(c) if c.is_ascii_digit()) {
                is_float = true;
                while matches!(self.cursor.current_char(), Some(c) if c.is_ascii_digit()) {
                    self.cursor.advance();
                }
            } else {
                self.cursor.pos = save;
            }
        }
        let text = self.cursor.slice_from(start);
        if is_float {
            let value: f64 = text.parse().unwrap_or(0.0);
            self.emit(TokenKind::Float(value))
        } else {
            let value: i64 = text.parse().unwrap_or(0);
            self.emit(TokenKind::Int(value))
        }
    }

    fn lex_word(&mut self) -> Token {
        let start = self.cursor.pos;
        while matches!(self.cursor.current_char(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.cursor.advance();
        }
        let word = self.cursor.slice_from(start);
        match keyword_kind(word) {
            Some(kind) => self.emit(kind),
            None => self.emit(TokenKind::Id(word.to_string())),
        }
    }

    fn lex_string(&mut self, quote: char) -> Token {
        if self.cursor.current_char() == Some(quote)
            && self.cursor.peek_char() == Some(quote)
        {
            return self.lex_triple_string(quote);
        }
        self.cursor.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.cursor.current_char() {
                None => break,
                Some(c) if c == quote => {
                    self.cursor.advance();
                    break;
                }
                Some('\\') => {
                    self.cursor.advance();
                    value.push(self.lex_escape());
                }
                Some(c) => {
                    value.push(c);
                    self.cursor.advance();
                }
            }
        }
        self.emit(TokenKind::Str(value))
    }

    fn lex_triple_string(&mut self, quote: char) -> Token {
        self.cursor.advance();
        self.cursor.advance();
        self.cursor.advance();
        let mut value = String::new();
        loop {
            if self.cursor.is_eof() {
                break;
            }
            if self.cursor.current_char() == Some(quote)
                && self.cursor.char_at(self.cursor.pos + 1) == Some(quote)
                && self.cursor.char_at(self.cursor.pos + 2) == Some(quote)
            {
                self.cursor.advance();
                self.cursor.advance();
                self.cursor.advance();
                break;
            }
            if self.cursor.current_char() == Some('\\') {
                self.cursor.advance();
                value.push(self.lex_escape());
                continue;
            }
            if let Some(c) = self.cursor.advance() {
                value.push(c);
            }
        }
        self.emit(TokenKind::Str(value))
    }

    fn lex_escape(&mut self) -> char {
        match self.cursor.advance() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('0') => '\0',
            Some('\\') => '\\',
            Some('"') => '"',
            Some('\'') => '\'',
            Some(other) => other,
            None => '\\',
        }
    }
}

/// Returns the trimmed directive text (e.g. `nocache`, `cachedir "path"`) if
/// the raw, unlexed source begins with a `#!` directive line, `None`
/// otherwise. The lexer itself treats `#!...` as an ordinary comment; a host
/// driver that cares about directives inspects the raw text itself, before
/// lexing.
pub fn first_line_directive(source: &str) -> Option<&str> {
    let first_line = source.lines().next()?;
    first_line.strip_prefix("#!").map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn every_token_has_sane_position() {
        let tokens = Lexer::new("x = 1 + 2\nprint(x)").tokenize();
        for t in &tokens {
            assert!(t.line >= 1);
            assert!(t.column >= 1);
        }
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn newline_becomes_semi() {
        let ks = kinds("x = 1\ny = 2");
        assert!(ks.contains(&TokenKind::Semi));
    }

    #[test]
    fn keywords_recognized() {
        let ks = kinds("if then end while do function class import try except");
        assert_eq!(
            ks,
            vec![
                TokenKind::If,
                TokenKind::Then,
                TokenKind::End,
                TokenKind::While,
                TokenKind::Do,
                TokenKind::Function,
                TokenKind::Class,
                TokenKind::Import,
                TokenKind::Try,
                TokenKind::Except,
            ]
        );
    }

    #[test]
    fn float_vs_int() {
        let ks = kinds("1 1.5 2e3 7");
        assert_eq!(
            ks,
            vec![
                TokenKind::Int(1),
                TokenKind::Float(1.5),
                TokenKind::Float(2000.0),
                TokenKind::Int(7),
            ]
        );
    }

    #[test]
    fn leading_and_trailing_dot_floats() {
        let ks = kinds(".5 1. 3.14");
        assert_eq!(
            ks,
            vec![TokenKind::Float(0.5), TokenKind::Float(1.0), TokenKind::Float(3.14)]
        );
    }

    #[test]
    fn triple_quoted_preserves_newlines_and_opening_line() {
        let tokens = Lexer::new("x = \"\"\"a\nb\nc\"\"\"").tokenize();
        let str_tok = tokens
            .iter()
            .find(|t| matches!(t.kind, TokenKind::Str(_)))
            .unwrap();
        assert_eq!(str_tok.line, 1);
        match &str_tok.kind {
            TokenKind::Str(s) => assert_eq!(s, "a\nb\nc"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn unexpected_character_becomes_error_token_and_continues() {
        let ks = kinds("x = 1 @ 2");
        assert!(ks.contains(&TokenKind::Error('@')));
        assert!(ks.contains(&TokenKind::Int(2)));
    }

    #[test]
    fn comment_is_discarded() {
        let ks = kinds("x = 1 # trailing comment\ny = 2");
        assert!(!ks.iter().any(|k| matches!(k, TokenKind::Error(_))));
    }

    #[test]
    fn first_line_directive_extracted_only_at_position_one() {
        assert_eq!(first_line_directive("#!nocache\nx = 1"), Some("nocache"));
        assert_eq!(
            first_line_directive("#!cachedir \"out\"\nx = 1"),
            Some("cachedir \"out\"")
        );
        assert_eq!(first_line_directive("x = 1\n#!nocache"), None);
        assert_eq!(first_line_directive("# just a comment"), None);
    }
}
