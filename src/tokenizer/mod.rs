use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Represents the position of a token in the source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A piece of a backtick template: literal text or the raw source of a `${...}` hole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TemplateChunk {
    Text(String),
    Code { source: String, position: Position },
}

/// All token kinds produced by the tokenizer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TokenKind {
    // Literals
    Int(String),
    Float(String),
    String(String),
    Template(Vec<TemplateChunk>),
    Identifier(String),

    // Keywords
    Let,         // dhoro
    Const,       // sthir
    Global,      // bishwo
    If,          // jodi
    Else,        // nahole
    While,       // jotokkhon
    For,         // ghuriye
    Function,    // kaj
    Return,      // ferao
    Class,       // sreni
    Constructor, // shuru
    New,         // notun
    This,        // ei
    True,        // sotti
    False,       // mittha
    Null,        // khali
    And,         // ebong, &&
    Or,          // ba, ||
    Not,         // na, !
    Break,       // thamo
    Continue,    // chharo
    Import,      // ano
    Export,      // pathao
    As,          // hisabe
    Try,         // chesta
    Catch,       // dhoro_bhul
    Finally,     // shesh
    Throw,       // felo
    Switch,      // bikolpo
    Case,        // khetre
    Default,     // manchito
    Async,       // proyash
    Await,       // opekha
    Yield,       // utpadan
    Get,         // pao
    Set,         // set
    InstanceOf,  // instanceof
    Delete,      // delete
    In,          // in
    Of,          // of
    Do,          // do

    // Operators
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    PlusPlus,
    MinusMinus,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Arrow,
    Question,
    Colon,
    Dot,

    // Punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Semicolon,

    Eof,
}

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    HashMap::from([
        ("dhoro", TokenKind::Let),
        ("sthir", TokenKind::Const),
        ("bishwo", TokenKind::Global),
        ("jodi", TokenKind::If),
        ("nahole", TokenKind::Else),
        ("jotokkhon", TokenKind::While),
        ("ghuriye", TokenKind::For),
        ("kaj", TokenKind::Function),
        ("ferao", TokenKind::Return),
        ("sreni", TokenKind::Class),
        ("shuru", TokenKind::Constructor),
        ("notun", TokenKind::New),
        ("ei", TokenKind::This),
        ("sotti", TokenKind::True),
        ("mittha", TokenKind::False),
        ("khali", TokenKind::Null),
        ("ebong", TokenKind::And),
        ("ba", TokenKind::Or),
        ("na", TokenKind::Not),
        ("thamo", TokenKind::Break),
        ("chharo", TokenKind::Continue),
        ("ano", TokenKind::Import),
        ("pathao", TokenKind::Export),
        ("hisabe", TokenKind::As),
        ("chesta", TokenKind::Try),
        ("dhoro_bhul", TokenKind::Catch),
        ("shesh", TokenKind::Finally),
        ("felo", TokenKind::Throw),
        ("bikolpo", TokenKind::Switch),
        ("khetre", TokenKind::Case),
        ("manchito", TokenKind::Default),
        ("proyash", TokenKind::Async),
        ("opekha", TokenKind::Await),
        ("utpadan", TokenKind::Yield),
        ("pao", TokenKind::Get),
        ("set", TokenKind::Set),
        ("instanceof", TokenKind::InstanceOf),
        ("delete", TokenKind::Delete),
        ("in", TokenKind::In),
        ("of", TokenKind::Of),
        ("do", TokenKind::Do),
    ])
});

impl TokenKind {
    /// Source spelling of a keyword token, if this kind is one.
    pub fn keyword_text(&self) -> Option<&'static str> {
        KEYWORDS
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(text, _)| *text)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.keyword_text() {
            return write!(f, "'{}'", text);
        }
        match self {
            TokenKind::Int(n) | TokenKind::Float(n) => write!(f, "number {}", n),
            TokenKind::String(s) => write!(f, "string \"{}\"", s),
            TokenKind::Template(_) => write!(f, "template string"),
            TokenKind::Identifier(s) => write!(f, "identifier '{}'", s),
            TokenKind::Eof => write!(f, "end of input"),
            other => write!(f, "'{}'", operator_text(other)),
        }
    }
}

fn operator_text(kind: &TokenKind) -> &'static str {
    match kind {
        TokenKind::Plus => "+",
        TokenKind::Minus => "-",
        TokenKind::Star => "*",
        TokenKind::StarStar => "**",
        TokenKind::Slash => "/",
        TokenKind::Percent => "%",
        TokenKind::Assign => "=",
        TokenKind::PlusAssign => "+=",
        TokenKind::MinusAssign => "-=",
        TokenKind::StarAssign => "*=",
        TokenKind::SlashAssign => "/=",
        TokenKind::PercentAssign => "%=",
        TokenKind::PlusPlus => "++",
        TokenKind::MinusMinus => "--",
        TokenKind::Equal => "==",
        TokenKind::NotEqual => "!=",
        TokenKind::Less => "<",
        TokenKind::LessEqual => "<=",
        TokenKind::Greater => ">",
        TokenKind::GreaterEqual => ">=",
        TokenKind::Arrow => "=>",
        TokenKind::Question => "?",
        TokenKind::Colon => ":",
        TokenKind::Dot => ".",
        TokenKind::LeftParen => "(",
        TokenKind::RightParen => ")",
        TokenKind::LeftBrace => "{",
        TokenKind::RightBrace => "}",
        TokenKind::LeftBracket => "[",
        TokenKind::RightBracket => "]",
        TokenKind::Comma => ",",
        TokenKind::Semicolon => ";",
        _ => "?",
    }
}

/// A token with its kind and position information
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, position: Position) -> Self {
        Self { kind, position }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unexpected character '{character}' at {position}")]
    UnexpectedCharacter { character: char, position: Position },
    #[error("unterminated string starting at {position}")]
    UnterminatedString { position: Position },
    #[error("unterminated template string starting at {position}")]
    UnterminatedTemplate { position: Position },
    #[error("unterminated block comment starting at {position}")]
    UnterminatedComment { position: Position },
    #[error("malformed number '{lexeme}' at {position}")]
    MalformedNumber { lexeme: String, position: Position },
}

impl LexError {
    pub fn position(&self) -> Position {
        match self {
            LexError::UnexpectedCharacter { position, .. }
            | LexError::UnterminatedString { position }
            | LexError::UnterminatedTemplate { position }
            | LexError::UnterminatedComment { position }
            | LexError::MalformedNumber { position, .. } => *position,
        }
    }
}

/// Tokenizer for BanglaCode source text
pub struct Tokenizer {
    input: Vec<char>,
    position: usize,
    base_offset: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        Self::with_origin(input, Position::new(1, 1, 0))
    }

    /// Tokenizer whose positions start at `origin`; used for template holes.
    pub fn with_origin(input: &str, origin: Position) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            base_offset: origin.offset,
            line: origin.line,
            column: origin.column,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        loop {
            self.skip_whitespace_and_comments()?;
            if self.is_at_end() {
                break;
            }

            let ch = self.current_char();
            let start = self.current_position();

            if ch == '"' || ch == '\'' {
                let text = self.read_string(ch, start)?;
                self.tokens.push(Token::new(TokenKind::String(text), start));
            } else if ch == '`' {
                let chunks = self.read_template(start)?;
                self.tokens.push(Token::new(TokenKind::Template(chunks), start));
            } else if ch.is_ascii_digit() {
                let kind = self.read_number(start)?;
                self.tokens.push(Token::new(kind, start));
            } else if ch.is_alphabetic() || ch == '_' || ch == '$' {
                let kind = self.read_identifier();
                self.tokens.push(Token::new(kind, start));
            } else {
                let kind = self.read_operator(start)?;
                self.tokens.push(Token::new(kind, start));
            }
        }

        let end = self.current_position();
        self.tokens.push(Token::new(TokenKind::Eof, end));
        Ok(self.tokens)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input.get(self.position).copied().unwrap_or('\0')
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.current_char();
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn current_position(&self) -> Position {
        Position::new(self.line, self.column, self.base_offset + self.position)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        while !self.is_at_end() {
            let ch = self.current_char();
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '/' && self.peek_char() == Some('/') {
                while !self.is_at_end() && self.current_char() != '\n' {
                    self.advance();
                }
            } else if ch == '/' && self.peek_char() == Some('*') {
                let start = self.current_position();
                self.advance();
                self.advance();
                loop {
                    if self.is_at_end() {
                        return Err(LexError::UnterminatedComment { position: start });
                    }
                    if self.current_char() == '*' && self.peek_char() == Some('/') {
                        self.advance();
                        self.advance();
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    fn read_escape(&mut self) -> char {
        match self.advance() {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            other => other,
        }
    }

    fn read_string(&mut self, quote: char, start: Position) -> Result<String, LexError> {
        self.advance();
        let mut value = String::new();
        loop {
            if self.is_at_end() {
                return Err(LexError::UnterminatedString { position: start });
            }
            match self.advance() {
                c if c == quote => break,
                '\\' => {
                    if self.is_at_end() {
                        return Err(LexError::UnterminatedString { position: start });
                    }
                    value.push(self.read_escape());
                }
                c => value.push(c),
            }
        }
        Ok(value)
    }

    fn read_template(&mut self, start: Position) -> Result<Vec<TemplateChunk>, LexError> {
        self.advance();
        let mut chunks = Vec::new();
        let mut text = String::new();
        loop {
            if self.is_at_end() {
                return Err(LexError::UnterminatedTemplate { position: start });
            }
            let ch = self.current_char();
            if ch == '`' {
                self.advance();
                break;
            }
            if ch == '\\' {
                self.advance();
                if self.is_at_end() {
                    return Err(LexError::UnterminatedTemplate { position: start });
                }
                text.push(self.read_escape());
                continue;
            }
            if ch == '$' && self.peek_char() == Some('{') {
                self.advance();
                self.advance();
                if !text.is_empty() {
                    chunks.push(TemplateChunk::Text(std::mem::take(&mut text)));
                }
                let hole_start = self.current_position();
                let source = self.read_interpolation(start)?;
                chunks.push(TemplateChunk::Code {
                    source,
                    position: hole_start,
                });
                continue;
            }
            text.push(self.advance());
        }
        if !text.is_empty() || chunks.is_empty() {
            chunks.push(TemplateChunk::Text(text));
        }
        Ok(chunks)
    }

    /// Collects the raw source of a `${...}` hole up to its matching `}`.
    /// Braces, quoted strings and nested templates inside the hole are skipped
    /// as units so their own `}` characters do not close the hole.
    fn read_interpolation(&mut self, template_start: Position) -> Result<String, LexError> {
        let mut source = String::new();
        let mut depth = 0usize;
        loop {
            if self.is_at_end() {
                return Err(LexError::UnterminatedTemplate {
                    position: template_start,
                });
            }
            let ch = self.current_char();
            match ch {
                '{' => {
                    depth += 1;
                    source.push(self.advance());
                }
                '}' if depth == 0 => {
                    self.advance();
                    return Ok(source);
                }
                '}' => {
                    depth -= 1;
                    source.push(self.advance());
                }
                '"' | '\'' | '`' => {
                    let quote = self.advance();
                    source.push(quote);
                    let mut nested = 0usize;
                    loop {
                        if self.is_at_end() {
                            return Err(LexError::UnterminatedTemplate {
                                position: template_start,
                            });
                        }
                        let c = self.advance();
                        source.push(c);
                        if c == '\\' {
                            if !self.is_at_end() {
                                source.push(self.advance());
                            }
                        } else if quote == '`' && c == '$' && self.current_char() == '{' {
                            nested += 1;
                            source.push(self.advance());
                        } else if quote == '`' && c == '}' && nested > 0 {
                            nested -= 1;
                        } else if c == quote && nested == 0 {
                            break;
                        }
                    }
                }
                _ => source.push(self.advance()),
            }
        }
    }

    fn read_number(&mut self, start: Position) -> Result<TokenKind, LexError> {
        let mut lexeme = String::new();
        let mut is_float = false;

        while self.current_char().is_ascii_digit() || self.current_char() == '_' {
            let c = self.advance();
            if c != '_' {
                lexeme.push(c);
            }
        }

        if self.current_char() == '.' && self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            lexeme.push(self.advance());
            while self.current_char().is_ascii_digit() {
                lexeme.push(self.advance());
            }
        }

        if matches!(self.current_char(), 'e' | 'E') {
            let sign_then_digit = matches!(self.peek_char(), Some('+') | Some('-'))
                && self
                    .input
                    .get(self.position + 2)
                    .is_some_and(|c| c.is_ascii_digit());
            let digit = self.peek_char().is_some_and(|c| c.is_ascii_digit());
            if digit || sign_then_digit {
                is_float = true;
                lexeme.push(self.advance());
                if sign_then_digit {
                    lexeme.push(self.advance());
                }
                while self.current_char().is_ascii_digit() {
                    lexeme.push(self.advance());
                }
            }
        }

        if self.current_char().is_alphabetic() || self.current_char() == '_' {
            lexeme.push(self.current_char());
            return Err(LexError::MalformedNumber {
                lexeme,
                position: start,
            });
        }

        Ok(if is_float {
            TokenKind::Float(lexeme)
        } else {
            TokenKind::Int(lexeme)
        })
    }

    fn read_identifier(&mut self) -> TokenKind {
        let mut name = String::new();
        while !self.is_at_end() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '_' || c == '$' {
                name.push(self.advance());
            } else {
                break;
            }
        }
        KEYWORDS
            .get(name.as_str())
            .cloned()
            .unwrap_or(TokenKind::Identifier(name))
    }

    fn read_operator(&mut self, start: Position) -> Result<TokenKind, LexError> {
        let ch = self.advance();
        let next = self.current_char();
        let kind = match (ch, next) {
            ('*', '*') => self.take(TokenKind::StarStar),
            ('+', '+') => self.take(TokenKind::PlusPlus),
            ('-', '-') => self.take(TokenKind::MinusMinus),
            ('+', '=') => self.take(TokenKind::PlusAssign),
            ('-', '=') => self.take(TokenKind::MinusAssign),
            ('*', '=') => self.take(TokenKind::StarAssign),
            ('/', '=') => self.take(TokenKind::SlashAssign),
            ('%', '=') => self.take(TokenKind::PercentAssign),
            ('=', '=') => self.take(TokenKind::Equal),
            ('=', '>') => self.take(TokenKind::Arrow),
            ('!', '=') => self.take(TokenKind::NotEqual),
            ('<', '=') => self.take(TokenKind::LessEqual),
            ('>', '=') => self.take(TokenKind::GreaterEqual),
            ('&', '&') => self.take(TokenKind::And),
            ('|', '|') => self.take(TokenKind::Or),
            ('+', _) => TokenKind::Plus,
            ('-', _) => TokenKind::Minus,
            ('*', _) => TokenKind::Star,
            ('/', _) => TokenKind::Slash,
            ('%', _) => TokenKind::Percent,
            ('=', _) => TokenKind::Assign,
            ('!', _) => TokenKind::Not,
            ('<', _) => TokenKind::Less,
            ('>', _) => TokenKind::Greater,
            ('?', _) => TokenKind::Question,
            (':', _) => TokenKind::Colon,
            ('.', _) => TokenKind::Dot,
            ('(', _) => TokenKind::LeftParen,
            (')', _) => TokenKind::RightParen,
            ('{', _) => TokenKind::LeftBrace,
            ('}', _) => TokenKind::RightBrace,
            ('[', _) => TokenKind::LeftBracket,
            (']', _) => TokenKind::RightBracket,
            (',', _) => TokenKind::Comma,
            (';', _) => TokenKind::Semicolon,
            (character, _) => {
                return Err(LexError::UnexpectedCharacter {
                    character,
                    position: start,
                });
            }
        };
        Ok(kind)
    }

    fn take(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }
}
