//! A module implementing lexical analysis (tokenization) of a single command line.
//!
//! The lexer is a deterministic finite automaton that reads one character at a time.
//! It knows nothing about commands: it only splits the line into words and the two
//! redirection markers `<` and `>`. Double quotes group characters (including blanks)
//! into a single word and are never copied into the token text.

use thiserror::Error;

/// The kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// An ordinary word: command name, argument or file name.
    Word,
    /// Input redirection marker, `<`.
    RedirectIn,
    /// Output redirection marker, `>`.
    RedirectOut,
}

/// Represents a token resulting from lexical analysis.
///
/// For redirection markers `text` holds the single character `<` or `>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    /// Creates a word token with the given text.
    pub fn word(text: impl Into<String>) -> Self {
        Token {
            kind: TokenKind::Word,
            text: text.into(),
        }
    }

    fn redirect(marker: char) -> Self {
        let kind = match marker {
            '<' => TokenKind::RedirectIn,
            _ => TokenKind::RedirectOut,
        };
        Token {
            kind,
            text: marker.to_string(),
        }
    }

    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }
}

/// Errors that can occur during the lexical analysis process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexingError {
    /// The line ended while a double quote was still open.
    #[error("Unmatched quote")]
    UnmatchedQuote,
    /// A character that is neither blank nor printable ASCII.
    #[error("Invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Outcome of lexing one line.
///
/// `tokens` is populated even when `status` is an error: it then holds whatever
/// was collected before the failure, which callers use to tell a blank line from
/// a broken one.
#[derive(Debug)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub status: Result<(), LexingError>,
}

impl Lexed {
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    InWord,
    InQuote,
    Error,
    Exit,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
    tokens: Vec<Token>,
    error: Option<LexingError>,
}

impl LexingFSM {
    /// Creates a new instance of the lexical analysis Finite State Machine.
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
            tokens: Vec::new(),
            error: None,
        }
    }

    /// Runs the automaton until it reaches `Exit` or `Error`.
    fn make_tokens(mut self) -> Lexed {
        loop {
            let ch = match self.state {
                LexingState::Exit | LexingState::Error => break,
                _ => self.read_char(),
            };
            self.state = match self.state {
                LexingState::Start => self.handle_start(ch),
                LexingState::InWord => self.handle_word(ch),
                LexingState::InQuote => self.handle_quote(ch),
                finished => finished,
            };
        }

        let status = match self.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        };
        Lexed {
            tokens: self.tokens,
            status,
        }
    }

    /// Returns the next character, or `None` at the end of the line.
    ///
    /// A newline counts as the end of the line; anything after it is ignored.
    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        self.pos += 1;
        match ch {
            Some('\n') | None => None,
            c => c,
        }
    }

    fn handle_start(&mut self, ch: Option<char>) -> LexingState {
        match ch {
            None => LexingState::Exit,
            Some(c @ ('<' | '>')) => {
                self.tokens.push(Token::redirect(c));
                LexingState::Start
            }
            Some('"') => LexingState::InQuote,
            Some(' ' | '\t') => LexingState::Start,
            Some(c) if c.is_ascii_graphic() => {
                self.buffer.push(c);
                LexingState::InWord
            }
            Some(c) => self.fail(LexingError::InvalidCharacter(c)),
        }
    }

    fn handle_word(&mut self, ch: Option<char>) -> LexingState {
        match ch {
            None => {
                self.emit_word();
                LexingState::Exit
            }
            Some(' ' | '\t') => {
                self.emit_word();
                LexingState::Start
            }
            Some(c @ ('<' | '>')) => {
                self.emit_word();
                self.tokens.push(Token::redirect(c));
                LexingState::Start
            }
            // A quote inside a word does not end it: `a"b c"d` is the single word `ab cd`.
            Some('"') => LexingState::InQuote,
            Some(c) if c.is_ascii_graphic() => {
                self.buffer.push(c);
                LexingState::InWord
            }
            Some(c) => self.fail(LexingError::InvalidCharacter(c)),
        }
    }

    fn handle_quote(&mut self, ch: Option<char>) -> LexingState {
        match ch {
            None => {
                // Keep the partial word so the line still counts as non-blank.
                self.emit_word();
                self.fail(LexingError::UnmatchedQuote)
            }
            Some('"') => LexingState::InWord,
            Some(c) if c == ' ' || c == '\t' || c.is_ascii_graphic() => {
                self.buffer.push(c);
                LexingState::InQuote
            }
            Some(c) => self.fail(LexingError::InvalidCharacter(c)),
        }
    }

    fn emit_word(&mut self) {
        let text = std::mem::take(&mut self.buffer);
        self.tokens.push(Token::word(text));
    }

    fn fail(&mut self, err: LexingError) -> LexingState {
        self.error = Some(err);
        LexingState::Error
    }
}

/// The main entry point function to perform lexical analysis.
///
/// Creates and runs the finite state machine over `line`. There is no upper bound on
/// the line length: token text accumulates in growable buffers.
pub fn split_into_tokens(line: &str) -> Lexed {
    LexingFSM::new(line).make_tokens()
}
