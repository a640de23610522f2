//! Syntax analysis: turns the lexer's tokens into a [`Command`].
//!
//! Grammar: `command := WORD {WORD | redirect}`, `redirect := ('<' | '>') WORD`.
//! At most one input and one output redirection are allowed, anywhere after the
//! command name.

use crate::command::Command;
use crate::lexer::{Token, TokenKind};
use thiserror::Error;

/// Errors that can occur while building a command from tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsingError {
    /// The first token is missing or is a redirection marker.
    #[error("Missing command name")]
    MissingCommandName,
    #[error("Standard input redirection without file name")]
    InputWithoutFileName,
    #[error("Standard output redirection without file name")]
    OutputWithoutFileName,
    #[error("Multiple redirection of standard input")]
    MultipleInput,
    #[error("Multiple redirection of standard output")]
    MultipleOutput,
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Input,
    Output,
}

impl Stream {
    fn missing_file_name(self) -> ParsingError {
        match self {
            Stream::Input => ParsingError::InputWithoutFileName,
            Stream::Output => ParsingError::OutputWithoutFileName,
        }
    }

    fn duplicated(self) -> ParsingError {
        match self {
            Stream::Input => ParsingError::MultipleInput,
            Stream::Output => ParsingError::MultipleOutput,
        }
    }
}

struct CommandBuilder {
    tokens: std::vec::IntoIter<Token>,
    argv: Vec<String>,
    stdin: Option<String>,
    stdout: Option<String>,
}

impl CommandBuilder {
    fn from(tokens: Vec<Token>) -> Self {
        CommandBuilder {
            tokens: tokens.into_iter(),
            argv: Vec::new(),
            stdin: None,
            stdout: None,
        }
    }

    fn build(mut self) -> Result<Command, ParsingError> {
        match self.tokens.next() {
            Some(token) if token.is_word() => self.argv.push(token.text),
            _ => return Err(ParsingError::MissingCommandName),
        }

        while let Some(token) = self.tokens.next() {
            match token.kind {
                TokenKind::Word => self.argv.push(token.text),
                TokenKind::RedirectIn => self.redirect(Stream::Input)?,
                TokenKind::RedirectOut => self.redirect(Stream::Output)?,
            }
        }

        Ok(Command {
            argv: self.argv,
            stdin: self.stdin,
            stdout: self.stdout,
        })
    }

    /// Consume the file name following a redirection marker.
    fn redirect(&mut self, stream: Stream) -> Result<(), ParsingError> {
        let path = match self.tokens.next() {
            Some(token) if token.is_word() && !token.text.is_empty() => token.text,
            _ => return Err(stream.missing_file_name()),
        };

        let slot = match stream {
            Stream::Input => &mut self.stdin,
            Stream::Output => &mut self.stdout,
        };
        if slot.is_some() {
            return Err(stream.duplicated());
        }
        *slot = Some(path);
        Ok(())
    }
}

/// Builds a [`Command`] from a token sequence.
///
/// Redirection markers and their file names are removed from the stream; the
/// remaining words, in order, become `argv`. Any error aborts the whole command.
pub fn construct_command(tokens: Vec<Token>) -> Result<Command, ParsingError> {
    CommandBuilder::from(tokens).build()
}
