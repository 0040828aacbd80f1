use std::path::PathBuf;
use std::{error, fmt, mem};

use crate::lexer::Token;
use crate::types::{Command, Pipeline, PipelineLevelRedirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
	/// A `<` or `>` with no following word to name the file.
	MissingRedirectTarget,
	/// A pipe with nothing on one side, or a line with no command at all.
	EmptyStage,
}

impl fmt::Display for ParseError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			ParseError::MissingRedirectTarget => write!(f, "redirect operator with no target file"),
			ParseError::EmptyStage => write!(f, "empty pipeline stage"),
		}
	}
}

impl error::Error for ParseError {}

/// Groups word tokens into per-stage argument vectors split on `|` and
/// pulls out the pipeline-level redirections. Redirect operators may
/// appear anywhere in the line; each consumes exactly the next word, and
/// a repeated operator of the same direction overwrites the earlier one.
pub fn build(tokens: Vec<Token>) -> Result<Pipeline, ParseError> {
	let mut stages: Vec<Command> = vec![];
	let mut current: Vec<String> = vec![];
	let mut redirects = PipelineLevelRedirection::default();

	let mut tokens = tokens.into_iter();
	while let Some(token) = tokens.next() {
		match token {
			Token::Word(word) => current.push(word),
			Token::Pipe => {
				if current.is_empty() {
					return Err(ParseError::EmptyStage);
				}
				stages.push(Command { argv: mem::take(&mut current) });
			}
			Token::RedirectIn => redirects.input = Some(redirect_target(&mut tokens)?),
			Token::RedirectOut => redirects.output = Some(redirect_target(&mut tokens)?),
		}
	}

	if current.is_empty() {
		return Err(ParseError::EmptyStage);
	}
	stages.push(Command { argv: current });

	Ok(Pipeline { stages, redirects })
}

fn redirect_target<I: Iterator<Item = Token>>(tokens: &mut I) -> Result<PathBuf, ParseError> {
	match tokens.next() {
		Some(Token::Word(word)) => Ok(PathBuf::from(word)),
		_ => Err(ParseError::MissingRedirectTarget),
	}
}
