//! The execution core of a small interactive shell: tokenize a line,
//! group it into a pipeline, handle the `cd`/`exit` builtins, and run
//! everything else as concurrently forked external processes wired
//! together with pipes and optional file redirection.
//!
//! [`interpret`] drives one line end to end; the binary wraps it in a
//! prompt-and-read loop and owns nothing else.

pub mod builtin;
pub mod eval;
pub mod job;
pub mod lexer;
pub mod parser;
pub mod types;

use std::io::{self, Write};

use builtin::Dispatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpret {
	Continue,
	Exit,
}

/// Runs one input line to completion. Every failure short of the `exit`
/// builtin is reported on stderr and leaves the read loop running; the
/// per-stage exit statuses are collected but not printed.
pub fn interpret(line: &str) -> Interpret {
	let tokens = lexer::tokenize(line);
	if tokens.is_empty() {
		return Interpret::Continue;
	}
	let pipeline = match parser::build(tokens) {
		Ok(pipeline) => pipeline,
		Err(e) => {
			let _ = writeln!(io::stderr(), "msh: {}", e);
			return Interpret::Continue;
		}
	};
	match builtin::dispatch(&pipeline) {
		Dispatch::Handled { exit: true } => return Interpret::Exit,
		Dispatch::Handled { exit: false } => return Interpret::Continue,
		Dispatch::NotBuiltin => {}
	}
	if let Err(e) = eval::run(&pipeline) {
		let _ = writeln!(io::stderr(), "msh: {}", e);
	}
	Interpret::Continue
}
