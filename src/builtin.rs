use std::io::{self, Write};
use std::path::Path;

use nix::unistd;

use crate::types::Pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
	Handled { exit: bool },
	NotBuiltin,
}

/// Recognizes `exit` and `cd` against the first stage's program name.
/// Builtins never take part in pipes or redirection: anything but a bare
/// single-stage command goes through normal external lookup, so `ls | cd`
/// ends up as a failed `execvp("cd")` rather than a directory change.
pub fn dispatch(pipeline: &Pipeline) -> Dispatch {
	if pipeline.stages.len() != 1 || !pipeline.redirects.is_empty() {
		return Dispatch::NotBuiltin;
	}
	let command = &pipeline.stages[0];
	match command.name() {
		"exit" => Dispatch::Handled { exit: true },
		"cd" => {
			builtin_cd(&command.argv);
			Dispatch::Handled { exit: false }
		}
		_ => Dispatch::NotBuiltin,
	}
}

// Arguments past the first are ignored.
fn builtin_cd(argv: &[String]) {
	match argv.get(1) {
		None => {
			let _ = writeln!(io::stderr(), "cd: missing argument");
		}
		Some(target) => {
			if let Err(e) = unistd::chdir(Path::new(target)) {
				let _ = writeln!(io::stderr(), "cd: {}: {}", target, e);
			}
		}
	}
}
