use anyhow::Result;
use msh::{interpret, Interpret};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const PROMPT: &str = "msh> ";

fn main() -> Result<()> {
	let mut rl = DefaultEditor::new()?;
	loop {
		match rl.readline(PROMPT) {
			Ok(line) => {
				let _ = rl.add_history_entry(line.as_str());
				if interpret(&line) == Interpret::Exit {
					break;
				}
			}
			Err(ReadlineError::Interrupted) => continue,
			Err(ReadlineError::Eof) => break,
			Err(e) => return Err(e.into()),
		}
	}
	Ok(())
}
