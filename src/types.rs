use std::path::PathBuf;

/// One pipeline stage: the program name followed by its arguments.
/// The parser guarantees `argv` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
	pub argv: Vec<String>,
}

impl Command {
	pub fn name(&self) -> &str {
		&self.argv[0]
	}
}

/// File redirections bind to the pipeline as a whole, wherever the
/// operators appeared in the line: `input` feeds stage 0's stdin,
/// `output` receives the last stage's stdout. A per-stage model would
/// replace this type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineLevelRedirection {
	pub input: Option<PathBuf>,
	pub output: Option<PathBuf>,
}

impl PipelineLevelRedirection {
	pub fn is_empty(&self) -> bool {
		self.input.is_none() && self.output.is_none()
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
	pub stages: Vec<Command>,
	pub redirects: PipelineLevelRedirection,
}
