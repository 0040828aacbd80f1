use std::ffi::{CString, NulError};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::io::IntoRawFd;
use std::path::PathBuf;
use std::{error, fmt};

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::wait::WaitStatus;
use nix::unistd::{self, ForkResult};

use crate::job::PipelineJob;
use crate::types::{Command, Pipeline};

/// Parent-side failure: resource exhaustion (pipe or fork), or an
/// argument that cannot cross the exec boundary.
#[derive(Debug)]
pub enum RunError {
	Sys(Errno),
	Nul(NulError),
}

impl From<Errno> for RunError {
	fn from(e: Errno) -> RunError {
		RunError::Sys(e)
	}
}

impl From<NulError> for RunError {
	fn from(e: NulError) -> RunError {
		RunError::Nul(e)
	}
}

impl fmt::Display for RunError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			RunError::Sys(ref e) => write!(f, "{}", e),
			RunError::Nul(ref e) => write!(f, "argument contains NUL byte: {}", e),
		}
	}
}

impl error::Error for RunError {}

// Failures on the child side of the fork. Each is fatal to that child
// only; the parent and sibling stages keep going.
enum ChildError {
	Redirect(PathBuf, io::Error),
	Wire(Errno),
	Exec(Errno),
}

impl ChildError {
	fn exit_code(&self) -> libc::c_int {
		match *self {
			ChildError::Redirect(..) => 1,
			ChildError::Exec(Errno::ENOENT) => 127,
			ChildError::Wire(_) | ChildError::Exec(_) => 126,
		}
	}
}

impl fmt::Display for ChildError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			ChildError::Redirect(ref path, ref e) => write!(f, "{}: {}", path.display(), e),
			ChildError::Wire(ref e) => write!(f, "{}", e),
			ChildError::Exec(Errno::ENOENT) => write!(f, "command not found"),
			ChildError::Exec(ref e) => write!(f, "{}", e),
		}
	}
}

/// Runs an external pipeline to completion: one forked process per stage,
/// all spawned before any is awaited, stdout of stage i feeding stdin of
/// stage i+1. Returns one wait status per stage, in stage order.
pub fn run(pipeline: &Pipeline) -> Result<Vec<WaitStatus>, RunError> {
	let stage_count = pipeline.stages.len();
	let argvs = pipeline
		.stages
		.iter()
		.map(stage_argv)
		.collect::<Result<Vec<_>, NulError>>()?;

	// N-1 pipes for N stages. O_CLOEXEC means every end a child does not
	// dup2 onto its stdio vanishes at exec, so no stage can hold a write
	// end open and starve a downstream reader of EOF.
	let mut pipes: Vec<(OwnedFd, OwnedFd)> = Vec::with_capacity(stage_count.saturating_sub(1));
	for _ in 1..stage_count {
		pipes.push(unistd::pipe2(OFlag::O_CLOEXEC)?);
	}

	let mut job = PipelineJob::new(stage_count);
	let mut fork_error = None;
	for (i, argv) in argvs.iter().enumerate() {
		match job.push_fork() {
			Ok(ForkResult::Parent { .. }) => {}
			Ok(ForkResult::Child) => {
				let stdin_pipe = if i > 0 { Some(&pipes[i - 1].0) } else { None };
				let stdout_pipe = if i + 1 < stage_count { Some(&pipes[i].1) } else { None };
				exec_stage(pipeline, i, argv, stdin_pipe, stdout_pipe);
			}
			Err(e) => {
				// Stop spawning, but fall through: children forked so
				// far must still be reaped.
				fork_error = Some(e);
				break;
			}
		}
	}

	// Until the parent lets go of the write ends, readers never see EOF.
	drop(pipes);

	let statuses = job.wait_all();
	match fork_error {
		Some(e) => Err(RunError::Sys(e)),
		None => Ok(statuses),
	}
}

fn stage_argv(command: &Command) -> Result<Vec<CString>, NulError> {
	command.argv.iter().map(|arg| CString::new(arg.as_str())).collect()
}

fn exec_stage(
	pipeline: &Pipeline,
	stage: usize,
	argv: &[CString],
	stdin_pipe: Option<&OwnedFd>,
	stdout_pipe: Option<&OwnedFd>,
) -> ! {
	let e = match do_exec_stage(pipeline, stage, argv, stdin_pipe, stdout_pipe) {
		Err(e) => e,
		Ok(never) => match never {},
	};
	let _ = match e {
		ChildError::Exec(_) => {
			writeln!(io::stderr(), "msh: {}: {}", argv[0].to_string_lossy(), e)
		}
		_ => writeln!(io::stderr(), "msh: {}", e),
	};
	unsafe { libc::_exit(e.exit_code()) }
}

fn do_exec_stage(
	pipeline: &Pipeline,
	stage: usize,
	argv: &[CString],
	stdin_pipe: Option<&OwnedFd>,
	stdout_pipe: Option<&OwnedFd>,
) -> Result<std::convert::Infallible, ChildError> {
	if let Some(fd) = stdin_pipe {
		unistd::dup2(fd.as_raw_fd(), libc::STDIN_FILENO).map_err(ChildError::Wire)?;
	}
	if let Some(fd) = stdout_pipe {
		unistd::dup2(fd.as_raw_fd(), libc::STDOUT_FILENO).map_err(ChildError::Wire)?;
	}
	// File redirections apply only at the pipeline's outer edges and
	// override the terminal, never a pipe (stage 0 has no stdin pipe, the
	// last stage no stdout pipe).
	if stage == 0 {
		if let Some(ref path) = pipeline.redirects.input {
			let file = File::open(path)
				.map_err(|e| ChildError::Redirect(path.clone(), e))?;
			redirect_fd(file, libc::STDIN_FILENO)?;
		}
	}
	if stage + 1 == pipeline.stages.len() {
		if let Some(ref path) = pipeline.redirects.output {
			let file = OpenOptions::new()
				.write(true)
				.create(true)
				.truncate(true)
				.open(path)
				.map_err(|e| ChildError::Redirect(path.clone(), e))?;
			redirect_fd(file, libc::STDOUT_FILENO)?;
		}
	}
	unistd::execvp(&argv[0], argv).map_err(ChildError::Exec)
}

fn redirect_fd(file: File, fd: RawFd) -> Result<(), ChildError> {
	let raw = file.into_raw_fd();
	unistd::dup2(raw, fd).map_err(ChildError::Wire)?;
	let _ = unistd::close(raw);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::job::WaitStatusExt;
	use crate::types::PipelineLevelRedirection;
	use std::fs;
	use std::path::PathBuf;
	use std::process;

	fn command(argv: &[&str]) -> Command {
		Command { argv: argv.iter().map(|s| s.to_string()).collect() }
	}

	fn pipeline(stages: &[&[&str]]) -> Pipeline {
		Pipeline {
			stages: stages.iter().map(|s| command(s)).collect(),
			redirects: PipelineLevelRedirection::default(),
		}
	}

	fn temp_path(tag: &str) -> PathBuf {
		let mut path = std::env::temp_dir();
		path.push(format!("msh-test-{}-{}", process::id(), tag));
		path
	}

	#[test]
	fn single_stage_reports_its_exit_status() {
		let statuses = run(&pipeline(&[&["true"]])).unwrap();
		assert_eq!(statuses.len(), 1);
		assert_eq!(statuses[0].code(), 0);

		let statuses = run(&pipeline(&[&["false"]])).unwrap();
		assert_eq!(statuses[0].code(), 1);
	}

	#[test]
	fn command_not_found_exits_127_and_spares_the_parent() {
		let statuses = run(&pipeline(&[&["msh-no-such-program"]])).unwrap();
		assert_eq!(statuses.len(), 1);
		assert_eq!(statuses[0].code(), 127);
	}

	#[test]
	fn pipe_carries_bytes_between_stages() {
		let out = temp_path("pipe-out");
		let mut p = pipeline(&[&["echo", "hello"], &["cat"]]);
		p.redirects.output = Some(out.clone());

		let statuses = run(&p).unwrap();
		assert_eq!(statuses.len(), 2);
		assert!(statuses.iter().all(|s| s.code() == 0));
		assert_eq!(fs::read_to_string(&out).unwrap(), "hello\n");
		fs::remove_file(&out).unwrap();
	}

	#[test]
	fn n_stages_yield_n_statuses_in_stage_order() {
		let out = temp_path("order-out");
		let mut p = pipeline(&[&["msh-no-such-program"], &["cat"], &["cat"]]);
		p.redirects.output = Some(out.clone());

		let statuses = run(&p).unwrap();
		assert_eq!(statuses.len(), 3);
		assert_eq!(statuses[0].code(), 127);
		assert_eq!(statuses[1].code(), 0);
		assert_eq!(statuses[2].code(), 0);
		fs::remove_file(&out).unwrap();
	}

	#[test]
	fn file_redirection_copies_byte_for_byte() {
		let infile = temp_path("redir-in");
		let outfile = temp_path("redir-out");
		fs::write(&infile, "one\ntwo\n").unwrap();

		let mut p = pipeline(&[&["cat"]]);
		p.redirects.input = Some(infile.clone());
		p.redirects.output = Some(outfile.clone());

		let statuses = run(&p).unwrap();
		assert_eq!(statuses[0].code(), 0);
		assert_eq!(fs::read_to_string(&outfile).unwrap(), "one\ntwo\n");
		fs::remove_file(&infile).unwrap();
		fs::remove_file(&outfile).unwrap();
	}

	#[test]
	fn unreadable_input_file_fails_only_that_stage() {
		let out = temp_path("badredir-out");
		let mut p = pipeline(&[&["cat"], &["cat"]]);
		p.redirects.input = Some(PathBuf::from("/msh-no-such-input"));
		p.redirects.output = Some(out.clone());

		let statuses = run(&p).unwrap();
		assert_eq!(statuses.len(), 2);
		assert_eq!(statuses[0].code(), 1);
		assert_eq!(statuses[1].code(), 0);
		fs::remove_file(&out).unwrap();
	}

	#[test]
	fn no_parent_fd_leak_across_pipelines() {
		fn open_fds() -> usize {
			fs::read_dir("/proc/self/fd").unwrap().count()
		}

		let out = temp_path("leak-out");
		run(&pipeline(&[&["true"]])).unwrap();
		let before = open_fds();
		for _ in 0..5 {
			let mut p = pipeline(&[&["echo", "x"], &["cat"], &["cat"]]);
			p.redirects.output = Some(out.clone());
			run(&p).unwrap();
		}
		let after = open_fds();
		fs::remove_file(&out).unwrap();
		// A leak compounds by four descriptors per run; a few transient
		// descriptors from concurrently running tests do not.
		assert!(after <= before + 3, "fd count grew from {} to {}", before, after);
	}
}
