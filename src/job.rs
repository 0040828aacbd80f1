use std::io::{self, Write};

use nix::sys::wait::{self, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};

/// One spawned stage: its pid, and its wait status once reaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessHandle {
	pub pid: Pid,
	pub status: WaitStatus,
}

/// The processes backing one pipeline, recorded in stage order so that
/// partial-failure accounting is a property of this collection rather
/// than of implicit OS state.
#[derive(Debug)]
pub struct PipelineJob {
	handles: Vec<ProcessHandle>,
}

impl PipelineJob {
	pub fn new(size_hint: usize) -> PipelineJob {
		PipelineJob { handles: Vec::with_capacity(size_hint) }
	}

	/// Forks and, on the parent side, records the child's handle.
	pub fn push_fork(&mut self) -> nix::Result<ForkResult> {
		// fork is unsafe since the child of a multithreaded process may
		// only run async-signal-safe code; our children go straight to
		// dup2/open/execvp/_exit.
		let r = unsafe { unistd::fork() }?;
		if let ForkResult::Parent { child } = r {
			self.handles.push(ProcessHandle { pid: child, status: WaitStatus::StillAlive });
		}
		Ok(r)
	}

	/// Reaps every recorded child, in stage order, with no early abort:
	/// a failed stage never leaves its siblings unwaited.
	pub fn wait_all(mut self) -> Vec<WaitStatus> {
		for handle in &mut self.handles {
			match wait::waitpid(handle.pid, None) {
				Ok(status) => handle.status = status,
				Err(e) => {
					let _ = writeln!(io::stderr(), "wait on {}: {}", handle.pid, e);
				}
			}
		}
		self.handles.into_iter().map(|handle| handle.status).collect()
	}
}

pub trait WaitStatusExt {
	fn code(self) -> i32;
}

impl WaitStatusExt for WaitStatus {
	fn code(self) -> i32 {
		match self {
			WaitStatus::Exited(_, code) => code,
			WaitStatus::Signaled(_, signal, _) => 128 + signal as i32,
			_ => 0,
		}
	}
}
