use log::debug;
use nix::sys::signal::Signal;
use nix::unistd::Pid;

use crate::error::ShResult;
use crate::jobs::{JobState, JobStatus};
use crate::shellenv::Shell;

pub mod command;
pub mod dispatch;
pub mod redirect;
pub mod resolve;

/// Waits on a job that owns (or is about to own) the terminal.
///
/// Terminal ownership goes back to the shell no matter how the wait ends, so the prompt
/// can always read again.
pub fn handle_fg(shell: &mut Shell, pgid: Pid) -> ShResult<()> {
	if let Err(e) = shell.session().grant_foreground(pgid) {
		debug!("could not grant terminal to {}: {}",pgid,e);
	}
	let waited = shell.jobs_mut().wait_fg(pgid);
	let reclaimed = shell.session().reclaim_foreground();
	let job = waited?;
	reclaimed?;

	match job.state() {
		JobState::Done(status) => {
			if let JobStatus::Signaled(sig) = status {
				if !matches!(sig, Signal::SIGINT | Signal::SIGPIPE) {
					eprintln!("pgsh: {}: {}",job.cmd(),sig);
				}
			}
			shell.set_status(status.code());
		}
		JobState::Stopped(sig) => {
			shell.set_status(128 + sig as i32);
			if shell.session().is_interactive() {
				eprintln!();
			}
			shell.report_job(&job);
		}
		JobState::Running => {}
	}
	Ok(())
}
