use std::io::{self, Write};

use log::{debug, trace};
use nix::errno::Errno;
use nix::unistd::{fork, getpid, setpgid, ForkResult, Pid};

use crate::error::{ShErr, ShResult};
use crate::interp::parse::CmdDesc;
use crate::jobs::JobBuilder;
use crate::shellenv::{Session, Shell};
use crate::signal::Dispositions;

use super::redirect::CmdRedirs;
use super::resolve;

/// Runs one external command as its own job.
///
/// Everything the child needs (argv, candidate paths, redirections) is prepared before
/// the fork. Failures inside the child are reported by the child and end it; they never
/// come back here.
pub fn exec_cmd(desc: CmdDesc, shell: &mut Shell) -> ShResult<()> {
	let argv = resolve::prepare_argv(&desc.argv)?;
	let paths = resolve::exec_paths(desc.name());
	let redirs = CmdRedirs::new(&desc);

	io::stdout().flush()?;
	io::stderr().flush()?;

	// SAFETY: the shell is single-threaded, the child only applies signal dispositions,
	// adjusts descriptors and process groups, and then execs or exits
	match unsafe { fork() } {
		Ok(ForkResult::Child) => {
			let err = match setup_child(&desc, &redirs, shell.session()) {
				Ok(()) => resolve::exec_candidates(desc.name(), &paths, &argv),
				Err(e) => e
			};
			eprintln!("pgsh: {}",err);
			// SAFETY: ends the forked child without running the parent's exit handlers
			unsafe { libc::_exit(err.child_status()) }
		}
		Ok(ForkResult::Parent { child }) => handle_parent_process(child, desc, shell),
		Err(e) => Err(ShErr::ForkFailure(e))
	}
}

/// Child side, strictly in this order: dispositions, own process group, terminal
/// (foreground jobs only), redirections, default job-control signals for the new program.
fn setup_child(desc: &CmdDesc, redirs: &CmdRedirs, session: &Session) -> ShResult<()> {
	Dispositions::CHILD_SETUP.apply()?;
	let pid = getpid();
	setpgid(pid, pid)?;
	if !desc.background {
		// The parent grants the terminal too, whichever runs first wins
		if let Err(e) = session.grant_foreground(pid) {
			debug!("child {} could not take the terminal: {}",pid,e);
		}
	}
	redirs.activate()?;
	Dispositions::CHILD_EXEC.apply()
}

fn handle_parent_process(child: Pid, desc: CmdDesc, shell: &mut Shell) -> ShResult<()> {
	Dispositions::SHELL.apply()?;
	match setpgid(child, child) {
		// EACCES: the child already exec'd, ESRCH: it already exited. Either way it set its own group.
		Ok(()) | Err(Errno::EACCES) | Err(Errno::ESRCH) => {}
		Err(e) => debug!("setpgid({}) failed: {}",child,e)
	}

	let job = JobBuilder::new()
		.with_pid(child)
		.with_pgid(child)
		.with_cmd(desc.display())
		.background(desc.background)
		.build();
	let table_id = shell.jobs_mut().insert(job);
	trace!("forked `{}' as pid {}",desc.display(),child);

	if desc.background {
		if shell.notify_enabled() {
			eprintln!("[{}] {}",table_id,child);
		}
		shell.set_status(0);
		return Ok(())
	}

	super::handle_fg(shell, child)
}
