use std::io::{self, IsTerminal, Write};
use std::os::fd::{BorrowedFd, RawFd};

use libc::STDIN_FILENO;
use log::{debug, trace, warn};
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::sys::termios::{tcgetattr, tcsetattr, SetArg, Termios};
use nix::unistd::{getpgrp, getpid, setpgid, tcgetpgrp, tcsetpgrp, Pid};

use crate::error::ShResult;
use crate::jobs::{Job, JobCmdFlags, JobState, JobTable};
use crate::shopt::ShOpts;
use crate::signal::{ChildNotifier, Dispositions};

/// Process-wide terminal and process-group state, built once at startup.
///
/// When the shell is not interactive every terminal operation is a no-op.
#[derive(Debug)]
pub struct Session {
	interactive: bool,
	tty: RawFd,
	saved_tmodes: Option<Termios>,
	shell_pgid: Pid,
}

impl Session {
	/// Takes control of the terminal on standard input, if there is one.
	///
	/// While the shell's group is not the terminal's foreground group it stops itself with
	/// SIGTTIN and tries again once continued. Anything that goes wrong after the terminal
	/// check degrades the session to non-interactive instead of failing.
	pub fn init() -> Self {
		let mut session = Self::non_interactive();
		if !io::stdin().is_terminal() {
			debug!("standard input is not a terminal, running non-interactively");
			return session
		}
		match session.acquire_terminal() {
			Ok(()) => session.interactive = true,
			Err(e) => warn!("could not take control of the terminal, running non-interactively: {}",e)
		}
		session
	}

	pub fn non_interactive() -> Self {
		Self {
			interactive: false,
			tty: STDIN_FILENO,
			saved_tmodes: None,
			shell_pgid: getpgrp(),
		}
	}

	fn acquire_terminal(&mut self) -> ShResult<()> {
		loop {
			let pgrp = getpgrp();
			if tcgetpgrp(self.tty())? == pgrp {
				break
			}
			trace!("pgrp {} is not in the foreground, stopping",pgrp);
			killpg(pgrp, Signal::SIGTTIN)?;
		}

		Dispositions::SHELL.apply()?;

		let pid = getpid();
		match setpgid(pid, pid) {
			// A session leader already leads its group and may not move
			Ok(()) | Err(Errno::EPERM) => {}
			Err(e) => return Err(e.into())
		}
		self.shell_pgid = getpgrp();
		tcsetpgrp(self.tty(), self.shell_pgid)?;
		self.saved_tmodes = Some(tcgetattr(self.tty())?);
		debug!("shell pgid {} owns the terminal",self.shell_pgid);
		Ok(())
	}

	fn tty(&self) -> BorrowedFd<'_> {
		// SAFETY: the terminal descriptor is standard input, open for the life of the process
		unsafe { BorrowedFd::borrow_raw(self.tty) }
	}

	pub fn is_interactive(&self) -> bool {
		self.interactive
	}

	pub fn grant_foreground(&self, pgid: Pid) -> ShResult<()> {
		if !self.interactive {
			return Ok(())
		}
		trace!("granting terminal to pgid {}",pgid);
		tcsetpgrp(self.tty(), pgid)?;
		Ok(())
	}

	/// Hands the terminal back to the shell's group and restores the saved terminal mode.
	pub fn reclaim_foreground(&self) -> ShResult<()> {
		self.grant_foreground(self.shell_pgid)?;
		self.restore_tmodes()
	}

	pub fn restore_tmodes(&self) -> ShResult<()> {
		if let (true, Some(tmodes)) = (self.interactive, &self.saved_tmodes) {
			tcsetattr(self.tty(), SetArg::TCSADRAIN, tmodes)?;
		}
		Ok(())
	}
}

/// Everything the interpreter loop carries from one line to the next.
pub struct Shell {
	session: Session,
	jobs: JobTable,
	opts: ShOpts,
	notifier: ChildNotifier,
	line_num: usize,
	status: i32,
}

impl Shell {
	pub fn new(session: Session, opts: ShOpts, notifier: ChildNotifier) -> Self {
		Self {
			session,
			jobs: JobTable::new(),
			opts,
			notifier,
			line_num: 0,
			status: 0,
		}
	}

	pub fn session(&self) -> &Session {
		&self.session
	}

	pub fn jobs(&self) -> &JobTable {
		&self.jobs
	}

	pub fn jobs_mut(&mut self) -> &mut JobTable {
		&mut self.jobs
	}

	pub fn opts(&self) -> &ShOpts {
		&self.opts
	}

	pub fn opts_mut(&mut self) -> &mut ShOpts {
		&mut self.opts
	}

	/// Status of the last line: the job's exit code, 128+signal, or 0/1 for built-ins.
	/// Becomes the shell's exit code at end of input.
	pub fn status(&self) -> i32 {
		self.status
	}

	pub fn set_status(&mut self, status: i32) {
		self.status = status;
	}

	pub fn line_num(&self) -> usize {
		self.line_num
	}

	pub fn next_line(&mut self) {
		self.line_num += 1;
	}

	pub fn prompt(&self) -> io::Result<()> {
		if self.session.is_interactive() && self.opts.prompt.enabled {
			let mut stdout = io::stdout();
			write!(stdout,"{}: ",self.line_num)?;
			stdout.flush()?;
		}
		Ok(())
	}

	/// Whether job state changes should be announced on stderr.
	pub fn notify_enabled(&self) -> bool {
		self.session.is_interactive() && self.opts.core.notify
	}

	pub fn report_job(&self, job: &Job) {
		if !self.notify_enabled() {
			return
		}
		let current = self.jobs.current().map(|cur| cur.table_id()) == Some(job.table_id());
		eprintln!("{}",job.display(current || job.is_done(), JobCmdFlags::empty()));
	}

	/// Reaps whatever changed since the last prompt, if SIGCHLD said anything did.
	pub fn poll_jobs(&mut self) {
		if !self.notifier.take() {
			return
		}
		match self.jobs.reap_all_nonblocking() {
			Ok(changed) => {
				for job in changed.iter().filter(|job| job.is_background() || job.is_stopped()) {
					self.report_job(job);
				}
			}
			Err(e) => debug!("background reap failed: {}",e)
		}
	}

	/// Restores the terminal and hangs up stopped jobs, which would otherwise stay
	/// stopped forever once their shell is gone. Returns the exit code.
	pub fn shutdown(&mut self, code: i32) -> i32 {
		for job in self.jobs.jobs().filter(|job| job.state() != JobState::Running) {
			debug!("hanging up stopped job [{}]",job.table_id());
			let _ = job.killpg(Signal::SIGHUP);
			let _ = job.killpg(Signal::SIGCONT);
		}
		if let Err(e) = self.session.restore_tmodes() {
			warn!("could not restore terminal mode: {}",e);
		}
		code
	}
}
