use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::trace;
use nix::sys::signal::{signal, SigHandler, Signal};

use crate::error::ShResult;

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum Disposition {
	Default,
	Ignored,
}

impl Disposition {
	fn handler(self) -> SigHandler {
		match self {
			Disposition::Default => SigHandler::SigDfl,
			Disposition::Ignored => SigHandler::SigIgn,
		}
	}
}

/// A fixed set of signal dispositions, applied as a whole at a fork boundary.
///
/// The shell lives in `SHELL`. A freshly forked child moves to `CHILD_SETUP` before it
/// touches the terminal, and to `CHILD_EXEC` right before the exec attempts, so the new
/// program starts with default job-control behavior.
#[derive(Debug)]
pub struct Dispositions {
	table: &'static [(Signal, Disposition)],
}

impl Dispositions {
	pub const SHELL: Self = Self {
		table: &[
			(Signal::SIGINT, Disposition::Ignored),
			(Signal::SIGQUIT, Disposition::Ignored),
			(Signal::SIGTSTP, Disposition::Ignored),
			(Signal::SIGTTIN, Disposition::Ignored),
			(Signal::SIGTTOU, Disposition::Ignored),
		]
	};

	pub const CHILD_SETUP: Self = Self {
		table: &[
			(Signal::SIGINT, Disposition::Default),
			(Signal::SIGQUIT, Disposition::Default),
			(Signal::SIGTSTP, Disposition::Default),
			(Signal::SIGTTIN, Disposition::Ignored),
			(Signal::SIGTTOU, Disposition::Ignored),
		]
	};

	pub const CHILD_EXEC: Self = Self {
		table: &[
			(Signal::SIGTTIN, Disposition::Default),
			(Signal::SIGTTOU, Disposition::Default),
			// Ignored by the Rust runtime at startup, and an ignored disposition survives exec
			(Signal::SIGPIPE, Disposition::Default),
		]
	};

	pub fn apply(&self) -> ShResult<()> {
		for (sig, disposition) in self.table {
			// SAFETY: only SigDfl and SigIgn are installed, no handler code runs
			unsafe { signal(*sig, disposition.handler()) }?;
		}
		Ok(())
	}
}

/// Raised whenever a child changes state. The loop polls the job table only when it is set.
#[derive(Debug,Clone)]
pub struct ChildNotifier {
	flag: Arc<AtomicBool>,
}

impl ChildNotifier {
	pub fn register() -> ShResult<Self> {
		let flag = Arc::new(AtomicBool::new(false));
		signal_hook::flag::register(signal_hook::consts::SIGCHLD, Arc::clone(&flag))?;
		trace!("registered SIGCHLD flag");
		Ok(Self { flag })
	}

	/// A notifier with no handler behind it, raised by hand.
	pub fn detached() -> Self {
		Self { flag: Arc::new(AtomicBool::new(false)) }
	}

	pub fn raise(&self) {
		self.flag.store(true, Ordering::Release);
	}

	/// Returns whether the flag was raised, and lowers it.
	pub fn take(&self) -> bool {
		self.flag.swap(false, Ordering::AcqRel)
	}
}
