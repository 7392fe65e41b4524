use std::io::{self, Write};

use nix::unistd::Pid;

use crate::error::{ShErr, ShResult};
use crate::execute::handle_fg;
use crate::jobs::{JobCmdFlags, JobID};
use crate::shellenv::Shell;

/// `fg` and `bg`. Without an argument they act on the current job.
pub fn continue_job(args: &[&str], shell: &mut Shell, fg: bool) -> ShResult<()> {
	let name = if fg { "fg" } else { "bg" };
	let id = match args.first() {
		Some(arg) => parse_job_id(arg)?,
		None => match shell.jobs().current() {
			Some(job) => JobID::TableID(job.table_id()),
			None => return Err(ShErr::builtin(name, "no current job"))
		}
	};
	let Some(job) = shell.jobs().query(id) else {
		return Err(ShErr::NoSuchJob(args.first().map(|arg| arg.to_string()).unwrap_or_else(|| id.to_string())))
	};
	if !fg && !job.is_stopped() {
		return Err(ShErr::builtin(name, format!("job {} already in background",job.table_id())))
	}

	let pgid = job.pgid();
	if fg {
		// Hand over the terminal before the job wakes up
		shell.session().grant_foreground(pgid)?;
	}
	let job = shell.jobs_mut().resume(id, !fg)?;

	if fg {
		eprintln!("{}",job.cmd());
		handle_fg(shell, pgid)
	} else {
		shell.report_job(&job);
		Ok(())
	}
}

pub fn jobs(args: &[&str], shell: &mut Shell) -> ShResult<()> {
	let mut flags = JobCmdFlags::empty();
	for arg in args {
		let Some(opts) = arg.strip_prefix('-') else {
			return Err(ShErr::builtin("jobs", format!("invalid argument: {}",arg)))
		};
		for ch in opts.chars() {
			flags |= match ch {
				'l' => JobCmdFlags::LONG,
				'p' => JobCmdFlags::PIDS,
				'r' => JobCmdFlags::RUNNING,
				's' => JobCmdFlags::STOPPED,
				_ => return Err(ShErr::builtin("jobs", format!("invalid flag: -{}",ch)))
			};
		}
	}

	let mut stdout = io::stdout();
	for line in shell.jobs().print_jobs(flags) {
		writeln!(stdout,"{}",line)?;
	}
	Ok(())
}

/// `%n` names a table id, a bare number names a process group.
pub fn parse_job_id(arg: &str) -> ShResult<JobID> {
	if let Some(id) = arg.strip_prefix('%') {
		return id.parse::<usize>()
			.map(JobID::TableID)
			.map_err(|_| ShErr::BadJobSpec(arg.into()))
	}
	match arg.parse::<i32>() {
		Ok(pgid) if pgid > 0 => Ok(JobID::Pgid(Pid::from_raw(pgid))),
		_ => Err(ShErr::BadJobSpec(arg.into()))
	}
}
