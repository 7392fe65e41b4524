use std::collections::BTreeMap;
use std::fmt::{self, Display};

use bitflags::bitflags;
use log::{debug, trace};
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use crate::error::{ShErr, ShResult};

bitflags! {
	#[derive(Debug,Clone,Copy,PartialEq,Eq)]
	pub struct JobCmdFlags: u32 {
		const LONG    = 0b0001; // -l
		const PIDS    = 0b0010; // -p
		const RUNNING = 0b0100; // -r
		const STOPPED = 0b1000; // -s
	}
}

/// How a finished job ended.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum JobStatus {
	Exited(i32),
	Signaled(Signal),
}

impl JobStatus {
	/// The status as a shell reports it, `128 + n` for a signal.
	pub fn code(&self) -> i32 {
		match self {
			JobStatus::Exited(code) => *code,
			JobStatus::Signaled(sig) => 128 + *sig as i32,
		}
	}
}

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum JobState {
	Running,
	Stopped(Signal),
	Done(JobStatus),
}

impl Display for JobState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			JobState::Running => write!(f,"Running"),
			JobState::Stopped(_) => write!(f,"Stopped"),
			JobState::Done(JobStatus::Exited(0)) => write!(f,"Done"),
			JobState::Done(JobStatus::Exited(code)) => write!(f,"Exit {}",code),
			JobState::Done(JobStatus::Signaled(sig)) => write!(f,"{}",sig),
		}
	}
}

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum JobID {
	TableID(usize),
	Pgid(Pid),
	Pid(Pid),
}

impl Display for JobID {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			JobID::TableID(id) => write!(f,"%{}",id),
			JobID::Pgid(pid) | JobID::Pid(pid) => write!(f,"{}",pid),
		}
	}
}

#[derive(Debug,Clone)]
pub struct Job {
	table_id: usize,
	pgid: Pid,
	pid: Pid,
	cmd: String,
	state: JobState,
	is_background: bool,
}

impl Job {
	pub fn table_id(&self) -> usize {
		self.table_id
	}
	pub fn pgid(&self) -> Pid {
		self.pgid
	}
	pub fn pid(&self) -> Pid {
		self.pid
	}
	pub fn cmd(&self) -> &str {
		&self.cmd
	}
	pub fn state(&self) -> JobState {
		self.state
	}
	pub fn is_background(&self) -> bool {
		self.is_background
	}
	pub fn is_done(&self) -> bool {
		matches!(self.state, JobState::Done(_))
	}
	pub fn is_stopped(&self) -> bool {
		matches!(self.state, JobState::Stopped(_))
	}
	pub fn killpg(&self, sig: Signal) -> ShResult<()> {
		killpg(self.pgid, sig)?;
		Ok(())
	}

	/// One line of `jobs` output, e.g. `[1]+  Running    sleep 10 &`
	pub fn display(&self, current: bool, flags: JobCmdFlags) -> String {
		if flags.contains(JobCmdFlags::PIDS) {
			return self.pgid.to_string()
		}
		let marker = if current { '+' } else { '-' };
		let pid = if flags.contains(JobCmdFlags::LONG) {
			format!("{} ",self.pid)
		} else {
			String::new()
		};
		let amp = if self.state == JobState::Running && self.is_background { " &" } else { "" };
		format!("[{}]{}  {}{:<10} {}{}",self.table_id,marker,pid,self.state.to_string(),self.cmd,amp)
	}
}

#[derive(Default)]
pub struct JobBuilder {
	pgid: Option<Pid>,
	pid: Option<Pid>,
	cmd: String,
	is_background: bool,
}

impl JobBuilder {
	pub fn new() -> Self {
		Self::default()
	}
	pub fn with_pgid(self, pgid: Pid) -> Self {
		Self { pgid: Some(pgid), ..self }
	}
	pub fn with_pid(self, pid: Pid) -> Self {
		Self { pid: Some(pid), ..self }
	}
	pub fn with_cmd(self, cmd: impl Into<String>) -> Self {
		Self { cmd: cmd.into(), ..self }
	}
	pub fn background(self, is_background: bool) -> Self {
		Self { is_background, ..self }
	}
	/// The table id is assigned on insertion. A job without an explicit pgid leads its own group.
	pub fn build(self) -> Job {
		let pid = self.pid.unwrap_or(Pid::from_raw(0));
		Job {
			table_id: 0,
			pgid: self.pgid.unwrap_or(pid),
			pid,
			cmd: self.cmd,
			state: JobState::Running,
			is_background: self.is_background,
		}
	}
}

/// The wait primitive behind the job table.
pub trait WaitSource {
	fn wait(&mut self, pid: Option<Pid>, flags: Option<WaitPidFlag>) -> nix::Result<WaitStatus>;
}

pub struct SysWait;

impl WaitSource for SysWait {
	fn wait(&mut self, pid: Option<Pid>, flags: Option<WaitPidFlag>) -> nix::Result<WaitStatus> {
		waitpid(pid, flags)
	}
}

/// Process groups the shell has spawned and not yet reaped.
///
/// Job states change only in `observe()`, and only in response to a status reported by
/// the wait primitive.
pub struct JobTable<W: WaitSource = SysWait> {
	jobs: BTreeMap<usize, Job>,
	order: Vec<usize>,
	source: W,
}

impl Default for JobTable<SysWait> {
	fn default() -> Self {
		Self::new()
	}
}

impl JobTable<SysWait> {
	pub fn new() -> Self {
		Self::with_source(SysWait)
	}
}

impl<W: WaitSource> JobTable<W> {
	pub fn with_source(source: W) -> Self {
		Self { jobs: BTreeMap::new(), order: vec![], source }
	}

	pub fn is_empty(&self) -> bool {
		self.jobs.is_empty()
	}

	pub fn len(&self) -> usize {
		self.jobs.len()
	}

	pub fn jobs(&self) -> impl Iterator<Item = &Job> {
		self.jobs.values()
	}

	/// Registers a job under the lowest free table id and returns that id.
	pub fn insert(&mut self, mut job: Job) -> usize {
		let mut id = 1;
		while self.jobs.contains_key(&id) {
			id += 1;
		}
		job.table_id = id;
		debug!("new job [{}] pgid {} `{}'",id,job.pgid,job.cmd);
		self.jobs.insert(id, job);
		self.order.push(id);
		id
	}

	pub fn query(&self, id: JobID) -> Option<&Job> {
		self.jobs.values().find(|job| Self::matches(job, &id))
	}

	pub fn query_mut(&mut self, id: JobID) -> Option<&mut Job> {
		self.jobs.values_mut().find(|job| Self::matches(job, &id))
	}

	fn matches(job: &Job, id: &JobID) -> bool {
		match id {
			JobID::TableID(table_id) => job.table_id == *table_id,
			JobID::Pgid(pgid) => job.pgid == *pgid,
			JobID::Pid(pid) => job.pid == *pid,
		}
	}

	pub fn remove(&mut self, id: JobID) -> Option<Job> {
		let table_id = self.query(id)?.table_id;
		self.order.retain(|entry| *entry != table_id);
		self.jobs.remove(&table_id)
	}

	/// The most recently registered job, the default target of `fg` and `bg`.
	pub fn current(&self) -> Option<&Job> {
		self.order.last().and_then(|id| self.jobs.get(id))
	}

	/// Feeds one wait status into the table. Returns a snapshot of the job it touched;
	/// a job that reached `Done` is removed from the table before it is returned.
	pub fn observe(&mut self, status: WaitStatus) -> Option<Job> {
		let (pid, state) = match status {
			WaitStatus::Exited(pid, code) => (pid, JobState::Done(JobStatus::Exited(code))),
			WaitStatus::Signaled(pid, sig, _) => (pid, JobState::Done(JobStatus::Signaled(sig))),
			WaitStatus::Stopped(pid, sig) => (pid, JobState::Stopped(sig)),
			WaitStatus::Continued(pid) => (pid, JobState::Running),
			_ => return None
		};
		let Some(job) = self.query_mut(JobID::Pid(pid)) else {
			trace!("ignoring status for unknown child {}: {:?}",pid,status);
			return None
		};
		debug!("job [{}] {} -> {:?}",job.table_id,job.state,state);
		job.state = state;
		if job.is_done() {
			self.remove(JobID::Pid(pid))
		} else {
			Some(job.clone())
		}
	}

	/// Blocks until the process group `pgid` exits, is killed, or stops.
	pub fn wait_fg(&mut self, pgid: Pid) -> ShResult<Job> {
		let group = Pid::from_raw(-pgid.as_raw());
		loop {
			match self.source.wait(Some(group), Some(WaitPidFlag::WUNTRACED)) {
				Ok(status) => {
					if let Some(job) = self.observe(status) {
						if job.pgid == pgid && job.state != JobState::Running {
							return Ok(job)
						}
					}
				}
				Err(Errno::EINTR) => continue,
				Err(e) => {
					// Nothing left to wait on in that group, so the job cannot be tracked anymore
					self.remove(JobID::Pgid(pgid));
					return Err(ShErr::WaitFailure(e))
				}
			}
		}
	}

	/// Blocks until any tracked job finishes or stops and returns it.
	/// `Ok(None)` means there are no children left to wait for.
	fn next_change(&mut self) -> ShResult<Option<Job>> {
		loop {
			match self.source.wait(None, Some(WaitPidFlag::WUNTRACED)) {
				Ok(status) => {
					if let Some(job) = self.observe(status) {
						if job.state != JobState::Running {
							return Ok(Some(job))
						}
					}
				}
				Err(Errno::ECHILD) => return Ok(None),
				Err(Errno::EINTR) => continue,
				Err(e) => return Err(ShErr::WaitFailure(e))
			}
		}
	}

	/// Blocks until any child terminates and returns its job. Jobs that stop on the way
	/// are recorded as stopped and waiting goes on.
	/// `Ok(None)` means there are no children left to wait for.
	pub fn reap_one(&mut self) -> ShResult<Option<Job>> {
		while let Some(job) = self.next_change()? {
			if job.is_done() {
				return Ok(Some(job))
			}
		}
		Ok(None)
	}

	/// Reaps children until none are left. Stopped jobs cannot finish on their own,
	/// so waiting ends once they are the only ones left.
	pub fn wait_all(&mut self) -> ShResult<Vec<Job>> {
		let mut finished = vec![];
		loop {
			if !self.jobs.is_empty() && self.jobs.values().all(|job| job.is_stopped()) {
				debug!("only stopped jobs remain, done waiting");
				break
			}
			match self.next_change()? {
				Some(job) if job.is_done() => finished.push(job),
				Some(job) => debug!("job [{}] stopped while waiting",job.table_id),
				None => break
			}
		}
		Ok(finished)
	}

	/// Polls for state changes without blocking. Returns every job that finished or
	/// stopped; finished ones are no longer in the table.
	pub fn reap_all_nonblocking(&mut self) -> ShResult<Vec<Job>> {
		let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
		let mut changed = vec![];
		loop {
			match self.source.wait(None, Some(flags)) {
				Ok(WaitStatus::StillAlive) => break,
				Ok(status) => {
					if let Some(job) = self.observe(status) {
						if job.state != JobState::Running {
							changed.push(job);
						}
					}
				}
				Err(Errno::ECHILD) => break,
				Err(Errno::EINTR) => continue,
				Err(e) => return Err(ShErr::WaitFailure(e))
			}
		}
		Ok(changed)
	}

	/// Sends SIGCONT to a job and marks it running. The job becomes the current one.
	pub fn resume(&mut self, id: JobID, background: bool) -> ShResult<Job> {
		let Some(job) = self.query_mut(id) else {
			return Err(ShErr::NoSuchJob(id.to_string()))
		};
		let table_id = job.table_id;
		job.killpg(Signal::SIGCONT)?;
		job.state = JobState::Running;
		job.is_background = background;
		let job = job.clone();
		self.order.retain(|entry| *entry != table_id);
		self.order.push(table_id);
		Ok(job)
	}

	pub fn print_jobs(&self, flags: JobCmdFlags) -> Vec<String> {
		let current = self.current().map(|job| job.table_id);
		self.jobs.values()
			.filter(|job| {
				if flags.contains(JobCmdFlags::RUNNING) && job.state != JobState::Running {
					return false
				}
				if flags.contains(JobCmdFlags::STOPPED) && !job.is_stopped() {
					return false
				}
				true
			})
			.map(|job| job.display(current == Some(job.table_id), flags))
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use std::collections::VecDeque;

	use super::*;

	/// Hands out scripted wait results and records the requests it saw.
	struct ScriptedWait {
		script: VecDeque<nix::Result<WaitStatus>>,
		calls: Vec<(Option<Pid>, Option<WaitPidFlag>)>,
	}

	impl ScriptedWait {
		fn new(script: Vec<nix::Result<WaitStatus>>) -> Self {
			Self { script: script.into(), calls: vec![] }
		}
	}

	impl WaitSource for ScriptedWait {
		fn wait(&mut self, pid: Option<Pid>, flags: Option<WaitPidFlag>) -> nix::Result<WaitStatus> {
			self.calls.push((pid, flags));
			self.script.pop_front().unwrap_or(Err(Errno::ECHILD))
		}
	}

	fn pid(n: i32) -> Pid {
		Pid::from_raw(n)
	}

	fn job(n: i32, cmd: &str, background: bool) -> Job {
		JobBuilder::new().with_pid(pid(n)).with_pgid(pid(n)).with_cmd(cmd).background(background).build()
	}

	#[test]
	fn insert_uses_lowest_free_id() {
		let mut table = JobTable::with_source(ScriptedWait::new(vec![]));
		assert_eq!(table.insert(job(100, "a", true)), 1);
		assert_eq!(table.insert(job(200, "b", true)), 2);
		table.remove(JobID::TableID(1));
		assert_eq!(table.insert(job(300, "c", true)), 1);
		assert_eq!(table.current().unwrap().cmd(), "c");
		assert_eq!(table.len(), 2);
	}

	#[test]
	fn foreground_exit_removes_job() {
		let script = vec![Ok(WaitStatus::Exited(pid(100), 3))];
		let mut table = JobTable::with_source(ScriptedWait::new(script));
		table.insert(job(100, "false", false));

		let done = table.wait_fg(pid(100)).unwrap();
		assert_eq!(done.state(), JobState::Done(JobStatus::Exited(3)));
		assert!(table.is_empty());
		assert_eq!(table.source.calls, vec![(Some(pid(-100)), Some(WaitPidFlag::WUNTRACED))]);
	}

	#[test]
	fn foreground_stop_keeps_job() {
		let script = vec![Ok(WaitStatus::Stopped(pid(100), Signal::SIGTSTP))];
		let mut table = JobTable::with_source(ScriptedWait::new(script));
		table.insert(job(100, "vi", false));

		let stopped = table.wait_fg(pid(100)).unwrap();
		assert_eq!(stopped.state(), JobState::Stopped(Signal::SIGTSTP));
		assert!(table.query(JobID::Pgid(pid(100))).unwrap().is_stopped());
	}

	#[test]
	fn foreground_interrupt_reports_signal() {
		let script = vec![
			Err(Errno::EINTR),
			Ok(WaitStatus::Signaled(pid(100), Signal::SIGINT, false)),
		];
		let mut table = JobTable::with_source(ScriptedWait::new(script));
		table.insert(job(100, "sleep 100", false));

		let done = table.wait_fg(pid(100)).unwrap();
		assert_eq!(done.state(), JobState::Done(JobStatus::Signaled(Signal::SIGINT)));
		assert_eq!(JobStatus::Signaled(Signal::SIGINT).code(), 130);
	}

	#[test]
	fn foreground_wait_failure_drops_job() {
		let mut table = JobTable::with_source(ScriptedWait::new(vec![]));
		table.insert(job(100, "gone", false));
		assert!(matches!(table.wait_fg(pid(100)), Err(ShErr::WaitFailure(Errno::ECHILD))));
		assert!(table.is_empty());
	}

	#[test]
	fn reap_one_skips_unknown_children() {
		let script = vec![
			Ok(WaitStatus::Exited(pid(999), 0)),
			Ok(WaitStatus::Exited(pid(100), 0)),
		];
		let mut table = JobTable::with_source(ScriptedWait::new(script));
		table.insert(job(100, "sleep 1", true));

		let reaped = table.reap_one().unwrap().unwrap();
		assert_eq!(reaped.pid(), pid(100));
		assert_eq!(table.reap_one().unwrap().map(|job| job.pid()), None);
	}

	#[test]
	fn wait_all_drains_table() {
		let script = vec![
			Ok(WaitStatus::Exited(pid(200), 0)),
			Ok(WaitStatus::Signaled(pid(100), Signal::SIGKILL, false)),
		];
		let mut table = JobTable::with_source(ScriptedWait::new(script));
		table.insert(job(100, "a", true));
		table.insert(job(200, "b", true));

		let finished = table.wait_all().unwrap();
		assert_eq!(finished.len(), 2);
		assert!(table.is_empty());
	}

	#[test]
	fn wait_all_stops_at_stopped_jobs() {
		let mut table = JobTable::with_source(ScriptedWait::new(vec![]));
		table.insert(job(100, "vi", false));
		table.observe(WaitStatus::Stopped(pid(100), Signal::SIGTSTP));

		assert!(table.wait_all().unwrap().is_empty());
		assert!(table.source.calls.is_empty());
		assert_eq!(table.len(), 1);
	}

	#[test]
	fn wait_all_ends_when_remaining_job_stops() {
		let script = vec![Ok(WaitStatus::Stopped(pid(100), Signal::SIGSTOP))];
		let mut table = JobTable::with_source(ScriptedWait::new(script));
		table.insert(job(100, "./stopper", true));

		assert!(table.wait_all().unwrap().is_empty());
		assert!(table.query(JobID::Pid(pid(100))).unwrap().is_stopped());
		assert_eq!(table.source.calls, vec![(None, Some(WaitPidFlag::WUNTRACED))]);
	}

	#[test]
	fn wait_all_keeps_waiting_past_a_stop() {
		let script = vec![
			Ok(WaitStatus::Stopped(pid(100), Signal::SIGTSTP)),
			Ok(WaitStatus::Exited(pid(200), 0)),
		];
		let mut table = JobTable::with_source(ScriptedWait::new(script));
		table.insert(job(100, "a", true));
		table.insert(job(200, "b", true));

		let finished = table.wait_all().unwrap();
		assert_eq!(finished.len(), 1);
		assert_eq!(finished[0].pid(), pid(200));
		assert_eq!(table.len(), 1);
		assert_eq!(table.source.calls.len(), 2);
	}

	#[test]
	fn reap_one_records_stops() {
		let script = vec![
			Ok(WaitStatus::Stopped(pid(100), Signal::SIGTSTP)),
			Ok(WaitStatus::Exited(pid(200), 0)),
		];
		let mut table = JobTable::with_source(ScriptedWait::new(script));
		table.insert(job(100, "a", true));
		table.insert(job(200, "b", true));

		assert_eq!(table.reap_one().unwrap().map(|job| job.pid()), Some(pid(200)));
		assert!(table.query(JobID::Pid(pid(100))).unwrap().is_stopped());
	}

	#[test]
	fn wait_failure_is_reported() {
		let mut table = JobTable::with_source(ScriptedWait::new(vec![Err(Errno::EINVAL)]));
		assert!(matches!(table.reap_one(), Err(ShErr::WaitFailure(Errno::EINVAL))));
	}

	#[test]
	fn nonblocking_reap_collects_changes() {
		let script = vec![
			Ok(WaitStatus::Exited(pid(100), 0)),
			Ok(WaitStatus::Stopped(pid(200), Signal::SIGTTIN)),
			Ok(WaitStatus::StillAlive),
		];
		let mut table = JobTable::with_source(ScriptedWait::new(script));
		table.insert(job(100, "a", true));
		table.insert(job(200, "b", true));
		table.insert(job(300, "c", true));

		let changed = table.reap_all_nonblocking().unwrap();
		assert_eq!(changed.len(), 2);
		assert!(changed[0].is_done());
		assert!(changed[1].is_stopped());
		assert_eq!(table.len(), 2);
		assert_eq!(table.query(JobID::Pid(pid(300))).unwrap().state(), JobState::Running);
	}

	#[test]
	fn continued_job_runs_again() {
		let mut table = JobTable::with_source(ScriptedWait::new(vec![]));
		table.insert(job(100, "vi", true));
		table.observe(WaitStatus::Stopped(pid(100), Signal::SIGTSTP));
		let job = table.observe(WaitStatus::Continued(pid(100))).unwrap();
		assert_eq!(job.state(), JobState::Running);
	}

	#[test]
	fn job_listing() {
		let mut table = JobTable::with_source(ScriptedWait::new(vec![]));
		table.insert(job(100, "sleep 10", true));
		table.insert(job(200, "vi notes", false));
		table.observe(WaitStatus::Stopped(pid(200), Signal::SIGTSTP));

		let lines = table.print_jobs(JobCmdFlags::empty());
		assert_eq!(lines, vec![
			"[1]-  Running    sleep 10 &",
			"[2]+  Stopped    vi notes",
		]);
		assert_eq!(table.print_jobs(JobCmdFlags::PIDS), vec!["100", "200"]);
		assert_eq!(table.print_jobs(JobCmdFlags::STOPPED).len(), 1);
		assert_eq!(table.print_jobs(JobCmdFlags::LONG)[0], "[1]-  100 Running    sleep 10 &");
	}
}
