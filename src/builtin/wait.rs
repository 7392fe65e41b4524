use crate::error::ShResult;
use crate::shellenv::Shell;

/// Blocks until every background job has finished. Stopped jobs are left in the table.
pub fn execute(shell: &mut Shell) -> ShResult<()> {
	let finished = shell.jobs_mut().wait_all()?;
	for job in &finished {
		shell.report_job(job);
	}
	Ok(())
}
