use std::io::BufRead;

use log::{debug, error, trace};

use crate::error::ShErr;
use crate::execute::dispatch::exec_input;
use crate::shellenv::Shell;

/// The read-eval loop. Returns the code the shell should exit with: 0 for `exit`,
/// the status of the last line at end of input.
///
/// Only `exit` and end of input leave the loop. Every other error is reported and
/// the next line is read.
pub fn listen<R: BufRead>(shell: &mut Shell, mut input: R) -> i32 {
	let mut buf = Vec::new();
	loop {
		shell.poll_jobs();
		if let Err(e) = shell.prompt() {
			debug!("could not write prompt: {}",e);
		}

		buf.clear();
		match input.read_until(b'\n', &mut buf) {
			Ok(0) => {
				let status = shell.status();
				debug!("end of input, last status {}",status);
				return shell.shutdown(status)
			}
			Ok(_) => {}
			Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
			Err(e) => {
				error!("could not read input: {}",e);
				return shell.shutdown(1)
			}
		}
		let line = String::from_utf8_lossy(&buf);
		trace!("line {}: {:?}",shell.line_num(),line);

		match exec_input(&line, shell) {
			Ok(()) => {}
			Err(ShErr::CleanExit(code)) => return shell.shutdown(code),
			Err(e) => {
				eprintln!("pgsh: {}",e);
				shell.set_status(1);
			}
		}
		shell.next_line();
	}
}
