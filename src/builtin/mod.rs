use crate::error::{ShErr, ShResult};
use crate::shellenv::Shell;

pub mod cd;
pub mod job;
pub mod opts;
pub mod pwd;
pub mod wait;

/// Built-in names with their one-line help text, in `help` order.
pub const BUILTINS: [(&str, &str); 11] = [
	("?", "print this help"),
	("help", "print this help"),
	("exit", "exit the shell"),
	("cd", "change the working directory (default $HOME)"),
	("pwd", "print the working directory"),
	("wait", "wait for all background jobs to finish"),
	("jobs", "list jobs [-l] [-p] [-r] [-s]"),
	("fg", "continue a job in the foreground [%id|pgid]"),
	("bg", "continue a stopped job in the background [%id|pgid]"),
	("setopt", "set a shell option: setopt key value"),
	("getopt", "print a shell option: getopt key"),
];

pub fn is_builtin(name: &str) -> bool {
	BUILTINS.iter().any(|(builtin, _)| *builtin == name)
}

/// Runs a built-in in the shell process itself. `argv[0]` is the built-in's name.
///
/// Built-ins see the raw tokens: redirection operators are passed through as plain
/// arguments, nothing is opened.
pub fn exec_builtin<S: AsRef<str>>(argv: &[S], shell: &mut Shell) -> ShResult<()> {
	let argv: Vec<&str> = argv.iter().map(|arg| arg.as_ref()).collect();
	let Some((name, args)) = argv.split_first() else {
		return Ok(())
	};
	let result = match *name {
		"exit" => Err(ShErr::CleanExit(0)),
		"?" | "help" => {
			for line in help() {
				println!("{}",line);
			}
			Ok(())
		}
		"cd" => cd::execute(args),
		"pwd" => pwd::execute(),
		"wait" => wait::execute(shell),
		"jobs" => job::jobs(args, shell),
		"fg" => job::continue_job(args, shell, true),
		"bg" => job::continue_job(args, shell, false),
		"setopt" => opts::setopt(args, shell),
		"getopt" => opts::getopt(args, shell),
		_ => Err(ShErr::builtin(name, "not a built-in")),
	};
	match &result {
		Ok(()) => {
			// fg sets the status of the job it waited on
			if *name != "fg" {
				shell.set_status(0)
			}
		}
		Err(e) if !e.is_exit() => shell.set_status(1),
		Err(_) => {}
	}
	result
}

pub fn help() -> Vec<String> {
	BUILTINS.iter().map(|(name, doc)| format!("{} - {}",name,doc)).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builtin_lookup() {
		assert!(is_builtin("cd"));
		assert!(is_builtin("?"));
		assert!(!is_builtin("ls"));
		assert!(!is_builtin(""));
	}

	#[test]
	fn help_lists_every_builtin() {
		let lines = help();
		assert_eq!(lines.len(), BUILTINS.len());
		assert_eq!(lines[2], "exit - exit the shell");
	}
}
