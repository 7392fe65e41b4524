use std::env;
use std::path::PathBuf;

use log::debug;

use crate::error::{ShErr, ShResult};

/// `cd [dir]`. With no argument goes to `$HOME`; `-` goes back to `$OLDPWD`.
/// On failure the working directory is left alone.
pub fn execute(args: &[&str]) -> ShResult<()> {
	let new_pwd: PathBuf = match args.first() {
		Some(&"-") => env::var_os("OLDPWD")
			.map(PathBuf::from)
			.ok_or_else(|| ShErr::builtin("cd", "OLDPWD not set"))?,
		Some(dir) => PathBuf::from(dir),
		None => env::var_os("HOME")
			.map(PathBuf::from)
			.ok_or_else(|| ShErr::builtin("cd", "HOME not set"))?,
	};
	let old_pwd = env::current_dir().ok();

	env::set_current_dir(&new_pwd)
		.map_err(|e| ShErr::builtin("cd", format!("{}: {}",new_pwd.display(),e)))?;
	debug!("cd: now in {}",new_pwd.display());

	if let Some(old_pwd) = old_pwd {
		env::set_var("OLDPWD", old_pwd);
	}
	env::set_var("PWD", env::current_dir()?);
	Ok(())
}
