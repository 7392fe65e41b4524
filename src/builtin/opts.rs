use crate::error::{ShErr, ShResult};
use crate::shellenv::Shell;
use crate::shopt::ShOpts;

/// `setopt key value`, e.g. `setopt core.notify false`
pub fn setopt(args: &[&str], shell: &mut Shell) -> ShResult<()> {
	let [key, raw] = args else {
		return Err(ShErr::builtin("setopt", "usage: setopt key value"))
	};
	shell.opts_mut().set(key, ShOpts::parse_value(raw))
		.map_err(|e| ShErr::builtin("setopt", e.to_string()))
}

pub fn getopt(args: &[&str], shell: &mut Shell) -> ShResult<()> {
	let [key] = args else {
		return Err(ShErr::builtin("getopt", "usage: getopt key"))
	};
	let value = shell.opts().get(key)
		.map_err(|e| ShErr::builtin("getopt", e.to_string()))?;
	println!("{}",value);
	Ok(())
}
