use std::env;
use std::io::{self, Write};

use crate::error::ShResult;

pub fn execute() -> ShResult<()> {
	let pwd = env::current_dir()?;
	let mut stdout = io::stdout();
	writeln!(stdout,"{}",pwd.display())?;
	Ok(())
}
