use log::trace;

use crate::builtin;
use crate::error::ShResult;
use crate::interp::parse::CmdDesc;
use crate::interp::token::tokenize;
use crate::shellenv::Shell;

use super::command;

/// Runs one line of input: a built-in if the first word names one, an external command otherwise.
pub fn exec_input(input: &str, shell: &mut Shell) -> ShResult<()> {
	let tokens = tokenize(input);
	trace!("tokens: {:?}",tokens);

	let Some(name) = tokens.first() else {
		return Ok(())
	};
	if builtin::is_builtin(name) {
		return builtin::exec_builtin(&tokens, shell)
	}

	match CmdDesc::from_tokens(&tokens)? {
		Some(desc) => command::exec_cmd(desc, shell),
		None => Ok(())
	}
}
