use std::path::PathBuf;

use log::trace;

use crate::error::{ShErr, ShResult};

use super::token::is_operator;

/// A single external command, ready to be handed to the launcher.
#[derive(Debug,Clone,Default,PartialEq,Eq)]
pub struct CmdDesc {
	pub argv: Vec<String>,
	pub stdin_path: Option<PathBuf>,
	pub stdout_path: Option<PathBuf>,
	pub background: bool,
}

impl CmdDesc {
	/// Builds a descriptor from a token sequence in one left-to-right pass.
	///
	/// `<` and `>` take the following token as their path, `&` marks the command as a
	/// background job, everything else is an argument. Returns `Ok(None)` for an empty
	/// line. A redirection with no path, or with an operator where the path should be,
	/// is a `MalformedRedirection`.
	pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> ShResult<Option<Self>> {
		if tokens.is_empty() {
			return Ok(None)
		}
		let mut desc = CmdDesc::default();
		let mut tokens = tokens.iter().map(|tk| tk.as_ref());

		while let Some(token) = tokens.next() {
			match token {
				"<" => desc.stdin_path = Some(Self::redir_target(token, tokens.next())?),
				">" => desc.stdout_path = Some(Self::redir_target(token, tokens.next())?),
				"&" => desc.background = true,
				_ => desc.argv.push(token.to_string())
			}
		}

		if desc.argv.is_empty() {
			return Err(ShErr::MissingCommand)
		}
		trace!("built command descriptor: {:?}",desc);
		Ok(Some(desc))
	}

	fn redir_target(op: &str, target: Option<&str>) -> ShResult<PathBuf> {
		match target {
			Some(path) if !is_operator(path) => Ok(PathBuf::from(path)),
			_ => Err(ShErr::MalformedRedirection(op.into()))
		}
	}

	pub fn name(&self) -> &str {
		self.argv.first().map(|arg| arg.as_str()).unwrap_or_default()
	}

	/// The command line as the user would recognize it, for job listings.
	pub fn display(&self) -> String {
		let mut text = self.argv.join(" ");
		if let Some(path) = &self.stdin_path {
			text.push_str(&format!(" < {}",path.display()));
		}
		if let Some(path) = &self.stdout_path {
			text.push_str(&format!(" > {}",path.display()));
		}
		text
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::interp::token::tokenize;

	fn build(line: &str) -> ShResult<Option<CmdDesc>> {
		CmdDesc::from_tokens(&tokenize(line))
	}

	#[test]
	fn plain_command() {
		let desc = build("ls -l /tmp").unwrap().unwrap();
		assert_eq!(desc.argv, vec!["ls", "-l", "/tmp"]);
		assert_eq!(desc.stdin_path, None);
		assert_eq!(desc.stdout_path, None);
		assert!(!desc.background);
	}

	#[test]
	fn empty_line_has_no_descriptor() {
		assert_eq!(build("").unwrap(), None);
		assert_eq!(build("   ").unwrap(), None);
	}

	#[test]
	fn redirections_and_background() {
		let desc = build("sort < in.txt > out.txt &").unwrap().unwrap();
		assert_eq!(desc.argv, vec!["sort"]);
		assert_eq!(desc.stdin_path, Some(PathBuf::from("in.txt")));
		assert_eq!(desc.stdout_path, Some(PathBuf::from("out.txt")));
		assert!(desc.background);
	}

	#[test]
	fn words_after_redirection_are_kept() {
		let desc = build("a b > out c").unwrap().unwrap();
		assert_eq!(desc.argv, vec!["a", "b", "c"]);
		assert_eq!(desc.stdout_path, Some(PathBuf::from("out")));
	}

	#[test]
	fn last_redirection_wins() {
		let desc = build("cat < one < two > x > y").unwrap().unwrap();
		assert_eq!(desc.stdin_path, Some(PathBuf::from("two")));
		assert_eq!(desc.stdout_path, Some(PathBuf::from("y")));
	}

	#[test]
	fn trailing_redirection_is_malformed() {
		assert!(matches!(build("echo hi >"), Err(ShErr::MalformedRedirection(op)) if op == ">"));
		assert!(matches!(build("cat <"), Err(ShErr::MalformedRedirection(op)) if op == "<"));
	}

	#[test]
	fn operator_as_path_is_malformed() {
		assert!(matches!(build("cat < > out"), Err(ShErr::MalformedRedirection(_))));
		assert!(matches!(build("echo hi > &"), Err(ShErr::MalformedRedirection(_))));
	}

	#[test]
	fn operators_without_command() {
		assert!(matches!(build("> out"), Err(ShErr::MissingCommand)));
		assert!(matches!(build("&"), Err(ShErr::MissingCommand)));
	}

	#[test]
	fn display_reassembles_command() {
		let desc = build("sleep 5>log&").unwrap().unwrap();
		assert_eq!(desc.display(), "sleep 5 > log");
		assert_eq!(desc.name(), "sleep");
	}
}
