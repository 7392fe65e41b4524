use std::os::fd::RawFd;
use std::path::{Path, PathBuf};

use libc::{STDIN_FILENO, STDOUT_FILENO};
use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2};

use crate::error::{ShErr, ShResult};
use crate::interp::parse::CmdDesc;

/// One file redirection: `path` is opened with `flags` and takes over `our_fd`.
#[derive(Debug,Clone,PartialEq,Eq)]
pub struct Redir {
	our_fd: RawFd,
	flags: OFlag,
	file_target: PathBuf,
}

impl Redir {
	pub fn output(path: &Path) -> Self {
		Self {
			our_fd: STDOUT_FILENO,
			flags: OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
			file_target: path.to_path_buf(),
		}
	}

	pub fn input(path: &Path) -> Self {
		Self {
			our_fd: STDIN_FILENO,
			flags: OFlag::O_RDONLY,
			file_target: path.to_path_buf(),
		}
	}

	pub fn activate(&self) -> ShResult<()> {
		let open_err = |no| ShErr::RedirectionOpenFailure(self.file_target.clone(), no);
		// New files are readable and writable by the owner only
		let file_fd = open(self.file_target.as_path(), self.flags, Mode::S_IRUSR | Mode::S_IWUSR).map_err(open_err)?;
		if file_fd != self.our_fd {
			dup2(file_fd, self.our_fd).map_err(open_err)?;
			close(file_fd)?;
		}
		Ok(())
	}
}

/// The redirections of one command, output before input.
#[derive(Debug)]
pub struct CmdRedirs {
	redirs: Vec<Redir>,
}

impl CmdRedirs {
	pub fn new(desc: &CmdDesc) -> Self {
		let mut redirs = vec![];
		if let Some(path) = &desc.stdout_path {
			redirs.push(Redir::output(path));
		}
		if let Some(path) = &desc.stdin_path {
			redirs.push(Redir::input(path));
		}
		Self { redirs }
	}

	pub fn activate(&self) -> ShResult<()> {
		for redir in &self.redirs {
			redir.activate()?;
		}
		Ok(())
	}
}
