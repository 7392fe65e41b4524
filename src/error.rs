use std::fmt::Display;
use std::path::PathBuf;

use nix::errno::Errno;

pub type ShResult<T> = Result<T, ShErr>;

// Errors raised by the interpreter loop, the launcher and the built-ins.
// Variants marked "child only" are reported from inside a forked child right before it exits;
// they never travel back into the shell's own control flow.

#[derive(Debug)]
pub enum ShErr {
	MalformedRedirection(String),
	MissingCommand,
	InvalidArgument(String),
	ForkFailure(Errno),
	/// child only
	RedirectionOpenFailure(PathBuf, Errno),
	/// child only
	ExecutableNotFound(String),
	/// child only
	PermissionDenied(String),
	WaitFailure(Errno),
	NoSuchJob(String),
	BadJobSpec(String),
	BuiltinFailure(String, String),
	Config(String),
	IoError(std::io::Error),
	ErrNo(Errno),

	// Not an actual error, used to carry `exit` up to the loop
	CleanExit(i32),
}

impl ShErr {
	pub fn builtin(name: &str, msg: impl Into<String>) -> Self {
		Self::BuiltinFailure(name.into(), msg.into())
	}

	/// Status a forked child exits with after reporting this error.
	pub fn child_status(&self) -> i32 {
		match self {
			ShErr::ExecutableNotFound(_) => 127,
			ShErr::PermissionDenied(_) => 126,
			_ => 1,
		}
	}

	pub fn is_exit(&self) -> bool {
		matches!(self, ShErr::CleanExit(_))
	}
}

impl Display for ShErr {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ShErr::MalformedRedirection(op) => write!(f,"syntax error: expected a path after `{}'",op),
			ShErr::MissingCommand => write!(f,"syntax error: missing command"),
			ShErr::InvalidArgument(arg) => write!(f,"invalid argument: {:?}",arg),
			ShErr::ForkFailure(no) => write!(f,"fork failed: {}",no),
			ShErr::RedirectionOpenFailure(path,no) => write!(f,"{}: {}",path.display(),no.desc()),
			ShErr::ExecutableNotFound(name) => write!(f,"command not found: {}",name),
			ShErr::PermissionDenied(name) => write!(f,"permission denied: {}",name),
			ShErr::WaitFailure(no) => write!(f,"wait failed: {}",no),
			ShErr::NoSuchJob(spec) => write!(f,"{}: no such job",spec),
			ShErr::BadJobSpec(spec) => write!(f,"{}: invalid job spec",spec),
			ShErr::BuiltinFailure(name,msg) => write!(f,"{}: {}",name,msg),
			ShErr::Config(msg) => write!(f,"config error: {}",msg),
			ShErr::IoError(error) => write!(f,"I/O error: {}",error),
			ShErr::ErrNo(no) => write!(f,"ERRNO: {}",no),
			ShErr::CleanExit(_) => write!(f, ""),
		}
	}
}

impl std::error::Error for ShErr {}

impl From<std::io::Error> for ShErr {
	fn from(err: std::io::Error) -> Self {
		ShErr::IoError(err)
	}
}

impl From<Errno> for ShErr {
	fn from(no: Errno) -> Self {
		ShErr::ErrNo(no)
	}
}

impl From<serde_json::Error> for ShErr {
	fn from(err: serde_json::Error) -> Self {
		ShErr::Config(err.to_string())
	}
}
