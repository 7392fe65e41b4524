use std::env;
use std::ffi::{CString, OsStr};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use nix::errno::Errno;
use nix::unistd::execv;

use crate::error::{ShErr, ShResult};

/// Every path the launcher will try for `name`, in order: the name exactly as given,
/// then `name` under each non-empty directory of `path_var`.
pub fn candidates(name: &str, path_var: Option<&OsStr>) -> Vec<PathBuf> {
	let mut candidates = vec![PathBuf::from(name)];
	if let Some(path_var) = path_var {
		candidates.extend(
			env::split_paths(path_var)
				.filter(|dir| !dir.as_os_str().is_empty())
				.map(|dir| dir.join(name))
		);
	}
	candidates
}

/// Candidate paths as NUL-terminated strings, built before forking so the child only
/// has to walk a list. A path that cannot be represented is skipped.
pub fn exec_paths(name: &str) -> Vec<CString> {
	let path_var = env::var_os("PATH");
	candidates(name, path_var.as_deref())
		.into_iter()
		.filter_map(|path| CString::new(path.as_os_str().as_bytes()).ok())
		.collect()
}

pub fn prepare_argv(argv: &[String]) -> ShResult<Vec<CString>> {
	argv.iter()
		.map(|arg| CString::new(arg.as_str()).map_err(|_| ShErr::InvalidArgument(arg.clone())))
		.collect()
}

/// Tries each path in order until one replaces the process image. Only returns if every
/// attempt failed; the error tells the child what to report and how to exit.
pub fn exec_candidates(name: &str, paths: &[CString], argv: &[CString]) -> ShErr {
	let mut denied = false;
	for path in paths {
		match execv(path, argv) {
			Ok(never) => match never {},
			Err(Errno::EACCES) => denied = true,
			Err(_) => {}
		}
	}
	if denied {
		ShErr::PermissionDenied(name.into())
	} else {
		ShErr::ExecutableNotFound(name.into())
	}
}
