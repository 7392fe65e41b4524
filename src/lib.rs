pub mod builtin;
pub mod error;
pub mod event;
pub mod execute;
pub mod interp;
pub mod jobs;
pub mod shellenv;
pub mod shopt;
pub mod signal;
