use std::env;
use std::io;
use std::path::PathBuf;
use std::process::exit;

use clap::{value_parser, Arg, ArgAction, Command};
use log::{debug, warn, LevelFilter};

use pgsh::event;
use pgsh::shellenv::{Session, Shell};
use pgsh::shopt::ShOpts;
use pgsh::signal::ChildNotifier;

fn cli() -> Command {
	Command::new("pgsh")
		.about("A small shell with process groups and job control")
		.arg(
			Arg::new("config")
				.long("config")
				.value_name("FILE")
				.value_parser(value_parser!(PathBuf))
				.help("Read shell options from FILE instead of ~/.pgsh.json")
		)
		.arg(
			Arg::new("no-notify")
				.long("no-notify")
				.action(ArgAction::SetTrue)
				.help("Do not announce background job state changes")
		)
		.arg(
			Arg::new("verbose")
				.short('v')
				.action(ArgAction::Count)
				.help("Raise the log level, repeat for more")
		)
}

fn init_logging(verbosity: u8) {
	let level = match verbosity {
		0 => LevelFilter::Warn,
		1 => LevelFilter::Info,
		2 => LevelFilter::Debug,
		_ => LevelFilter::Trace,
	};
	let mut builder = env_logger::Builder::new();
	builder.filter_level(level);
	if env::var_os("RUST_LOG").is_some() {
		builder.parse_default_env();
	}
	builder.init();
}

fn load_opts(config: Option<&PathBuf>) -> Result<ShOpts, String> {
	if let Some(path) = config {
		return ShOpts::load(path).map_err(|e| e.to_string())
	}
	let Some(home) = env::var_os("HOME") else {
		return Ok(ShOpts::new())
	};
	let path = PathBuf::from(home).join(".pgsh.json");
	if !path.exists() {
		return Ok(ShOpts::new())
	}
	match ShOpts::load(&path) {
		Ok(opts) => Ok(opts),
		Err(e) => {
			eprintln!("pgsh: {}",e);
			Ok(ShOpts::new())
		}
	}
}

fn main() {
	let matches = cli().get_matches();
	init_logging(matches.get_count("verbose"));

	let mut opts = match load_opts(matches.get_one::<PathBuf>("config")) {
		Ok(opts) => opts,
		Err(msg) => {
			eprintln!("pgsh: {}",msg);
			exit(2)
		}
	};
	if matches.get_flag("no-notify") {
		opts.core.notify = false;
	}

	let session = Session::init();
	let notifier = ChildNotifier::register().unwrap_or_else(|e| {
		warn!("could not watch SIGCHLD, job notices only appear after `wait': {}",e);
		ChildNotifier::detached()
	});
	let mut shell = Shell::new(session, opts, notifier);

	debug!("Starting event loop");
	let code = event::listen(&mut shell, io::stdin().lock());
	exit(code)
}
