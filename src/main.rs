#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	clap::{Parser, Subcommand},
	log::{error, info},
	miband_res::{
		initLogging,
		pipeline::{Config, Naming, Orchestrator, DEFAULT_OUTPUT_DIR},
		Result,
	},
	std::{
		io::{self, Write},
		path::{Path, PathBuf},
		process::ExitCode,
	},
};

/// Unpacks the palette images of a firmware resource container into PNGs and packs them back.
#[derive(Parser)]
#[clap(version)]
struct Args {
	/// Directory the numbered PNGs are written to and read back from
	#[clap(long, value_parser, default_value = DEFAULT_OUTPUT_DIR)]
	outputDir: PathBuf,

	/// Text put in front of each PNG's number
	#[clap(long, default_value = "")]
	prefix: String,

	/// Rewrite the table of contents from the re-encoded resource sizes
	#[clap(long)]
	recomputeToc: bool,

	#[clap(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Decode every resource into <output-dir>/<n>.png
	Unpack {
		#[clap(value_parser)]
		container: PathBuf,
	},

	/// Encode <output-dir>/<n>.png back into <container>.new.<ext>
	Repack {
		#[clap(value_parser)]
		container: PathBuf,
	},

	/// Unpack, then repack straight away
	#[clap(name = "justdoit")]
	JustDoIt {
		#[clap(value_parser)]
		container: PathBuf,
	},

	/// Print the header, table of contents and image headers as TOML
	Info {
		#[clap(value_parser)]
		container: PathBuf,
	},
}

fn main() -> ExitCode {
	initLogging();
	let Args { outputDir, prefix, recomputeToc, command } = Args::parse();
	let orchestrator = Orchestrator::new(Config {
		outputDir,
		naming: Naming { prefix, ..Naming::default() },
		recomputeToc,
	});
	match run(&orchestrator, &command) {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			error!("{err}");
			ExitCode::FAILURE
		}
	}
}

fn run(orchestrator: &Orchestrator, command: &Command) -> Result<()> {
	let outputDir: &Path = &orchestrator.config().outputDir;
	match command {
		Command::Unpack { container } => {
			let resFile = orchestrator.unpack(container)?;
			info!("{} images written to {outputDir:?}", resFile.resources.len());
		}
		Command::Repack { container } => {
			info!("repacked into {:?}", orchestrator.repack(container)?);
		}
		Command::JustDoIt { container } => {
			info!("round trip through {outputDir:?} written to {:?}", orchestrator.justDoIt(container)?);
		}
		Command::Info { container } => {
			let toml = toml::to_string(&orchestrator.load(container)?.metadata())?;
			io::stdout().lock().write_all(toml.as_bytes())?;
		}
	}
	Ok(())
}
