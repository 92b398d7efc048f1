#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

pub mod bits;
pub mod error;
pub mod image;
pub mod pipeline;
pub mod record;
pub mod res;

pub use {
	error::{Error, Result, ResultExt},
	image::IndexedImage,
	res::ResFile,
};

pub const RGB_SIZE: usize = 3;

/// Logs to stderr at `info` unless `RUST_LOG` says otherwise.
pub fn initLogging() {
	use {env_logger::Env, std::io::Write};

	env_logger::Builder::from_env(Env::default().default_filter_or("info"))
		.format(|buf, record| writeln!(buf, "[{} {}] {}", record.level(), record.target(), record.args()))
		.init();
}
