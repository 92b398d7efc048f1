use {
	std::{io, path::PathBuf},
	thiserror::Error,
};

#[derive(Error, Debug)]
pub enum Error {
	#[error("truncated input: {record} needs {needed} bytes at offset {offset}, only {available} left")]
	TruncatedInput { record: &'static str, offset: u64, needed: usize, available: usize },

	#[error("{record}.{field} packed to {actual} bytes, but is declared {declared} bytes wide")]
	FieldSizeMismatch { record: &'static str, field: &'static str, declared: usize, actual: usize },

	#[error("row {row} packs to {needed} bytes, more than the row length of {rowLength}")]
	RowLengthMismatch { row: usize, needed: usize, rowLength: usize },

	#[error("unsupported bit depth: {0} bits per pixel")]
	UnsupportedBitDepth(u16),

	#[error("{0:?}: no such file")]
	MissingInputFile(PathBuf),

	#[error("pixel index {index} does not fit in {bitsPerPixel} bits")]
	PixelIndexOutOfRange { index: u8, bitsPerPixel: u8 },

	#[error("table of contents entry #{index} ({offset}) lies before the previous one ({previous})")]
	NonMonotonicToc { index: usize, offset: u32, previous: u32 },

	#[error("container declares no resources")]
	NoResources,

	#[error("interchange image is not indexed-colour but {0:?}")]
	NotIndexed(png::ColorType),

	#[error("{width}x{height} image exceeds the 16-bit dimensions of the container")]
	ImageTooLarge { width: u32, height: u32 },

	#[error("palette of {0} colours does not fit the container")]
	PaletteTooLarge(usize),

	#[error("{width}x{height} image carries {actual} pixels")]
	PixelCountMismatch { width: u16, height: u16, actual: usize },

	#[error("resource data reaches offset {0}, past what the table of contents can hold")]
	OffsetOverflow(usize),

	#[error("resource #{index}: {source}")]
	Resource {
		index: usize,
		#[source]
		source: Box<Error>,
	},

	#[error("{path:?}: {source}")]
	File {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error(transparent)]
	Io(#[from] io::Error),

	#[error(transparent)]
	PngDecoding(#[from] png::DecodingError),

	#[error(transparent)]
	PngEncoding(#[from] png::EncodingError),

	#[error(transparent)]
	Toml(#[from] toml::ser::Error),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

pub trait ResultExt<T> {
	/// Tags an error with the resource it happened in.
	fn inResource(self, index: usize) -> Result<T>;

	/// Tags an I/O error with the file it happened on.
	fn onFile(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for core::result::Result<T, E> {
	fn inResource(self, index: usize) -> Result<T> {
		self.map_err(|err| match err.into() {
			err @ Error::Resource { .. } => err,
			err => Error::Resource { index, source: Box::new(err) },
		})
	}

	fn onFile(self, path: impl Into<PathBuf>) -> Result<T> {
		self.map_err(|err| match err.into() {
			Error::Io(source) => Error::File { path: path.into(), source },
			err => err,
		})
	}
}
