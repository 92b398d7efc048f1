//! Moving a whole container to numbered PNGs and back.

use {
	crate::{image::IndexedImage, res::ResFile, Error, Result, ResultExt},
	log::{info, warn},
	std::{
		ffi::OsString,
		fs::{self, File},
		io::{self, BufReader, BufWriter, Write},
		path::{Path, PathBuf},
	},
};

pub const DEFAULT_OUTPUT_DIR: &str = "unpacked";
pub const REPACKED_INFIX: &str = "new";

#[derive(Clone, Debug)]
pub struct Naming {
	pub prefix: String,
	pub extension: String,
}

impl Default for Naming {
	fn default() -> Self {
		Self { prefix: String::new(), extension: "png".into() }
	}
}

impl Naming {
	pub fn fileName(&self, index: usize) -> String {
		format!("{}{index}.{}", self.prefix, self.extension)
	}
}

#[derive(Clone, Debug)]
pub struct Config {
	pub outputDir: PathBuf,
	pub naming: Naming,

	/// Rewrite TOC offsets from the re-encoded sizes instead of copying them.
	pub recomputeToc: bool,
}

impl Default for Config {
	fn default() -> Self {
		Self { outputDir: DEFAULT_OUTPUT_DIR.into(), naming: Naming::default(), recomputeToc: false }
	}
}

impl Config {
	pub fn imagePath(&self, index: usize) -> PathBuf {
		self.outputDir.join(self.naming.fileName(index))
	}
}

/// Where decoded images go for editing and come back from.
pub trait RasterStore {
	fn save(&mut self, index: usize, image: &IndexedImage) -> Result<()>;
	fn load(&mut self, index: usize) -> Result<IndexedImage>;
}

pub struct PngDir<'a> {
	config: &'a Config,
}

impl<'a> PngDir<'a> {
	pub fn new(config: &'a Config) -> Self {
		Self { config }
	}
}

impl RasterStore for PngDir<'_> {
	fn save(&mut self, index: usize, image: &IndexedImage) -> Result<()> {
		let outputDir = &self.config.outputDir;
		fs::create_dir_all(outputDir).onFile(outputDir)?;
		let path = &self.config.imagePath(index);
		let file = File::create(path).onFile(path)?;
		image.writePNG(BufWriter::new(file)).onFile(path)
	}

	fn load(&mut self, index: usize) -> Result<IndexedImage> {
		let path = &self.config.imagePath(index);
		let file = match File::open(path) {
			Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(Error::MissingInputFile(path.clone())),
			file => file.onFile(path)?,
		};
		IndexedImage::readPNG(BufReader::new(file)).onFile(path)
	}
}

pub fn unpackAll(resFile: &ResFile, store: &mut impl RasterStore) -> Result<()> {
	for resource in &resFile.resources {
		let image = resource.decode().inResource(resource.index)?;
		store.save(resource.index, &image).inResource(resource.index)?;
		info!(
			"resource #{}: {}x{}, {} bpp, {} colours",
			resource.index, image.width, image.height, resource.imageHeader.bitsPerPixel, resource.imageHeader.paletteColors
		);
	}
	Ok(())
}

/// Re-encodes every resource from the store and writes the new container. The
/// header always, and the TOC unless `recomputeToc`, are copied from `resFile`.
pub fn writeRepacked<W: Write>(
	writer: &mut W,
	resFile: &ResFile,
	store: &mut impl RasterStore,
	recomputeToc: bool,
) -> Result<()> {
	let mut encoded = Vec::with_capacity(resFile.resources.len());
	for resource in &resFile.resources {
		let bytes = {
			let mut image = store.load(resource.index).inResource(resource.index)?;
			image.truncatePalette(resource.imageHeader.paletteColors);
			image.encode(&resource.imageHeader).inResource(resource.index)?
		};
		if !recomputeToc && bytes.len() != resource.len() {
			warn!(
				"resource #{}: size changed from {} to {} bytes, the table of contents no longer matches",
				resource.index,
				resource.len(),
				bytes.len()
			);
		}
		encoded.push(bytes);
	}
	let toc = if recomputeToc { resFile.recomputedToc(encoded.iter().map(Vec::len))? } else { resFile.toc.clone() };
	resFile.writeWith(writer, &toc, &encoded)
}

/// [`writeRepacked`] into a file, created only once every resource has encoded.
pub fn repackAll(
	outputPath: &Path,
	resFile: &ResFile,
	store: &mut impl RasterStore,
	recomputeToc: bool,
) -> Result<()> {
	let mut bytes = Vec::new();
	writeRepacked(&mut bytes, resFile, store, recomputeToc)?;
	let mut file = File::create(outputPath).onFile(outputPath)?;
	file.write_all(&bytes).onFile(outputPath)?;
	info!("{outputPath:?}: {} resources, {} bytes", resFile.resources.len(), bytes.len());
	Ok(())
}

/// `dir/name.ext` becomes `dir/name.new.ext`.
pub fn repackedPath(containerPath: &Path) -> PathBuf {
	let mut extension = OsString::from(REPACKED_INFIX);
	if let Some(original) = containerPath.extension() {
		extension.push(".");
		extension.push(original);
	}
	containerPath.with_extension(extension)
}

pub struct Orchestrator {
	config: Config,
}

impl Orchestrator {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn load(&self, containerPath: &Path) -> Result<ResFile> {
		if !containerPath.exists() {
			return Err(Error::MissingInputFile(containerPath.into()));
		}
		let bytes = fs::read(containerPath).onFile(containerPath)?;
		let resFile = ResFile::parse(&bytes)?;
		info!("{containerPath:?}: {} resources", resFile.resources.len());
		Ok(resFile)
	}

	pub fn unpack(&self, containerPath: &Path) -> Result<ResFile> {
		let resFile = self.load(containerPath)?;
		unpackAll(&resFile, &mut PngDir::new(&self.config))?;
		Ok(resFile)
	}

	/// Returns the path of the repacked container.
	pub fn repack(&self, containerPath: &Path) -> Result<PathBuf> {
		let resFile = self.load(containerPath)?;
		self.repackParsed(containerPath, &resFile)
	}

	/// Unpacks and immediately repacks; without edits the output matches the input byte for byte.
	pub fn justDoIt(&self, containerPath: &Path) -> Result<PathBuf> {
		let resFile = self.unpack(containerPath)?;
		self.repackParsed(containerPath, &resFile)
	}

	fn repackParsed(&self, containerPath: &Path, resFile: &ResFile) -> Result<PathBuf> {
		let outputPath = repackedPath(containerPath);
		repackAll(&outputPath, resFile, &mut PngDir::new(&self.config), self.config.recomputeToc)?;
		Ok(outputPath)
	}
}
