use {
	crate::{
		bits,
		record::{readSpan, Field, FieldReader, FieldWriter, Record, Scalar},
		res::ImageHeader,
		Error, Result, RGB_SIZE,
	},
	log::{debug, warn},
	png::{BitDepth, ColorType, Transformations},
	std::io::{self, Read, Write},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaletteEntry {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub pad: u8,
}

impl Record for PaletteEntry {
	const NAME: &'static str = "PaletteEntry";
	const FIELDS: &'static [Field] = &[
		Field::new("r", 1, Scalar::U8),
		Field::new("g", 1, Scalar::U8),
		Field::new("b", 1, Scalar::U8),
		Field::new("pad", 1, Scalar::U8),
	];

	fn fromFields(fields: &mut FieldReader<'_>) -> Self {
		Self { r: fields.u8(), g: fields.u8(), b: fields.u8(), pad: fields.u8() }
	}

	fn intoFields(&self, fields: &mut FieldWriter<'_>) -> Result<()> {
		fields.u8(self.r)?;
		fields.u8(self.g)?;
		fields.u8(self.b)?;
		fields.u8(self.pad)
	}
}

/// One palette index byte per pixel, rows top to bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedImage {
	pub width: u16,
	pub height: u16,

	/// Flat RGB triples.
	pub palette: Vec<u8>,
	pub pixels: Vec<u8>,
}

impl IndexedImage {
	pub fn decode(header: &ImageHeader, payload: &[u8]) -> Result<Self> {
		let bitsPerPixel = bits::bitDepth(header.bitsPerPixel)?;
		let (width, height, rowLength) =
			(usize::from(header.width), usize::from(header.height), usize::from(header.rowLength));
		let needed = bits::packedLen(width, bitsPerPixel);
		if needed > rowLength {
			return Err(Error::RowLengthMismatch { row: 0, needed, rowLength });
		}

		let cursor = &mut io::Cursor::new(payload);
		let mut palette = Vec::with_capacity(usize::from(header.paletteColors) * RGB_SIZE);
		for i in 0..header.paletteColors {
			let PaletteEntry { r, g, b, pad } = PaletteEntry::read(cursor)?;
			if pad != 0 {
				warn!("palette colour #{i} carries pad byte {pad:#04X}, which is not kept");
			}
			palette.extend_from_slice(&[r, g, b]);
		}

		let mut pixels = Vec::with_capacity(width * height);
		for _ in 0..height {
			let row = readSpan(cursor, rowLength, "packed row")?;
			pixels.extend(bits::unpack(row, bitsPerPixel).take(width));
		}
		let trailing = payload.len() - cursor.position() as usize;
		if trailing > 0 {
			debug!("{trailing} bytes after the last row are left out");
		}

		Ok(Self { width: header.width, height: header.height, palette, pixels })
	}

	/// Encodes against the header the image was decoded from: signature, row
	/// length, bit depth and transparency carry over, dimensions and palette
	/// size come from the image.
	pub fn encode(&self, original: &ImageHeader) -> Result<Vec<u8>> {
		let bitsPerPixel = bits::bitDepth(original.bitsPerPixel)?;
		let (width, rowLength) = (usize::from(self.width), usize::from(original.rowLength));
		if self.pixels.len() != width * usize::from(self.height) {
			return Err(Error::PixelCountMismatch { width: self.width, height: self.height, actual: self.pixels.len() });
		}
		let paletteColors = self.palette.len() / RGB_SIZE;
		let header = ImageHeader {
			width: self.width,
			height: self.height,
			paletteColors: u16::try_from(paletteColors).map_err(|_| Error::PaletteTooLarge(paletteColors))?,
			..original.clone()
		};

		let mut bytes = header.toBytes()?;
		for rgb in self.palette.chunks_exact(RGB_SIZE) {
			PaletteEntry { r: rgb[0], g: rgb[1], b: rgb[2], pad: 0 }.write(&mut bytes)?;
		}
		for y in 0..usize::from(self.height) {
			let row = &self.pixels[y * width..][..width];
			bytes.extend(bits::packRow(row.iter().copied(), bitsPerPixel, rowLength, y)?);
		}
		Ok(bytes)
	}

	/// Keeps at most `colors` palette entries.
	pub fn truncatePalette(&mut self, colors: u16) {
		self.palette.truncate(usize::from(colors) * RGB_SIZE);
	}

	/// Reads an indexed-colour PNG of any bit depth up to 8.
	pub fn readPNG<R: Read>(reader: R) -> Result<Self> {
		let mut decoder = png::Decoder::new(reader);
		decoder.set_transformations(Transformations::IDENTITY);
		let png = &mut decoder.read_info()?;
		let mut buffer = vec![0; png.output_buffer_size()];
		let frame = png.next_frame(&mut buffer)?;
		if frame.color_type != ColorType::Indexed {
			return Err(Error::NotIndexed(frame.color_type));
		}
		let (Ok(width), Ok(height)) = (u16::try_from(frame.width), u16::try_from(frame.height)) else {
			return Err(Error::ImageTooLarge { width: frame.width, height: frame.height });
		};

		let mut pixels = Vec::with_capacity(usize::from(width) * usize::from(height));
		for row in buffer[..frame.buffer_size()].chunks(frame.line_size.max(1)).take(height.into()) {
			pixels.extend(bits::unpack(row, frame.bit_depth as u8).take(width.into()));
		}
		let palette = png.info().palette.as_deref().unwrap_or_default().to_vec();
		Ok(Self { width, height, palette, pixels })
	}

	/// Writes an 8-bit indexed-colour PNG.
	pub fn writePNG<W: Write>(&self, writer: W) -> Result<()> {
		let mut png = png::Encoder::new(writer, self.width.into(), self.height.into());
		png.set_color(ColorType::Indexed);
		png.set_depth(BitDepth::Eight);
		png.set_palette(self.palette.as_slice());
		let mut writer = png.write_header()?;
		writer.write_image_data(&self.pixels)?;
		writer.finish()?;
		Ok(())
	}
}
