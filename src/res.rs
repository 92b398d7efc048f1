//! The resource container: a fixed header, a table of contents and a run of
//! palette images.
//!
//! ```text
//! Header       5B signature | 1B version | 10B reserved | 4B resCount
//! TOC          resCount × 4B offset
//! Resource[i]  ImageHeader (16B) | PaletteEntry × paletteColors | rows
//! ```
//!
//! TOC offsets count from the first byte after the TOC. Entry 0 marks the start
//! of that data and delimits nothing; entry `i` ends resource `i - 1`, and the
//! last resource runs to the end of the file.

use {
	crate::{
		image::IndexedImage,
		record::{readRest, readSpan, Field, FieldReader, FieldWriter, Record, Scalar},
		Error, Result, ResultExt,
	},
	log::debug,
	serde::Serialize,
	std::io::{self, Write},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Header {
	pub signature: [u8; 5],
	pub version: u8,
	pub reserved: [u8; 10],
	pub resCount: u32,
}

impl Record for Header {
	const NAME: &'static str = "Header";
	const FIELDS: &'static [Field] = &[
		Field::new("signature", 5, Scalar::Bytes),
		Field::new("version", 1, Scalar::U8),
		Field::new("reserved", 10, Scalar::Bytes),
		Field::new("resCount", 4, Scalar::U32),
	];

	fn fromFields(fields: &mut FieldReader<'_>) -> Self {
		Self { signature: fields.bytes(), version: fields.u8(), reserved: fields.bytes(), resCount: fields.u32() }
	}

	fn intoFields(&self, fields: &mut FieldWriter<'_>) -> Result<()> {
		fields.bytes(&self.signature)?;
		fields.u8(self.version)?;
		fields.bytes(&self.reserved)?;
		fields.u32(self.resCount)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TocEntry {
	pub absOffset: u32,
}

impl Record for TocEntry {
	const NAME: &'static str = "TocEntry";
	const FIELDS: &'static [Field] = &[Field::new("absOffset", 4, Scalar::U32)];

	fn fromFields(fields: &mut FieldReader<'_>) -> Self {
		Self { absOffset: fields.u32() }
	}

	fn intoFields(&self, fields: &mut FieldWriter<'_>) -> Result<()> {
		fields.u32(self.absOffset)
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImageHeader {
	pub signature: [u8; 4],
	pub width: u16,
	pub height: u16,

	/// Bytes per packed row, padding included.
	pub rowLength: u16,
	pub bitsPerPixel: u16,
	pub paletteColors: u16,

	/// Carried through untouched.
	pub transparency: u16,
}

impl Record for ImageHeader {
	const NAME: &'static str = "ImageHeader";
	const FIELDS: &'static [Field] = &[
		Field::new("signature", 4, Scalar::Bytes),
		Field::new("width", 2, Scalar::U16),
		Field::new("height", 2, Scalar::U16),
		Field::new("rowLength", 2, Scalar::U16),
		Field::new("bitsPerPixel", 2, Scalar::U16),
		Field::new("paletteColors", 2, Scalar::U16),
		Field::new("transparency", 2, Scalar::U16),
	];

	fn fromFields(fields: &mut FieldReader<'_>) -> Self {
		Self {
			signature: fields.bytes(),
			width: fields.u16(),
			height: fields.u16(),
			rowLength: fields.u16(),
			bitsPerPixel: fields.u16(),
			paletteColors: fields.u16(),
			transparency: fields.u16(),
		}
	}

	fn intoFields(&self, fields: &mut FieldWriter<'_>) -> Result<()> {
		fields.bytes(&self.signature)?;
		fields.u16(self.width)?;
		fields.u16(self.height)?;
		fields.u16(self.rowLength)?;
		fields.u16(self.bitsPerPixel)?;
		fields.u16(self.paletteColors)?;
		fields.u16(self.transparency)
	}
}

#[derive(Clone, Debug)]
pub struct Resource {
	/// Position in the container, also the number its PNG is saved under.
	pub index: usize,
	pub imageHeader: ImageHeader,

	/// Palette table followed by the packed rows.
	pub payload: Vec<u8>,
}

impl Resource {
	pub fn parse(index: usize, span: &[u8]) -> Result<Self> {
		let cursor = &mut io::Cursor::new(span);
		let imageHeader = ImageHeader::read(cursor)?;
		debug!("resource #{index}: {imageHeader:?}");
		Ok(Self { index, imageHeader, payload: readRest(cursor).to_vec() })
	}

	pub fn decode(&self) -> Result<IndexedImage> {
		IndexedImage::decode(&self.imageHeader, &self.payload)
	}

	pub fn len(&self) -> usize {
		ImageHeader::SIZE + self.payload.len()
	}

	pub fn toBytes(&self) -> Result<Vec<u8>> {
		let mut bytes = self.imageHeader.toBytes()?;
		bytes.extend_from_slice(&self.payload);
		Ok(bytes)
	}
}

#[derive(Clone, Debug)]
pub struct ResFile {
	pub header: Header,
	pub toc: Vec<TocEntry>,
	pub resources: Vec<Resource>,
}

impl ResFile {
	pub fn parse(bytes: &[u8]) -> Result<Self> {
		let cursor = &mut io::Cursor::new(bytes);
		let header = Header::read(cursor)?;
		if header.resCount == 0 {
			return Err(Error::NoResources);
		}
		let toc = (0..header.resCount).map(|_| TocEntry::read(cursor)).collect::<Result<Vec<_>>>()?;
		let dataStart = cursor.position();
		debug!("{header:?}, resource data starts at {dataStart}");

		let mut resources = Vec::with_capacity(toc.len());
		let mut previous = 0;
		for (index, &TocEntry { absOffset }) in toc.iter().enumerate().skip(1) {
			let Some(length) = absOffset.checked_sub(previous) else {
				return Err(Error::NonMonotonicToc { index, offset: absOffset, previous });
			};
			debug!("resource #{}: {length} bytes at offset {}", index - 1, cursor.position());
			let span = readSpan(cursor, length as _, "Resource").inResource(index - 1)?;
			resources.push(Resource::parse(index - 1, span).inResource(index - 1)?);
			previous = absOffset;
		}
		let index = toc.len() - 1;
		debug!("resource #{index}: rest of the file from offset {}", cursor.position());
		resources.push(Resource::parse(index, readRest(cursor)).inResource(index)?);

		Ok(Self { header, toc, resources })
	}

	/// The container as parsed, from the retained payloads.
	pub fn toBytes(&self) -> Result<Vec<u8>> {
		let mut bytes = Vec::new();
		self.writeWith(&mut bytes, &self.toc, &self.resources.iter().map(Resource::toBytes).collect::<Result<Vec<_>>>()?)?;
		Ok(bytes)
	}

	/// Writes the header unchanged, the given TOC and the encoded resources in order.
	pub fn writeWith<W: Write>(&self, writer: &mut W, toc: &[TocEntry], resources: &[Vec<u8>]) -> Result<()> {
		self.header.write(writer)?;
		for entry in toc {
			entry.write(writer)?;
		}
		for resource in resources {
			writer.write_all(resource)?;
		}
		Ok(())
	}

	/// Offsets for resources of the given lengths; the leading entry is kept as is.
	pub fn recomputedToc(&self, lengths: impl IntoIterator<Item = usize>) -> Result<Vec<TocEntry>> {
		let mut toc = Vec::with_capacity(self.toc.len());
		toc.extend(self.toc.first().copied());
		let mut end = 0_usize;
		for length in lengths.into_iter().take(self.toc.len().saturating_sub(1)) {
			end += length;
			toc.push(TocEntry { absOffset: u32::try_from(end).map_err(|_| Error::OffsetOverflow(end))? });
		}
		Ok(toc)
	}

	pub fn metadata(&self) -> Metadata<'_> {
		Metadata {
			toc: self.toc.iter().map(|entry| entry.absOffset).collect(),
			header: &self.header,
			resources: self
				.resources
				.iter()
				.map(|resource| ResourceInfo {
					index: resource.index,
					length: resource.len(),
					imageHeader: &resource.imageHeader,
				})
				.collect(),
		}
	}
}

/// Container layout as printed by `info`. Plain values lead so TOML can put tables after them.
#[derive(Serialize)]
pub struct Metadata<'a> {
	pub toc: Vec<u32>,
	pub header: &'a Header,

	#[serde(rename = "resource")]
	pub resources: Vec<ResourceInfo<'a>>,
}

#[derive(Serialize)]
pub struct ResourceInfo<'a> {
	pub index: usize,
	pub length: usize,
	pub imageHeader: &'a ImageHeader,
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;

	pub(crate) const HEADER: Header =
		Header { signature: *b"HMRES", version: 1, reserved: [0; 10], resCount: 0 };

	pub(crate) fn imageHeader(width: u16, height: u16, rowLength: u16, bitsPerPixel: u16, paletteColors: u16) -> ImageHeader {
		ImageHeader { signature: *b"BM\x09\x02", width, height, rowLength, bitsPerPixel, paletteColors, transparency: 0 }
	}

	/// Lays resources out the way the container does, TOC included.
	pub(crate) fn container(resources: &[Vec<u8>]) -> Vec<u8> {
		let mut bytes = Header { resCount: resources.len() as _, ..HEADER }.toBytes().unwrap();
		let mut end = 0;
		TocEntry { absOffset: 0 }.write(&mut bytes).unwrap();
		for resource in &resources[..resources.len() - 1] {
			end += resource.len() as u32;
			TocEntry { absOffset: end }.write(&mut bytes).unwrap();
		}
		for resource in resources {
			bytes.extend_from_slice(resource);
		}
		bytes
	}

	fn resource(header: &ImageHeader, payload: &[u8]) -> Vec<u8> {
		let mut bytes = header.toBytes().unwrap();
		bytes.extend_from_slice(payload);
		bytes
	}

	#[test]
	fn header_layout() {
		let header = Header { resCount: 0x0102_0304, ..HEADER };
		let bytes = header.toBytes().unwrap();
		assert_eq!(Header::SIZE, 20);
		assert_eq!(&bytes[..5], b"HMRES");
		assert_eq!(bytes[5], 1);
		assert_eq!(&bytes[16..], [4, 3, 2, 1]);
		assert_eq!(Header::parse(&bytes).unwrap(), header);
	}

	#[test]
	fn image_header_layout() {
		let header = imageHeader(0x0102, 3, 4, 2, 4);
		let bytes = header.toBytes().unwrap();
		assert_eq!(ImageHeader::SIZE, 16);
		assert_eq!(bytes, [b'B', b'M', 9, 2, 2, 1, 3, 0, 4, 0, 2, 0, 4, 0, 0, 0]);
		assert_eq!(ImageHeader::parse(&bytes).unwrap(), header);
	}

	#[test]
	fn toc_entries_delimit_resources() {
		let resources = [
			resource(&imageHeader(1, 1, 1, 8, 0), &[7]),
			resource(&imageHeader(2, 1, 1, 2, 0), &[0xD0, 0xEE]),
			resource(&imageHeader(0, 0, 0, 1, 0), &[]),
			resource(&imageHeader(3, 1, 3, 8, 0), &[1, 2, 3, 4, 5]),
		];
		let bytes = container(&resources);
		let resFile = ResFile::parse(&bytes).unwrap();

		assert_eq!(resFile.header.resCount, 4);
		assert_eq!(
			resFile.toc.iter().map(|entry| entry.absOffset).collect::<Vec<_>>(),
			[0, 17, 35, 51]
		);
		assert_eq!(resFile.resources.len(), 4);
		for (index, (parsed, raw)) in resFile.resources.iter().zip(&resources).enumerate() {
			assert_eq!(parsed.index, index);
			assert_eq!(parsed.len(), raw.len());
			assert_eq!(parsed.toBytes().unwrap(), *raw);
		}
		assert_eq!(resFile.resources[1].payload, [0xD0, 0xEE]);
		assert!(resFile.resources[2].payload.is_empty());
		assert_eq!(resFile.resources[3].payload, [1, 2, 3, 4, 5]);
		assert_eq!(resFile.toBytes().unwrap(), bytes);
	}

	#[test]
	fn single_resource_takes_the_whole_tail() {
		let raw = resource(&imageHeader(2, 2, 1, 1, 0), &[0x80, 0x40, 0xFF]);
		let resFile = ResFile::parse(&container(&[raw.clone()])).unwrap();
		assert_eq!(resFile.toc, [TocEntry { absOffset: 0 }]);
		assert_eq!(resFile.resources[0].toBytes().unwrap(), raw);
	}

	#[test]
	fn short_toc_is_truncated() {
		let mut bytes = Header { resCount: 3, ..HEADER }.toBytes().unwrap();
		bytes.extend_from_slice(&[0, 0, 0, 0, 16, 0]);
		assert!(matches!(
			ResFile::parse(&bytes),
			Err(Error::TruncatedInput { record: "TocEntry", offset: 24, needed: 4, available: 2 })
		));
	}

	#[test]
	fn short_header_is_truncated() {
		assert!(matches!(ResFile::parse(b"HMRES"), Err(Error::TruncatedInput { record: "Header", .. })));
	}

	#[test]
	fn short_resource_is_truncated_and_located() {
		let resources = [resource(&imageHeader(1, 1, 1, 8, 0), &[7]), resource(&imageHeader(1, 1, 1, 8, 0), &[9])];
		let bytes = container(&resources);
		match ResFile::parse(&bytes[..30]) {
			Err(Error::Resource { index: 0, source }) => {
				assert!(matches!(*source, Error::TruncatedInput { record: "Resource", needed: 17, available: 2, .. }));
			}
			other => panic!("{other:?}"),
		}
		match ResFile::parse(&bytes[..bytes.len() - 10]) {
			Err(Error::Resource { index: 1, source }) => {
				assert!(matches!(*source, Error::TruncatedInput { record: "ImageHeader", .. }));
			}
			other => panic!("{other:?}"),
		}
	}

	#[test]
	fn decreasing_toc_is_refused() {
		let resources = vec![resource(&imageHeader(1, 1, 1, 8, 0), &[7]); 3];
		let mut bytes = container(&resources);
		bytes[28..32].copy_from_slice(&10_u32.to_le_bytes());
		assert!(matches!(
			ResFile::parse(&bytes),
			Err(Error::NonMonotonicToc { index: 2, offset: 10, previous: 17 })
		));
	}

	#[test]
	fn empty_container_is_refused() {
		assert!(matches!(ResFile::parse(&HEADER.toBytes().unwrap()), Err(Error::NoResources)));
	}

	#[test]
	fn toc_recomputed_from_lengths() {
		let resources = vec![resource(&imageHeader(1, 1, 1, 8, 0), &[7]); 3];
		let resFile = ResFile::parse(&container(&resources)).unwrap();
		let toc = resFile.recomputedToc([20, 30, 40]).unwrap();
		assert_eq!(toc.iter().map(|entry| entry.absOffset).collect::<Vec<_>>(), [0, 20, 50]);
		assert_eq!(resFile.recomputedToc(resFile.resources.iter().map(Resource::len)).unwrap(), resFile.toc);
		assert!(matches!(resFile.recomputedToc([usize::MAX / 2, 1 << 33]), Err(Error::OffsetOverflow(_))));
	}

	#[test]
	fn metadata_renders_as_toml() {
		let resources = [resource(&imageHeader(2, 1, 1, 2, 0), &[0xD0]), resource(&imageHeader(1, 1, 1, 8, 0), &[7])];
		let toml = toml::to_string(&ResFile::parse(&container(&resources)).unwrap().metadata()).unwrap();
		assert!(toml.starts_with("toc = [0, 17]"), "{toml}");
		assert!(toml.contains("resCount = 2"), "{toml}");
		assert!(toml.contains("[[resource]]"), "{toml}");
		assert!(toml.contains("bitsPerPixel = 2"), "{toml}");
	}
}
