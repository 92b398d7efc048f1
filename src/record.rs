//! Fixed-layout records.
//!
//! Each record kind declares its layout once, as a static table of [`Field`]
//! descriptors, and both directions walk that same table: [`FieldReader`] hands
//! out exactly the declared bytes per field, [`FieldWriter`] refuses any field
//! whose serialized size disagrees with its declaration. Integers are
//! little-endian throughout the container.

use {
	crate::{Error, Result},
	byteorder::{ByteOrder, WriteBytesExt, LE},
	core::slice,
	std::io::{self, Write},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scalar {
	Bytes,
	U8,
	U16,
	U32,
}

#[derive(Clone, Copy, Debug)]
pub struct Field {
	pub name: &'static str,
	pub width: usize,
	pub scalar: Scalar,
}

impl Field {
	pub const fn new(name: &'static str, width: usize, scalar: Scalar) -> Self {
		Self { name, width, scalar }
	}
}

pub const fn totalWidth(fields: &[Field]) -> usize {
	let (mut i, mut total) = (0, 0);
	while i < fields.len() {
		total += fields[i].width;
		i += 1;
	}
	total
}

pub trait Record: Sized {
	const NAME: &'static str;
	const FIELDS: &'static [Field];
	const SIZE: usize = totalWidth(Self::FIELDS);

	fn fromFields(fields: &mut FieldReader<'_>) -> Self;
	fn intoFields(&self, fields: &mut FieldWriter<'_>) -> Result<()>;

	/// Consumes exactly [`Self::SIZE`] bytes at the cursor's position.
	fn read(cursor: &mut io::Cursor<&[u8]>) -> Result<Self> {
		let bytes = readSpan(cursor, Self::SIZE, Self::NAME)?;
		Ok(Self::fromFields(&mut FieldReader { fields: Self::FIELDS.iter(), bytes }))
	}

	fn parse(bytes: &[u8]) -> Result<Self> {
		Self::read(&mut io::Cursor::new(bytes))
	}

	fn toBytes(&self) -> Result<Vec<u8>> {
		let mut bytes = Vec::with_capacity(Self::SIZE);
		let mut fields = FieldWriter { record: Self::NAME, fields: Self::FIELDS.iter(), out: &mut bytes };
		self.intoFields(&mut fields)?;
		fields.finish()?;
		Ok(bytes)
	}

	fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
		writer.write_all(&self.toBytes()?)?;
		Ok(())
	}
}

pub struct FieldReader<'a> {
	fields: slice::Iter<'static, Field>,
	bytes: &'a [u8],
}

impl<'a> FieldReader<'a> {
	fn next(&mut self, scalar: Scalar) -> &'a [u8] {
		let field = self.fields.next().expect("record reads more fields than it declares");
		debug_assert_eq!(field.scalar, scalar, "{}", field.name);
		let (head, tail) = self.bytes.split_at(field.width);
		self.bytes = tail;
		head
	}

	pub fn bytes<const N: usize>(&mut self) -> [u8; N] {
		let mut array = [0; N];
		array.copy_from_slice(self.next(Scalar::Bytes));
		array
	}

	pub fn u8(&mut self) -> u8 {
		self.next(Scalar::U8)[0]
	}

	pub fn u16(&mut self) -> u16 {
		LE::read_u16(self.next(Scalar::U16))
	}

	pub fn u32(&mut self) -> u32 {
		LE::read_u32(self.next(Scalar::U32))
	}
}

pub struct FieldWriter<'a> {
	record: &'static str,
	fields: slice::Iter<'static, Field>,
	out: &'a mut Vec<u8>,
}

impl FieldWriter<'_> {
	fn put(&mut self, scalar: Scalar, encode: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> Result<()> {
		let start = self.out.len();
		encode(&mut *self.out)?;
		let actual = self.out.len() - start;
		let Some(field) = self.fields.next() else {
			return Err(Error::FieldSizeMismatch { record: self.record, field: "<undeclared>", declared: 0, actual });
		};
		debug_assert_eq!(field.scalar, scalar, "{}", field.name);
		if actual != field.width {
			return Err(Error::FieldSizeMismatch {
				record: self.record,
				field: field.name,
				declared: field.width,
				actual,
			});
		}
		Ok(())
	}

	pub fn bytes(&mut self, value: &[u8]) -> Result<()> {
		self.put(Scalar::Bytes, |out| out.write_all(value))
	}

	pub fn u8(&mut self, value: u8) -> Result<()> {
		self.put(Scalar::U8, |out| out.write_u8(value))
	}

	pub fn u16(&mut self, value: u16) -> Result<()> {
		self.put(Scalar::U16, |out| out.write_u16::<LE>(value))
	}

	pub fn u32(&mut self, value: u32) -> Result<()> {
		self.put(Scalar::U32, |out| out.write_u32::<LE>(value))
	}

	fn finish(mut self) -> Result<()> {
		match self.fields.next() {
			Some(field) => Err(Error::FieldSizeMismatch {
				record: self.record,
				field: field.name,
				declared: field.width,
				actual: 0,
			}),
			None => Ok(()),
		}
	}
}

/// Takes the next `len` bytes off the cursor.
pub fn readSpan<'a>(cursor: &mut io::Cursor<&'a [u8]>, len: usize, what: &'static str) -> Result<&'a [u8]> {
	let (offset, underlyingSlice) = (cursor.position(), *cursor.get_ref());
	let rest = underlyingSlice.get(offset as usize..).unwrap_or_default();
	let Some(span) = rest.get(..len) else {
		return Err(Error::TruncatedInput { record: what, offset, needed: len, available: rest.len() });
	};
	cursor.set_position(offset + len as u64);
	Ok(span)
}

/// Takes whatever is left on the cursor.
pub fn readRest<'a>(cursor: &mut io::Cursor<&'a [u8]>) -> &'a [u8] {
	let (offset, underlyingSlice) = (cursor.position(), *cursor.get_ref());
	let rest = underlyingSlice.get(offset as usize..).unwrap_or_default();
	cursor.set_position(underlyingSlice.len() as _);
	rest
}
