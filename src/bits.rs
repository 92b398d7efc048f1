//! Palette indices packed MSB-first, `bitsPerPixel` bits each, into byte rows.

use {
	crate::{Error, Result},
	core::slice,
};

pub fn bitDepth(bitsPerPixel: u16) -> Result<u8> {
	match bitsPerPixel {
		1 | 2 | 4 | 8 => Ok(bitsPerPixel as _),
		_ => Err(Error::UnsupportedBitDepth(bitsPerPixel)),
	}
}

/// Bytes needed to hold `width` indices, the last one possibly partly filled.
pub const fn packedLen(width: usize, bitsPerPixel: u8) -> usize {
	(width * bitsPerPixel as usize + 7) / 8
}

/// Single bits of a byte buffer, most significant first.
pub struct Bits<'a> {
	bytes: slice::Iter<'a, u8>,
	current: u8,
	left: u32,
}

impl Iterator for Bits<'_> {
	type Item = u8;

	fn next(&mut self) -> Option<u8> {
		if self.left == 0 {
			self.current = *self.bytes.next()?;
			self.left = u8::BITS;
		}
		self.left -= 1;
		Some((self.current >> self.left) & 1)
	}
}

pub fn bits(bytes: &[u8]) -> Bits<'_> {
	Bits { bytes: bytes.iter(), current: 0, left: 0 }
}

/// Groups bits into indices; the first bit of a group is the most significant.
pub struct Indices<I> {
	bits: I,
	bitsPerPixel: u8,
}

impl<I: Iterator<Item = u8>> Iterator for Indices<I> {
	type Item = u8;

	fn next(&mut self) -> Option<u8> {
		let mut index = self.bits.next()?;
		for _ in 1..self.bitsPerPixel {
			match self.bits.next() {
				Some(bit) => index = index << 1 | bit,
				None => break,
			}
		}
		Some(index)
	}
}

/// Every index a packed row holds, padding included; `take(width)` drops the padding.
pub fn unpack(row: &[u8], bitsPerPixel: u8) -> Indices<Bits<'_>> {
	Indices { bits: bits(row), bitsPerPixel }
}

#[derive(Default)]
pub struct BitWriter {
	bytes: Vec<u8>,
	accumulator: u32,
	filled: u32,
}

impl BitWriter {
	pub fn add(&mut self, index: u8, bitsPerPixel: u8) {
		self.accumulator = self.accumulator << bitsPerPixel | u32::from(index);
		self.filled += u32::from(bitsPerPixel);
		if self.filled >= u8::BITS {
			self.bytes.push(self.accumulator as _);
			self.accumulator = 0;
			self.filled = 0;
		}
	}

	/// Flushes a partial byte with its bits moved to the top and zeros below.
	pub fn build(mut self) -> Vec<u8> {
		if self.filled > 0 {
			self.bytes.push((self.accumulator << (u8::BITS - self.filled)) as _);
		}
		self.bytes
	}
}

/// Packs one row and pads it with zero bytes up to `rowLength`.
pub fn packRow(
	indices: impl IntoIterator<Item = u8>,
	bitsPerPixel: u8,
	rowLength: usize,
	row: usize,
) -> Result<Vec<u8>> {
	let mut writer = BitWriter::default();
	for index in indices {
		if u32::from(index) >> bitsPerPixel != 0 {
			return Err(Error::PixelIndexOutOfRange { index, bitsPerPixel });
		}
		writer.add(index, bitsPerPixel);
	}
	let mut packed = writer.build();
	if packed.len() > rowLength {
		return Err(Error::RowLengthMismatch { row, needed: packed.len(), rowLength });
	}
	packed.resize(rowLength, 0);
	Ok(packed)
}

#[cfg(test)]
mod tests {
	use {super::*, rand::Rng};

	const DEPTHS: [u8; 4] = [1, 2, 4, 8];

	fn unpackRow(row: &[u8], width: usize, bitsPerPixel: u8) -> Vec<u8> {
		unpack(row, bitsPerPixel).take(width).collect()
	}

	#[test]
	fn two_bit_pair_packs_into_one_byte() {
		assert_eq!(packRow([3, 1], 2, 1, 0).unwrap(), [0b1101_0000]);
		assert_eq!(unpackRow(&[0xD0], 2, 2), [3, 1]);
	}

	#[test]
	fn bits_come_out_msb_first() {
		assert_eq!(bits(&[0b1010_0001]).collect::<Vec<_>>(), [1, 0, 1, 0, 0, 0, 0, 1]);
		assert_eq!(bits(&[0xFF, 0x00]).count(), 16);
	}

	#[test]
	fn unpack_yields_padding_until_taken() {
		assert_eq!(unpack(&[0b1110_0000], 1).collect::<Vec<_>>(), [1, 1, 1, 0, 0, 0, 0, 0]);
		assert_eq!(unpackRow(&[0b1110_0000], 3, 1), [1, 1, 1]);
		assert_eq!(unpackRow(&[0x12, 0x34], 3, 4), [1, 2, 3]);
		assert_eq!(unpackRow(&[0xAB, 0xCD], 2, 8), [0xAB, 0xCD]);
	}

	#[test]
	fn pack_unpack_round_trip() {
		let mut rng = rand::thread_rng();
		for bitsPerPixel in DEPTHS {
			for width in 0..40 {
				let indices: Vec<u8> = (0..width).map(|_| rng.gen_range(0..=u8::MAX >> (8 - bitsPerPixel))).collect();
				let rowLength = packedLen(width, bitsPerPixel);
				let row = packRow(indices.iter().copied(), bitsPerPixel, rowLength, 0).unwrap();
				assert_eq!(row.len(), rowLength);
				assert_eq!(unpackRow(&row, width, bitsPerPixel), indices, "{bitsPerPixel} bpp, width {width}");
			}
		}
	}

	#[test]
	fn padding_bits_are_zero() {
		let mut rng = rand::thread_rng();
		for bitsPerPixel in [1, 2, 4] {
			for width in 1..24 {
				let used = width * bitsPerPixel as usize % 8;
				if used == 0 {
					continue;
				}
				let indices: Vec<u8> = (0..width).map(|_| u8::MAX >> (8 - bitsPerPixel)).collect();
				let row = packRow(indices, bitsPerPixel, packedLen(width, bitsPerPixel), 0).unwrap();
				let last = *row.last().unwrap();
				assert_eq!(last & (0xFF >> used), 0, "{bitsPerPixel} bpp, width {width}");

				// garbage in the padding does not leak into the indices
				let mut dirty = row.clone();
				*dirty.last_mut().unwrap() |= rng.gen::<u8>() & (0xFF >> used);
				assert_eq!(unpackRow(&dirty, width, bitsPerPixel), unpackRow(&row, width, bitsPerPixel));
			}
		}
	}

	#[test]
	fn short_row_is_zero_padded() {
		assert_eq!(packRow([1, 1, 1], 1, 3, 0).unwrap(), [0b1110_0000, 0, 0]);
		assert_eq!(packRow([0_u8; 0], 4, 2, 0).unwrap(), [0, 0]);
	}

	#[test]
	fn long_row_is_refused() {
		assert!(matches!(
			packRow([0xA, 0xB, 0xC], 4, 1, 5),
			Err(Error::RowLengthMismatch { row: 5, needed: 2, rowLength: 1 })
		));
	}

	#[test]
	fn index_wider_than_depth_is_refused() {
		assert!(matches!(
			packRow([1, 4], 2, 1, 0),
			Err(Error::PixelIndexOutOfRange { index: 4, bitsPerPixel: 2 })
		));
		assert!(packRow([255], 8, 1, 0).is_ok());
	}

	#[test]
	fn only_power_of_two_depths_up_to_a_byte() {
		for bitsPerPixel in DEPTHS {
			assert_eq!(bitDepth(bitsPerPixel.into()).unwrap(), bitsPerPixel);
		}
		for bitsPerPixel in [0, 3, 5, 16, 24] {
			assert!(matches!(bitDepth(bitsPerPixel), Err(Error::UnsupportedBitDepth(depth)) if depth == bitsPerPixel));
		}
	}

	#[test]
	fn packed_len_rounds_up() {
		assert_eq!(packedLen(0, 4), 0);
		assert_eq!(packedLen(2, 2), 1);
		assert_eq!(packedLen(9, 1), 2);
		assert_eq!(packedLen(3, 4), 2);
		assert_eq!(packedLen(5, 8), 5);
	}
}
