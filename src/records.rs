//! Object program records.

use std::fmt::{Display, Formatter};
use std::io::Write;

#[allow(unused)]
use smartstring::alias::String;

use crate::common::{hex_field, MemoryAddress};

/// Maximum number of code bytes one text record may carry.
pub const MAX_TEXT_RECORD_BYTES: usize = 30;

/// The header record: program name, start address and total length.
#[derive(Clone, Debug)]
pub struct HeaderRecord {
	/// Program name, taken from the START label.
	pub name:   String,
	/// Absolute program start address.
	pub start:  MemoryAddress,
	/// Total program length (sum of block lengths).
	pub length: MemoryAddress,
}

impl Display for HeaderRecord {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let name: &str = &self.name;
		write!(f, "H{name:<6.6}{}{}", hex_field(self.start, 6), hex_field(self.length, 6))
	}
}

/// One text record: up to [`MAX_TEXT_RECORD_BYTES`] bytes of contiguous object code.
#[derive(Clone, Debug)]
pub struct TextRecord {
	/// Absolute address of the first byte.
	pub start: MemoryAddress,
	/// The object code as uppercase hex digits (two per byte).
	pub code:  String,
}

impl TextRecord {
	/// Number of code bytes in the record.
	#[must_use]
	pub fn length(&self) -> usize {
		self.code.len() / 2
	}
}

impl Display for TextRecord {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "T{}{}{}", hex_field(self.start, 6), hex_field(self.length() as MemoryAddress, 2), self.code)
	}
}

/// One modification record: a relocation directive for the loader.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ModificationRecord {
	/// Absolute address of the field to adjust.
	pub address:    MemoryAddress,
	/// Field length in half-bytes.
	pub half_bytes: u8,
}

impl Display for ModificationRecord {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "M{}{}", hex_field(self.address, 6), hex_field(MemoryAddress::from(self.half_bytes), 2))
	}
}

/// The end record: the first-executable absolute address.
#[derive(Clone, Copy, Debug)]
pub struct EndRecord {
	/// Where execution starts.
	pub first_instruction: MemoryAddress,
}

impl Display for EndRecord {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "E{}", hex_field(self.first_instruction, 6))
	}
}

/// The complete object program: header, text records, modification records, end record, in that order.
#[derive(Clone, Debug)]
pub struct ObjectProgram {
	/// The header record.
	pub header:        HeaderRecord,
	/// All text records, in emission order.
	pub text:          Vec<TextRecord>,
	/// All modification records, in emission order.
	pub modifications: Vec<ModificationRecord>,
	/// The end record.
	pub end:           EndRecord,
}

impl ObjectProgram {
	/// Write the object program, one record per line.
	///
	/// # Errors
	/// I/O errors from the writer.
	pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
		write!(writer, "{self}")
	}
}

impl Display for ObjectProgram {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		writeln!(f, "{}", self.header)?;
		for record in &self.text {
			writeln!(f, "{record}")?;
		}
		for record in &self.modifications {
			writeln!(f, "{record}")?;
		}
		writeln!(f, "{}", self.end)
	}
}

/// Accumulates object code into text records, splitting at the 30-byte limit and at address discontinuities.
#[derive(Debug, Default)]
pub struct TextRecordBuilder {
	records: Vec<TextRecord>,
	start:   MemoryAddress,
	code:    String,
	length:  usize,
}

impl TextRecordBuilder {
	/// Append object code residing at the given absolute address. Empty object code (RESW/RESB) only flushes the
	/// current record, since it leaves an address gap.
	pub fn append(&mut self, object_code: &str, address: MemoryAddress) {
		if object_code.is_empty() {
			self.flush();
			return;
		}
		let code_bytes = object_code.len() / 2;
		if self.length + code_bytes > MAX_TEXT_RECORD_BYTES
			|| (self.length > 0 && address != self.start + self.length as MemoryAddress)
		{
			self.flush();
		}
		if self.length == 0 {
			self.start = address;
		}
		self.code.push_str(object_code);
		self.length += code_bytes;
	}

	/// Emit the current record, if it holds any code.
	pub fn flush(&mut self) {
		if self.length > 0 {
			self.records.push(TextRecord { start: self.start, code: std::mem::take(&mut self.code) });
		}
		self.code.clear();
		self.length = 0;
	}

	/// Flush and return all emitted records.
	#[must_use]
	pub fn finish(mut self) -> Vec<TextRecord> {
		self.flush();
		self.records
	}
}

#[cfg(test)]
mod tests {
	use super::{EndRecord, HeaderRecord, ModificationRecord, TextRecordBuilder};

	#[test]
	fn record_serialization() {
		let header = HeaderRecord { name: "COPY".into(), start: 0x1000, length: 0x107A };
		assert_eq!(header.to_string(), "HCOPY  00100000107A");
		let modification = ModificationRecord { address: 0x1037, half_bytes: 5 };
		assert_eq!(modification.to_string(), "M00103705");
		let end = EndRecord { first_instruction: 0x1000 };
		assert_eq!(end.to_string(), "E001000");
	}

	#[test]
	fn text_records_split_at_the_byte_limit() {
		let mut builder = TextRecordBuilder::default();
		let mut address = 0x1000;
		for _ in 0 .. 11 {
			builder.append("032010", address);
			address += 3;
		}
		let records = builder.finish();
		assert_eq!(records.len(), 2);
		assert_eq!(records[0].start, 0x1000);
		assert_eq!(records[0].length(), 30);
		assert_eq!(records[1].start, 0x101E);
		assert_eq!(records[1].length(), 3);
	}

	#[test]
	fn address_gaps_start_a_new_record() {
		let mut builder = TextRecordBuilder::default();
		builder.append("032010", 0x1000);
		builder.append("032010", 0x1003);
		// RESW leaves a gap: empty code flushes, the next append re-anchors.
		builder.append("", 0x1006);
		builder.append("0F2016", 0x1024);
		let records = builder.finish();
		assert_eq!(records.len(), 2);
		assert_eq!(records[0].to_string(), "T00100006032010032010");
		assert_eq!(records[1].to_string(), "T001024030F2016");
	}
}
