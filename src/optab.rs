//! Operation code table.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

#[allow(unused)]
use smartstring::alias::String;

use crate::common::MemoryAddress;
use crate::error::report_warning;
use crate::source::AssemblyCode;
use crate::AssemblyError;

/// Mnemonics encoded in one byte with no operand field.
const FORMAT_1_MNEMONICS: [&str; 6] = ["FIX", "FLOAT", "HIO", "NORM", "SIO", "TIO"];
/// Mnemonics encoded in two bytes with register operands.
const FORMAT_2_MNEMONICS: [&str; 11] =
	["ADDR", "CLEAR", "COMPR", "DIVR", "MULR", "RMO", "SHIFTL", "SHIFTR", "SUBR", "SVC", "TIXR"];

/// Base encoding format of an instruction. Format 4 is not a table attribute; it is selected per line with the `+`
/// prefix.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InstructionFormat {
	/// One byte: just the opcode.
	One,
	/// Two bytes: opcode and two register nibbles.
	Two,
	/// Three bytes: opcode, nixbpe flags and a 12-bit displacement.
	Three,
}

impl InstructionFormat {
	/// Encoded length in bytes.
	#[must_use]
	pub const fn length(self) -> MemoryAddress {
		match self {
			Self::One => 1,
			Self::Two => 2,
			Self::Three => 3,
		}
	}
}

/// One operation table entry.
#[derive(Clone, Copy, Debug)]
pub struct InstructionInfo {
	/// Opcode byte with the low two bits cleared; they hold the n/i flags at encode time.
	pub opcode: u8,
	/// Base encoding format.
	pub format: InstructionFormat,
}

/// The operation table, loaded once from a plaintext file and immutable thereafter.
#[derive(Clone, Debug, Default)]
pub struct Optab {
	table: BTreeMap<String, InstructionInfo>,
}

impl Optab {
	/// Load the operation table from a file.
	///
	/// # Errors
	/// If the file cannot be read. Malformed records inside a readable file are skipped with a warning.
	pub fn load(file_name: &str) -> Result<Self, AssemblyError> {
		Ok(Self::parse(&AssemblyCode::from_file_or_assembly_error(file_name)?))
	}

	/// Parse the operation table from already-loaded source text. One record per line, `MNEMONIC OPCODE` with a
	/// two-digit hexadecimal opcode; blank lines and `#` comments are skipped.
	#[must_use]
	pub fn parse(source_code: &Arc<AssemblyCode>) -> Self {
		let mut table = BTreeMap::new();
		let mut offset = 0;
		for line in source_code.text.lines() {
			let record = line.trim();
			if !record.is_empty() && !record.starts_with('#') {
				let mut fields = record.split_whitespace();
				let entry = match (fields.next(), fields.next().map(|digits| u8::from_str_radix(digits, 16))) {
					(Some(mnemonic), Some(Ok(opcode))) =>
						Some((mnemonic, InstructionInfo { opcode: opcode & 0xFC, format: Self::classify(mnemonic) })),
					_ => None,
				};
				match entry {
					Some((mnemonic, info)) => {
						table.insert(mnemonic.into(), info);
					},
					None => report_warning(AssemblyError::MalformedOptabRecord {
						record:   record.into(),
						src:      source_code.clone(),
						location: (offset, line.trim_end().len()).into(),
					}),
				}
			}
			offset += line.len() + 1;
		}
		Self { table }
	}

	/// The hard-coded format rule set: a handful of mnemonics are format 1 or 2, everything else is format 3.
	fn classify(mnemonic: &str) -> InstructionFormat {
		if FORMAT_1_MNEMONICS.contains(&mnemonic) {
			InstructionFormat::One
		} else if FORMAT_2_MNEMONICS.contains(&mnemonic) {
			InstructionFormat::Two
		} else {
			InstructionFormat::Three
		}
	}

	/// Whether the mnemonic names a machine instruction (as opposed to a directive).
	#[must_use]
	pub fn is_instruction(&self, mnemonic: &str) -> bool {
		self.table.contains_key(mnemonic)
	}

	/// Look up the table entry for a mnemonic.
	#[must_use]
	pub fn get(&self, mnemonic: &str) -> Option<InstructionInfo> {
		self.table.get(mnemonic).copied()
	}

	/// Write a human-readable dump of the table.
	///
	/// # Errors
	/// I/O errors from the writer.
	pub fn write_table<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
		writeln!(writer, "{:<10}{:<10}{}", "Mnemonic", "Opcode", "Format")?;
		writeln!(writer, "{}", "-".repeat(28))?;
		for (mnemonic, info) in &self.table {
			writeln!(writer, "{:<10}{:<10}{}", mnemonic, format!("{:02X}", info.opcode), info.format.length())?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::{InstructionFormat, Optab};
	use crate::AssemblyCode;

	#[test]
	fn records_parse_and_classify() {
		let source = Arc::new(AssemblyCode::new("# comment\nLDA 00\nCLEAR B4\nFIX C4\n\nTD E0\n", "<optab>"));
		let optab = Optab::parse(&source);
		assert!(optab.is_instruction("LDA"));
		assert!(!optab.is_instruction("WORD"));
		assert_eq!(optab.get("LDA").unwrap().format, InstructionFormat::Three);
		assert_eq!(optab.get("CLEAR").unwrap().format, InstructionFormat::Two);
		assert_eq!(optab.get("FIX").unwrap().format, InstructionFormat::One);
		assert_eq!(optab.get("TD").unwrap().opcode, 0xE0);
	}

	#[test]
	fn opcodes_are_masked_for_the_ni_bits() {
		let source = Arc::new(AssemblyCode::new("COMP 29\nJEQ 33\n", "<optab>"));
		let optab = Optab::parse(&source);
		assert_eq!(optab.get("COMP").unwrap().opcode, 0x28);
		assert_eq!(optab.get("JEQ").unwrap().opcode, 0x30);
	}
}
