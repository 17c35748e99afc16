//! Literal table: an insertion-ordered set of literals whose order is also the pool-flush order.

use std::io::Write;

#[allow(unused)]
use smartstring::alias::String;

use crate::common::{hex_field, MemoryAddress};
use crate::parser::quoted_body;

/// One literal. The name is the canonical spelling including the leading `=`; the value is the raw text after it.
#[derive(Clone, Debug)]
pub struct Literal {
	/// Canonical spelling, e.g. `=C'EOF'`.
	pub name:    String,
	/// Value text without the `=`, e.g. `C'EOF'`.
	pub value:   String,
	/// Address assigned when a pool flush places the literal; [`None`] until then.
	pub address: Option<MemoryAddress>,
	/// Size in bytes, floored to a word (3 bytes).
	pub length:  MemoryAddress,
}

impl Literal {
	fn new(canonical: &str) -> Self {
		let value = canonical.strip_prefix('=').unwrap_or(canonical);
		Self { name: canonical.into(), value: value.into(), address: None, length: Self::length_of(value) }
	}

	/// Length rules: `C'...'` is the character count, `X'...'` is the hex-digit count rounded up to whole bytes,
	/// and a plain number occupies a word. Anything shorter than a word is floored to one.
	fn length_of(value: &str) -> MemoryAddress {
		let natural = if value.starts_with("C'") {
			quoted_body(value).map_or(0, |body| body.len() as MemoryAddress)
		} else if value.starts_with("X'") {
			quoted_body(value).map_or(0, |body| (body.len() as MemoryAddress + 1) / 2)
		} else {
			3
		};
		natural.max(3)
	}

	/// The literal's bytes as uppercase hex. Character data is padded on the right with zero bytes up to the
	/// literal's length; hexadecimal and numeric data zero-extends on the left.
	#[must_use]
	pub fn object_code(&self) -> String {
		let width = (self.length as usize) * 2;
		if self.value.starts_with("C'") {
			let mut code: String = quoted_body(&self.value)
				.unwrap_or_default()
				.bytes()
				.map(|byte| format!("{byte:02X}"))
				.collect::<std::string::String>()
				.into();
			while code.len() < width {
				code.push_str("00");
			}
			code
		} else if self.value.starts_with("X'") {
			let digits = quoted_body(&self.value).unwrap_or_default().to_uppercase();
			format!("{digits:0>width$}").into()
		} else {
			let value = self.value.parse().unwrap_or(0);
			hex_field(value, width)
		}
	}
}

/// The literal table.
#[derive(Clone, Debug, Default)]
pub struct LiteralTable {
	entries: Vec<Literal>,
}

impl LiteralTable {
	/// Record a literal in insertion order. Inserting a literal that is already present does nothing.
	pub fn insert(&mut self, canonical: &str) {
		if self.get(canonical).is_none() {
			self.entries.push(Literal::new(canonical));
		}
	}

	/// Look up a literal by its canonical spelling.
	#[must_use]
	pub fn get(&self, canonical: &str) -> Option<&Literal> {
		self.entries.iter().find(|literal| literal.name == canonical)
	}

	/// Assign the address a pool flush placed the literal at.
	pub fn assign_address(&mut self, canonical: &str, address: MemoryAddress) {
		if let Some(literal) = self.entries.iter_mut().find(|literal| literal.name == canonical) {
			literal.address = Some(address);
		}
	}

	/// The literals no pool has placed yet, in insertion order.
	#[must_use]
	pub fn unassigned(&self) -> Vec<Literal> {
		self.entries.iter().filter(|literal| literal.address.is_none()).cloned().collect()
	}

	/// Iterate all literals in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = &Literal> {
		self.entries.iter()
	}

	/// Write a human-readable dump of the table.
	///
	/// # Errors
	/// I/O errors from the writer.
	pub fn write_table<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
		writeln!(writer, "{:<20}{:<20}{:<15}{}", "Literal", "Value", "Address", "Length")?;
		writeln!(writer, "{}", "-".repeat(61))?;
		for literal in &self.entries {
			let address = literal
				.address
				.map_or_else(|| "unassigned".to_string(), |address| format!("0x{address:04X}"));
			writeln!(writer, "{:<20}{:<20}{:<15}{}", literal.name, literal.value, address, literal.length)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::LiteralTable;

	#[test]
	fn lengths_floor_to_a_word() {
		let mut table = LiteralTable::default();
		table.insert("=C'EOF'");
		table.insert("=X'05'");
		table.insert("=4096");
		table.insert("=C'RECORDS'");
		assert_eq!(table.get("=C'EOF'").unwrap().length, 3);
		assert_eq!(table.get("=X'05'").unwrap().length, 3);
		assert_eq!(table.get("=4096").unwrap().length, 3);
		assert_eq!(table.get("=C'RECORDS'").unwrap().length, 7);
	}

	#[test]
	fn insertion_is_idempotent_and_ordered() {
		let mut table = LiteralTable::default();
		table.insert("=C'EOF'");
		table.insert("=X'05'");
		table.insert("=C'EOF'");
		let unassigned = table.unassigned();
		assert_eq!(unassigned.len(), 2);
		assert_eq!(unassigned[0].name, "=C'EOF'");
		assert_eq!(unassigned[1].name, "=X'05'");

		table.assign_address("=C'EOF'", 0x2000);
		assert_eq!(table.unassigned().len(), 1);
		assert_eq!(table.get("=C'EOF'").unwrap().address, Some(0x2000));
	}

	#[test]
	fn object_code_padding() {
		let mut table = LiteralTable::default();
		table.insert("=C'EOF'");
		table.insert("=X'05'");
		table.insert("=5");
		table.insert("=C'AB'");
		assert_eq!(table.get("=C'EOF'").unwrap().object_code(), "454F46");
		assert_eq!(table.get("=X'05'").unwrap().object_code(), "000005");
		assert_eq!(table.get("=5").unwrap().object_code(), "000005");
		assert_eq!(table.get("=C'AB'").unwrap().object_code(), "414200");
	}
}
