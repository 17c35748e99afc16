//! Symbol table: a mutable builder filled by Pass 1 and an immutable, absolutized snapshot consumed by Pass 2.

use std::collections::BTreeMap;
use std::io::Write;

#[allow(unused)]
use smartstring::alias::String;

use crate::blocks::BlockLayout;
use crate::common::{BlockId, MemoryAddress};

/// Read-only symbol value access, for the expression evaluator.
pub trait SymbolLookup {
	/// The symbol's current value, or [`None`] if it is not defined.
	fn lookup(&self, symbol: &str) -> Option<MemoryAddress>;
}

/// A symbol's value before block finalization. The two variants keep block-relative offsets and assembly-time
/// constants apart so an offset cannot be used as an address before it has been rebased.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SymbolValue {
	/// An offset into the symbol's program block; rebased to an absolute address at finalization.
	BlockRelative(MemoryAddress),
	/// An assembly-time constant from `EQU`; never rebased and never relocated.
	Absolute(MemoryAddress),
}

impl SymbolValue {
	/// The raw numeric value, regardless of interpretation.
	#[must_use]
	pub const fn value(self) -> MemoryAddress {
		match self {
			Self::BlockRelative(value) | Self::Absolute(value) => value,
		}
	}
}

#[derive(Clone, Copy, Debug)]
struct PendingSymbol {
	value: SymbolValue,
	block: BlockId,
}

/// A finalized symbol.
#[derive(Clone, Copy, Debug)]
pub struct Symbol {
	/// The absolute address (or constant value).
	pub address:     MemoryAddress,
	/// The program block the symbol was defined in.
	pub block:       BlockId,
	/// Whether references to the symbol need a modification record. `EQU`-defined constants do not.
	pub relocatable: bool,
}

/// The symbol table Pass 1 builds up. All stored addresses are block-relative offsets (or `EQU` constants) until
/// [`Self::finalize`] turns the builder into an absolute [`SymbolTable`].
#[derive(Clone, Debug, Default)]
pub struct SymbolTableBuilder {
	entries: BTreeMap<String, PendingSymbol>,
}

impl SymbolTableBuilder {
	/// Define a symbol. Returns false (and changes nothing) if the name is already taken; the first definition
	/// wins and the caller reports the duplicate.
	pub fn insert(&mut self, symbol: &str, value: SymbolValue, block: BlockId) -> bool {
		if self.entries.contains_key(symbol) {
			return false;
		}
		self.entries.insert(symbol.into(), PendingSymbol { value, block });
		true
	}

	/// Rebase every block-relative entry onto the finished block layout, producing the immutable table Pass 2
	/// works with.
	#[must_use]
	pub fn finalize(self, layout: &BlockLayout) -> SymbolTable {
		let entries = self
			.entries
			.into_iter()
			.map(|(name, pending)| {
				let symbol = match pending.value {
					SymbolValue::BlockRelative(offset) => Symbol {
						address:     layout.absolute(pending.block, offset),
						block:       pending.block,
						relocatable: true,
					},
					SymbolValue::Absolute(value) =>
						Symbol { address: value, block: pending.block, relocatable: false },
				};
				(name, symbol)
			})
			.collect();
		SymbolTable { entries }
	}
}

impl SymbolLookup for SymbolTableBuilder {
	fn lookup(&self, symbol: &str) -> Option<MemoryAddress> {
		self.entries.get(symbol).map(|pending| pending.value.value())
	}
}

/// The finalized symbol table; every address is absolute.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
	entries: BTreeMap<String, Symbol>,
}

impl SymbolTable {
	/// Look up a finalized symbol.
	#[must_use]
	pub fn get(&self, symbol: &str) -> Option<Symbol> {
		self.entries.get(symbol).copied()
	}

	/// Iterate all symbols in name order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &Symbol)> {
		self.entries.iter().map(|(name, symbol)| (name.as_str(), symbol))
	}

	/// Write a human-readable dump of the table (sorted by name, so re-runs produce identical files).
	///
	/// # Errors
	/// I/O errors from the writer.
	pub fn write_table<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
		writeln!(writer, "{:<20}{:<15}{}", "Symbol", "Address", "Block")?;
		writeln!(writer, "{}", "-".repeat(45))?;
		for (name, symbol) in self.iter() {
			writeln!(writer, "{:<20}{:<15}{}", name, format!("0x{:04X}", symbol.address), symbol.block)?;
		}
		Ok(())
	}
}

impl SymbolLookup for SymbolTable {
	fn lookup(&self, symbol: &str) -> Option<MemoryAddress> {
		self.entries.get(symbol).map(|entry| entry.address)
	}
}

#[cfg(test)]
mod tests {
	use super::{SymbolLookup, SymbolTableBuilder, SymbolValue};
	use crate::blocks::BlockTable;

	#[test]
	fn first_definition_wins() {
		let mut builder = SymbolTableBuilder::default();
		assert!(builder.insert("ALPHA", SymbolValue::BlockRelative(0x10), 0));
		assert!(!builder.insert("ALPHA", SymbolValue::BlockRelative(0x20), 0));
		assert_eq!(builder.lookup("ALPHA"), Some(0x10));
	}

	#[test]
	fn finalize_rebases_relative_entries_only() {
		let mut blocks = BlockTable::new();
		blocks.advance(0x30);
		let mut builder = SymbolTableBuilder::default();
		builder.insert("LABEL", SymbolValue::BlockRelative(0x8), 0);
		builder.insert("MAXLEN", SymbolValue::Absolute(0x1000), 0);
		let layout = blocks.finalize(0x4000);
		let table = builder.finalize(&layout);
		let label = table.get("LABEL").unwrap();
		assert_eq!(label.address, 0x4008);
		assert!(label.relocatable);
		let maxlen = table.get("MAXLEN").unwrap();
		assert_eq!(maxlen.address, 0x1000);
		assert!(!maxlen.relocatable);
	}
}
