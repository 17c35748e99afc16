//! Program blocks: named, independently-counted regions of the output program.

#[allow(unused)]
use smartstring::alias::String;

use crate::common::{BlockId, MemoryAddress};

/// Name of the block that is active when assembly starts.
pub const DEFAULT_BLOCK: &str = "DEFAULT";

#[derive(Clone, Debug)]
struct BlockState {
	name:   String,
	locctr: MemoryAddress,
}

/// All program blocks while Pass 1 runs. Block ids are dense indices in first-encounter order; each block keeps
/// its own location counter, and the active one belongs to the current block.
#[derive(Clone, Debug)]
pub struct BlockTable {
	blocks:  Vec<BlockState>,
	current: BlockId,
}

impl BlockTable {
	/// Create the table with the implicit `DEFAULT` block active at id 0.
	#[must_use]
	pub fn new() -> Self {
		Self { blocks: vec![BlockState { name: DEFAULT_BLOCK.into(), locctr: 0 }], current: 0 }
	}

	/// Id of the currently active block.
	#[must_use]
	pub const fn current(&self) -> BlockId {
		self.current
	}

	/// The active block's location counter.
	#[must_use]
	pub fn locctr(&self) -> MemoryAddress {
		self.blocks[self.current].locctr
	}

	/// Overwrite the active block's location counter (`ORG`). Revisiting already-used ranges afterwards is the
	/// programmer's responsibility.
	pub fn set_locctr(&mut self, value: MemoryAddress) {
		self.blocks[self.current].locctr = value;
	}

	/// Advance the active block's location counter.
	pub fn advance(&mut self, amount: MemoryAddress) {
		self.blocks[self.current].locctr += amount;
	}

	/// Switch to the named block (`USE`), creating it with the next id on first encounter. An empty name switches
	/// back to `DEFAULT`. Each block's location counter survives across switches.
	pub fn switch_to(&mut self, name: &str) -> BlockId {
		let name = if name.is_empty() { DEFAULT_BLOCK } else { name };
		self.current = self.blocks.iter().position(|block| block.name == name).unwrap_or_else(|| {
			self.blocks.push(BlockState { name: name.into(), locctr: 0 });
			self.blocks.len() - 1
		});
		self.current
	}

	/// Lay the blocks out in id order starting at the program's start address. Each block's length is its final
	/// location counter.
	#[must_use]
	pub fn finalize(self, program_start: MemoryAddress) -> BlockLayout {
		let mut start = program_start;
		let blocks = self
			.blocks
			.into_iter()
			.enumerate()
			.map(|(id, block)| {
				let placed = ProgramBlock { name: block.name, id, start, length: block.locctr };
				start += placed.length;
				placed
			})
			.collect();
		BlockLayout { blocks }
	}
}

impl Default for BlockTable {
	fn default() -> Self {
		Self::new()
	}
}

/// One finalized program block.
#[derive(Clone, Debug)]
pub struct ProgramBlock {
	/// The block's source-level name.
	pub name:   String,
	/// Dense id in first-encounter order.
	pub id:     BlockId,
	/// Absolute start address.
	pub start:  MemoryAddress,
	/// Final length in bytes.
	pub length: MemoryAddress,
}

/// The finished program layout: blocks in id order with assigned start addresses.
#[derive(Clone, Debug)]
pub struct BlockLayout {
	blocks: Vec<ProgramBlock>,
}

impl BlockLayout {
	/// Turn a block-relative offset into an absolute address.
	#[must_use]
	pub fn absolute(&self, block: BlockId, offset: MemoryAddress) -> MemoryAddress {
		self.blocks.get(block).map_or(offset, |block| block.start + offset)
	}

	/// Total program length: the sum of all block lengths.
	#[must_use]
	pub fn total_length(&self) -> MemoryAddress {
		self.blocks.iter().map(|block| block.length).sum()
	}

	/// Iterate the blocks in id order.
	pub fn iter(&self) -> impl Iterator<Item = &ProgramBlock> {
		self.blocks.iter()
	}
}

#[cfg(test)]
mod tests {
	use super::BlockTable;

	#[test]
	fn counters_survive_block_switches() {
		let mut blocks = BlockTable::new();
		blocks.advance(0x30);
		let cdata = blocks.switch_to("CDATA");
		assert_eq!(cdata, 1);
		assert_eq!(blocks.locctr(), 0);
		blocks.advance(0x10);
		blocks.switch_to("");
		assert_eq!(blocks.current(), 0);
		assert_eq!(blocks.locctr(), 0x30);
		blocks.switch_to("CDATA");
		assert_eq!(blocks.locctr(), 0x10);
	}

	#[test]
	fn layout_is_contiguous_in_id_order() {
		let mut blocks = BlockTable::new();
		blocks.advance(0x30);
		blocks.switch_to("CDATA");
		blocks.advance(0x10);
		blocks.switch_to("CBLKS");
		blocks.advance(0x1000);
		let layout = blocks.finalize(0x0);
		let starts: Vec<_> = layout.iter().map(|block| block.start).collect();
		assert_eq!(starts, [0x0, 0x30, 0x40]);
		assert_eq!(layout.total_length(), 0x1040);
		assert_eq!(layout.absolute(2, 0x8), 0x48);
	}
}
