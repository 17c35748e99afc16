//! Pass 1: location assignment, symbol and literal collection, intermediate-stream construction.

use std::sync::Arc;

use miette::SourceSpan;
#[allow(unused)]
use smartstring::alias::String;

use crate::blocks::{BlockLayout, BlockTable};
use crate::common::{BlockId, MemoryAddress};
use crate::error::report_warning;
use crate::littab::LiteralTable;
use crate::optab::Optab;
use crate::parser::{self, expression, SourceLine};
use crate::source::AssemblyCode;
use crate::symtab::{SymbolTable, SymbolTableBuilder, SymbolValue};
use crate::AssemblyError;

/// One record of the intermediate stream, in source order. Pass 2 never mutates these; the object code it computes
/// lives in an index-aligned sequence of its own.
#[derive(Clone, Debug)]
pub struct IntermediateLine {
	/// Block-relative location. For START this is the absolute start address instead.
	pub location:     MemoryAddress,
	/// Block the line was assembled into.
	pub block:        BlockId,
	/// Label field; literal-pool entries use the reserved label `*`.
	pub label:        Option<String>,
	/// Mnemonic or directive (for pool entries: the literal's canonical name).
	pub opcode:       String,
	/// Verbatim operand text.
	pub operand:      String,
	/// Whether the `+` format-4 prefix was present.
	pub extended:     bool,
	/// Whether `location` is meaningful for this line.
	pub has_location: bool,
	/// Source location, for Pass-2 diagnostics.
	pub span:         SourceSpan,
}

impl IntermediateLine {
	/// Whether this record is a literal placed by a pool flush.
	#[must_use]
	pub fn is_literal(&self) -> bool {
		self.label.as_deref() == Some("*")
	}

	fn from_line(line: &SourceLine, location: MemoryAddress, block: BlockId, has_location: bool) -> Self {
		Self {
			location,
			block,
			label: line.label.clone(),
			opcode: line.opcode.clone(),
			operand: line.operand.clone(),
			extended: line.extended,
			has_location,
			span: line.span,
		}
	}
}

/// Everything Pass 1 produces: the immutable inputs of Pass 2.
#[derive(Debug)]
pub struct Pass1Output {
	/// Program name from the START label.
	pub program_name:  String,
	/// Absolute start address from the START operand.
	pub start_address: MemoryAddress,
	/// The intermediate stream, in source order.
	pub intermediate:  Vec<IntermediateLine>,
	/// The finalized symbol table; every address is absolute.
	pub symbols:       SymbolTable,
	/// The literal table, with every literal placed.
	pub literals:      LiteralTable,
	/// The finished block layout.
	pub layout:        BlockLayout,
}

/// Walk the source line by line, building the tables and the intermediate stream, and finalize the program layout
/// at END.
///
/// All problems Pass 1 encounters are recoverable and reported as warnings; the walk itself always completes.
#[must_use]
pub fn run(optab: &Optab, source_code: &Arc<AssemblyCode>) -> Pass1Output {
	let mut state = Pass1State {
		optab,
		source_code,
		symbols: SymbolTableBuilder::default(),
		literals: LiteralTable::default(),
		blocks: BlockTable::new(),
		intermediate: Vec::new(),
		program_name: String::new(),
		start_address: 0,
	};

	let mut saw_end = false;
	let mut offset = 0;
	for raw_line in source_code.text.lines() {
		let parsed = parser::parse_line(raw_line, offset);
		offset += raw_line.len() + 1;
		if let Some(line) = parsed {
			if state.process(&line) {
				saw_end = true;
				break;
			}
		}
	}
	if !saw_end {
		let end_of_input = (source_code.text.len().saturating_sub(1), 0).into();
		report_warning(AssemblyError::MissingEnd { src: source_code.clone(), location: end_of_input });
		state.flush_literal_pool(end_of_input);
	}

	state.into_output()
}

struct Pass1State<'run> {
	optab:         &'run Optab,
	source_code:   &'run Arc<AssemblyCode>,
	symbols:       SymbolTableBuilder,
	literals:      LiteralTable,
	blocks:        BlockTable,
	intermediate:  Vec<IntermediateLine>,
	program_name:  String,
	start_address: MemoryAddress,
}

impl Pass1State<'_> {
	/// Handle one source line. Returns whether this was the END line and the walk should stop.
	fn process(&mut self, line: &SourceLine) -> bool {
		match line.opcode.as_str() {
			"START" => {
				self.program_name = line.label.clone().unwrap_or_default();
				self.start_address = self.parse_start_address(line);
				self.push(line, self.start_address, true);
			},
			"EQU" => self.process_equ(line),
			"ORG" => {
				let target = self.evaluate_or_zero(&line.operand, line.span, &line.opcode);
				self.blocks.set_locctr(target);
				self.push(line, target, true);
			},
			"USE" => {
				self.blocks.switch_to(&line.operand);
				self.push(line, self.blocks.locctr(), false);
			},
			"LTORG" => {
				self.flush_literal_pool(line.span);
				self.push(line, 0, false);
			},
			"BASE" | "NOBASE" => self.push(line, 0, false),
			"END" => {
				self.flush_literal_pool(line.span);
				self.push(line, 0, false);
				return true;
			},
			_ => self.process_statement(line),
		}
		false
	}

	/// Instructions and storage directives: define the label, collect a literal operand, compute the length,
	/// advance the location counter.
	fn process_statement(&mut self, line: &SourceLine) {
		let location = self.blocks.locctr();

		if let Some(label) = &line.label {
			if !self.symbols.insert(label, SymbolValue::BlockRelative(location), self.blocks.current()) {
				report_warning(AssemblyError::DuplicateSymbol {
					symbol:   label.clone(),
					src:      self.source_code.clone(),
					location: line.span,
				});
			}
		}

		let (_, _, cleaned) = parser::strip_addressing(&line.operand);
		if cleaned.starts_with('=') {
			self.literals.insert(cleaned);
		}

		let length = self.optab.get(&line.opcode).map_or_else(
			|| self.directive_length(line),
			|info| if line.extended { 4 } else { info.format.length() },
		);
		self.push(line, location, true);
		self.blocks.advance(length);
	}

	fn process_equ(&mut self, line: &SourceLine) {
		let Some(label) = &line.label else {
			report_warning(AssemblyError::EquWithoutLabel { src: self.source_code.clone(), location: line.span });
			return;
		};
		let value = self.evaluate_or_zero(&line.operand, line.span, &line.opcode);
		if !self.symbols.insert(label, SymbolValue::Absolute(value), self.blocks.current()) {
			report_warning(AssemblyError::DuplicateSymbol {
				symbol:   label.clone(),
				src:      self.source_code.clone(),
				location: line.span,
			});
		}
		self.push(line, 0, false);
	}

	/// Place every so-far-unplaced literal at the current location counter, in insertion order, emitting a pool
	/// record (label `*`) for each.
	fn flush_literal_pool(&mut self, span: SourceSpan) {
		for literal in self.literals.unassigned() {
			let location = self.blocks.locctr();
			self.literals.assign_address(&literal.name, location);
			self.intermediate.push(IntermediateLine {
				location,
				block: self.blocks.current(),
				label: Some("*".into()),
				opcode: literal.name.clone(),
				operand: literal.value.clone(),
				extended: false,
				has_location: true,
				span,
			});
			self.blocks.advance(literal.length);
		}
	}

	fn parse_start_address(&self, line: &SourceLine) -> MemoryAddress {
		if line.operand.is_empty() {
			report_warning(AssemblyError::MissingOperand {
				opcode:   line.opcode.clone(),
				src:      self.source_code.clone(),
				location: line.span,
			});
			return 0;
		}
		MemoryAddress::from_str_radix(&line.operand, 16).unwrap_or_else(|_| {
			report_warning(AssemblyError::InvalidStartAddress {
				operand:  line.operand.clone(),
				src:      self.source_code.clone(),
				location: line.span,
			});
			0
		})
	}

	fn directive_length(&self, line: &SourceLine) -> MemoryAddress {
		match line.opcode.as_str() {
			"WORD" => 3,
			"RESW" => 3 * self.evaluate_or_zero(&line.operand, line.span, &line.opcode),
			"RESB" => self.evaluate_or_zero(&line.operand, line.span, &line.opcode),
			"BYTE" => self.byte_length(line),
			_ => {
				report_warning(AssemblyError::UnknownMnemonic {
					mnemonic: line.opcode.clone(),
					src:      self.source_code.clone(),
					location: line.span,
				});
				0
			},
		}
	}

	fn byte_length(&self, line: &SourceLine) -> MemoryAddress {
		let body = parser::quoted_body(&line.operand);
		let length = if line.operand.starts_with("C'") {
			body.map(|body| body.len() as MemoryAddress)
		} else if line.operand.starts_with("X'") {
			body.map(|body| (body.len() as MemoryAddress + 1) / 2)
		} else {
			None
		};
		length.unwrap_or_else(|| {
			report_warning(AssemblyError::InvalidByteOperand {
				operand:  line.operand.clone(),
				src:      self.source_code.clone(),
				location: line.span,
			});
			0
		})
	}

	fn evaluate_or_zero(&self, operand: &str, span: SourceSpan, opcode: &str) -> MemoryAddress {
		if operand.is_empty() {
			report_warning(AssemblyError::MissingOperand {
				opcode:   opcode.into(),
				src:      self.source_code.clone(),
				location: span,
			});
			return 0;
		}
		expression::evaluate(operand, &self.symbols, self.source_code, span).unwrap_or_else(|warning| {
			report_warning(warning);
			0
		})
	}

	fn push(&mut self, line: &SourceLine, location: MemoryAddress, has_location: bool) {
		self.intermediate.push(IntermediateLine::from_line(line, location, self.blocks.current(), has_location));
	}

	/// Finalize the block layout and absolutize both tables. Literal addresses are block-relative offsets up to
	/// this point, just like label addresses; each pool record knows its block, so they rebase the same way.
	fn into_output(mut self) -> Pass1Output {
		let layout = self.blocks.finalize(self.start_address);
		for line in &self.intermediate {
			if line.is_literal() {
				self.literals.assign_address(&line.opcode, layout.absolute(line.block, line.location));
			}
		}
		let symbols = self.symbols.finalize(&layout);
		Pass1Output {
			program_name: self.program_name,
			start_address: self.start_address,
			intermediate: self.intermediate,
			symbols,
			literals: self.literals,
			layout,
		}
	}
}
