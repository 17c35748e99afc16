//! Pass 2: object-code generation and record emission.

use std::sync::Arc;

#[allow(unused)]
use smartstring::alias::String;

use crate::common::{hex_field, MemoryAddress};
use crate::error::report_warning;
use crate::optab::{InstructionFormat, InstructionInfo, Optab};
use crate::parser::{self, AddressingSigil};
use crate::pass1::{IntermediateLine, Pass1Output};
use crate::records::{EndRecord, HeaderRecord, ModificationRecord, ObjectProgram, TextRecordBuilder};
use crate::source::AssemblyCode;
use crate::AssemblyError;

/// Everything Pass 2 produces.
#[derive(Debug)]
pub struct Pass2Output {
	/// The finished object program.
	pub object:       ObjectProgram,
	/// Object code per intermediate record, index-aligned with the Pass-1 stream. [`None`] for records that emit
	/// nothing (START, USE, BASE and the like).
	pub object_codes: Vec<Option<String>>,
}

/// Outcome of displacement selection for a format-3 instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Displacement {
	/// Value packed directly into the displacement field; no relative addressing.
	Immediate(MemoryAddress),
	/// Signed offset from the next instruction's address.
	PcRelative(MemoryAddress),
	/// Unsigned offset from the base register.
	BaseRelative(MemoryAddress),
	/// Truncated absolute address; diagnostic-only fallback.
	Direct(MemoryAddress),
}

impl Displacement {
	/// The b flag, the p flag and the 12-bit displacement field.
	const fn fields(self) -> (MemoryAddress, MemoryAddress, MemoryAddress) {
		match self {
			Self::Immediate(disp) | Self::Direct(disp) => (0, 0, disp & 0xFFF),
			Self::PcRelative(disp) => (0, 1, disp & 0xFFF),
			Self::BaseRelative(disp) => (1, 0, disp & 0xFFF),
		}
	}
}

/// A resolved format-3/4 target operand.
#[derive(Clone, Copy, Debug)]
struct Target {
	address:     MemoryAddress,
	/// The operand was a plain numeric constant.
	numeric:     bool,
	/// The loader must relocate references to this target.
	relocatable: bool,
}

const fn sigil_bits(sigil: AddressingSigil) -> (MemoryAddress, MemoryAddress) {
	match sigil {
		AddressingSigil::Immediate => (0, 1),
		AddressingSigil::Indirect => (1, 0),
		AddressingSigil::Simple => (1, 1),
	}
}

/// Translate the intermediate stream into the object program. Encoding problems degrade gracefully: they are
/// reported as warnings and a defined fallback is emitted, so this pass always completes.
#[must_use]
pub fn run(optab: &Optab, pass1: &Pass1Output, source_code: &Arc<AssemblyCode>) -> Pass2Output {
	let mut state = Pass2State {
		optab,
		pass1,
		source_code,
		base_register: None,
		text: TextRecordBuilder::default(),
		modifications: Vec::new(),
	};
	let mut object_codes = vec![None; pass1.intermediate.len()];
	let mut first_instruction = pass1.start_address;

	for (index, line) in pass1.intermediate.iter().enumerate() {
		if line.is_literal() {
			let code = pass1.literals.get(&line.opcode).map(|literal| literal.object_code()).unwrap_or_default();
			state.text.append(&code, pass1.layout.absolute(line.block, line.location));
			object_codes[index] = Some(code);
			continue;
		}
		match line.opcode.as_str() {
			"START" | "ORG" | "LTORG" => {},
			// Block switches make the object-code stream non-contiguous.
			"USE" => state.text.flush(),
			"BASE" => state.set_base(line),
			"NOBASE" => state.base_register = None,
			"END" => {
				if !line.operand.is_empty() {
					match pass1.symbols.get(&line.operand) {
						Some(symbol) => first_instruction = symbol.address,
						None => report_warning(AssemblyError::UndefinedSymbol {
							symbol:   line.operand.clone(),
							src:      source_code.clone(),
							location: line.span,
						}),
					}
				}
				break;
			},
			_ => {
				let code = state.generate(line);
				state.text.append(&code, pass1.layout.absolute(line.block, line.location));
				object_codes[index] = Some(code);
			},
		}
	}

	let Pass2State { text, modifications, .. } = state;
	let object = ObjectProgram {
		header: HeaderRecord {
			name:   pass1.program_name.clone(),
			start:  pass1.start_address,
			length: pass1.layout.total_length(),
		},
		text: text.finish(),
		modifications,
		end: EndRecord { first_instruction },
	};
	Pass2Output { object, object_codes }
}

struct Pass2State<'run> {
	optab:         &'run Optab,
	pass1:         &'run Pass1Output,
	source_code:   &'run Arc<AssemblyCode>,
	base_register: Option<MemoryAddress>,
	text:          TextRecordBuilder,
	modifications: Vec<ModificationRecord>,
}

impl Pass2State<'_> {
	fn generate(&mut self, line: &IntermediateLine) -> String {
		match self.optab.get(&line.opcode) {
			Some(info) if line.extended => self.format_4(line, info),
			Some(info) => match info.format {
				InstructionFormat::One => hex_field(info.opcode.into(), 2),
				InstructionFormat::Two => self.format_2(line, info),
				InstructionFormat::Three => self.format_3(line, info),
			},
			None => self.directive_code(line),
		}
	}

	/// Opcode byte followed by two register nibbles. `SHIFTL`/`SHIFTR` take a shift count whose encoding is `n-1`;
	/// single-register mnemonics leave the second nibble 0.
	fn format_2(&mut self, line: &IntermediateLine, info: InstructionInfo) -> String {
		let operand = line.operand.as_str();
		let (first, second) = match operand.split_once(',') {
			Some((first, second)) => (first.trim(), Some(second.trim())),
			None => (operand.trim(), None),
		};
		let r1 = self.register_number(first, line);
		let r2 = match second {
			None => 0,
			Some(count) if line.opcode == "SHIFTL" || line.opcode == "SHIFTR" =>
				count.parse::<MemoryAddress>().map(|n| n - 1).unwrap_or_else(|error| {
					report_warning(AssemblyError::InvalidNumber {
						error,
						src: self.source_code.clone(),
						location: line.span,
					});
					0
				}),
			Some(register) => self.register_number(register, line),
		};
		let mut code = hex_field(info.opcode.into(), 2);
		code.push_str(&hex_field(r1, 1));
		code.push_str(&hex_field(r2, 1));
		code
	}

	fn format_3(&mut self, line: &IntermediateLine, info: InstructionInfo) -> String {
		let (sigil, indexed, operand) = parser::strip_addressing(&line.operand);
		let (n, i) = sigil_bits(sigil);

		let displacement = if operand.is_empty() {
			// RSUB: no target.
			Displacement::Direct(0)
		} else {
			let target = self.resolve(operand, line);
			if sigil == AddressingSigil::Immediate && target.numeric {
				Displacement::Immediate(target.address)
			} else {
				self.select_displacement(target.address, line)
			}
		};

		let (b, p, disp) = displacement.fields();
		let first_byte = MemoryAddress::from(info.opcode) | (n << 1) | i;
		let flags = (MemoryAddress::from(indexed) << 3) | (b << 2) | (p << 1);
		hex_field((first_byte << 16) | (flags << 12) | disp, 6)
	}

	/// 20-bit address field, e=1. A modification record covers the address field except for immediate numeric
	/// operands and references to absolute symbols.
	fn format_4(&mut self, line: &IntermediateLine, info: InstructionInfo) -> String {
		let (sigil, indexed, operand) = parser::strip_addressing(&line.operand);
		let (n, i) = sigil_bits(sigil);

		let target = if operand.is_empty() {
			Target { address: 0, numeric: false, relocatable: false }
		} else {
			self.resolve(operand, line)
		};

		if target.relocatable || (target.numeric && sigil != AddressingSigil::Immediate) {
			self.modifications.push(ModificationRecord {
				address:    self.pass1.layout.absolute(line.block, line.location) + 1,
				half_bytes: 5,
			});
		}

		let first_byte = MemoryAddress::from(info.opcode) | (n << 1) | i;
		let flags = (MemoryAddress::from(indexed) << 3) | 1;
		hex_field((first_byte << 24) | (flags << 20) | (target.address & 0xF_FFFF), 8)
	}

	/// PC-relative if the signed 12-bit range allows, base-relative if a base is set and the unsigned range
	/// allows, direct truncation as a last resort.
	fn select_displacement(&mut self, target: MemoryAddress, line: &IntermediateLine) -> Displacement {
		let next_instruction = self.pass1.layout.absolute(line.block, line.location) + 3;
		let pc_relative = target - next_instruction;
		if (-2048 ..= 2047).contains(&pc_relative) {
			return Displacement::PcRelative(pc_relative);
		}
		if let Some(base) = self.base_register {
			let base_relative = target - base;
			if (0 ..= 4095).contains(&base_relative) {
				return Displacement::BaseRelative(base_relative);
			}
		}
		report_warning(AssemblyError::OperandOutOfRange {
			target,
			src: self.source_code.clone(),
			location: line.span,
		});
		Displacement::Direct(target)
	}

	/// Resolve a cleaned operand: literals through LITTAB, symbols through SYMTAB, otherwise a decimal constant.
	fn resolve(&self, operand: &str, line: &IntermediateLine) -> Target {
		if operand.starts_with('=') {
			return Target {
				address:     self.pass1.literals.get(operand).and_then(|literal| literal.address).unwrap_or(0),
				numeric:     false,
				relocatable: true,
			};
		}
		if let Some(symbol) = self.pass1.symbols.get(operand) {
			return Target { address: symbol.address, numeric: false, relocatable: symbol.relocatable };
		}
		operand.parse().map_or_else(
			|_| {
				report_warning(AssemblyError::UndefinedSymbol {
					symbol:   operand.into(),
					src:      self.source_code.clone(),
					location: line.span,
				});
				Target { address: 0, numeric: false, relocatable: false }
			},
			|value| Target { address: value, numeric: true, relocatable: false },
		)
	}

	fn directive_code(&mut self, line: &IntermediateLine) -> String {
		match line.opcode.as_str() {
			"WORD" => self.word_code(line),
			"BYTE" => self.byte_code(line),
			// RESW/RESB (and unknown mnemonics, already reported in Pass 1) emit nothing; the empty code forces
			// a text-record flush because of the address gap.
			_ => String::new(),
		}
	}

	fn word_code(&mut self, line: &IntermediateLine) -> String {
		if line.operand.is_empty() {
			report_warning(AssemblyError::MissingOperand {
				opcode:   line.opcode.clone(),
				src:      self.source_code.clone(),
				location: line.span,
			});
			return hex_field(0, 6);
		}
		if let Some(symbol) = self.pass1.symbols.get(&line.operand) {
			if symbol.relocatable {
				self.modifications.push(ModificationRecord {
					address:    self.pass1.layout.absolute(line.block, line.location),
					half_bytes: 6,
				});
			}
			return hex_field(symbol.address, 6);
		}
		line.operand.parse().map_or_else(
			|_| {
				report_warning(AssemblyError::UndefinedSymbol {
					symbol:   line.operand.clone(),
					src:      self.source_code.clone(),
					location: line.span,
				});
				hex_field(0, 6)
			},
			|value| hex_field(value, 6),
		)
	}

	fn byte_code(&self, line: &IntermediateLine) -> String {
		let body = parser::quoted_body(&line.operand).unwrap_or_default();
		if line.operand.starts_with("C'") {
			body.bytes().map(|byte| format!("{byte:02X}")).collect::<std::string::String>().into()
		} else if line.operand.starts_with("X'") {
			let digits = body.to_uppercase();
			if digits.len() % 2 == 0 {
				digits.into()
			} else {
				format!("0{digits}").into()
			}
		} else {
			String::new()
		}
	}

	/// BASE resolves its operand to an absolute address: a defined symbol, otherwise hexadecimal. An unresolvable
	/// operand leaves the previous base in place.
	fn set_base(&mut self, line: &IntermediateLine) {
		if let Some(symbol) = self.pass1.symbols.get(&line.operand) {
			self.base_register = Some(symbol.address);
		} else {
			match MemoryAddress::from_str_radix(&line.operand, 16) {
				Ok(value) => self.base_register = Some(value),
				Err(error) => report_warning(AssemblyError::InvalidNumber {
					error,
					src: self.source_code.clone(),
					location: line.span,
				}),
			}
		}
	}

	fn register_number(&self, register: &str, line: &IntermediateLine) -> MemoryAddress {
		match register {
			"A" => 0,
			"X" => 1,
			"L" => 2,
			"B" => 3,
			"S" => 4,
			"T" => 5,
			"F" => 6,
			_ => {
				report_warning(AssemblyError::UnknownRegister {
					register: register.into(),
					src:      self.source_code.clone(),
					location: line.span,
				});
				0
			},
		}
	}
}
