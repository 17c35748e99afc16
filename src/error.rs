//! All assembler diagnostics.

use std::sync::Arc;

use miette::{Diagnostic, SourceSpan};
#[allow(unused)]
use smartstring::alias::String;
use thiserror::Error;

use crate::common::MemoryAddress;
use crate::source::AssemblyCode;

/// All types of errors and warnings that the assembler can report to the user.
///
/// Variants marked `severity(Warning)` are recoverable: the assembler substitutes a defined fallback value and
/// continues. Everything else aborts the run.
#[derive(Error, Debug, Clone, Diagnostic)]
#[allow(clippy::module_name_repetitions, missing_docs)]
pub enum AssemblyError {
	#[error("File \"{file_name}\" was not found")]
	#[diagnostic(code(sicasm::io::file_not_found), severity(Error))]
	FileNotFound {
		#[source]
		os_error:  Arc<std::io::Error>,
		file_name: String,
		#[source_code]
		src:       Arc<AssemblyCode>,
		#[label("File was requested here")]
		location:  SourceSpan,
	},

	#[error("Malformed opcode table record")]
	#[diagnostic(
		code(sicasm::optab::malformed_record),
		severity(Warning),
		help("Each record must consist of a mnemonic and a two-digit hexadecimal opcode. The record is skipped.")
	)]
	MalformedOptabRecord {
		record:   String,
		#[source_code]
		src:      Arc<AssemblyCode>,
		#[label("In this record")]
		location: SourceSpan,
	},

	#[error("Invalid start address `{operand}`")]
	#[diagnostic(
		code(sicasm::pass1::invalid_start_address),
		severity(Warning),
		help("The operand of START must be a hexadecimal address. The program is assembled at address 0 instead.")
	)]
	InvalidStartAddress {
		operand:  String,
		#[source_code]
		src:      Arc<AssemblyCode>,
		#[label("START directive")]
		location: SourceSpan,
	},

	#[error("EQU requires a label")]
	#[diagnostic(
		code(sicasm::pass1::equ_without_label),
		severity(Warning),
		help("EQU defines the symbol in its label field; without a label the line has no effect and is skipped.")
	)]
	EquWithoutLabel {
		#[source_code]
		src:      Arc<AssemblyCode>,
		#[label("This EQU")]
		location: SourceSpan,
	},

	#[error("Missing operand for {opcode}")]
	#[diagnostic(code(sicasm::pass1::missing_operand), severity(Warning))]
	MissingOperand {
		opcode:   String,
		#[source_code]
		src:      Arc<AssemblyCode>,
		#[label("Operand expected here")]
		location: SourceSpan,
	},

	#[error("Invalid number")]
	#[diagnostic(code(sicasm::parser::invalid_number), severity(Warning))]
	InvalidNumber {
		#[source]
		error:    core::num::ParseIntError,
		#[source_code]
		src:      Arc<AssemblyCode>,
		#[label("In this operand")]
		location: SourceSpan,
	},

	#[error("Undefined symbol `{symbol}`")]
	#[diagnostic(
		code(sicasm::symbol::undefined),
		severity(Warning),
		help("The value 0 is substituted so assembly can continue; the produced object program is almost certainly wrong.")
	)]
	UndefinedSymbol {
		symbol:   String,
		#[source_code]
		src:      Arc<AssemblyCode>,
		#[label("Symbol used here")]
		location: SourceSpan,
	},

	#[error("Duplicate symbol `{symbol}`")]
	#[diagnostic(
		code(sicasm::symbol::duplicate),
		severity(Warning),
		help("The first definition wins; this definition is ignored.")
	)]
	DuplicateSymbol {
		symbol:   String,
		#[source_code]
		src:      Arc<AssemblyCode>,
		#[label("Redefined here")]
		location: SourceSpan,
	},

	#[error("Division by zero in expression")]
	#[diagnostic(code(sicasm::expression::division_by_zero), severity(Warning))]
	DivisionByZero {
		#[source_code]
		src:      Arc<AssemblyCode>,
		#[label("In this expression")]
		location: SourceSpan,
	},

	#[error("Target address {target:#X} is out of range for both PC-relative and base-relative addressing")]
	#[diagnostic(
		code(sicasm::pass2::displacement_out_of_range),
		severity(Warning),
		help(
			"The displacement is truncated to 12 bits, which will not produce a usable instruction. Set a base \
			 register with BASE or use format 4 (`+` prefix) for this instruction."
		)
	)]
	OperandOutOfRange {
		target:   MemoryAddress,
		#[source_code]
		src:      Arc<AssemblyCode>,
		#[label("In this instruction")]
		location: SourceSpan,
	},

	#[error("Unknown register `{register}`")]
	#[diagnostic(
		code(sicasm::pass2::unknown_register),
		severity(Warning),
		help("Valid registers are A, X, L, B, S, T and F. Register A (0) is substituted.")
	)]
	UnknownRegister {
		register: String,
		#[source_code]
		src:      Arc<AssemblyCode>,
		#[label("In this operand")]
		location: SourceSpan,
	},

	#[error("Unknown mnemonic `{mnemonic}`")]
	#[diagnostic(
		code(sicasm::pass1::unknown_mnemonic),
		severity(Warning),
		help("The mnemonic is neither in the opcode table nor an assembler directive; the line occupies no space.")
	)]
	UnknownMnemonic {
		mnemonic: String,
		#[source_code]
		src:      Arc<AssemblyCode>,
		#[label("This mnemonic")]
		location: SourceSpan,
	},

	#[error("Malformed BYTE operand `{operand}`")]
	#[diagnostic(
		code(sicasm::pass1::invalid_byte_operand),
		severity(Warning),
		help("BYTE takes either C'...' (character data) or X'...' (hexadecimal data).")
	)]
	InvalidByteOperand {
		operand:  String,
		#[source_code]
		src:      Arc<AssemblyCode>,
		#[label("In this directive")]
		location: SourceSpan,
	},

	#[error("Source ended without an END directive")]
	#[diagnostic(
		code(sicasm::pass1::missing_end),
		severity(Warning),
		help("The literal pool is flushed and program blocks are finalized at end of input.")
	)]
	MissingEnd {
		#[source_code]
		src:      Arc<AssemblyCode>,
		#[label("Input ends here")]
		location: SourceSpan,
	},
}

/// Print a recoverable diagnostic to standard error and carry on.
pub fn report_warning(warning: AssemblyError) {
	eprintln!("{:?}", miette::Report::new(warning));
}
