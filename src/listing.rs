//! Intermediate-file and listing writers.

use std::io::Write;

#[allow(unused)]
use smartstring::alias::String;

use crate::pass1::{IntermediateLine, Pass1Output};
use crate::pass2::Pass2Output;

/// Write the intermediate file: one record per retained source line, with absolutized locations.
///
/// # Errors
/// I/O errors from the writer.
pub fn write_intermediate<W: Write>(writer: &mut W, pass1: &Pass1Output) -> std::io::Result<()> {
	for line in &pass1.intermediate {
		writeln!(
			writer,
			"{}{:<10}{:<10}{:<20}",
			location_column(line, pass1),
			line.label.as_deref().unwrap_or(""),
			line.opcode,
			line.operand
		)?;
	}
	Ok(())
}

/// Write the program listing: the intermediate records with the object code Pass 2 attached.
///
/// # Errors
/// I/O errors from the writer.
pub fn write_listing<W: Write>(writer: &mut W, pass1: &Pass1Output, pass2: &Pass2Output) -> std::io::Result<()> {
	writeln!(writer, "{:<10}{:<10}{:<10}{:<20}{}", "LOC", "LABEL", "OPCODE", "OPERAND", "OBJCODE")?;
	writeln!(writer, "{}", "-".repeat(70))?;
	for (line, object_code) in pass1.intermediate.iter().zip(&pass2.object_codes) {
		writeln!(
			writer,
			"{}{:<10}{:<10}{:<20}{}",
			location_column(line, pass1),
			line.label.as_deref().unwrap_or(""),
			line.opcode,
			line.operand,
			object_code.as_deref().unwrap_or("")
		)?;
	}
	Ok(())
}

/// The fixed-width location column. START already stores its absolute address; every other located line is
/// absolutized through the block layout.
fn location_column(line: &IntermediateLine, pass1: &Pass1Output) -> String {
	if line.has_location {
		let absolute = if line.opcode == "START" {
			line.location
		} else {
			pass1.layout.absolute(line.block, line.location)
		};
		format!("0x{:<8}", format!("{absolute:04X}")).into()
	} else {
		" ".repeat(10).into()
	}
}
