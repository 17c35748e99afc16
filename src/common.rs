//! Common includes and functions for both library and executable.

use std::sync::Arc;

#[allow(unused)]
use smartstring::alias::String;

pub use crate::error::{report_warning, AssemblyError};
use crate::optab::Optab;
use crate::pass1::Pass1Output;
use crate::pass2::Pass2Output;
pub use crate::source::AssemblyCode;

/// An address or assembly-time value. Expression arithmetic is 32-bit two's complement; real SIC/XE addresses fit
/// in 24 bits.
pub type MemoryAddress = i32;

/// Dense identifier of a program block, assigned in first-encounter order. The implicit `DEFAULT` block always has
/// id 0.
pub type BlockId = usize;

/// Everything both passes produced for one source file.
#[derive(Debug)]
pub struct AssemblyArtifacts {
	/// The intermediate stream, finalized tables and block layout.
	pub pass1: Pass1Output,
	/// The object program and the per-line object code.
	pub pass2: Pass2Output,
}

/// Run both assembler passes over the given source code.
///
/// Recoverable problems are reported as warning diagnostics on standard error; the only fatal conditions (an
/// unreadable opcode table or source file) are handled while constructing the inputs to this function.
#[must_use]
pub fn run_assembler(source_code: &Arc<AssemblyCode>, optab: &Optab) -> AssemblyArtifacts {
	let pass1 = crate::pass1::run(optab, source_code);
	let pass2 = crate::pass2::run(optab, &pass1, source_code);
	AssemblyArtifacts { pass1, pass2 }
}

/// Format a value as a fixed-width field of uppercase hex digits, truncated to the field width in the same way the
/// object format's bit fields are.
#[must_use]
pub fn hex_field(value: MemoryAddress, width: usize) -> String {
	let mask = (1_u64 << (width * 4)) - 1;
	let masked = u64::from(value as u32) & mask;
	format!("{masked:0width$X}").into()
}

#[cfg(test)]
mod tests {
	use super::hex_field;

	#[test]
	fn hex_field_masks_to_width() {
		assert_eq!(hex_field(0x1000, 6), "001000");
		assert_eq!(hex_field(0x1ABCDE, 4), "BCDE");
		assert_eq!(hex_field(-3, 3), "FFD");
		assert_eq!(hex_field(5, 1), "5");
	}
}
