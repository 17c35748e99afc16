//! Assembly-time expression evaluation.
//!
//! Expressions appear in the operands of `EQU`, `ORG`, `RESW` and `RESB`. The grammar is left-to-right with two
//! precedence levels (`+ -` below `* /`); leaves are decimal literals, `0x`-prefixed hexadecimal literals, and
//! defined symbols.

use std::sync::Arc;

use miette::SourceSpan;
#[allow(unused)]
use smartstring::alias::String;

use crate::common::MemoryAddress;
use crate::source::AssemblyCode;
use crate::symtab::SymbolLookup;
use crate::AssemblyError;

/// Evaluate an expression in the given symbol context. Arithmetic is 32-bit two's complement; overflow wraps.
///
/// # Errors
/// [`AssemblyError::UndefinedSymbol`] when a leaf is neither a number nor a defined symbol,
/// [`AssemblyError::DivisionByZero`] for a zero divisor, and [`AssemblyError::InvalidNumber`] for malformed
/// numeric literals. Callers recover by substituting 0 and reporting the error as a warning.
pub fn evaluate(
	expression: &str,
	symbols: &dyn SymbolLookup,
	src: &Arc<AssemblyCode>,
	location: SourceSpan,
) -> Result<MemoryAddress, AssemblyError> {
	let expression = expression.trim();

	// Split at the rightmost operator of the lowest precedence level so that evaluation associates left to right.
	// The scan starts at index 1 so a leading `-` stays part of the first leaf.
	for operators in [['+', '-'], ['*', '/']] {
		let split =
			expression.char_indices().filter(|(index, chr)| *index > 0 && operators.contains(chr)).next_back();
		if let Some((index, operator)) = split {
			let lhs = evaluate(&expression[.. index], symbols, src, location)?;
			let rhs = evaluate(&expression[index + 1 ..], symbols, src, location)?;
			return Ok(match operator {
				'+' => lhs.wrapping_add(rhs),
				'-' => lhs.wrapping_sub(rhs),
				'*' => lhs.wrapping_mul(rhs),
				'/' =>
					if rhs == 0 {
						return Err(AssemblyError::DivisionByZero { src: src.clone(), location });
					} else {
						lhs.wrapping_div(rhs)
					},
				_ => unreachable!(),
			});
		}
	}

	leaf(expression, symbols, src, location)
}

fn leaf(
	operand: &str,
	symbols: &dyn SymbolLookup,
	src: &Arc<AssemblyCode>,
	location: SourceSpan,
) -> Result<MemoryAddress, AssemblyError> {
	let operand = operand.trim();

	if let Some(digits) = operand.strip_prefix("0x") {
		return MemoryAddress::from_str_radix(digits, 16)
			.map_err(|error| AssemblyError::InvalidNumber { error, src: src.clone(), location });
	}

	if !operand.is_empty() && operand.chars().all(|chr| chr.is_ascii_digit() || chr == '-') {
		return operand
			.parse()
			.map_err(|error| AssemblyError::InvalidNumber { error, src: src.clone(), location });
	}

	symbols.lookup(operand).ok_or_else(|| AssemblyError::UndefinedSymbol {
		symbol: operand.into(),
		src: src.clone(),
		location,
	})
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;
	use std::sync::Arc;

	use super::evaluate;
	use crate::common::MemoryAddress;
	use crate::symtab::SymbolLookup;
	use crate::{AssemblyCode, AssemblyError};

	struct Symbols(HashMap<&'static str, MemoryAddress>);

	impl SymbolLookup for Symbols {
		fn lookup(&self, symbol: &str) -> Option<MemoryAddress> {
			self.0.get(symbol).copied()
		}
	}

	fn eval(expression: &str) -> Result<MemoryAddress, AssemblyError> {
		let symbols = Symbols(HashMap::from([("BUFFER", 0x1036), ("BUFEND", 0x2036), ("LENGTH", 0x100)]));
		let src = Arc::new(AssemblyCode::new(expression, "<expression>"));
		evaluate(expression, &symbols, &src, (0, expression.len()).into())
	}

	#[test]
	fn literals_and_symbols() {
		assert_eq!(eval("4096").unwrap(), 4096);
		assert_eq!(eval("0x1000").unwrap(), 0x1000);
		assert_eq!(eval("-3").unwrap(), -3);
		assert_eq!(eval("BUFFER").unwrap(), 0x1036);
	}

	#[test]
	fn two_precedence_levels() {
		assert_eq!(eval("BUFEND-BUFFER").unwrap(), 0x1000);
		assert_eq!(eval("LENGTH+10").unwrap(), 0x10A);
		assert_eq!(eval("2+3*4").unwrap(), 14);
		assert_eq!(eval("3*4+2").unwrap(), 14);
	}

	#[test]
	fn subtraction_associates_left() {
		assert_eq!(eval("10-4+2").unwrap(), 8);
		assert_eq!(eval("16/4/2").unwrap(), 2);
	}

	#[test]
	fn division_by_zero_is_an_error() {
		assert!(matches!(eval("LENGTH/0"), Err(AssemblyError::DivisionByZero { .. })));
	}

	#[test]
	fn undefined_symbols_are_an_error() {
		assert!(matches!(eval("NOWHERE+1"), Err(AssemblyError::UndefinedSymbol { .. })));
	}
}
