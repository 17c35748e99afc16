//! Source-line parsing.

use miette::SourceSpan;
#[allow(unused)]
use smartstring::alias::String;

pub mod expression;

/// Addressing sigil parsed off a format-3/4 operand.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AddressingSigil {
	/// `#operand`: n=0, i=1.
	Immediate,
	/// `@operand`: n=1, i=0.
	Indirect,
	/// No sigil: n=1, i=1.
	Simple,
}

/// One parsed source line.
///
/// The operand is kept verbatim, including addressing sigils, quoted content and the index suffix; the individual
/// consumers strip what they understand.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceLine {
	/// Label field; present iff the line does not start with whitespace.
	pub label:    Option<String>,
	/// Mnemonic or directive, without a leading `+`.
	pub opcode:   String,
	/// Operand text; empty when the line has none.
	pub operand:  String,
	/// Whether the opcode carried the `+` format-4 prefix.
	pub extended: bool,
	/// Where the line sits in the source file.
	pub span:     SourceSpan,
}

/// Split one raw source line into its fields. Returns [`None`] for blank lines, comment lines (first
/// non-whitespace character `#`) and label-only lines.
#[must_use]
pub fn parse_line(line: &str, offset: usize) -> Option<SourceLine> {
	let meaningful = line.trim_end();
	if meaningful.trim_start().is_empty() || meaningful.trim_start().starts_with('#') {
		return None;
	}

	let has_label = !meaningful.starts_with(char::is_whitespace);
	let (first, rest) = split_token(meaningful);
	let (label, opcode_token, rest) = if has_label {
		let (second, rest) = split_token(rest);
		(Some(first), second, rest)
	} else {
		(None, first, rest)
	};
	if opcode_token.is_empty() {
		return None;
	}

	let (opcode, extended) = match opcode_token.strip_prefix('+') {
		Some(stripped) => (stripped, true),
		None => (opcode_token, false),
	};

	let leading = meaningful.len() - meaningful.trim_start().len();
	Some(SourceLine {
		label:   label.map(Into::into),
		opcode:  opcode.into(),
		operand: rest.trim().into(),
		extended,
		span:    (offset + leading, meaningful.trim_start().len()).into(),
	})
}

/// Strip the addressing sigil and a trailing `,X` index suffix off an operand, returning the sigil, whether
/// indexing was requested, and the bare operand text.
#[must_use]
pub fn strip_addressing(operand: &str) -> (AddressingSigil, bool, &str) {
	let (sigil, rest) = match operand.chars().next() {
		Some('#') => (AddressingSigil::Immediate, &operand[1 ..]),
		Some('@') => (AddressingSigil::Indirect, &operand[1 ..]),
		_ => (AddressingSigil::Simple, operand),
	};
	rest.find(",X").map_or((sigil, false, rest), |position| (sigil, true, rest[.. position].trim()))
}

/// Extract the text between the quotes of a `C'...'`/`X'...'` operand, if it is well-formed.
#[must_use]
pub fn quoted_body(operand: &str) -> Option<&str> {
	let start = operand.find('\'')?;
	let end = operand.rfind('\'')?;
	(end > start).then(|| &operand[start + 1 .. end])
}

fn split_token(text: &str) -> (&str, &str) {
	let text = text.trim_start();
	text.find(char::is_whitespace).map_or((text, ""), |end| (&text[.. end], &text[end ..]))
}
