//! End-to-end tests: assemble in-memory sources through the public entry point and check the produced records
//! against hand-assembled expectations.

use std::sync::Arc;

use crate::optab::Optab;
use crate::{run_assembler, AssemblyArtifacts, AssemblyCode};

const OPTAB: &str = include_str!("../input/optab.txt");

fn assemble(source: &str) -> AssemblyArtifacts {
	let optab = Optab::parse(&Arc::new(AssemblyCode::new(OPTAB, "<optab>")));
	let source_code = Arc::new(AssemblyCode::new(source, "<test>"));
	run_assembler(&source_code, &optab)
}

fn object_code(artifacts: &AssemblyArtifacts, index: usize) -> &str {
	artifacts.pass2.object_codes[index].as_deref().unwrap_or("")
}

/// Every text record holds between 1 and 30 bytes, and consecutive records never overlap.
fn check_text_record_invariants(artifacts: &AssemblyArtifacts) {
	let records = &artifacts.pass2.object.text;
	for record in records {
		assert!(record.length() > 0 && record.length() <= 30, "bad text record length: {record}");
		assert_eq!(record.code.len() % 2, 0);
		assert!(record.code.chars().all(|chr| chr.is_ascii_digit() || chr.is_ascii_uppercase()));
	}
	for pair in records.windows(2) {
		assert!(
			pair[0].start + pair[0].length() as i32 <= pair[1].start,
			"overlapping text records: {} / {}",
			pair[0],
			pair[1]
		);
	}
}

#[test]
fn minimal_program_records() {
	let artifacts = assemble(
		"COPY   START  1000
FIRST  LDA    ZERO
ZERO   WORD   0
       END    FIRST
",
	);
	assert_eq!(
		artifacts.pass2.object.to_string(),
		"HCOPY  001000000006\nT00100006032000000000\nE001000\n"
	);
	check_text_record_invariants(&artifacts);
}

#[test]
fn immediate_numeric_operand() {
	let artifacts = assemble(
		"TEST   START  1000
       LDA    #5
       END
",
	);
	assert_eq!(object_code(&artifacts, 1), "010005");
	assert_eq!(artifacts.pass2.object.to_string(), "HTEST  001000000003\nT00100003010005\nE001000\n");
}

#[test]
fn format_4_emits_a_modification_record_for_symbols_only() {
	let artifacts = assemble(
		"PROG   START  0
FIRST  +LDT   BUFFER
       +LDT   #4096
BUFFER RESB   4096
       END
",
	);
	// Symbol reference: 20-bit address field, e=1, relocation at instruction+1 over 5 half-bytes.
	assert_eq!(object_code(&artifacts, 1), "77100008");
	// Immediate numeric: same shape, no relocation.
	assert_eq!(object_code(&artifacts, 2), "75101000");
	let modifications: Vec<_> =
		artifacts.pass2.object.modifications.iter().map(std::string::ToString::to_string).collect();
	assert_eq!(modifications, ["M00000105"]);
}

#[test]
fn program_blocks_are_laid_out_in_id_order() {
	let artifacts = assemble(
		"PROG   START  0
       RESB   48
       USE    CDATA
       RESB   16
       USE    CBLKS
       RESB   8
SYM    RESB   4088
       END
",
	);
	let starts: Vec<_> = artifacts.pass1.layout.iter().map(|block| block.start).collect();
	assert_eq!(starts, [0x0, 0x30, 0x40]);
	assert_eq!(artifacts.pass1.layout.total_length(), 0x1040);
	assert_eq!(artifacts.pass2.object.header.length, 0x1040);

	let symbol = artifacts.pass1.symbols.get("SYM").unwrap();
	assert_eq!(symbol.address, 0x48);
	assert_eq!(symbol.block, 2);
	assert!(symbol.relocatable);
}

#[test]
fn reservations_split_text_records() {
	let artifacts = assemble(
		"GAPS   START  1000
A1     LDA    A1
       LDA    A1
       LDA    A1
       LDA    A1
       RESW   10
AFTER  LDA    A1
       END
",
	);
	let records = &artifacts.pass2.object.text;
	assert_eq!(records.len(), 2);
	assert_eq!(records[0].start, 0x1000);
	assert_eq!(records[0].length(), 12);
	assert_eq!(records[1].start, 0x102A);
	assert_eq!(records[1].length(), 3);
	check_text_record_invariants(&artifacts);
}

#[test]
fn ltorg_places_literals_at_the_pool() {
	let artifacts = assemble(
		"LITS   START  2000
FIRST  LDA    =C'EOF'
       LDA    =X'05'
       LTORG
       END    FIRST
",
	);
	assert_eq!(artifacts.pass1.literals.get("=C'EOF'").unwrap().address, Some(0x2006));
	assert_eq!(artifacts.pass1.literals.get("=X'05'").unwrap().address, Some(0x2009));
	// Both literals are word-floored to 3 bytes; the hexadecimal one zero-extends on the left.
	assert_eq!(object_code(&artifacts, 3), "454F46");
	assert_eq!(object_code(&artifacts, 4), "000005");
	assert_eq!(
		artifacts.pass2.object.to_string(),
		"HLITS  00200000000C\nT0020000C032003032003454F46000005\nE002000\n"
	);
}

#[test]
fn pc_relative_displacement_is_twos_complement() {
	let artifacts = assemble(
		"LAW    START  1000
ZERO   WORD   0
NEXT   LDA    ZERO
       END
",
	);
	// target = next_instruction_address + sign_extend_12(disp): 0x1006 + (-6) = 0x1000.
	assert_eq!(object_code(&artifacts, 2), "032FFA");
}

#[test]
fn base_relative_takes_over_when_pc_relative_is_out_of_range() {
	let artifacts = assemble(
		"BASED  START  0
       BASE   2000
FIRST  LDA    FAR
       RESB   8192
FAR    WORD   0
       END
",
	);
	// disp = 0x2003 - 0x2000 = 3 with b=1.
	assert_eq!(object_code(&artifacts, 2), "034003");
}

#[test]
fn format_2_register_encoding() {
	let artifacts = assemble(
		"FMT2   START  0
       CLEAR  X
       COMPR  A,S
       SHIFTL T,4
       TIXR   T
       END
",
	);
	assert_eq!(object_code(&artifacts, 1), "B410");
	assert_eq!(object_code(&artifacts, 2), "A004");
	// The shift count is encoded as n-1.
	assert_eq!(object_code(&artifacts, 3), "A453");
	assert_eq!(object_code(&artifacts, 4), "B850");
}

#[test]
fn equ_symbols_are_absolute_and_not_relocated() {
	let artifacts = assemble(
		"EQUS   START  1000
MAXLEN EQU    4096
       LDA    #MAXLEN
       WORD   MAXLEN
       +LDA   MAXLEN
       END
",
	);
	// An immediate *symbol* still goes through displacement selection.
	assert_eq!(object_code(&artifacts, 2), "012FFD");
	assert_eq!(object_code(&artifacts, 3), "001000");
	assert_eq!(object_code(&artifacts, 4), "03101000");
	assert!(artifacts.pass2.object.modifications.is_empty());

	let maxlen = artifacts.pass1.symbols.get("MAXLEN").unwrap();
	assert_eq!(maxlen.address, 4096);
	assert!(!maxlen.relocatable);
}

#[test]
fn word_with_a_relocatable_symbol_emits_a_modification_record() {
	let artifacts = assemble(
		"RELOC  START  0
HERE   WORD   HERE
       END
",
	);
	assert_eq!(object_code(&artifacts, 1), "000000");
	let modifications: Vec<_> =
		artifacts.pass2.object.modifications.iter().map(std::string::ToString::to_string).collect();
	assert_eq!(modifications, ["M00000006"]);
}

#[test]
fn duplicate_symbols_keep_the_first_definition() {
	let artifacts = assemble(
		"DUP    START  0
A      WORD   1
A      WORD   2
       LDA    A
       END
",
	);
	assert_eq!(artifacts.pass1.symbols.get("A").unwrap().address, 0);
	assert_eq!(object_code(&artifacts, 3), "032FF7");
}

#[test]
fn reruns_are_byte_identical() {
	let source = include_str!("../input/copy.asm");
	let first = assemble(source);
	let second = assemble(source);
	assert_eq!(first.pass2.object.to_string(), second.pass2.object.to_string());

	let dump = |artifacts: &AssemblyArtifacts| {
		let mut symbols = Vec::new();
		artifacts.pass1.symbols.write_table(&mut symbols).unwrap();
		let mut literals = Vec::new();
		artifacts.pass1.literals.write_table(&mut literals).unwrap();
		(symbols, literals)
	};
	assert_eq!(dump(&first), dump(&second));
}

#[test]
fn copy_program_assembles() {
	let artifacts = assemble(include_str!("../input/copy.asm"));
	assert_eq!(artifacts.pass1.program_name, "COPY");
	assert_eq!(artifacts.pass1.layout.iter().count(), 3);
	// END FIRST: execution starts at the program start.
	assert_eq!(artifacts.pass2.object.end.first_instruction, 0);
	for literal in artifacts.pass1.literals.iter() {
		assert!(literal.address.is_some(), "literal {} was never placed", literal.name);
	}
	check_text_record_invariants(&artifacts);
}
