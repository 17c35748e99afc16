//! Command-line interface related structures.

use std::path::PathBuf;

use clap::Parser;

/// SIC/XE two-pass assembler.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct SicasmCli {
	/// Assembly source file to assemble.
	#[clap(value_parser)]
	pub input: PathBuf,

	/// Opcode table file.
	#[clap(value_parser, long, short = 't', default_value = "input/optab.txt")]
	pub optab: PathBuf,

	/// Directory the object program and the auxiliary artifacts (intermediate file, symbol/literal table dumps,
	/// listing) are written to.
	#[clap(value_parser, long, short = 'o', default_value = "output")]
	pub output_dir: PathBuf,

	/// Print the finished listing to standard output.
	#[clap(long)]
	pub dump_listing: bool,

	/// Print the opcode, symbol and literal tables to standard output.
	#[clap(long)]
	pub dump_tables: bool,
}
