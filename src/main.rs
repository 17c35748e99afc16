//! sicasm binary.

use std::fs::File;
use std::io::BufWriter;

use clap::Parser;
use sicasm::cli::SicasmCli;
use sicasm::optab::Optab;
use sicasm::{listing, run_assembler, AssemblyCode};

fn main() -> miette::Result<()> {
	miette::set_hook(Box::new(|_| {
		Box::new(miette::MietteHandlerOpts::new().unicode(true).context_lines(3).tab_width(4).build())
	}))?;

	let args = SicasmCli::parse();

	let optab = Optab::load(&args.optab.to_string_lossy())?;
	let source_code = AssemblyCode::from_file_or_assembly_error(&args.input.to_string_lossy())?;
	let artifacts = run_assembler(&source_code, &optab);

	for block in artifacts.pass1.layout.iter() {
		println!("Block [{}] {}: start=0x{:04X}, length=0x{:04X}", block.id, block.name, block.start, block.length);
	}

	std::fs::create_dir_all(&args.output_dir).expect("Couldn't create output directory");
	let open = |name: &str| BufWriter::new(File::create(args.output_dir.join(name)).expect("Couldn't open output file"));

	artifacts.pass2.object.write_to(&mut open("OBJFILE")).expect("Couldn't write object file");
	listing::write_intermediate(&mut open("INTFILE"), &artifacts.pass1).expect("Couldn't write intermediate file");
	artifacts.pass1.symbols.write_table(&mut open("SYMTAB.txt")).expect("Couldn't write symbol table");
	artifacts.pass1.literals.write_table(&mut open("LITTAB.txt")).expect("Couldn't write literal table");
	listing::write_listing(&mut open("LISTING.txt"), &artifacts.pass1, &artifacts.pass2)
		.expect("Couldn't write listing");

	if args.dump_tables {
		let mut stdout = std::io::stdout().lock();
		optab.write_table(&mut stdout).expect("Couldn't write to stdout");
		println!();
		artifacts.pass1.symbols.write_table(&mut stdout).expect("Couldn't write to stdout");
		println!();
		artifacts.pass1.literals.write_table(&mut stdout).expect("Couldn't write to stdout");
	}
	if args.dump_listing {
		let mut stdout = std::io::stdout().lock();
		listing::write_listing(&mut stdout, &artifacts.pass1, &artifacts.pass2).expect("Couldn't write to stdout");
	}

	Ok(())
}
