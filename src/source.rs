//! Source code infrastructure for error reporting.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use miette::{MietteError, MietteSpanContents, SourceCode, SourceSpan, SpanContents};
#[allow(unused)]
use smartstring::alias::String;

use crate::AssemblyError;

/// The assembly source code a diagnostic refers to.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct AssemblyCode {
	pub(crate) text: String,
	pub(crate) name: PathBuf,
}

impl AssemblyCode {
	/// Create a new source code struct by loading a file's contents.
	///
	/// # Errors
	/// If reading the file fails (doesn't exist, permissions wrong, I/O error etc.)
	pub fn from_file(filename: &str) -> Result<Arc<Self>, std::io::Error> {
		let mut path = PathBuf::from(filename);
		if path.is_relative() {
			path = std::env::current_dir()?.join(path);
		}
		path = path.canonicalize()?;
		let contents = std::fs::read_to_string(&path)?.chars().filter(|c| c != &'\r').collect();
		Ok(Arc::new(Self { name: path, text: contents }))
	}

	/// Create a new source code struct by loading a file's contents, and immediately create an assembler error if
	/// that fails.
	///
	/// # Errors
	/// If reading the file fails (doesn't exist, permissions wrong, I/O error etc.)
	pub fn from_file_or_assembly_error(file_name: &str) -> Result<Arc<Self>, AssemblyError> {
		Self::from_file(file_name).map_err(|os_error| AssemblyError::FileNotFound {
			os_error:  Arc::new(os_error),
			file_name: file_name.into(),
			src:       Arc::new(Self { name: PathBuf::from("<<arguments>>"), text: file_name.into() }),
			location:  (0, file_name.len()).into(),
		})
	}

	/// Create a new source code struct from source code text and a (possibly fake) name.
	#[must_use]
	pub fn new(text: &str, name: &str) -> Self {
		Self { text: text.chars().filter(|c| c != &'\r').collect(), name: PathBuf::from(name) }
	}

	/// Returns a pretty-printed variant of the file name of this source code: relative to the working directory
	/// where possible, absolute otherwise.
	#[must_use]
	pub fn file_name(&self) -> String {
		Self::file_name_for(&self.name)
	}

	/// Returns a pretty-printed variant of the given path.
	#[must_use]
	pub fn file_name_for(path: &Path) -> String {
		std::env::current_dir()
			.ok()
			.and_then(|cwd| path.strip_prefix(cwd).map(Path::to_path_buf).ok())
			.unwrap_or_else(|| path.to_path_buf())
			.to_string_lossy()
			.as_ref()
			.into()
	}
}

impl SourceCode for AssemblyCode {
	fn read_span<'a>(
		&'a self,
		span: &SourceSpan,
		context_lines_before: usize,
		context_lines_after: usize,
	) -> Result<Box<dyn SpanContents<'a> + 'a>, MietteError> {
		let result = self.text.read_span(span, context_lines_before, context_lines_after)?;
		Ok(Box::new(MietteSpanContents::new_named(
			self.file_name().to_string(),
			result.data(),
			*result.span(),
			result.line(),
			result.column(),
			result.line_count(),
		)))
	}
}
