//! Multi-module linking driven by `#LINK`, `#RUN` and `#BREAK`.
//!
//! The top-level source is the implicit "this" module. `#RUN` places a file
//! before everything laid out so far, `#LINK` places it after. Code segments
//! are laid out contiguously in that order, then every module's data, then a
//! single `Stack` line marking the first free address.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::errors::{AsmError, ErrorKind, SourceLoc};
use crate::module::{Module, ResolvedLine};
use crate::parser::{parse_line, source_lines, Directive, ParsedLine, SourceItem};
use crate::symbols::STACK_SYMBOL;

/// File extension required on `#LINK`/`#RUN` targets.
pub const SOURCE_EXTENSION: &str = "as";

/// Supplies source text for linked files.
pub trait SourceProvider {
    /// Returns the contents of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NotFound`] or [`ErrorKind::Io`] when the file
    /// cannot be produced.
    fn read_source(&self, path: &Path) -> Result<String, AsmError>;
}

/// Reads sources from disk.
///
/// Absolute paths are read as given. Relative paths are resolved against
/// the base folder, never the working directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FsSources {
    base: PathBuf,
}

impl FsSources {
    /// Creates a provider resolving relative paths against `base`.
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// The base folder.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl SourceProvider for FsSources {
    fn read_source(&self, path: &Path) -> Result<String, AsmError> {
        if path.is_absolute() {
            read_source_file(path)
        } else {
            read_source_file(&self.base.join(path))
        }
    }
}

/// Reads one source file at exactly `path`.
///
/// # Errors
///
/// Returns [`ErrorKind::NotFound`] when nothing exists at `path` and
/// [`ErrorKind::Io`] for any other read failure.
pub fn read_source_file(path: &Path) -> Result<String, AsmError> {
    fs::read_to_string(path).map_err(|e| {
        let kind = if e.kind() == io::ErrorKind::NotFound {
            ErrorKind::NotFound(path.to_path_buf())
        } else {
            ErrorKind::Io {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        };
        AsmError::new(kind)
    })
}

/// In-memory sources keyed by path, for embedding and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySources {
    files: HashMap<PathBuf, String>,
}

impl MemorySources {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    /// Adds or replaces a file.
    pub fn insert(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.files.insert(path.into(), text.into());
    }
}

impl SourceProvider for MemorySources {
    fn read_source(&self, path: &Path) -> Result<String, AsmError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| AsmError::new(ErrorKind::NotFound(path.to_path_buf())))
    }
}

/// The linker's output: resolved program lines plus breakpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    /// Resolved code lines of every module, in layout order.
    pub code: Vec<ResolvedLine>,
    /// Resolved data lines of every module, in layout order.
    pub data: Vec<ResolvedLine>,
    /// Absolute addresses recorded by `#BREAK`, in source order.
    pub breakpoints: Vec<i32>,
}

impl Program {
    /// Number of program words, including the trailing `Stack` line.
    #[must_use]
    pub fn len(&self) -> usize {
        self.code.len() + self.data.len() + 1
    }

    /// Always `false`: the `Stack` line is always present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Renders the program as assembler source text.
    #[must_use]
    pub fn text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.code.iter().chain(&self.data) {
            writeln!(f, "{line}")?;
        }
        writeln!(f, "{STACK_SYMBOL}\t.fill\t0")
    }
}

enum Unit {
    This,
    File { name: String, lines: Vec<ParsedLine> },
}

fn to_address(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Links a top-level source and every file it names.
///
/// `name` labels the top-level module in diagnostics.
///
/// # Errors
///
/// Returns the first parse, directive, load or resolution error, located
/// at the offending module and line where one applies.
pub fn link(name: &str, source: &str, provider: &dyn SourceProvider) -> Result<Program, AsmError> {
    let mut order = VecDeque::from([Unit::This]);
    let mut this_lines = Vec::new();
    let mut pending_breaks = Vec::new();

    for (number, text) in source_lines(source) {
        let item = parse_line(text, number).map_err(|kind| AsmError::at(kind, name, number))?;
        match item {
            SourceItem::Blank => {}
            SourceItem::Line(line) => this_lines.push(line),
            SourceItem::Directive(Directive::Break) => pending_breaks.push(code_lines(&this_lines)),
            SourceItem::Directive(Directive::Link(path)) => {
                let unit = load_unit(&path, provider).map_err(|e| located(e, name, number))?;
                order.push_back(unit);
            }
            SourceItem::Directive(Directive::Run(path)) => {
                let unit = load_unit(&path, provider).map_err(|e| located(e, name, number))?;
                order.push_front(unit);
            }
        }
    }

    let mut this_start = 0;
    let mut modules = Vec::with_capacity(order.len());
    let mut code_start = 0usize;
    for unit in order {
        let module = match unit {
            Unit::This => {
                this_start = code_start;
                Module::new(name, std::mem::take(&mut this_lines), to_address(code_start))
            }
            Unit::File { name, lines } => Module::new(name, lines, to_address(code_start)),
        };
        code_start += module.code_len();
        modules.push(module);
    }

    let mut program = Program {
        breakpoints: pending_breaks
            .into_iter()
            .map(|offset| to_address(this_start + offset))
            .collect(),
        ..Program::default()
    };

    let mut data_start = code_start;
    for module in modules {
        let data_len = module.data_len();
        let resolved = module.resolve(to_address(data_start))?;
        program.code.extend(resolved.code);
        program.data.extend(resolved.data);
        data_start += data_len;
    }

    Ok(program)
}

/// Links a file read through `provider`, naming the module after its path.
///
/// # Errors
///
/// Returns the load error for `path` or any error from [`link`].
pub fn link_file(path: &Path, provider: &dyn SourceProvider) -> Result<Program, AsmError> {
    let source = provider.read_source(path)?;
    link(&path.display().to_string(), &source, provider)
}

fn code_lines(lines: &[ParsedLine]) -> usize {
    lines.iter().filter(|line| !line.statement.is_fill()).count()
}

fn located(error: AsmError, module: &str, line: usize) -> AsmError {
    error.or_location(SourceLoc::new(module, line))
}

fn load_unit(path: &Path, provider: &dyn SourceProvider) -> Result<Unit, AsmError> {
    if path.extension().and_then(|ext| ext.to_str()) != Some(SOURCE_EXTENSION) {
        return Err(AsmError::new(ErrorKind::BadExtension(path.to_path_buf())));
    }

    let name = path.display().to_string();
    let source = provider.read_source(path)?;
    let mut lines = Vec::new();
    for (number, text) in source_lines(&source) {
        match parse_line(text, number).map_err(|kind| AsmError::at(kind, &name, number))? {
            SourceItem::Blank => {}
            SourceItem::Line(line) => lines.push(line),
            SourceItem::Directive(_) => {
                return Err(AsmError::at(ErrorKind::NestedDirective, name, number))
            }
        }
    }
    Ok(Unit::File { name, lines })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn create_temp_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(content.as_bytes()).expect("write temp file");
        path
    }

    #[test]
    fn standalone_source_gets_stack_marker() {
        let program = link("main", "\tnoop\n\thalt\n", &MemorySources::new()).expect("links");
        assert_eq!(program.text(), "\tnoop\n\thalt\nStack\t.fill\t0\n");
        assert_eq!(program.len(), 3);
    }

    #[test]
    fn run_goes_first_and_link_goes_last() {
        let sources = MemorySources::new()
            .with_file("a.as", "\tadd\t1\t1\t1\navalue\t.fill\t1\n")
            .with_file("b.as", "\tnor\t2\t2\t2\nbvalue\t.fill\t2\n");
        let main = "#LINK b.as\n\tlw\t0\t3\tmine\n#RUN a.as\nmine\t.fill\t3\n";
        let program = link("main", main, &sources).expect("links");

        assert_eq!(
            program.text(),
            "\tadd\t1\t1\t1\n\tlw\t0\t3\t4\n\tnor\t2\t2\t2\n\
             \t.fill\t1\n\t.fill\t3\n\t.fill\t2\nStack\t.fill\t0\n"
        );
    }

    #[test]
    fn later_run_lands_before_earlier_run() {
        let sources = MemorySources::new()
            .with_file("one.as", "\tnoop\n")
            .with_file("two.as", "\thalt\n");
        let program = link("main", "#RUN one.as\n#RUN two.as\n", &sources).expect("links");
        assert_eq!(program.text(), "\thalt\n\tnoop\nStack\t.fill\t0\n");
    }

    #[test]
    fn break_records_absolute_address_of_next_code_line() {
        let sources = MemorySources::new().with_file("init.as", "\tnoop\n\tnoop\n");
        let main = "#RUN init.as\n\tnoop\nx\t.fill\t1\n#BREAK\n\thalt\n";
        let program = link("main", main, &sources).expect("links");
        assert_eq!(program.breakpoints, vec![3]);
    }

    #[test]
    fn stack_reference_in_module_stays_symbolic() {
        let program = link("main", "\tlw\t0\t1\tsp\nsp\t.fill\tStack\n", &MemorySources::new())
            .expect("links");
        assert_eq!(program.text(), "\tlw\t0\t1\t1\n\t.fill\tStack\nStack\t.fill\t0\n");
    }

    #[test]
    fn rejects_wrong_extension() {
        let err = link("main", "#LINK lib.txt\n", &MemorySources::new()).expect_err("bad ext");
        assert_eq!(err.kind, ErrorKind::BadExtension(PathBuf::from("lib.txt")));
        assert_eq!(err.location.map(|l| (l.module, l.line)), Some(("main".into(), 1)));
    }

    #[test]
    fn missing_file_is_an_io_class_error() {
        let err = link("main", "\tnoop\n#LINK gone.as\n", &MemorySources::new())
            .expect_err("missing");
        assert_eq!(err.kind, ErrorKind::NotFound(PathBuf::from("gone.as")));
        assert_eq!(err.class(), crate::errors::ErrorClass::Io);
        assert_eq!(err.location.map(|l| l.line), Some(2));
    }

    #[test]
    fn nested_directive_is_rejected_in_linked_file() {
        let sources = MemorySources::new().with_file("lib.as", "\tnoop\n#LINK other.as\n");
        let err = link("main", "#LINK lib.as\n", &sources).expect_err("nested");
        assert_eq!(err.kind, ErrorKind::NestedDirective);
        assert_eq!(err.location.map(|l| (l.module, l.line)), Some(("lib.as".into(), 2)));
    }

    #[test]
    fn unknown_directive_is_rejected() {
        let err = link("main", "#FOO\n", &MemorySources::new()).expect_err("unknown");
        assert_eq!(err.kind, ErrorKind::UnknownDirective("#FOO".into()));
    }

    #[test]
    fn resolution_errors_name_the_linked_module() {
        let sources = MemorySources::new().with_file("lib.as", "\tbeq\t0\t0\tmain\n");
        let err = link("main", "main\tnoop\n#LINK lib.as\n", &sources).expect_err("private");
        assert_eq!(err.format_for_stderr(), "lib.as:1: error: undefined label 'main'");
    }

    #[test]
    fn fs_sources_resolve_relative_paths_in_base_folder() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        create_temp_file(temp_dir.path(), "lib.as", "\thalt\n");

        let sources = FsSources::new(temp_dir.path());
        let text = sources
            .read_source(Path::new("lib.as"))
            .expect("found relative to base");
        assert_eq!(text, "\thalt\n");

        let err = sources
            .read_source(Path::new("missing.as"))
            .expect_err("missing");
        assert_eq!(err.kind, ErrorKind::NotFound(temp_dir.path().join("missing.as")));
    }

    #[test]
    fn fs_sources_read_absolute_paths_as_given() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let elsewhere = tempfile::tempdir().expect("temp dir");
        let path = create_temp_file(elsewhere.path(), "abs.as", "\tnoop\n");

        let sources = FsSources::new(temp_dir.path());
        assert_eq!(sources.read_source(&path).expect("absolute"), "\tnoop\n");
    }

    #[test]
    fn read_source_file_reports_missing_path() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("none.as");
        let err = read_source_file(&path).expect_err("missing");
        assert_eq!(err.kind, ErrorKind::NotFound(path));
    }

    #[test]
    fn link_file_reads_top_level_through_provider() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let main = create_temp_file(temp_dir.path(), "main.as", "\tnoop\n#LINK lib.as\n");
        create_temp_file(temp_dir.path(), "lib.as", "\thalt\n");

        let program = link_file(&main, &FsSources::new(temp_dir.path())).expect("links");
        assert_eq!(program.text(), "\tnoop\n\thalt\nStack\t.fill\t0\n");
    }
}
