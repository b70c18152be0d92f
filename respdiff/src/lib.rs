use anyhow::{Context, Result};
use memmap2::Mmap;
use sha2::{Digest, Sha256};
use std::{
    borrow::Cow,
    cell::OnceCell,
    fmt,
    fs::File,
    hash::{Hash, Hasher},
    io::Read,
    path::Path,
};

use libdiff::DiffArray;

pub mod format;
pub mod output;

pub use format::{AsciiFormat, ColorFormat, Format, FormatError, FormatKind, FormatRegistry};
pub use libdiff::DiffItem;
pub use output::Output;

/// One line of a compared payload
///
/// `meta` holds the structural paths an upstream serializer attached to the line. It only
/// annotates hunk headers: equality and hashing look at the text alone.
#[derive(Debug, Clone, Eq)]
pub struct Line {
    text: String,
    meta: Vec<String>,
}

impl Line {
    pub fn new(text: impl Into<String>) -> Line {
        Line {
            text: text.into(),
            meta: Vec::new(),
        }
    }

    pub fn with_meta(text: impl Into<String>, meta: Vec<String>) -> Line {
        Line {
            text: text.into(),
            meta,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn meta(&self) -> &[String] {
        &self.meta
    }

    pub fn first_meta(&self) -> Option<&str> {
        self.meta.first().map(String::as_str)
    }
}

impl PartialEq for Line {
    fn eq(&self, other: &Line) -> bool {
        self.text == other.text
    }
}

impl Hash for Line {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Split a text blob into lines without metadata
pub fn lines_from_text(text: &str) -> Vec<Line> {
    text.lines().map(Line::new).collect()
}

/// Split a text blob into lines, attaching the n-th meta list to the n-th line
///
/// Lines past the end of `metas` carry no metadata.
pub fn lines_with_meta<I>(text: &str, metas: I) -> Vec<Line>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut metas = metas.into_iter();
    text.lines()
        .map(|line| Line::with_meta(line, metas.next().unwrap_or_default()))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiffOptions {
    /// Names of the left and right side in the report header
    pub labels: [String; 2],
    /// Unchanged lines kept around each hunk. `None` renders every line
    pub context: Option<usize>,
    /// Separator placed between output lines
    pub join_char: String,
    pub show_line_numbers: bool,
    pub format: FormatKind,
}

impl Default for DiffOptions {
    fn default() -> DiffOptions {
        DiffOptions {
            labels: ["left".to_string(), "right".to_string()],
            context: Some(3),
            join_char: "\n".to_string(),
            show_line_numbers: false,
            format: FormatKind::Ascii,
        }
    }
}

/// Comparison of two texts
///
/// The diff array is computed on first use and kept until [`Diff::recompute`]. The rendered
/// report is kept until the options change.
pub struct Diff {
    left: Vec<Line>,
    right: Vec<Line>,
    options: DiffOptions,
    output: Output,
    diff_array: OnceCell<DiffArray<Line>>,
    formatted: OnceCell<String>,
}

impl Diff {
    pub fn new(left: &str, right: &str, options: DiffOptions) -> Diff {
        Diff::from_lines(lines_from_text(left), lines_from_text(right), options)
    }

    pub fn from_lines(left: Vec<Line>, right: Vec<Line>, options: DiffOptions) -> Diff {
        let output = Output::new(&options);

        Diff {
            left,
            right,
            options,
            output,
            diff_array: OnceCell::new(),
            formatted: OnceCell::new(),
        }
    }

    pub fn left_lines(&self) -> &[Line] {
        &self.left
    }

    pub fn right_lines(&self) -> &[Line] {
        &self.right
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    pub fn diff_array(&self) -> &DiffArray<Line> {
        self.diff_array.get_or_init(|| {
            let diff_array = libdiff::diff(&self.left, &self.right);
            log::debug!(
                "Computed diff of {} and {} lines: {} items, {} changes",
                self.left.len(),
                self.right.len(),
                diff_array.len(),
                libdiff::change_count(&diff_array)
            );
            diff_array
        })
    }

    /// Drop the cached diff array and report
    pub fn recompute(&mut self) {
        self.diff_array = OnceCell::new();
        self.formatted = OnceCell::new();
    }

    /// Number of change blocks
    pub fn count(&self) -> usize {
        libdiff::change_count(self.diff_array())
    }

    pub fn is_any(&self) -> bool {
        self.count() > 0
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Swap in a new set of options. The cached report survives only if nothing changed
    pub fn process_new_options(&mut self, options: &DiffOptions) {
        if self.options != *options {
            self.options = options.clone();
            self.output = Output::new(&self.options);
            self.formatted = OnceCell::new();
        }
    }

    /// The rendered report, computed once per set of options
    pub fn formatted(&self) -> &str {
        self.formatted.get_or_init(|| self.render())
    }

    /// Render the report without looking at or filling the cache
    pub fn render(&self) -> String {
        self.output
            .render(self.diff_array(), self.left.len(), self.right.len())
    }
}

fn open_file<P: AsRef<Path>>(path: P) -> Result<Mmap> {
    let file = File::open(path).context("Failed to open file")?;
    let mmap = unsafe { Mmap::map(&file) }.context("Failed to map file")?;
    Ok(mmap)
}

/// Text to compare for a raw buffer. Binary content is reduced to its digest
pub fn buf_to_text(buf: &[u8]) -> Cow<str> {
    match std::str::from_utf8(buf) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => {
            let hash = Sha256::digest(buf);
            let hash_str = hex::encode(hash);
            Cow::Owned(format!("Binary file with sha256 digest: {}", hash_str))
        }
    }
}

/// Read the text to compare from a file, or from stdin when the path is `-`
pub fn load_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();

    if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf_to_text(&buf).into_owned());
    }

    let mmap = open_file(path).with_context(|| format!("Failed to open {}", path.display()))?;
    log::debug!("Loaded {} bytes from {}", mmap.len(), path.display());
    Ok(buf_to_text(&mmap).into_owned())
}
