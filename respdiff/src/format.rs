use ansi_term::Colour;
use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};
use thiserror::Error;

use crate::Line;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("unknown diff format {0:?}")]
    Unknown(String),
}

/// Rendering rules for a diff report
///
/// Every method has the plain unified-diff behavior, so a custom format only overrides what it
/// wants to change
pub trait Format: Send + Sync {
    /// Header lines naming both sides
    fn head(&self, left: &str, right: &str) -> Vec<String> {
        vec![format!("--- {left}"), format!("+++ {right}")]
    }

    /// Hunk marker. `left` and `right` are `line,length` ranges, `info` an optional annotation
    fn context(&self, left: &str, right: &str, info: Option<&str>) -> String {
        format!("@@ -{left} +{right} @@ {}", info.unwrap_or(""))
    }

    fn common(&self, line: &Line) -> String {
        format!("  {line}")
    }

    fn added(&self, line: &Line) -> String {
        format!("+ {line}")
    }

    fn deleted(&self, line: &Line) -> String {
        format!("- {line}")
    }

    /// Line number gutter. A side without a line is padded to `width`
    fn lines(&self, line_numbers: (Option<usize>, Option<usize>), width: usize) -> String {
        let num_to_string = |line: Option<usize>| {
            line.map(|x| format!("{x:>width$}"))
                .unwrap_or_else(|| " ".repeat(width))
        };

        format!(
            "{}|{} ",
            num_to_string(line_numbers.0),
            num_to_string(line_numbers.1)
        )
    }
}

/// Plain text output
#[derive(Debug, Default, Clone, Copy)]
pub struct AsciiFormat;

impl Format for AsciiFormat {}

/// Ascii layout with ANSI colors for the header, hunk markers, additions and deletions
#[derive(Debug, Default, Clone, Copy)]
pub struct ColorFormat;

impl Format for ColorFormat {
    fn head(&self, left: &str, right: &str) -> Vec<String> {
        let style = Colour::Yellow.bold();
        vec![
            format!("{}--- {left}", style.prefix()),
            format!("+++ {right}{}", style.suffix()),
        ]
    }

    fn context(&self, left: &str, right: &str, info: Option<&str>) -> String {
        let marker = Colour::Purple
            .bold()
            .paint(format!("@@ -{left} +{right} @@"));
        format!("{marker} {}", info.unwrap_or(""))
    }

    fn added(&self, line: &Line) -> String {
        Colour::Green.bold().paint(format!("+ {line}")).to_string()
    }

    fn deleted(&self, line: &Line) -> String {
        Colour::Red.bold().paint(format!("- {line}")).to_string()
    }
}

/// Which format a diff is rendered with
#[derive(Clone, Default)]
pub enum FormatKind {
    #[default]
    Ascii,
    Color,
    Custom(Arc<dyn Format>),
}

impl FormatKind {
    pub fn strategy(&self) -> Arc<dyn Format> {
        match self {
            FormatKind::Ascii => Arc::new(AsciiFormat),
            FormatKind::Color => Arc::new(ColorFormat),
            FormatKind::Custom(format) => Arc::clone(format),
        }
    }
}

impl fmt::Debug for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use FormatKind::*;

        let s = match self {
            Ascii => "Ascii",
            Color => "Color",
            Custom(_) => "Custom",
        };

        f.write_str(s)
    }
}

impl PartialEq for FormatKind {
    fn eq(&self, other: &FormatKind) -> bool {
        use FormatKind::*;

        match (self, other) {
            (Ascii, Ascii) | (Color, Color) => true,
            (Custom(a), Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl FromStr for FormatKind {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<FormatKind, FormatError> {
        FormatRegistry::default().resolve(s)
    }
}

pub type FormatConstructor = fn() -> FormatKind;

/// Names a format can be selected by, each mapped to the constructor of its strategy
#[derive(Clone)]
pub struct FormatRegistry {
    constructors: HashMap<String, FormatConstructor>,
}

impl Default for FormatRegistry {
    fn default() -> FormatRegistry {
        let mut registry = FormatRegistry {
            constructors: HashMap::new(),
        };

        registry
            .register("ascii", || FormatKind::Ascii)
            .register("ascii_diff", || FormatKind::Ascii)
            .register("color", || FormatKind::Color)
            .register("color_diff", || FormatKind::Color);

        registry
    }
}

impl FormatRegistry {
    /// Add or replace the format selected by `name`
    pub fn register(
        &mut self,
        name: impl Into<String>,
        constructor: FormatConstructor,
    ) -> &mut FormatRegistry {
        self.constructors.insert(name.into(), constructor);
        self
    }

    pub fn resolve(&self, name: &str) -> Result<FormatKind, FormatError> {
        self.constructors
            .get(name)
            .map(|constructor| constructor())
            .ok_or_else(|| FormatError::Unknown(name.to_string()))
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
