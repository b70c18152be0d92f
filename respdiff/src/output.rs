use std::sync::Arc;

use libdiff::DiffItem;

use crate::{format::Format, DiffOptions, Line};

/// Renders a diff array as a report of context-bounded sections
pub struct Output {
    labels: [String; 2],
    context: Option<usize>,
    join_char: String,
    show_line_numbers: bool,
    format: Arc<dyn Format>,
}

/// One `@@ -l,n +l,m @@` block being assembled
struct Section<'a> {
    format: &'a dyn Format,
    /// Gutter width, `None` when line numbers are hidden
    line_num_width: Option<usize>,
    /// Lines of each side that precede the section
    left_start: usize,
    right_start: usize,
    left_len: usize,
    right_len: usize,
    left_meta: Option<&'a str>,
    right_meta: Option<&'a str>,
    lines: Vec<String>,
    /// Common lines seen since the last change
    context: usize,
}

impl<'a> Section<'a> {
    fn new(
        format: &'a dyn Format,
        line_num_width: Option<usize>,
        left_start: usize,
        right_start: usize,
    ) -> Section<'a> {
        Section {
            format,
            line_num_width,
            left_start,
            right_start,
            left_len: 0,
            right_len: 0,
            left_meta: None,
            right_meta: None,
            lines: Vec::new(),
            context: 0,
        }
    }

    fn push(&mut self, item: &'a DiffItem<Line>) {
        match item {
            DiffItem::Common(line) => self.push_common(line),
            DiffItem::Change { left, right } => {
                for line in left {
                    self.push_deleted(line);
                }
                for line in right {
                    self.push_added(line);
                }
            }
        }
    }

    fn push_common(&mut self, line: &'a Line) {
        self.left_len += 1;
        self.right_len += 1;
        self.context += 1;

        if self.left_meta.is_none() {
            if self.right_meta.is_none() {
                self.right_meta = line.first_meta();
            }
            self.left_meta = self.right_meta;
        }

        let line_numbers = self.line_numbers(
            Some(self.left_start + self.left_len),
            Some(self.right_start + self.right_len),
        );
        self.lines
            .push(format!("{line_numbers}{}", self.format.common(line)));
    }

    fn push_deleted(&mut self, line: &'a Line) {
        self.left_len += 1;
        self.context = 0;

        if self.left_meta.is_none() {
            self.left_meta = line.first_meta();
        }

        let line_numbers = self.line_numbers(Some(self.left_start + self.left_len), None);
        self.lines
            .push(format!("{line_numbers}{}", self.format.deleted(line)));
    }

    fn push_added(&mut self, line: &'a Line) {
        self.right_len += 1;
        self.context = 0;

        if self.right_meta.is_none() {
            self.right_meta = line.first_meta();
        }

        let line_numbers = self.line_numbers(None, Some(self.right_start + self.right_len));
        self.lines
            .push(format!("{line_numbers}{}", self.format.added(line)));
    }

    fn line_numbers(&self, line_a: Option<usize>, line_b: Option<usize>) -> String {
        self.line_num_width
            .map(|width| self.format.lines((line_a, line_b), width))
            .unwrap_or_default()
    }

    fn render(self) -> Vec<String> {
        let mut left_range = format!("{},{}", self.left_start + 1, self.left_len);
        let mut right_range = format!("{},{}", self.right_start + 1, self.right_len);

        let info = match (self.left_meta, self.right_meta) {
            (Some(left_meta), Some(right_meta)) if left_meta != right_meta => {
                left_range.push(' ');
                left_range.push_str(left_meta);
                right_range.push(' ');
                right_range.push_str(right_meta);
                None
            }
            (left_meta, right_meta) => left_meta.or(right_meta),
        };

        log::trace!("Rendering section -{left_range} +{right_range}");

        let mut output = Vec::with_capacity(self.lines.len() + 1);
        output.push(self.format.context(&left_range, &right_range, info));
        output.extend(self.lines);
        output
    }
}

impl Output {
    pub fn new(options: &DiffOptions) -> Output {
        Output {
            labels: options.labels.clone(),
            context: options.context,
            join_char: options.join_char.clone(),
            show_line_numbers: options.show_line_numbers,
            format: options.format.strategy(),
        }
    }

    /// A section started at or containing `idx` has to keep going if a change is within reach
    fn continue_section(&self, diff_array: &[DiffItem<Line>], idx: usize) -> bool {
        match self.context {
            None => true,
            Some(context) => diff_array
                .iter()
                .skip(idx)
                .take(context + 1)
                .any(DiffItem::is_change),
        }
    }

    fn end_section(&self, diff_array: &[DiffItem<Line>], idx: usize, section: &Section) -> bool {
        if idx >= diff_array.len() {
            return true;
        }

        match self.context {
            None => false,
            Some(context) => {
                section.context >= context && !self.continue_section(diff_array, idx)
            }
        }
    }

    /// Render `diff_array`, computed from `left_count` and `right_count` lines, as one string
    pub fn render(
        &self,
        diff_array: &[DiffItem<Line>],
        left_count: usize,
        right_count: usize,
    ) -> String {
        let line_num_width = self
            .show_line_numbers
            .then(|| left_count.max(right_count).to_string().len());

        let mut output = self.format.head(&self.labels[0], &self.labels[1]);
        let mut section: Option<Section> = None;
        let mut num_sections = 0;

        let mut left_line = 0;
        let mut right_line = 0;

        for (idx, item) in diff_array.iter().enumerate() {
            if section.is_none() && self.continue_section(diff_array, idx) {
                section = Some(Section::new(
                    self.format.as_ref(),
                    line_num_width,
                    left_line,
                    right_line,
                ));
            }

            left_line += item.left().len();
            right_line += item.right().len();

            let Some(current) = section.as_mut() else {
                continue;
            };
            current.push(item);

            if self.end_section(diff_array, idx + 1, current) {
                if let Some(finished) = section.take() {
                    output.extend(finished.render());
                    num_sections += 1;
                }
            }
        }

        log::debug!(
            "Rendered {} sections from {} diff items",
            num_sections,
            diff_array.len()
        );

        output.join(&self.join_char)
    }
}
