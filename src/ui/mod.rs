mod diff_view;
mod styles;
mod tree_view;
mod utils;

pub use diff_view::render as render_diff;
pub use tree_view::render as render_tree;

use anyhow::Result;
use crossterm::queue;
use crossterm::style::{ContentStyle, Print, PrintStyledContent};
use std::io::Write;

/// A run of text with one style
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub style: ContentStyle,
}

impl Span {
    pub fn styled(text: impl Into<String>, style: ContentStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// One printed line
pub type Line = Vec<Span>;

/// Text of a line without styling
pub fn plain_text(line: &[Span]) -> String {
    line.iter().map(|s| s.text.as_str()).collect()
}

/// Print lines, styled when `color` is set
pub fn write_lines(out: &mut impl Write, lines: &[Line], color: bool) -> Result<()> {
    for line in lines {
        for span in line {
            if color {
                queue!(out, PrintStyledContent(span.style.apply(span.text.as_str())))?;
            } else {
                queue!(out, Print(&span.text))?;
            }
        }
        queue!(out, Print("\n"))?;
    }
    out.flush()?;
    Ok(())
}
