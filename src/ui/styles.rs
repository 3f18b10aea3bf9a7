use crate::changes::ChangeKind;
use crate::diff::{DiffLineRecord, LineKind, LineTone};
use crossterm::style::{Attribute, Color, ContentStyle};

// ── Text colors ──
pub const TEXT: Color = Color::Rgb { r: 200, g: 200, b: 200 };
pub const DIM: Color = Color::Rgb { r: 102, g: 102, b: 102 };
pub const BRIGHT: Color = Color::Rgb { r: 232, g: 232, b: 232 };

// ── Accent colors ──
pub const BLUE: Color = Color::Rgb { r: 96, g: 165, b: 250 };
pub const GREEN: Color = Color::Rgb { r: 74, g: 222, b: 128 };
pub const YELLOW: Color = Color::Rgb { r: 250, g: 204, b: 21 };
pub const RED: Color = Color::Rgb { r: 248, g: 113, b: 113 };
pub const PURPLE: Color = Color::Rgb { r: 167, g: 139, b: 250 };

// ── Diff colors ──
pub const ADD_TEXT: Color = Color::Rgb { r: 120, g: 240, b: 160 };
pub const DEL_TEXT: Color = Color::Rgb { r: 255, g: 140, b: 140 };

// ── Composed styles ──

pub fn plain() -> ContentStyle {
    fg(TEXT)
}

pub fn fg(color: Color) -> ContentStyle {
    ContentStyle {
        foreground_color: Some(color),
        ..ContentStyle::default()
    }
}

pub fn bold(color: Color) -> ContentStyle {
    ContentStyle {
        foreground_color: Some(color),
        attributes: Attribute::Bold.into(),
        ..ContentStyle::default()
    }
}

pub fn dim_style() -> ContentStyle {
    fg(DIM)
}

pub fn directory_style() -> ContentStyle {
    bold(BLUE)
}

pub fn heading_style() -> ContentStyle {
    bold(BRIGHT)
}

pub fn reviewed_style() -> ContentStyle {
    fg(GREEN)
}

pub fn status_style(kind: ChangeKind) -> ContentStyle {
    match kind {
        ChangeKind::Added => bold(GREEN),
        ChangeKind::Removed => bold(RED),
        ChangeKind::Modified => bold(YELLOW),
        ChangeKind::Renamed => bold(PURPLE),
    }
}

pub fn line_style(record: &DiffLineRecord) -> ContentStyle {
    match (record.tone, record.kind) {
        (LineTone::Warning, _) => bold(YELLOW),
        (LineTone::Divider, _) => dim_style(),
        (_, LineKind::Insertion) => fg(ADD_TEXT),
        (_, LineKind::Deletion) => fg(DEL_TEXT),
        _ => plain(),
    }
}
