use super::styles;
use super::utils::unescape_html;
use super::{Line, Span};
use crate::app::Session;
use crate::diff::LineTone;
use crate::tree::{display_name, display_prefix};

const DIVIDER: &str = "────────";

/// Every diff section with its normalized lines. Collapsed sections show only
/// their heading; the active filters decide which lines and comment counts
/// are shown.
pub fn render(session: &Session) -> Vec<Line> {
    let collapse = session.collapse();
    let mut lines: Vec<Line> = Vec::new();

    for section in session.sections() {
        let path = section.path.as_str();
        let collapsed = collapse.is_collapsed(path);
        let kind = section.kind();

        let mut heading = vec![
            Span::styled(if collapsed { "▸ " } else { "▾ " }, styles::dim_style()),
            if session.review().is_reviewed(path) {
                Span::styled("[x] ", styles::reviewed_style())
            } else {
                Span::styled("[ ] ", styles::dim_style())
            },
        ];
        let prefix = display_prefix(path);
        if !prefix.is_empty() {
            heading.push(Span::styled(format!("{}/", prefix), styles::plain()));
        }
        heading.push(Span::styled(display_name(path), styles::heading_style()));
        heading.push(Span::styled(format!("  [{}]", kind.label()), styles::status_style(kind)));
        if section.comments > 0 && collapse.shows_comments() {
            heading.push(Span::styled(
                format!("  ({} comment{})", section.comments, if section.comments == 1 { "" } else { "s" }),
                styles::dim_style(),
            ));
        }
        lines.push(heading);

        if !collapsed {
            for record in collapse.visible_lines(session.lines(path)) {
                let text = match record.tone {
                    LineTone::Divider => DIVIDER.to_string(),
                    _ => unescape_html(&record.normalized_html),
                };
                lines.push(vec![
                    Span::styled("    ", styles::plain()),
                    Span::styled(text, styles::line_style(record)),
                ]);
            }
        }
        lines.push(Vec::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ViewOp;
    use crate::changes::PageSnapshot;
    use crate::config::RtConfig;
    use crate::diff::ObserveMode;
    use crate::review::MemoryStorage;
    use crate::ui::plain_text;
    use std::time::Instant;

    const PAGE: &str = r#"{
        "document": "/p/1",
        "sections": [
            {"path": "src/a.rs", "changeKindLabel": "MODIFIED", "anchor": "chg-a",
             "lines": [" ctx", "+new", "-old", "======="], "comments": 2},
            {"path": "gone.rs", "changeKindLabel": "DELETED", "anchor": "chg-g", "lines": ["-x"]}
        ]
    }"#;

    fn session(ops: &mut Vec<ViewOp>) -> Session {
        let snapshot = PageSnapshot::parse(PAGE).unwrap();
        Session::start(
            &snapshot,
            Box::new(MemoryStorage::new()),
            &RtConfig::default(),
            ObserveMode::Active,
            Instant::now(),
            ops,
        )
        .unwrap()
    }

    fn text(session: &Session) -> Vec<String> {
        render(session).iter().map(|l| plain_text(l)).collect()
    }

    #[test]
    fn renders_normalized_lines_and_collapsed_headings() {
        let mut ops = Vec::new();
        let s = session(&mut ops);
        assert_eq!(
            text(&s),
            vec![
                "▾ [ ] src/a.rs  [MODIFIED]  (2 comments)",
                "     ctx",
                "     new",
                "     old",
                "    ────────",
                "",
                "▸ [ ] gone.rs  [DELETED]",
                "",
            ]
        );
    }

    #[test]
    fn filters_hide_deletions_and_comment_counts() {
        let mut ops = Vec::new();
        let mut s = session(&mut ops);
        s.set_hide_deletions(true, &mut ops);
        s.set_hide_comments(true, &mut ops);
        let out = text(&s);
        assert_eq!(out[0], "▾ [ ] src/a.rs  [MODIFIED]");
        assert!(!out.iter().any(|l| l.contains("old")));
        assert!(out.iter().any(|l| l.contains("new")));
    }
}
