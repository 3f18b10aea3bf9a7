use super::styles;
use super::utils::truncate;
use super::{Line, Span};
use crate::app::CollapseController;
use crate::review::ReviewState;
use crate::tree::{display_name, TreeNode, TreeRow};

const MAX_NAME: usize = 60;

/// The file tree with review marks, in rendered order
pub fn render(tree: &TreeNode, state: &ReviewState, collapse: &CollapseController) -> Vec<Line> {
    let files = tree.files();
    let reviewed = files.iter().filter(|c| state.is_reviewed(&c.path)).count();

    let mut lines: Vec<Line> = vec![vec![Span::styled(
        format!(" FILES ({}/{} reviewed) ", reviewed, files.len()),
        styles::heading_style(),
    )]];

    for row in tree.rows() {
        let indent = "  ".repeat(row.depth() + 1);
        match row {
            TreeRow::Dir { name, .. } => {
                lines.push(vec![
                    Span::styled(indent, styles::plain()),
                    Span::styled(format!("{}/", name), styles::directory_style()),
                ]);
            }
            TreeRow::File { change, .. } => {
                let is_reviewed = state.is_reviewed(&change.path);
                let (mark, mark_style) = if is_reviewed {
                    ("[x] ", styles::reviewed_style())
                } else {
                    ("[ ] ", styles::dim_style())
                };
                let name_style = if is_reviewed {
                    styles::dim_style()
                } else {
                    styles::plain()
                };
                let mut line = vec![
                    Span::styled(indent, styles::plain()),
                    Span::styled(mark, mark_style),
                    Span::styled(format!("{} ", change.kind.symbol()), styles::status_style(change.kind)),
                    Span::styled(truncate(display_name(&change.path), MAX_NAME), name_style),
                ];
                if collapse.is_collapsed(&change.path) {
                    line.push(Span::styled("  (collapsed)", styles::dim_style()));
                }
                lines.push(line);
            }
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::{ChangeKind, FileChange};
    use crate::tree;
    use crate::ui::plain_text;

    #[test]
    fn renders_rows_with_marks_and_collapse() {
        let changes = vec![
            FileChange::new("a/b.txt", ChangeKind::Modified, "#1"),
            FileChange::new("a/c.txt", ChangeKind::Added, "#2"),
            FileChange::new("d.txt", ChangeKind::Removed, "#3"),
        ];
        let tree = tree::build(&changes);
        let state = ReviewState::default().set_reviewed("a/c.txt", true);
        let mut collapse = CollapseController::new(&[]);
        let mut ops: Vec<crate::app::ViewOp> = Vec::new();
        collapse.apply_initial(&changes, &state, &mut ops);

        let text: Vec<String> = render(&tree, &state, &collapse)
            .iter()
            .map(|l| plain_text(l))
            .collect();
        assert_eq!(
            text,
            vec![
                " FILES (1/3 reviewed) ",
                "  a/",
                "    [ ] ~ b.txt",
                "    [x] + c.txt  (collapsed)",
                "  [ ] - d.txt  (collapsed)",
            ]
        );
    }
}
