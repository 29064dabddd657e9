//! Table extraction with merged-cell handling and markdown rendering.

use crate::util::normalize_whitespace;
use crate::xml::{XmlDocument, W};
use indextree::NodeId;
use serde::{Deserialize, Serialize};

/// A table as a grid of cell texts. Cells covered by a horizontal or vertical
/// merge hold an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedTable {
    pub rows: Vec<Vec<String>>,
    pub columns: usize,
}

impl ExtractedTable {
    /// Pipe table with the first row as header. Empty tables render as "".
    pub fn to_markdown(&self) -> String {
        let Some((header, body)) = self.rows.split_first() else {
            return String::new();
        };
        let width = self
            .rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(self.columns)
            .max(1);

        let mut out = String::new();
        push_row(&mut out, header, width);
        out.push('|');
        for _ in 0..width {
            out.push_str(" --- |");
        }
        out.push('\n');
        for row in body {
            push_row(&mut out, row, width);
        }
        out.pop();
        out
    }
}

fn push_row(out: &mut String, row: &[String], width: usize) {
    out.push('|');
    for i in 0..width {
        let cell = row.get(i).map(String::as_str).unwrap_or("");
        out.push(' ');
        out.push_str(&escape_cell(cell));
        out.push_str(" |");
    }
    out.push('\n');
}

fn escape_cell(cell: &str) -> String {
    normalize_whitespace(cell).replace('|', "\\|")
}

/// Nearest ancestor of `node` with the given name.
fn nearest(doc: &XmlDocument, node: NodeId, name: &crate::xml::XName) -> Option<NodeId> {
    doc.ancestors(node).find(|&a| doc.is_named(a, name))
}

/// Descendants of `owner` named `name` whose nearest `owner_name` ancestor is
/// `owner` itself, so nested tables are not flattened into their parent.
fn owned<'a>(
    doc: &'a XmlDocument,
    owner: NodeId,
    name: &'a crate::xml::XName,
    owner_name: &'a crate::xml::XName,
) -> impl Iterator<Item = NodeId> + 'a {
    doc.descendants_named(owner, name)
        .filter(move |&n| nearest(doc, n, owner_name) == Some(owner))
}

fn cell_text(doc: &XmlDocument, cell: NodeId) -> String {
    let p = W::p();
    let t = W::t();
    let tc = W::tc();
    let paragraphs: Vec<String> = owned(doc, cell, &p, &tc)
        .map(|para| {
            owned(doc, para, &t, &p)
                .map(|node| doc.text_content(node))
                .collect::<String>()
        })
        .filter(|text| !text.trim().is_empty())
        .collect();
    normalize_whitespace(&paragraphs.join(" "))
}

#[derive(Debug, PartialEq, Eq)]
enum VerticalMerge {
    None,
    Restart,
    Continue,
}

fn vertical_merge(doc: &XmlDocument, cell: NodeId) -> VerticalMerge {
    let Some(props) = doc.first_child_named(cell, &W::tcPr()) else {
        return VerticalMerge::None;
    };
    match doc.first_child_named(props, &W::vMerge()) {
        None => VerticalMerge::None,
        Some(merge) => match doc.attribute(merge, &W::val()) {
            Some("restart") => VerticalMerge::Restart,
            _ => VerticalMerge::Continue,
        },
    }
}

/// Word's own column limit; bounds spans in tables without a declared grid.
const MAX_COLUMNS: usize = 63;

fn grid_span(doc: &XmlDocument, cell: NodeId) -> usize {
    doc.first_child_named(cell, &W::tcPr())
        .and_then(|props| doc.first_child_named(props, &W::gridSpan()))
        .and_then(|span| doc.attribute(span, &W::val()))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .max(1)
}

fn read_table(doc: &XmlDocument, table: NodeId) -> ExtractedTable {
    let tbl = W::tbl();
    let tr = W::tr();
    let tc = W::tc();

    let declared = doc
        .first_child_named(table, &W::tblGrid())
        .map(|grid| doc.elements_by_name(grid, &W::gridCol()).count())
        .unwrap_or(0);

    let mut rows: Vec<Vec<String>> = owned(doc, table, &tr, &tbl)
        .map(|row| {
            let mut cells = Vec::new();
            for cell in owned(doc, row, &tc, &tr) {
                let text = match vertical_merge(doc, cell) {
                    VerticalMerge::Continue => String::new(),
                    _ => cell_text(doc, cell),
                };
                let limit = if declared > 0 {
                    declared.saturating_sub(cells.len()).max(1)
                } else {
                    MAX_COLUMNS
                };
                let span = grid_span(doc, cell).min(limit);
                cells.push(text);
                cells.extend(std::iter::repeat(String::new()).take(span - 1));
            }
            cells
        })
        .collect();

    let columns = if declared > 0 {
        declared
    } else {
        rows.iter().map(Vec::len).max().unwrap_or(0)
    };
    for row in &mut rows {
        if row.len() < columns {
            row.resize(columns, String::new());
        }
    }

    ExtractedTable { rows, columns }
}

/// Every top-level table in document order.
pub fn read_tables(doc: &XmlDocument) -> Vec<ExtractedTable> {
    let Some(root) = doc.root() else {
        return Vec::new();
    };
    let tbl = W::tbl();
    doc.descendants_named(root, &tbl)
        .filter(|&t| nearest(doc, t, &tbl).is_none())
        .map(|t| read_table(doc, t))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parser::parse;
    use pretty_assertions::assert_eq;

    const NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

    fn cell(text: &str, props: &str) -> String {
        format!(r#"<w:tc><w:tcPr>{props}</w:tcPr><w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:tc>"#)
    }

    fn tables(inner: &str) -> Vec<ExtractedTable> {
        let xml = format!(r#"<w:document {NS}><w:body>{inner}</w:body></w:document>"#);
        read_tables(&parse(&xml).unwrap())
    }

    #[test]
    fn horizontal_merge_fills_covered_columns() {
        let xml = format!(
            r#"<w:tbl><w:tblGrid><w:gridCol/><w:gridCol/></w:tblGrid><w:tr>{}</w:tr><w:tr>{}{}</w:tr></w:tbl>"#,
            cell("Merged", r#"<w:gridSpan w:val="2"/>"#),
            cell("a", ""),
            cell("b", ""),
        );
        let tables = tables(&xml);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].columns, 2);
        assert_eq!(tables[0].rows[0], vec!["Merged".to_string(), String::new()]);
        assert_eq!(tables[0].rows[1], vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn oversized_span_is_clamped() {
        let xml = format!(
            r#"<w:tbl><w:tblGrid><w:gridCol/><w:gridCol/><w:gridCol/></w:tblGrid><w:tr>{}{}</w:tr></w:tbl><w:tbl><w:tr>{}</w:tr></w:tbl>"#,
            cell("a", ""),
            cell("wide", r#"<w:gridSpan w:val="100000000"/>"#),
            cell("free", r#"<w:gridSpan w:val="100000000"/>"#),
        );
        let tables = tables(&xml);
        assert_eq!(tables[0].rows[0], vec!["a".to_string(), "wide".to_string(), String::new()]);
        assert_eq!(tables[0].columns, 3);
        assert_eq!(tables[1].rows[0].len(), MAX_COLUMNS);
    }

    #[test]
    fn vertical_merge_continuation_is_empty() {
        let xml = format!(
            r#"<w:tbl><w:tr>{}{}</w:tr><w:tr>{}{}</w:tr></w:tbl>"#,
            cell("Group", r#"<w:vMerge w:val="restart"/>"#),
            cell("x", ""),
            cell("ignored", "<w:vMerge/>"),
            cell("y", ""),
        );
        let tables = tables(&xml);
        assert_eq!(tables[0].rows[1], vec![String::new(), "y".to_string()]);
        assert_eq!(tables[0].rows[0][0], "Group");
    }

    #[test]
    fn short_rows_are_padded_to_column_count() {
        let xml = format!(
            r#"<w:tbl><w:tr>{}{}{}</w:tr><w:tr>{}</w:tr></w:tbl>"#,
            cell("h1", ""),
            cell("h2", ""),
            cell("h3", ""),
            cell("only", ""),
        );
        let tables = tables(&xml);
        assert_eq!(tables[0].columns, 3);
        assert_eq!(tables[0].rows[1].len(), 3);
    }

    #[test]
    fn nested_tables_stay_inside_their_cell() {
        let inner = format!(r#"<w:tbl><w:tr>{}</w:tr></w:tbl>"#, cell("inner", ""));
        let xml = format!(
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>outer</w:t></w:r></w:p>{inner}</w:tc></w:tr></w:tbl>"#
        );
        let tables = tables(&xml);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows, vec![vec!["outer".to_string()]]);
    }

    #[test]
    fn renders_pipe_table_with_escaped_cells() {
        let table = ExtractedTable {
            rows: vec![
                vec!["Name".into(), "Value".into()],
                vec!["a|b".into(), "".into()],
            ],
            columns: 2,
        };
        assert_eq!(
            table.to_markdown(),
            "| Name | Value |\n| --- | --- |\n| a\\|b |  |"
        );
        assert_eq!(
            ExtractedTable { rows: vec![], columns: 0 }.to_markdown(),
            ""
        );
    }
}
