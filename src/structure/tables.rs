//! Table structure model.
//!
//! Builds a row/column model for a tagged Table element, capturing TH/TD
//! placement, spans, Scope, Headers and ID attributes. The WCAG and
//! PDF/UA table checks evaluate the model; this module only interprets
//! structure.

use super::walker::StructureWalker;
use crate::object::Dict;
use std::collections::HashMap;

/// One TH or TD cell with its grid placement.
#[derive(Debug, Clone)]
pub struct TableCell {
    /// TH when true, TD otherwise
    pub is_header: bool,
    /// 0-based row index
    pub row_index: usize,
    /// First column covered
    pub col_start: usize,
    /// Last column covered (inclusive)
    pub col_end: usize,
    /// ColSpan (>= 1)
    pub col_span: usize,
    /// RowSpan (>= 1)
    pub row_span: usize,
    /// Normalized Scope value ("Column", "Row", "Both")
    pub scope: Option<String>,
    /// IDs listed in the cell's Headers attribute
    pub headers: Vec<String>,
    /// The cell's own ID
    pub id: Option<String>,
}

/// Parsed model of one table.
#[derive(Debug, Clone, Default)]
pub struct TableModel {
    /// Page the table sits on, when determinable
    pub page: Option<u32>,
    /// Label extracted from the table element
    pub label: Option<String>,
    /// All recognized cells
    pub cells: Vec<TableCell>,
    /// Number of rows that contained cells
    pub row_count: usize,
    /// Widest row in columns
    pub column_count: usize,
}

impl TableModel {
    /// Header cells.
    pub fn headers(&self) -> impl Iterator<Item = &TableCell> {
        self.cells.iter().filter(|c| c.is_header)
    }

    /// Data cells.
    pub fn data_cells(&self) -> impl Iterator<Item = &TableCell> {
        self.cells.iter().filter(|c| !c.is_header)
    }

    /// Header lookup by ID.
    pub fn headers_by_id(&self) -> HashMap<&str, &TableCell> {
        self.headers()
            .filter_map(|h| h.id.as_deref().map(|id| (id, h)))
            .collect()
    }

    /// Column ranges overlap.
    pub fn columns_overlap(a: &TableCell, b: &TableCell) -> bool {
        !(a.col_end < b.col_start || b.col_end < a.col_start)
    }

    /// Resolve the headers associated with a data cell, in the priority
    /// order the table rules prescribe: explicit Headers IDs, then
    /// column-scoped TH overlap, then row-scoped TH in the same row, then
    /// the first-row / first-column layout fallback.
    pub fn associated_headers(&self, cell: &TableCell) -> Vec<&TableCell> {
        let by_id = self.headers_by_id();
        let mut matched: Vec<&TableCell> = cell
            .headers
            .iter()
            .filter_map(|id| by_id.get(id.as_str()).copied())
            .collect();
        if !matched.is_empty() {
            return matched;
        }

        matched = self
            .headers()
            .filter(|h| h.scope.as_deref() == Some("Column") && Self::columns_overlap(cell, h))
            .collect();
        if !matched.is_empty() {
            return matched;
        }

        matched = self
            .headers()
            .filter(|h| h.scope.as_deref() == Some("Row") && h.row_index == cell.row_index)
            .collect();
        if !matched.is_empty() {
            return matched;
        }

        self.infer_headers_from_layout(cell)
    }

    fn infer_headers_from_layout(&self, cell: &TableCell) -> Vec<&TableCell> {
        let first_row = self.headers().map(|h| h.row_index).min();
        if let Some(first_row) = first_row {
            let matched: Vec<&TableCell> = self
                .headers()
                .filter(|h| h.row_index == first_row && Self::columns_overlap(cell, h))
                .collect();
            if !matched.is_empty() {
                return matched;
            }
        }
        self.headers()
            .filter(|h| h.col_start == 0 && Self::columns_overlap(cell, h))
            .collect()
    }

    /// Validate that a TH's declared Scope matches its placement: a
    /// Column scope needs a TD in an overlapping column range on some
    /// other row, a Row scope needs data cells beside it in its own row.
    pub fn scope_consistent(&self, header: &TableCell) -> bool {
        match header.scope.as_deref() {
            Some("Column") => self.data_cells().any(|cell| {
                cell.row_index != header.row_index && Self::columns_overlap(cell, header)
            }),
            Some("Row") => {
                let row_cells: Vec<&TableCell> = self
                    .cells
                    .iter()
                    .filter(|c| c.row_index == header.row_index)
                    .collect();
                let has_data = row_cells.iter().any(|c| !c.is_header);
                let row_span: usize = row_cells.iter().map(|c| c.col_span).sum();
                has_data && row_span > header.col_span
            },
            _ => true,
        }
    }
}

/// Build the model for one Table element. Returns None when no rows or
/// cells could be interpreted.
pub fn build_table_model<'a>(
    walker: &StructureWalker<'a>,
    table: &'a Dict,
    page: Option<u32>,
) -> Option<TableModel> {
    let mut rows = collect_rows(walker, table);
    if rows.is_empty() {
        // Some writers omit TR and hang cells directly off the table.
        rows.push(table);
    }

    let mut model = TableModel {
        page,
        label: walker.element_label(table),
        ..Default::default()
    };

    let mut row_count = 0;
    for (row_index, &row) in rows.iter().enumerate() {
        let cells = collect_cells(walker, row);
        if cells.is_empty() {
            continue;
        }
        row_count += 1;
        let mut column = 0usize;
        for cell in cells {
            let cell_type = walker.resolved_type(cell);
            if cell_type != "TH" && cell_type != "TD" {
                continue;
            }
            let col_span = positive_int(cell, "ColSpan");
            let row_span = positive_int(cell, "RowSpan");
            model.cells.push(TableCell {
                is_header: cell_type == "TH",
                row_index,
                col_start: column,
                col_end: column + col_span - 1,
                col_span,
                row_span,
                scope: normalize_scope(cell),
                headers: header_ids(walker, cell),
                id: normalize_id(cell.get("ID")),
            });
            column += col_span;
        }
        model.column_count = model.column_count.max(column);
    }
    model.row_count = row_count;

    if model.cells.is_empty() {
        return None;
    }
    Some(model)
}

/// TR elements in reading order. Descends through row-group containers
/// (THead/TBody/TFoot and anything else that is not itself a row).
fn collect_rows<'a>(walker: &StructureWalker<'a>, table: &'a Dict) -> Vec<&'a Dict> {
    let mut rows = Vec::new();
    collect_typed(walker, table, "TR", &mut rows, 0);
    rows
}

/// TH/TD cells under a row container, in document order.
fn collect_cells<'a>(walker: &StructureWalker<'a>, row: &'a Dict) -> Vec<&'a Dict> {
    let mut cells = Vec::new();
    collect_two_types(walker, row, &mut cells, 0);
    cells
}

fn collect_typed<'a>(
    walker: &StructureWalker<'a>,
    element: &'a Dict,
    wanted: &str,
    out: &mut Vec<&'a Dict>,
    depth: usize,
) {
    if depth > 32 {
        return;
    }
    for child in walker.child_elements(element) {
        let resolved = walker.resolved_type(child);
        if resolved == wanted {
            out.push(child);
        } else {
            collect_typed(walker, child, wanted, out, depth + 1);
        }
    }
}

fn collect_two_types<'a>(
    walker: &StructureWalker<'a>,
    element: &'a Dict,
    out: &mut Vec<&'a Dict>,
    depth: usize,
) {
    if depth > 32 {
        return;
    }
    for child in walker.child_elements(element) {
        let resolved = walker.resolved_type(child);
        if resolved == "TH" || resolved == "TD" {
            out.push(child);
        } else {
            collect_two_types(walker, child, out, depth + 1);
        }
    }
}

fn positive_int(cell: &Dict, key: &str) -> usize {
    cell.get(key)
        .and_then(|v| v.as_integer())
        .filter(|&v| v > 0)
        .map(|v| v as usize)
        .unwrap_or(1)
}

fn normalize_scope(cell: &Dict) -> Option<String> {
    let scope = cell.get("Scope")?;
    let text = match scope.as_name() {
        Some(name) => name.to_string(),
        None => scope.as_text()?,
    };
    let trimmed = text.trim_start_matches('/').trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn normalize_id(value: Option<&crate::object::Object>) -> Option<String> {
    let value = value?;
    let text = value
        .as_text()
        .or_else(|| value.as_name().map(|n| n.to_string()))?;
    let trimmed = text.trim().trim_start_matches('/').to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn header_ids(walker: &StructureWalker<'_>, cell: &Dict) -> Vec<String> {
    let Some(headers) = cell.get("Headers") else {
        return Vec::new();
    };
    let resolved = walker.document().resolve(headers);
    match resolved {
        crate::object::Object::Array(items) => items
            .iter()
            .filter_map(|item| normalize_id(Some(walker.document().resolve(item))))
            .collect(),
        other => normalize_id(Some(other)).into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PdfDocument;
    use crate::object::{Object, ObjectRef};

    fn cell(is_header: bool, row: usize, col: usize) -> TableCell {
        TableCell {
            is_header,
            row_index: row,
            col_start: col,
            col_end: col,
            col_span: 1,
            row_span: 1,
            scope: None,
            headers: Vec::new(),
            id: None,
        }
    }

    /// Build a doc containing a 2x2 table: TR[TH TH] / TR[TD TD].
    fn table_doc(th_scope: Option<&str>) -> (PdfDocument, ObjectRef) {
        let mut doc = PdfDocument::new();
        let page = doc.add_blank_page(612.0, 792.0).unwrap();

        let mut make_cell = |doc: &mut PdfDocument, kind: &str, scope: Option<&str>| {
            let mut entries = vec![("S", Object::name(kind))];
            if let Some(scope) = scope {
                entries.push(("Scope", Object::name(scope)));
            }
            doc.add_object(Object::Dictionary(
                entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            ))
        };

        let th1 = make_cell(&mut doc, "TH", th_scope);
        let th2 = make_cell(&mut doc, "TH", th_scope);
        let td1 = make_cell(&mut doc, "TD", None);
        let td2 = make_cell(&mut doc, "TD", None);

        let tr1 = doc.add_object(Object::dict(vec![
            ("S", Object::name("TR")),
            ("K", Object::Array(vec![Object::Reference(th1), Object::Reference(th2)])),
        ]));
        let tr2 = doc.add_object(Object::dict(vec![
            ("S", Object::name("TR")),
            ("K", Object::Array(vec![Object::Reference(td1), Object::Reference(td2)])),
        ]));
        let table = doc.add_object(Object::dict(vec![
            ("S", Object::name("Table")),
            ("Pg", Object::Reference(page)),
            ("K", Object::Array(vec![Object::Reference(tr1), Object::Reference(tr2)])),
        ]));
        let root = doc.add_object(Object::dict(vec![
            ("Type", Object::name("StructTreeRoot")),
            ("K", Object::Reference(table)),
        ]));
        doc.catalog_mut()
            .unwrap()
            .insert("StructTreeRoot".to_string(), Object::Reference(root));
        (doc, table)
    }

    #[test]
    fn test_build_model_grid() {
        let (doc, table) = table_doc(Some("Column"));
        let walker = StructureWalker::new(&doc);
        let table_dict = doc.get(table).unwrap().as_dict().unwrap();
        let model = build_table_model(&walker, table_dict, Some(1)).unwrap();

        assert_eq!(model.row_count, 2);
        assert_eq!(model.column_count, 2);
        assert_eq!(model.headers().count(), 2);
        assert_eq!(model.data_cells().count(), 2);
        let td = model.data_cells().next().unwrap();
        assert_eq!(td.row_index, 1);
    }

    #[test]
    fn test_column_scope_association() {
        let (doc, table) = table_doc(Some("Column"));
        let walker = StructureWalker::new(&doc);
        let table_dict = doc.get(table).unwrap().as_dict().unwrap();
        let model = build_table_model(&walker, table_dict, Some(1)).unwrap();

        for td in model.data_cells() {
            let headers = model.associated_headers(td);
            assert_eq!(headers.len(), 1);
            assert_eq!(headers[0].col_start, td.col_start);
        }
    }

    #[test]
    fn test_layout_fallback_without_scope() {
        let (doc, table) = table_doc(None);
        let walker = StructureWalker::new(&doc);
        let table_dict = doc.get(table).unwrap().as_dict().unwrap();
        let model = build_table_model(&walker, table_dict, Some(1)).unwrap();

        // No scopes, no Headers: the first-row heuristic still associates.
        for td in model.data_cells() {
            assert!(!model.associated_headers(td).is_empty());
        }
    }

    #[test]
    fn test_scope_consistency() {
        let model = TableModel {
            cells: vec![
                TableCell {
                    scope: Some("Column".to_string()),
                    ..cell(true, 0, 0)
                },
                cell(false, 1, 0),
            ],
            row_count: 2,
            column_count: 1,
            ..Default::default()
        };
        let header = model.headers().next().unwrap();
        assert!(model.scope_consistent(header));

        // A column header with no data below it in its column is suspect.
        let lonely = TableModel {
            cells: vec![
                TableCell {
                    scope: Some("Column".to_string()),
                    ..cell(true, 0, 3)
                },
                cell(false, 1, 0),
            ],
            row_count: 2,
            column_count: 4,
            ..Default::default()
        };
        let header = lonely.headers().next().unwrap();
        assert!(!lonely.scope_consistent(header));
    }

    #[test]
    fn test_headers_attribute_resolution() {
        let model = TableModel {
            cells: vec![
                TableCell {
                    id: Some("hdr1".to_string()),
                    ..cell(true, 0, 0)
                },
                TableCell {
                    headers: vec!["hdr1".to_string()],
                    ..cell(false, 5, 5)
                },
            ],
            row_count: 2,
            column_count: 6,
            ..Default::default()
        };
        let td = model.data_cells().next().unwrap();
        let matched = model.associated_headers(td);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id.as_deref(), Some("hdr1"));
    }

    #[test]
    fn test_table_without_cells_is_none() {
        let mut doc = PdfDocument::new();
        doc.add_blank_page(612.0, 792.0).unwrap();
        let table = doc.add_object(Object::dict(vec![("S", Object::name("Table"))]));
        let root = doc.add_object(Object::dict(vec![
            ("Type", Object::name("StructTreeRoot")),
            ("K", Object::Reference(table)),
        ]));
        doc.catalog_mut()
            .unwrap()
            .insert("StructTreeRoot".to_string(), Object::Reference(root));
        let walker = StructureWalker::new(&doc);
        let table_dict = doc.get(table).unwrap().as_dict().unwrap();
        assert!(build_table_model(&walker, table_dict, None).is_none());
    }
}
