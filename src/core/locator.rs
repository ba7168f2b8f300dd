//! Header discovery in loosely structured sheets
//!
//! KPI slides put their headers somewhere in the top-left corner, often in
//! merged cells, so headers are found by scanning a window rather than by
//! reading a fixed header row.

use std::collections::BTreeMap;

use crate::core::normalize::clean_label;
use crate::error::{DashError, DashResult};
use crate::types::Grid;

/// Bounded scan region, 1-based and inclusive (rows 1..=rows, cols 1..=cols)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    pub rows: usize,
    pub cols: usize,
}

/// Column → canonical header, in first-discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(usize, String)>,
}

impl HeaderMap {
    /// Record a match; a later match on the same column replaces the header
    fn insert(&mut self, col: usize, header: &str) {
        match self.entries.iter_mut().find(|(c, _)| *c == col) {
            Some(entry) => entry.1 = header.to_string(),
            None => self.entries.push((col, header.to_string())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `(0-based column, header)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.entries.iter().map(|(c, h)| (*c, h.as_str()))
    }

    pub fn header_for(&self, col: usize) -> Option<&str> {
        self.entries.iter().find(|(c, _)| *c == col).map(|(_, h)| h.as_str())
    }

    /// Distinct headers in discovery order
    pub fn headers(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for (_, h) in &self.entries {
            if !seen.contains(&h.as_str()) {
                seen.push(h.as_str());
            }
        }
        seen
    }
}

/// Scan `window` row-major for text cells containing any wanted header
/// (case-insensitive substring on cleaned text). Last match in scan order
/// wins for a column. No match at all is a `HeaderNotFound` error.
pub fn locate_headers(
    grid: &Grid,
    wanted: &[String],
    window: ScanWindow,
    sheet: &str,
) -> DashResult<HeaderMap> {
    let wanted_lower: Vec<(String, &str)> = wanted
        .iter()
        .map(|w| (clean_label(w).to_lowercase(), w.as_str()))
        .collect();

    let mut map = HeaderMap::default();
    for row in 0..window.rows {
        for col in 0..window.cols {
            let Some(text) = grid.get(row, col).as_text() else {
                continue;
            };
            let cell = clean_label(text).to_lowercase();
            if cell.is_empty() {
                continue;
            }
            for (needle, canonical) in &wanted_lower {
                if cell.contains(needle.as_str()) {
                    map.insert(col, canonical);
                }
            }
        }
    }

    if map.is_empty() {
        return Err(DashError::HeaderNotFound {
            sheet: sheet.to_string(),
            wanted: wanted.join(", "),
        });
    }
    Ok(map)
}

/// A detected header row and the columns of its exact labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRow {
    /// 0-based row index
    pub row: usize,
    /// lowercase label → 0-based column (last occurrence wins)
    pub columns: BTreeMap<String, usize>,
}

impl HeaderRow {
    pub fn column(&self, label: &str) -> Option<usize> {
        self.columns.get(&label.to_lowercase()).copied()
    }
}

/// First row among the top `max_rows` whose trimmed, lowercased cells
/// include every label in `labels`.
pub fn find_header_row(grid: &Grid, labels: &[String], max_rows: usize) -> Option<HeaderRow> {
    let wanted: Vec<String> = labels.iter().map(|l| l.trim().to_lowercase()).collect();
    (0..max_rows.min(grid.height())).find_map(|row| {
        let cells: Vec<String> = grid
            .row(row)
            .iter()
            .map(|c| c.render().trim().to_lowercase())
            .collect();
        if !wanted.iter().all(|w| cells.contains(w)) {
            return None;
        }
        let columns = cells
            .into_iter()
            .enumerate()
            .filter(|(_, label)| !label.is_empty())
            .map(|(col, label)| (label, col))
            .collect();
        Some(HeaderRow { row, columns })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;

    fn grid_with(cells: &[(usize, usize, &str)]) -> Grid {
        let mut rows = vec![vec![CellValue::Empty; 30]; 40];
        for &(r, c, text) in cells {
            rows[r][c] = CellValue::text(text);
        }
        Grid::new(rows)
    }

    fn wanted(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    const WINDOW: ScanWindow = ScanWindow { rows: 29, cols: 24 };

    #[test]
    fn test_substring_case_insensitive() {
        let grid = grid_with(&[(5, 7, "  cloudification (%)  "), (5, 9, "LEGACY INDEX")]);
        let map = locate_headers(&grid, &wanted(&["Cloudification", "Legacy Index"]), WINDOW, "s").unwrap();
        assert_eq!(map.header_for(7), Some("Cloudification"));
        assert_eq!(map.header_for(9), Some("Legacy Index"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_dash_variants_normalised() {
        let grid = grid_with(&[(2, 3, "Information Domain \u{2014} Documentation")]);
        let map = locate_headers(
            &grid,
            &wanted(&["Information Domain - Documentation"]),
            WINDOW,
            "s",
        )
        .unwrap();
        assert_eq!(map.header_for(3), Some("Information Domain - Documentation"));
    }

    #[test]
    fn test_last_match_in_scan_order_wins() {
        // Both wanted headers are contained in the cell; the later one wins
        let grid = grid_with(&[(1, 2, "Completed risk scoping BAs: regular")]);
        let map = locate_headers(
            &grid,
            &wanted(&["Completed risk scoping BAs", "Completed risk scoping BAs: regular"]),
            WINDOW,
            "s",
        )
        .unwrap();
        assert_eq!(map.header_for(2), Some("Completed risk scoping BAs: regular"));

        // A lower row overrides an upper row in the same column
        let grid = grid_with(&[(1, 4, "Group Toxicity"), (3, 4, "Local Toxicity")]);
        let map = locate_headers(&grid, &wanted(&["Group Toxicity", "Local Toxicity"]), WINDOW, "s").unwrap();
        assert_eq!(map.header_for(4), Some("Local Toxicity"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_outside_window_ignored() {
        let grid = grid_with(&[(29, 0, "Legacy Index"), (0, 24, "Legacy Index")]);
        let err = locate_headers(&grid, &wanted(&["Legacy Index"]), WINDOW, "Architecture").unwrap_err();
        match err {
            DashError::HeaderNotFound { sheet, wanted } => {
                assert_eq!(sheet, "Architecture");
                assert_eq!(wanted, "Legacy Index");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_headers_distinct_in_discovery_order() {
        let grid = grid_with(&[(1, 5, "B score"), (1, 2, "A score"), (2, 8, "A score")]);
        let map = locate_headers(&grid, &wanted(&["A score", "B score"]), WINDOW, "s").unwrap();
        assert_eq!(map.headers(), vec!["A score", "B score"]);
        let cols: Vec<usize> = map.iter().map(|(c, _)| c).collect();
        assert_eq!(cols, vec![2, 5, 8]);
    }

    #[test]
    fn test_find_header_row() {
        let grid = grid_with(&[(0, 0, "Toxic report"), (2, 0, "ID"), (2, 3, " File "), (2, 4, "Date")]);
        let header = find_header_row(&grid, &wanted(&["file", "date"]), 10).unwrap();
        assert_eq!(header.row, 2);
        assert_eq!(header.column("file"), Some(3));
        assert_eq!(header.column("Date"), Some(4));
        assert_eq!(header.column("id"), Some(0));
    }

    #[test]
    fn test_find_header_row_requires_all_labels() {
        let grid = grid_with(&[(0, 0, "File"), (12, 0, "File"), (12, 1, "Date")]);
        assert!(find_header_row(&grid, &wanted(&["file", "date"]), 10).is_none());
    }
}
