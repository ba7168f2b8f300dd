//! Appending period blocks and side-by-side joins

use chrono::NaiveDateTime;

use crate::core::dates::coerce_date;
use crate::core::normalize::clean_label;
use crate::error::DashResult;
use crate::types::{CellValue, Frame};

/// How combined tables are ordered
#[derive(Debug, Clone)]
pub struct SortSpec<'a> {
    pub period_column: &'a str,
    pub oe_column: &'a str,
    /// Fixed entity order; entities not listed sort before listed ones
    pub oe_order: &'a [String],
    /// Text layouts accepted for the period column
    pub period_formats: &'a [String],
}

/// Stack `block` below `existing` and sort the result.
/// Neither input is modified.
pub fn append_block(
    existing: &Frame,
    block: &Frame,
    spec: &SortSpec<'_>,
    sheet: &str,
) -> DashResult<Frame> {
    sort_by_period_and_order(&existing.concat(block), spec, sheet)
}

/// Stable sort by period ascending, then by position in the fixed OE order.
/// Within a period, unlisted entities come first. Rows whose period cannot
/// be resolved sort last.
pub fn sort_by_period_and_order(frame: &Frame, spec: &SortSpec<'_>, sheet: &str) -> DashResult<Frame> {
    let period_idx = frame
        .require_column(spec.period_column, sheet)
        .map(|_| frame.column_index(spec.period_column))?
        .unwrap_or(0);
    let oe_idx = frame
        .require_column(spec.oe_column, sheet)
        .map(|_| frame.column_index(spec.oe_column))?
        .unwrap_or(0);

    let order: Vec<String> = spec.oe_order.iter().map(|o| clean_label(o).to_lowercase()).collect();
    let keys: Vec<(Option<NaiveDateTime>, usize)> = (0..frame.height())
        .map(|row| {
            let period = coerce_date(frame.get(row, period_idx), spec.period_formats);
            let oe = clean_label(&frame.get(row, oe_idx).render()).to_lowercase();
            let rank = order.iter().position(|o| *o == oe).map_or(0, |i| i + 1);
            (period, rank)
        })
        .collect();

    let mut rows: Vec<usize> = (0..frame.height()).collect();
    rows.sort_by(|&a, &b| {
        let (pa, ra) = &keys[a];
        let (pb, rb) = &keys[b];
        match (pa, pb) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
        .then(ra.cmp(rb))
    });
    Ok(frame.reorder(&rows))
}

/// Full outer join on `key` (cleaned, case-insensitive).
///
/// Left rows come first in their original order, each followed by all of its
/// right-hand matches; right rows without a match are appended at the end.
/// Non-key columns present on both sides get a `_y` suffix on the right.
pub fn outer_join(left: &Frame, right: &Frame, key: &str, sheet: &str) -> DashResult<Frame> {
    left.require_column(key, sheet)?;
    right.require_column(key, sheet)?;
    let left_key = left.column_index(key).unwrap_or(0);
    let right_key = right.column_index(key).unwrap_or(0);

    let mut names: Vec<String> = left.column_names().iter().map(|s| s.to_string()).collect();
    let mut right_positions = Vec::new();
    for (idx, column) in right.columns().iter().enumerate() {
        if idx == right_key {
            continue;
        }
        let name = if left.column_index(&column.name).is_some() {
            format!("{}_y", column.name)
        } else {
            column.name.clone()
        };
        names.push(name);
        right_positions.push(idx);
    }

    let key_of = |frame: &Frame, row: usize, col: usize| clean_label(&frame.get(row, col).render()).to_lowercase();

    let mut joined = Frame::with_columns(names);
    let mut matched_right = vec![false; right.height()];
    for l in 0..left.height() {
        let lk = key_of(left, l, left_key);
        let matches: Vec<usize> = (0..right.height())
            .filter(|&r| key_of(right, r, right_key) == lk)
            .collect();
        let left_values: Vec<CellValue> = left.row(l).into_iter().cloned().collect();
        if matches.is_empty() {
            joined.push_values(left_values);
            continue;
        }
        for r in matches {
            matched_right[r] = true;
            let mut values = left_values.clone();
            values.extend(right_positions.iter().map(|&c| right.get(r, c).clone()));
            joined.push_values(values);
        }
    }

    for (r, _) in matched_right.iter().enumerate().filter(|(_, m)| !**m) {
        let mut values = vec![CellValue::Empty; left.width()];
        values[left_key] = right.get(r, right_key).clone();
        values.extend(right_positions.iter().map(|&c| right.get(r, c).clone()));
        joined.push_values(values);
    }
    Ok(joined)
}
