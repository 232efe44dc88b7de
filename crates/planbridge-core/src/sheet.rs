//! Grid values for the remote tabular store
//!
//! Each kind lives in its own sheet, in the range returned by
//! [`Schema::range`](crate::schema::Schema::range). The network layer reads
//! and writes plain `Vec<Vec<String>>` grids; this module is the only place
//! that gives those grids meaning.

use tracing::debug;

use crate::codec::{NamedRow, Record, Row};
use crate::settings::Settings;

/// A1 range for a kind's sheet
pub fn range<T: Record>() -> String {
    T::schema().range()
}

/// Encode entities as grid rows, optionally preceded by the key header row
pub fn to_values<T: Record>(items: &[T], with_header: bool) -> Vec<Vec<String>> {
    let header = with_header.then(|| {
        T::schema()
            .keys()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>()
    });

    header
        .into_iter()
        .chain(items.iter().map(|item| item.encode().cells))
        .collect()
}

/// Decode grid rows.
///
/// When the first row is a header row (its first cell names the schema's
/// first column), cells are mapped by that header; otherwise by position.
/// Blank rows are skipped. Rows shorter than the schema decode with
/// defaults.
pub fn from_values<T: Record>(values: &[Vec<String>]) -> Vec<T> {
    let schema = T::schema();

    let (mapping, data) = match values.split_first() {
        Some((first, rest)) if schema.is_header_row(first) => (
            Some(
                schema
                    .mapping_from_header(first)
                    .unwrap_or_else(|| schema.default_mapping()),
            ),
            rest,
        ),
        _ => (None, values),
    };

    let items: Vec<T> = data
        .iter()
        .filter(|cells| cells.iter().any(|c| !c.trim().is_empty()))
        .map(|cells| match &mapping {
            Some(mapping) => T::decode_named(&NamedRow::from_mapping(mapping, cells.clone())),
            None => T::decode(&Row::new(cells.clone())),
        })
        .collect();

    debug!(
        sheet = schema.section,
        rows = values.len(),
        decoded = items.len(),
        header = mapping.is_some(),
        "decoded sheet values"
    );
    items
}

/// Settings as a single-row grid
pub fn settings_to_values(settings: &Settings, with_header: bool) -> Vec<Vec<String>> {
    to_values(std::slice::from_ref(settings), with_header)
}

/// First settings row of a grid, if there is one
pub fn settings_from_values(values: &[Vec<String>]) -> Option<Settings> {
    from_values::<Settings>(values).into_iter().next()
}
