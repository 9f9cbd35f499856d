use std::sync::Arc;

use super::row::CustomDbRow;
use super::{ColumnIndex, column_index};
use crate::types::RowValues;

/// View over the current row of a streamed result.
///
/// A reader refills the same cursor for every row, so a borrowed cursor is only valid until
/// the next row is requested. Use [`RowCursor::to_row`] to keep a row.
#[derive(Debug, Clone)]
pub struct RowCursor {
    column_names: Arc<Vec<String>>,
    column_index_cache: ColumnIndex,
    pub(crate) values: Vec<RowValues>,
}

impl RowCursor {
    pub(crate) fn new(column_names: Arc<Vec<String>>) -> Self {
        let column_index_cache = column_index(&column_names);
        let values = Vec::with_capacity(column_names.len());
        Self {
            column_names,
            column_index_cache,
            values,
        }
    }

    /// Column names of the streamed result, in order.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value from the current row by column name
    ///
    /// # Arguments
    ///
    /// * `column_name` - The column to read
    ///
    /// # Returns
    ///
    /// `None` when the column does not exist; a SQL NULL is `Some(&RowValues::Null)`
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.column_index_cache
            .get(column_name)
            .and_then(|&idx| self.values.get(idx))
    }

    /// Get a value from the current row by position.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    #[must_use]
    pub fn values(&self) -> &[RowValues] {
        &self.values
    }

    /// Copy the current row out of the cursor.
    #[must_use]
    pub fn to_row(&self) -> CustomDbRow {
        CustomDbRow::with_index(
            Arc::clone(&self.column_names),
            self.values.clone(),
            Arc::clone(&self.column_index_cache),
        )
    }
}
