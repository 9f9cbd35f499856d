use std::sync::Arc;

use super::row::CustomDbRow;
use super::{ColumnIndex, column_index};
use crate::types::RowValues;

/// One fully materialized table.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<CustomDbRow>,
    /// Number of rows added to this table
    pub rows_affected: usize,
    /// Column names shared by all rows (to avoid duplicating in each row)
    column_names: Option<Arc<Vec<String>>>,
    column_index_cache: Option<ColumnIndex>,
}

impl ResultSet {
    /// Create a new result set with a known capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - The initial capacity for the result rows
    ///
    /// # Returns
    ///
    /// An empty `ResultSet` without column names
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            rows_affected: 0,
            column_names: None,
            column_index_cache: None,
        }
    }

    /// Set the column names for this result set (to be shared by all rows)
    ///
    /// # Arguments
    ///
    /// * `column_names` - The column names, in result order
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_index_cache = Some(column_index(&column_names));
        self.column_names = Some(column_names);
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Add a row to the result set. Ignored until column names are set.
    ///
    /// # Arguments
    ///
    /// * `row_values` - The values for this row, one per column
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        if let (Some(column_names), Some(cache)) = (&self.column_names, &self.column_index_cache) {
            self.results.push(CustomDbRow::with_index(
                Arc::clone(column_names),
                row_values,
                Arc::clone(cache),
            ));
            self.rows_affected += 1;
        }
    }

    /// Add an already built row.
    ///
    /// The first row added to a table without column names supplies them.
    ///
    /// # Arguments
    ///
    /// * `row` - The row to add
    pub fn add_row(&mut self, row: CustomDbRow) {
        if self.column_names.is_none() {
            self.column_index_cache = Some(Arc::clone(&row.column_index_cache));
            self.column_names = Some(Arc::clone(&row.column_names));
        }
        self.results.push(row);
        self.rows_affected += 1;
    }

    /// Number of rows in this table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Every table produced by one tabular fill, in the order the driver returned them.
#[derive(Debug, Clone, Default)]
pub struct DataSet {
    pub tables: Vec<ResultSet>,
}

impl DataSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_table(&mut self, table: ResultSet) {
        self.tables.push(table);
    }

    /// Get a table by position
    ///
    /// # Arguments
    ///
    /// * `index` - Zero-based position in the order the driver produced the tables
    ///
    /// # Returns
    ///
    /// The table, or `None` if the fill produced fewer tables
    #[must_use]
    pub fn table(&self, index: usize) -> Option<&ResultSet> {
        self.tables.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl From<ResultSet> for DataSet {
    fn from(table: ResultSet) -> Self {
        Self {
            tables: vec![table],
        }
    }
}
