mod cursor;
mod result_set;
mod row;

pub use cursor::RowCursor;
pub use result_set::{DataSet, ResultSet};
pub use row::CustomDbRow;

use std::collections::HashMap;
use std::sync::Arc;

pub(crate) type ColumnIndex = Arc<HashMap<String, usize>>;

pub(crate) fn column_index(column_names: &[String]) -> ColumnIndex {
    Arc::new(
        column_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect(),
    )
}
