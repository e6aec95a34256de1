//! Column-oriented tables returned by connections.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// 64-bit signed integers.
    Int64,
    /// 64-bit floats.
    Float64,
    /// UTF-8 strings.
    Utf8,
    /// Booleans.
    Boolean,
}

/// A single borrowed cell value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    /// Missing value.
    Null,
    /// Integer cell.
    Int64(i64),
    /// Float cell.
    Float64(f64),
    /// String cell.
    Utf8(&'a str),
    /// Boolean cell.
    Boolean(bool),
}

impl Scalar<'_> {
    /// Report whether the cell is missing.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Typed, nullable cell storage for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    /// Integer cells.
    Int64(Vec<Option<i64>>),
    /// Float cells.
    Float64(Vec<Option<f64>>),
    /// String cells.
    Utf8(Vec<Option<String>>),
    /// Boolean cells.
    Boolean(Vec<Option<bool>>),
}

impl ColumnData {
    /// Empty storage of the given type.
    #[must_use]
    pub const fn empty(data_type: DataType) -> Self {
        match data_type {
            DataType::Int64 => Self::Int64(Vec::new()),
            DataType::Float64 => Self::Float64(Vec::new()),
            DataType::Utf8 => Self::Utf8(Vec::new()),
            DataType::Boolean => Self::Boolean(Vec::new()),
        }
    }

    /// Logical type of the cells.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Int64(_) => DataType::Int64,
            Self::Float64(_) => DataType::Float64,
            Self::Utf8(_) => DataType::Utf8,
            Self::Boolean(_) => DataType::Boolean,
        }
    }

    /// Number of cells.
    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::Int64(cells) => cells.len(),
            Self::Float64(cells) => cells.len(),
            Self::Utf8(cells) => cells.len(),
            Self::Boolean(cells) => cells.len(),
        }
    }

    /// Report whether the column holds no cells.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell at `index`, or `None` when out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Scalar<'_>> {
        let scalar = match self {
            Self::Int64(cells) => cells.get(index)?.map_or(Scalar::Null, Scalar::Int64),
            Self::Float64(cells) => cells.get(index)?.map_or(Scalar::Null, Scalar::Float64),
            Self::Utf8(cells) => cells
                .get(index)?
                .as_deref()
                .map_or(Scalar::Null, Scalar::Utf8),
            Self::Boolean(cells) => cells.get(index)?.map_or(Scalar::Null, Scalar::Boolean),
        };
        Some(scalar)
    }

    fn select(&self, indices: &[usize]) -> Self {
        fn pick<T: Clone>(cells: &[T], indices: &[usize]) -> Vec<T> {
            indices
                .iter()
                .filter_map(|index| cells.get(*index).cloned())
                .collect()
        }
        match self {
            Self::Int64(cells) => Self::Int64(pick(cells, indices)),
            Self::Float64(cells) => Self::Float64(pick(cells, indices)),
            Self::Utf8(cells) => Self::Utf8(pick(cells, indices)),
            Self::Boolean(cells) => Self::Boolean(pick(cells, indices)),
        }
    }
}

impl From<Vec<Option<i64>>> for ColumnData {
    fn from(cells: Vec<Option<i64>>) -> Self {
        Self::Int64(cells)
    }
}

impl From<Vec<Option<f64>>> for ColumnData {
    fn from(cells: Vec<Option<f64>>) -> Self {
        Self::Float64(cells)
    }
}

impl From<Vec<Option<String>>> for ColumnData {
    fn from(cells: Vec<Option<String>>) -> Self {
        Self::Utf8(cells)
    }
}

impl From<Vec<Option<bool>>> for ColumnData {
    fn from(cells: Vec<Option<bool>>) -> Self {
        Self::Boolean(cells)
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    /// Create a column from a name and typed cells.
    pub fn new(name: impl Into<String>, data: impl Into<ColumnData>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Typed cells.
    #[must_use]
    pub const fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Logical type of the cells.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    /// Number of cells.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Report whether the column holds no cells.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn select(&self, indices: &[usize]) -> Self {
        Self {
            name: self.name.clone(),
            data: self.data.select(indices),
        }
    }
}

/// Name and type of a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    /// Column name.
    pub name: String,
    /// Column type.
    pub data_type: DataType,
}

/// Errors raised when assembling a [`Table`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    /// Two columns share a name.
    #[error("duplicate column {name:?}")]
    DuplicateColumn {
        /// Repeated column name.
        name: String,
    },
    /// A column's length differs from the first column's.
    #[error("column {name:?} has {found} rows; expected {expected}")]
    LengthMismatch {
        /// Offending column.
        name: String,
        /// Length of the first column.
        expected: usize,
        /// Length of the offending column.
        found: usize,
    },
    /// A row index was outside the table.
    #[error("row {index} is out of range for a table of {rows} rows")]
    RowOutOfRange {
        /// Requested row.
        index: usize,
        /// Number of rows in the table.
        rows: usize,
    },
}

/// An ordered set of equally long, uniquely named columns.
///
/// Equality compares column names, column types and every cell, so two
/// tables are equal only when they would render identically.
///
/// # Examples
///
/// ```
/// use datavirt_core::{Column, Table};
///
/// # fn main() -> Result<(), datavirt_core::TableError> {
/// let table = Table::new(vec![
///     Column::new("ticker", vec![Some("ABC".to_owned()), Some("XYZ".to_owned())]),
///     Column::new("price", vec![Some(101.5), None]),
/// ])?;
/// assert_eq!(table.num_rows(), 2);
/// assert_eq!(table.head(1).num_rows(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Column>", into = "Vec<Column>")]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// A table with no columns and no rows.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Validate and assemble a table.
    ///
    /// # Errors
    /// Returns [`TableError::DuplicateColumn`] when names repeat and
    /// [`TableError::LengthMismatch`] when columns differ in length.
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        if let Some(first) = columns.first() {
            let expected = first.len();
            for (position, column) in columns.iter().enumerate() {
                if column.len() != expected {
                    return Err(TableError::LengthMismatch {
                        name: column.name.clone(),
                        expected,
                        found: column.len(),
                    });
                }
                if columns
                    .iter()
                    .take(position)
                    .any(|earlier| earlier.name == column.name)
                {
                    return Err(TableError::DuplicateColumn {
                        name: column.name.clone(),
                    });
                }
            }
        }
        Ok(Self { columns })
    }

    /// Number of rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    /// Number of columns.
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Report whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Columns in order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Look up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Column names and types in order.
    #[must_use]
    pub fn schema(&self) -> Vec<Field> {
        self.columns
            .iter()
            .map(|column| Field {
                name: column.name.clone(),
                data_type: column.data_type(),
            })
            .collect()
    }

    /// The first `n` rows (fewer if the table is shorter).
    #[must_use]
    pub fn head(&self, n: usize) -> Self {
        let indices: Vec<usize> = (0..n.min(self.num_rows())).collect();
        self.select(&indices)
    }

    /// Rows at `indices`, in the given order.
    ///
    /// # Errors
    /// Returns [`TableError::RowOutOfRange`] for any index past the end.
    pub fn take(&self, indices: &[usize]) -> Result<Self, TableError> {
        let rows = self.num_rows();
        if let Some(index) = indices.iter().copied().find(|index| *index >= rows) {
            return Err(TableError::RowOutOfRange { index, rows });
        }
        Ok(self.select(indices))
    }

    /// Borrowed view of the row at `index`.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        (index < self.num_rows()).then_some(Row { table: self, index })
    }

    /// Iterate over every row.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.num_rows()).map(move |index| Row { table: self, index })
    }

    /// Split rows into those matching `predicate` and the rest.
    ///
    /// Both halves keep this table's schema and row order.
    #[must_use]
    pub fn partition<F>(&self, mut predicate: F) -> (Self, Self)
    where
        F: FnMut(&Row<'_>) -> bool,
    {
        let (matching, rest): (Vec<usize>, Vec<usize>) =
            (0..self.num_rows()).partition(|index| {
                predicate(&Row {
                    table: self,
                    index: *index,
                })
            });
        (self.select(&matching), self.select(&rest))
    }

    /// A table with the same columns and no rows.
    #[must_use]
    pub fn empty_like(&self) -> Self {
        self.select(&[])
    }

    fn select(&self, indices: &[usize]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|column| column.select(indices))
                .collect(),
        }
    }
}

impl TryFrom<Vec<Column>> for Table {
    type Error = TableError;

    fn try_from(columns: Vec<Column>) -> Result<Self, Self::Error> {
        Self::new(columns)
    }
}

impl From<Table> for Vec<Column> {
    fn from(table: Table) -> Self {
        table.columns
    }
}

/// Borrowed view of one row of a [`Table`].
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> Row<'a> {
    /// Position of the row in its table.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Cell in the column called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Scalar<'a>> {
        self.table.column(name)?.data.get(self.index)
    }

    /// Cells in column order, paired with their column names.
    pub fn values(&self) -> impl Iterator<Item = (&'a str, Scalar<'a>)> + use<'a> {
        let index = self.index;
        self.table.columns.iter().map(move |column| {
            (
                column.name.as_str(),
                column.data.get(index).unwrap_or(Scalar::Null),
            )
        })
    }
}
