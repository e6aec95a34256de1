//! Valid/invalid splits produced by [`Connection::validate`](crate::Connection::validate).

use datavirt_log::Logger;

use crate::{Row, Table};

/// The outcome of validating a table: the rows that passed and the rows
/// that did not.
///
/// Both tables carry the schema of the validated data, and every input row
/// lands in exactly one of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validation {
    /// Rows that passed validation.
    pub valid: Table,
    /// Rows that failed validation.
    pub invalid: Table,
}

impl Validation {
    /// Two empty tables, returned when no validation rule is implemented.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            valid: Table::empty(),
            invalid: Table::empty(),
        }
    }

    /// Split `data` into rows accepted by `is_valid` and the rest.
    ///
    /// # Examples
    ///
    /// ```
    /// use datavirt_core::{Column, Scalar, Table, Validation};
    ///
    /// # fn main() -> Result<(), datavirt_core::TableError> {
    /// let data = Table::new(vec![Column::new("qty", vec![Some(3_i64), None, Some(-1)])])?;
    /// let outcome = Validation::partition(&data, |row| {
    ///     matches!(row.get("qty"), Some(Scalar::Int64(qty)) if qty >= 0)
    /// });
    /// assert_eq!(outcome.valid.num_rows(), 1);
    /// assert_eq!(outcome.invalid.num_rows(), 2);
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn partition<F>(data: &Table, is_valid: F) -> Self
    where
        F: FnMut(&Row<'_>) -> bool,
    {
        let (valid, invalid) = data.partition(is_valid);
        Self { valid, invalid }
    }

    /// Total number of rows across both sides.
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.valid.num_rows() + self.invalid.num_rows()
    }

    /// Report whether no row failed.
    #[must_use]
    pub fn all_valid(&self) -> bool {
        self.invalid.is_empty()
    }

    /// Log an informational summary when any row failed validation.
    pub fn log_findings(&self, logger: &Logger, connection: &str) {
        if self.all_valid() {
            return;
        }
        let invalid = self.invalid.num_rows();
        logger
            .info(format!(
                "{invalid} of {} rows failed validation on {connection}.",
                self.total_rows()
            ))
            .extra("connection", connection)
            .extra("valid_rows", self.valid.num_rows())
            .extra("invalid_rows", invalid)
            .emit();
    }
}
