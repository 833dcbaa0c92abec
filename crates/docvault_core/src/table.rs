//! Tabular batches.

use crate::error::{CoreError, CoreResult};
use docvault_store::{Document, Value, ID_FIELD};
use std::collections::HashSet;
use std::fmt;

/// Named columns over rows of values.
///
/// Row `i` converts to a document whose fields are the columns in order.
/// Converting documents into a table takes the union of their fields in
/// first-seen order; absent fields read as [`Value::Null`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Creates an empty table with the given columns.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidBatch`] if a column name repeats.
    pub fn new<I, S>(columns: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut seen = HashSet::new();
        if let Some(dup) = columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(CoreError::invalid_batch(format!("duplicate column {dup}")));
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Appends a row.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidBatch`] if the row length does not match
    /// the column count.
    pub fn push_row(&mut self, row: Vec<Value>) -> CoreResult<()> {
        if row.len() != self.columns.len() {
            return Err(CoreError::invalid_batch(format!(
                "row {} has {} values for {} columns",
                self.rows.len(),
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in order.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// Builds a table from documents.
    pub fn from_documents(documents: &[Document]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for document in documents {
            for key in document.keys() {
                if seen.insert(key.to_string()) {
                    columns.push(key.to_string());
                }
            }
        }

        let rows = documents
            .iter()
            .map(|document| {
                columns
                    .iter()
                    .map(|c| document.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    /// Converts rows into documents, dropping the `_id` column unless
    /// `include_id` is set.
    pub fn into_documents(self, include_id: bool) -> Vec<Document> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|row| {
                columns
                    .iter()
                    .zip(row)
                    .filter(|(name, _)| include_id || name.as_str() != ID_FIELD)
                    .map(|(name, value)| (name.clone(), value))
                    .collect()
            })
            .collect()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(render_cell).collect())
            .collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                cells
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(c.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write_line(f, self.columns.iter().map(String::as_str), &widths)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        write_line(f, rule.iter().map(String::as_str), &widths)?;
        for row in &cells {
            write_line(f, row.iter().map(String::as_str), &widths)?;
        }
        Ok(())
    }
}

fn write_line<'a>(
    f: &mut fmt::Formatter<'_>,
    values: impl Iterator<Item = &'a str>,
    widths: &[usize],
) -> fmt::Result {
    let rendered: Vec<String> = values
        .zip(widths)
        .map(|(v, w)| format!("{v:<w$}"))
        .collect();
    writeln!(f, "{}", rendered.join("  ").trim_end())
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Text(s) => s.clone(),
        other => other.to_json().to_string(),
    }
}

impl FromIterator<Document> for Table {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        let documents: Vec<Document> = iter.into_iter().collect();
        Self::from_documents(&documents)
    }
}

/// A batch of records to write.
#[derive(Debug, Clone, PartialEq)]
pub enum Batch {
    /// Documents written as given.
    Records(Vec<Document>),
    /// Table rows, one document each.
    Table {
        /// The rows.
        table: Table,
        /// Whether an `_id` column is written.
        include_id: bool,
    },
}

impl Batch {
    /// A table batch that drops any `_id` column.
    #[must_use]
    pub fn table(table: Table) -> Self {
        Self::Table {
            table,
            include_id: false,
        }
    }

    /// A table batch that keeps its `_id` column.
    #[must_use]
    pub fn table_with_id(table: Table) -> Self {
        Self::Table {
            table,
            include_id: true,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        match self {
            Self::Records(documents) => documents.len(),
            Self::Table { table, .. } => table.len(),
        }
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The batch as documents, in order.
    pub fn into_documents(self) -> Vec<Document> {
        match self {
            Self::Records(documents) => documents,
            Self::Table { table, include_id } => table.into_documents(include_id),
        }
    }
}

impl From<Vec<Document>> for Batch {
    fn from(documents: Vec<Document>) -> Self {
        Self::Records(documents)
    }
}

impl From<Table> for Batch {
    fn from(table: Table) -> Self {
        Self::table(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docvault_store::doc;

    fn sample() -> Table {
        let mut table = Table::new(["_id", "name", "qty"]).unwrap();
        table
            .push_row(vec![1.into(), "bolt".into(), 10.into()])
            .unwrap();
        table
            .push_row(vec![2.into(), "nut".into(), Value::Null])
            .unwrap();
        table
    }

    #[test]
    fn rejects_duplicate_columns_and_short_rows() {
        assert!(Table::new(["a", "a"]).is_err());
        let mut table = Table::new(["a", "b"]).unwrap();
        assert!(matches!(
            table.push_row(vec![1.into()]),
            Err(CoreError::InvalidBatch { .. })
        ));
    }

    #[test]
    fn id_column_dropped_unless_requested() {
        let docs = sample().into_documents(false);
        assert_eq!(docs[0], doc! { "name" => "bolt", "qty" => 10 });
        assert_eq!(docs[1], doc! { "name" => "nut", "qty" => Value::Null });

        let with_id = Batch::table_with_id(sample()).into_documents();
        assert_eq!(with_id[0], doc! { "_id" => 1, "name" => "bolt", "qty" => 10 });
    }

    #[test]
    fn from_documents_unions_fields() {
        let table = Table::from_documents(&[doc! { "a" => 1 }, doc! { "b" => 2, "a" => 3 }]);
        assert_eq!(table.columns(), ["a", "b"]);
        assert_eq!(table.rows()[0], vec![Value::Int(1), Value::Null]);
        assert_eq!(table.column("a").unwrap(), vec![&Value::Int(1), &Value::Int(3)]);
    }

    #[test]
    fn batch_lengths() {
        assert_eq!(Batch::from(sample()).len(), 2);
        assert!(Batch::from(Vec::<Document>::new()).is_empty());
    }

    #[test]
    fn display_aligns_columns() {
        let rendered = sample().to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "_id  name  qty");
        assert_eq!(lines[1], "---  ----  ---");
        assert_eq!(lines[2], "1    bolt  10");
        assert_eq!(lines[3], "2    nut");
    }
}
