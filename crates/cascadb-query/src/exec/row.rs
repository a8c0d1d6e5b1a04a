//! Row types for query execution.
//!
//! This module defines the [`Row`] type used as the unit of data
//! flowing through the execution operators, the [`Schema`] that
//! describes it, and the read-only [`RowView`] that window keys and
//! measures are evaluated against.

use std::collections::HashMap;
use std::sync::Arc;

use cascadb_core::{DataType, Value};

use crate::error::ExecResult;
use crate::plan::{ExprId, ExpressionEvaluator};

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: Arc<str>,
    data_type: DataType,
}

impl Field {
    /// Creates a new field.
    #[must_use]
    pub fn new(name: impl AsRef<str>, data_type: DataType) -> Self {
        Self { name: Arc::from(name.as_ref()), data_type }
    }

    /// Returns the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared column type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }
}

/// A schema defines the column names, types and their order in a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Fields in order.
    fields: Vec<Field>,
    /// Map from column name to index for fast lookup.
    name_to_index: HashMap<Arc<str>, usize>,
}

impl Schema {
    /// Creates a new schema from fields.
    ///
    /// If two fields share a name, lookups by name resolve to the first.
    #[must_use]
    pub fn new(fields: Vec<Field>) -> Self {
        let mut name_to_index = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            name_to_index.entry(Arc::clone(&field.name)).or_insert(i);
        }
        Self { fields, name_to_index }
    }

    /// Creates a schema whose columns all have type [`DataType::Any`].
    #[must_use]
    pub fn untyped<S: AsRef<str>>(columns: &[S]) -> Self {
        Self::new(columns.iter().map(|c| Field::new(c, DataType::Any)).collect())
    }

    /// Creates an empty schema.
    #[must_use]
    pub fn empty() -> Self {
        Self { fields: Vec::new(), name_to_index: HashMap::new() }
    }

    /// Returns the fields.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the column names as string slices.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        self.fields.iter().map(Field::name).collect()
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the schema has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Gets the index for a column name.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Gets the field at an index.
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Gets the declared type of the column at an index.
    #[must_use]
    pub fn data_type(&self, index: usize) -> Option<DataType> {
        self.fields.get(index).map(Field::data_type)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<Field>> for Schema {
    fn from(fields: Vec<Field>) -> Self {
        Self::new(fields)
    }
}

impl From<Vec<(&str, DataType)>> for Schema {
    fn from(columns: Vec<(&str, DataType)>) -> Self {
        Self::new(columns.into_iter().map(|(name, ty)| Field::new(name, ty)).collect())
    }
}

/// A row of values.
///
/// Rows are the unit of data flowing through execution operators.
/// Each row contains values that correspond to the schema columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// The schema describing the columns.
    schema: Arc<Schema>,
    /// The values in this row.
    values: Vec<Value>,
}

impl Row {
    /// Creates a new row with the given schema and values.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the number of values doesn't match the schema.
    #[must_use]
    pub fn new(schema: Arc<Schema>, values: Vec<Value>) -> Self {
        debug_assert_eq!(
            schema.len(),
            values.len(),
            "Row values count must match schema column count"
        );
        Self { schema, values }
    }

    /// Returns the schema of this row.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the values in this row.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Gets a value by column index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Gets a value by column name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.schema.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Consumes the row and returns the values.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// A read-only view of one row through an expression evaluator.
///
/// The view never mutates the row; it only evaluates expression
/// references against it.
#[derive(Clone, Copy)]
pub struct RowView<'a> {
    row: &'a Row,
    evaluator: &'a dyn ExpressionEvaluator,
}

impl<'a> RowView<'a> {
    /// Creates a view over `row`.
    #[must_use]
    pub fn new(row: &'a Row, evaluator: &'a dyn ExpressionEvaluator) -> Self {
        Self { row, evaluator }
    }

    /// Evaluates one expression against the row.
    pub fn evaluate(&self, expr: ExprId) -> ExecResult<Value> {
        self.evaluator.evaluate(expr, self.row)
    }

    /// Evaluates `exprs` in order into `buf`, replacing its contents.
    ///
    /// The buffer's allocation is reused across calls.
    pub fn extract_keys_into<I>(&self, exprs: I, buf: &mut Vec<Value>) -> ExecResult<()>
    where
        I: IntoIterator<Item = ExprId>,
    {
        buf.clear();
        for expr in exprs {
            buf.push(self.evaluate(expr)?);
        }
        Ok(())
    }
}

impl std::fmt::Debug for RowView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowView").field("row", self.row).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{ExprArena, ScalarExpr};

    fn abc_schema() -> Arc<Schema> {
        Arc::new(Schema::from(vec![
            ("a", DataType::Integer),
            ("b", DataType::Integer),
            ("c", DataType::Text),
        ]))
    }

    #[test]
    fn schema_basic() {
        let schema = abc_schema();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.index_of("b"), Some(1));
        assert_eq!(schema.index_of("unknown"), None);
        assert_eq!(schema.data_type(2), Some(DataType::Text));
        assert_eq!(schema.columns(), vec!["a", "b", "c"]);
    }

    #[test]
    fn schema_duplicate_names_resolve_to_first() {
        let schema = Schema::untyped(&["x", "x"]);
        assert_eq!(schema.index_of("x"), Some(0));
        assert_eq!(schema.len(), 2);
    }

    #[test]
    fn row_basic() {
        let row = Row::new(abc_schema(), vec![Value::Int(1), Value::Int(2), Value::from("z")]);
        assert_eq!(row.len(), 3);
        assert_eq!(row.get(0), Some(&Value::Int(1)));
        assert_eq!(row.get_by_name("c"), Some(&Value::from("z")));
        assert_eq!(row.get(3), None);
    }

    #[test]
    fn row_view_extracts_keys_into_reused_buffer() {
        let mut arena = ExprArena::new();
        let a = arena.add(ScalarExpr::column(0));
        let b = arena.add(ScalarExpr::column(1));
        let row = Row::new(abc_schema(), vec![Value::Int(1), Value::Int(2), Value::from("z")]);
        let view = RowView::new(&row, &arena);

        let mut buf = Vec::with_capacity(4);
        view.extract_keys_into([b, a], &mut buf).unwrap();
        assert_eq!(buf, vec![Value::Int(2), Value::Int(1)]);

        let capacity = buf.capacity();
        view.extract_keys_into([a], &mut buf).unwrap();
        assert_eq!(buf, vec![Value::Int(1)]);
        assert_eq!(buf.capacity(), capacity);
    }
}
