//! Output row construction for window operators.

use std::sync::Arc;

use cascadb_core::{DataType, Value};

use crate::error::{ExecError, ExecResult};
use crate::exec::row::{Field, Row, Schema};
use crate::plan::{ColumnSource, OutputColumn, WindowAggregate};

/// Maps input columns and window results onto the output schema.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    sources: Vec<ColumnSource>,
    schema: Arc<Schema>,
    /// True when the layout is every input column in order followed by every
    /// window column in order, so input values can be moved instead of cloned.
    appends_windows: bool,
}

impl OutputLayout {
    /// Resolves an output layout against the input schema.
    ///
    /// `columns` of `None` selects every input column followed by every
    /// window column. `result_types` holds each aggregate's result type.
    pub fn new(
        columns: Option<&[OutputColumn]>,
        input: &Schema,
        aggregates: &[WindowAggregate],
        result_types: &[DataType],
    ) -> ExecResult<Self> {
        debug_assert_eq!(aggregates.len(), result_types.len());

        let sources: Vec<ColumnSource> = match columns {
            Some(columns) => columns.iter().map(|c| c.source).collect(),
            None => (0..input.len())
                .map(ColumnSource::Input)
                .chain((0..aggregates.len()).map(ColumnSource::Window))
                .collect(),
        };

        let mut fields = Vec::with_capacity(sources.len());
        for (position, source) in sources.iter().enumerate() {
            let rename = columns.and_then(|c| c.get(position)).and_then(|c| c.name.as_deref());
            let field = match *source {
                ColumnSource::Input(i) => {
                    let field = input.field(i).ok_or_else(|| {
                        ExecError::InvalidPlan(format!(
                            "output column {position} references input column {i}, \
                             but the input has {} columns",
                            input.len()
                        ))
                    })?;
                    Field::new(rename.unwrap_or(field.name()), field.data_type())
                }
                ColumnSource::Window(j) => {
                    let aggregate = aggregates.get(j).ok_or_else(|| {
                        ExecError::InvalidPlan(format!(
                            "output column {position} references window column {j}, \
                             but the node computes {}",
                            aggregates.len()
                        ))
                    })?;
                    let data_type = result_types.get(j).copied().unwrap_or(DataType::Any);
                    Field::new(rename.unwrap_or(&aggregate.name), data_type)
                }
            };
            fields.push(field);
        }

        let appends_windows = sources.len() == input.len() + aggregates.len()
            && sources.iter().enumerate().all(|(position, source)| match *source {
                ColumnSource::Input(i) => i == position,
                ColumnSource::Window(j) => j + input.len() == position,
            });

        Ok(Self { sources, schema: Arc::new(Schema::new(fields)), appends_windows })
    }

    /// Returns the output schema.
    #[must_use]
    pub fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    /// Builds one output row from an input row and its window values.
    ///
    /// `window_values` holds one value per aggregate, in plan order.
    #[must_use]
    pub fn build(&self, input: Row, mut window_values: Vec<Value>) -> Row {
        if self.appends_windows {
            let mut values = input.into_values();
            values.append(&mut window_values);
            return Row::new(self.schema(), values);
        }

        let values = self
            .sources
            .iter()
            .map(|source| match *source {
                ColumnSource::Input(i) => input.get(i).cloned().unwrap_or(Value::Null),
                ColumnSource::Window(j) => window_values.get(j).cloned().unwrap_or(Value::Null),
            })
            .collect();
        Row::new(self.schema(), values)
    }
}
