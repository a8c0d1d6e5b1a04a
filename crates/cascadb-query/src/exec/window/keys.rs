//! Key comparison for window partitions and peer groups.

use std::cmp::Ordering;

use cascadb_core::Value;

use crate::error::ExecResult;
use crate::exec::row::RowView;
use crate::plan::{ExprId, SortKey};

/// Direction and null placement for one key position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    /// Whether this position sorts ascending.
    pub ascending: bool,
    /// Whether nulls come first. `None` treats NULL as the lowest value.
    pub nulls_first: Option<bool>,
}

impl SortSpec {
    /// Ascending with default null placement.
    pub const ASC: Self = Self { ascending: true, nulls_first: None };

    /// Descending with default null placement.
    pub const DESC: Self = Self { ascending: false, nulls_first: None };

    /// Returns whether NULL precedes non-NULL values at this position.
    #[must_use]
    pub const fn nulls_come_first(&self) -> bool {
        match self.nulls_first {
            Some(first) => first,
            None => self.ascending,
        }
    }

    /// Compares two values at this position.
    #[must_use]
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => {
                if self.nulls_come_first() {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (false, true) => {
                if self.nulls_come_first() {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
            (false, false) => {
                let ord = a.sql_cmp(b);
                if self.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            }
        }
    }
}

impl From<&SortKey> for SortSpec {
    fn from(key: &SortKey) -> Self {
        Self { ascending: key.ascending, nulls_first: key.nulls_first }
    }
}

/// Lexicographic comparator over extracted keys.
///
/// Position 0 is the most significant. Equality treats NULL as equal to
/// NULL, so rows with NULL keys group together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyComparator {
    specs: Vec<SortSpec>,
}

impl KeyComparator {
    /// Creates a comparator from per-position specs.
    #[must_use]
    pub fn new(specs: Vec<SortSpec>) -> Self {
        Self { specs }
    }

    /// Creates a comparator of `len` ascending positions.
    #[must_use]
    pub fn ascending(len: usize) -> Self {
        Self::new(vec![SortSpec::ASC; len])
    }

    /// Creates a comparator for a window's ORDER BY keys.
    #[must_use]
    pub fn for_sort_keys(keys: &[SortKey]) -> Self {
        Self::new(keys.iter().map(SortSpec::from).collect())
    }

    /// Returns the per-position specs.
    #[must_use]
    pub fn specs(&self) -> &[SortSpec] {
        &self.specs
    }

    /// Returns the number of key positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns true if there are no key positions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Compares two keys lexicographically.
    ///
    /// Both keys must have one value per position.
    #[must_use]
    pub fn compare(&self, a: &[Value], b: &[Value]) -> Ordering {
        debug_assert_eq!(a.len(), self.specs.len());
        debug_assert_eq!(b.len(), self.specs.len());
        self.specs
            .iter()
            .zip(a.iter().zip(b))
            .map(|(spec, (x, y))| spec.compare(x, y))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Returns true if the keys are equal at every position.
    #[must_use]
    pub fn equal(&self, a: &[Value], b: &[Value]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.not_distinct(y))
    }

    /// Evaluates `exprs` on both rows and compares the results.
    ///
    /// `exprs` must line up with this comparator's positions.
    pub fn compare_rows(
        &self,
        a: &RowView<'_>,
        b: &RowView<'_>,
        exprs: &[ExprId],
    ) -> ExecResult<Ordering> {
        debug_assert_eq!(exprs.len(), self.specs.len());
        for (spec, &expr) in self.specs.iter().zip(exprs) {
            let ord = spec.compare(&a.evaluate(expr)?, &b.evaluate(expr)?);
            if ord.is_ne() {
                return Ok(ord);
            }
        }
        Ok(Ordering::Equal)
    }
}
