// Derived-metrics engine.
//
// The formula set is ordered once in `Engine::new`; afterwards the engine is
// immutable and `compute` is a pure function of its arguments, so a single
// engine can be shared freely across threads.
pub mod formula;
pub mod graph;

use crate::benchmark::DepotCategory;
use crate::error::Result;
use crate::metric::{Metric, MetricMap, MetricRecord};
use crate::validator::{self, EditableFields, ValidationError};
use formula::{Formula, FORMULAS};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Engine {
    formulas: Vec<Formula>,
    order: Vec<usize>,
}

impl Engine {
    /// Engine over the shipped formula set.
    pub fn new() -> Result<Self> {
        Self::with_formulas(FORMULAS.to_vec())
    }

    /// Fails if the formulas contain a cycle, a duplicate target or a raw
    /// input as a target.
    pub fn with_formulas(formulas: Vec<Formula>) -> Result<Self> {
        let order = graph::evaluation_order(&formulas)?;
        debug!(formulas = formulas.len(), "formula evaluation order resolved");
        Ok(Self { formulas, order })
    }

    /// Derived metrics in the order they are evaluated.
    pub fn evaluation_order(&self) -> impl Iterator<Item = Metric> + '_ {
        self.order.iter().map(move |i| self.formulas[*i].target)
    }

    /// Returns `raw` with every derived field filled in.
    ///
    /// Unknown keys pass through untouched and derived keys already present in
    /// `raw` are overwritten. Keys are storage column names. The depot category
    /// does not enter any formula.
    pub fn compute(&self, raw: &MetricMap, category: DepotCategory) -> MetricMap {
        let mut values = raw.clone();
        for &idx in &self.order {
            let formula = &self.formulas[idx];
            let value = formula.expr.evaluate(&values);
            values.insert(formula.target.column().to_string(), value);
        }
        debug!(%category, fields = values.len(), "derived metrics computed");
        values
    }

    pub fn compute_record(&self, record: &MetricRecord, category: DepotCategory) -> MetricRecord {
        MetricRecord {
            depot: record.depot.clone(),
            date: record.date,
            values: self.compute(&record.values, category),
        }
    }

    pub fn validate(&self, record: &MetricMap, editable: &EditableFields) -> Vec<ValidationError> {
        validator::validate(record, editable)
    }
}
