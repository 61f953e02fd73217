// Persistence seam for depot records.
//
// The dashboard keeps one row per (depot, date). `RecordStore` is the
// interface the application talks to; `InMemoryStore` backs the console
// binary and the tests. `apply_entry` is the only write path that keeps
// stored derived cells in step with their inputs.
use crate::benchmark::DepotCategory;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::metric::{Metric, MetricRecord};
use crate::validator::{EditableFields, ValidationError};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
}

pub trait RecordStore {
    /// Insert, or merge into the existing record for the same depot and date.
    /// Cells present in `record` replace stored cells; others are kept.
    fn upsert(&mut self, record: MetricRecord) -> Upsert;

    fn get(&self, depot: &str, date: NaiveDate) -> Option<&MetricRecord>;

    /// Records of `depot` with `from <= date <= to`, oldest first.
    fn fetch(&self, depot: &str, from: NaiveDate, to: NaiveDate) -> Vec<MetricRecord>;

    fn delete(&mut self, depot: &str, date: NaiveDate) -> Result<MetricRecord>;

    fn latest_date(&self, depot: &str) -> Option<NaiveDate>;

    fn depots(&self) -> Vec<String>;

    fn all(&self) -> Vec<MetricRecord>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    records: BTreeMap<(String, NaiveDate), MetricRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for InMemoryStore {
    fn upsert(&mut self, record: MetricRecord) -> Upsert {
        match self.records.get_mut(&record.key()) {
            Some(existing) => {
                existing.values.extend(record.values);
                Upsert::Updated
            }
            None => {
                self.records.insert(record.key(), record);
                Upsert::Inserted
            }
        }
    }

    fn get(&self, depot: &str, date: NaiveDate) -> Option<&MetricRecord> {
        self.records.get(&(depot.to_string(), date))
    }

    fn fetch(&self, depot: &str, from: NaiveDate, to: NaiveDate) -> Vec<MetricRecord> {
        if from > to {
            return Vec::new();
        }
        self.records
            .range((depot.to_string(), from)..=(depot.to_string(), to))
            .map(|(_, r)| r.clone())
            .collect()
    }

    fn delete(&mut self, depot: &str, date: NaiveDate) -> Result<MetricRecord> {
        self.records
            .remove(&(depot.to_string(), date))
            .ok_or_else(|| Error::RecordNotFound {
                depot: depot.to_string(),
                date,
            })
    }

    fn latest_date(&self, depot: &str) -> Option<NaiveDate> {
        self.records
            .keys()
            .filter(|(d, _)| d == depot)
            .map(|(_, date)| *date)
            .max()
    }

    fn depots(&self) -> Vec<String> {
        let depots: BTreeSet<&String> = self.records.keys().map(|(d, _)| d).collect();
        depots.into_iter().cloned().collect()
    }

    fn all(&self) -> Vec<MetricRecord> {
        self.records.values().cloned().collect()
    }
}

/// Raw input cells that already hold a stored value and may not be re-entered.
pub fn locked_fields(existing: &MetricRecord) -> BTreeSet<Metric> {
    Metric::inputs()
        .filter(|m| existing.get(*m).is_some())
        .collect()
}

/// The only date a depot may enter next: the day after its latest record,
/// or `today` when nothing is stored yet.
pub fn next_entry_date<S: RecordStore + ?Sized>(store: &S, depot: &str, today: NaiveDate) -> NaiveDate {
    match store.latest_date(depot) {
        Some(latest) => latest.succ_opt().unwrap_or(latest),
        None => today,
    }
}

/// A date may be entered when it already has a record (an edit) or when it
/// is not later than `next_entry_date`.
pub fn entry_date_allowed<S: RecordStore + ?Sized>(
    store: &S,
    depot: &str,
    date: NaiveDate,
    today: NaiveDate,
) -> bool {
    store.get(depot, date).is_some() || date <= next_entry_date(store, depot, today)
}

/// Merge one sheet row into the store.
///
/// For an existing (depot, date) the incoming cells are laid over the stored
/// ones, except locked inputs, which keep their stored value. Derived cells
/// are then recomputed from the merged inputs and the result is validated
/// with the locked cells taken out of `editable`. Nothing is written when
/// validation reports a problem.
pub fn apply_entry<S: RecordStore + ?Sized>(
    engine: &Engine,
    store: &mut S,
    record: MetricRecord,
    category: DepotCategory,
    editable: &EditableFields,
) -> std::result::Result<Upsert, Vec<ValidationError>> {
    let (values, allowed) = match store.get(&record.depot, record.date) {
        Some(existing) => {
            let locked = locked_fields(existing);
            let mut values = existing.values.clone();
            for (key, value) in record.values {
                match Metric::from_key(&key).filter(|m| locked.contains(m)) {
                    Some(metric) => {
                        if value != existing.get(metric) {
                            warn!(
                                depot = %record.depot,
                                date = %record.date,
                                field = metric.column(),
                                "locked cell left unchanged"
                            );
                        }
                    }
                    None => {
                        values.insert(key, value);
                    }
                }
            }
            (values, editable.without(&locked))
        }
        None => (record.values, editable.clone()),
    };

    let computed = engine.compute(&values, category);
    let errors = engine.validate(&computed, &allowed);
    if !errors.is_empty() {
        return Err(errors);
    }
    debug!(depot = %record.depot, date = %record.date, "entry stored");
    Ok(store.upsert(MetricRecord {
        depot: record.depot,
        date: record.date,
        values: computed,
    }))
}
