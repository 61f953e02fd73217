// Formula definitions for every derived field on the depot sheet.
//
// Each formula names its target and an expression over other metrics. The
// expression knows its own inputs, which is all the graph module needs to
// order evaluation.
use crate::metric::{get, Metric, MetricMap, MU_REASONS, SL_REASONS};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expr {
    /// `minuend - Σ subtrahends`
    Difference {
        minuend: Metric,
        subtrahends: &'static [Metric],
    },
    /// `Σ terms`
    Sum(&'static [Metric]),
    /// `max(0, required - available)`
    Shortfall { required: Metric, available: Metric },
    /// `round(Σ parts / Total Drivers * 100)`, undefined unless Total Drivers > 0.
    ShareOfDrivers(&'static [Metric]),
    /// `round(numerator / denominator)`, `on_zero` when the denominator is 0.
    Ratio {
        numerator: Metric,
        denominator: Metric,
        on_zero: Option<f64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Formula {
    pub target: Metric,
    pub expr: Expr,
}

/// Blank, absent and non-numeric cells all count as 0 inside arithmetic.
pub(crate) fn operand(values: &MetricMap, metric: Metric) -> f64 {
    get(values, metric).filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn total(values: &MetricMap, metrics: &[Metric]) -> f64 {
    metrics.iter().map(|m| operand(values, *m)).sum()
}

/// Sum of the medically-unfit reason columns.
pub fn mu_reason_total(values: &MetricMap) -> f64 {
    total(values, &MU_REASONS)
}

/// Sum of the sick-leave reason columns.
pub fn sl_reason_total(values: &MetricMap) -> f64 {
    total(values, &SL_REASONS)
}

impl Expr {
    pub fn inputs(&self) -> Vec<Metric> {
        match *self {
            Expr::Difference {
                minuend,
                subtrahends,
            } => std::iter::once(minuend)
                .chain(subtrahends.iter().copied())
                .collect(),
            Expr::Sum(terms) => terms.to_vec(),
            Expr::Shortfall {
                required,
                available,
            } => vec![required, available],
            Expr::ShareOfDrivers(parts) => parts
                .iter()
                .copied()
                .chain(std::iter::once(Metric::TotalDrivers))
                .collect(),
            Expr::Ratio {
                numerator,
                denominator,
                ..
            } => vec![numerator, denominator],
        }
    }

    pub fn evaluate(&self, values: &MetricMap) -> Option<f64> {
        match *self {
            Expr::Difference {
                minuend,
                subtrahends,
            } => Some(operand(values, minuend) - total(values, subtrahends)),
            Expr::Sum(terms) => Some(total(values, terms)),
            Expr::Shortfall {
                required,
                available,
            } => Some((operand(values, required) - operand(values, available)).max(0.0)),
            Expr::ShareOfDrivers(parts) => {
                match get(values, Metric::TotalDrivers).filter(|v| v.is_finite()) {
                    Some(drivers) if drivers > 0.0 => {
                        Some((total(values, parts) / drivers * 100.0).round())
                    }
                    _ => None,
                }
            }
            Expr::Ratio {
                numerator,
                denominator,
                on_zero,
            } => {
                let d = operand(values, denominator);
                if d == 0.0 {
                    on_zero
                } else {
                    Some((operand(values, numerator) / d).round())
                }
            }
        }
    }
}

const fn share(target: Metric, parts: &'static [Metric]) -> Formula {
    Formula {
        target,
        expr: Expr::ShareOfDrivers(parts),
    }
}

const fn difference(target: Metric, minuend: Metric, subtrahends: &'static [Metric]) -> Formula {
    Formula {
        target,
        expr: Expr::Difference {
            minuend,
            subtrahends,
        },
    }
}

/// The shipped formula set. Listed in sheet order; the engine sorts it.
pub const FORMULAS: &[Formula] = {
    use Metric::*;
    &[
        difference(ServiceVariance, ActualServices, &[PlannedServices]),
        difference(KmVariance, ActualKm, &[PlannedKm]),
        difference(AvailableDrivers1, TotalDrivers, &[MedicallyUnfit, SuspendedDrivers]),
        share(PctAvailableDrivers1, &[AvailableDrivers1]),
        share(PctWeeklyOff, &[WeeklyOff]),
        share(PctSpecialOff, &[SpecialOff]),
        share(PctOthers, &[Training, Others]),
        share(PctLeaveAbsent, &[LeaveAbsent]),
        share(PctSickLeave, &[SickLeave]),
        difference(
            AvailableDrivers2,
            AvailableDrivers1,
            &[WeeklyOff, SpecialOff, Training, Others, LeaveAbsent, SickLeave],
        ),
        share(PctAvailableDrivers2, &[AvailableDrivers2]),
        share(PctSpotAbsent, &[SpotAbsent]),
        difference(AttendingDrivers, AvailableDrivers2, &[SpotAbsent]),
        share(PctAttendingDrivers, &[AttendingDrivers]),
        Formula {
            target: DriverSchedule,
            expr: Expr::Ratio {
                numerator: DriversRequired,
                denominator: PlannedSchedules,
                on_zero: Some(0.0),
            },
        },
        Formula {
            target: DriverShortage,
            expr: Expr::Shortfall {
                required: DriversRequired,
                available: AttendingDrivers,
            },
        },
        share(PctDoubleDuty, &[DoubleDuty]),
        share(PctOffCancellation, &[OffCancellation]),
        Formula {
            target: DriversOnDuty,
            expr: Expr::Sum(&[AttendingDrivers, DoubleDuty, OffCancellation]),
        },
        difference(DriverForBusServices, DriversOnDuty, &[DriversAsConductors]),
        Formula {
            target: KmPerDriver,
            expr: Expr::Ratio {
                numerator: ActualKm,
                denominator: DriverForBusServices,
                on_zero: None,
            },
        },
        difference(ServicePerDriverCheck, DriverForBusServices, &[ActualServices]),
        Formula {
            target: TotalDriversMuReasons,
            expr: Expr::Sum(&MU_REASONS),
        },
        difference(DiffMuReasons, TotalDriversMuReasons, &[MedicallyUnfit]),
        Formula {
            target: TotalDriversSlReasons,
            expr: Expr::Sum(&SL_REASONS),
        },
        difference(DiffSlReasons, TotalDriversSlReasons, &[SickLeave]),
    ]
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::MetricKind;
    use std::collections::HashSet;

    fn map(pairs: &[(Metric, f64)]) -> MetricMap {
        pairs
            .iter()
            .map(|(m, v)| (m.column().to_string(), Some(*v)))
            .collect()
    }

    #[test]
    fn every_derived_metric_has_exactly_one_formula() {
        let targets: HashSet<Metric> = FORMULAS.iter().map(|f| f.target).collect();
        assert_eq!(targets.len(), FORMULAS.len());
        for metric in Metric::ALL {
            assert_eq!(
                targets.contains(&metric),
                metric.kind() == MetricKind::Derived,
                "{}",
                metric
            );
        }
    }

    #[test]
    fn share_is_undefined_without_drivers() {
        let expr = Expr::ShareOfDrivers(&[Metric::SickLeave]);
        assert_eq!(expr.evaluate(&map(&[(Metric::SickLeave, 4.0)])), None);
        assert_eq!(
            expr.evaluate(&map(&[(Metric::SickLeave, 4.0), (Metric::TotalDrivers, 0.0)])),
            None
        );
        assert_eq!(
            expr.evaluate(&map(&[(Metric::SickLeave, 4.0), (Metric::TotalDrivers, -3.0)])),
            None
        );
        assert_eq!(
            expr.evaluate(&map(&[(Metric::SickLeave, 0.0), (Metric::TotalDrivers, 40.0)])),
            Some(0.0)
        );
    }

    #[test]
    fn share_rounds_half_away_from_zero() {
        let expr = Expr::ShareOfDrivers(&[Metric::SpotAbsent]);
        // 1 / 8 * 100 = 12.5
        let values = map(&[(Metric::SpotAbsent, 1.0), (Metric::TotalDrivers, 8.0)]);
        assert_eq!(expr.evaluate(&values), Some(13.0));
    }

    #[test]
    fn ratio_uses_zero_fallback() {
        let ratio = Expr::Ratio {
            numerator: Metric::DriversRequired,
            denominator: Metric::PlannedSchedules,
            on_zero: Some(0.0),
        };
        assert_eq!(ratio.evaluate(&map(&[(Metric::DriversRequired, 70.0)])), Some(0.0));
        let values = map(&[(Metric::DriversRequired, 70.0), (Metric::PlannedSchedules, 30.0)]);
        assert_eq!(ratio.evaluate(&values), Some(2.0));
    }

    #[test]
    fn non_numeric_operands_count_as_zero() {
        let mut values = map(&[(Metric::Ortho, 2.0)]);
        values.insert(Metric::Spondilitis.column().to_string(), Some(f64::NAN));
        values.insert(Metric::SpinalDisc.column().to_string(), None);
        assert_eq!(mu_reason_total(&values), 2.0);
    }

    #[test]
    fn share_inputs_include_total_drivers() {
        let inputs = Expr::ShareOfDrivers(&[Metric::Training, Metric::Others]).inputs();
        assert_eq!(
            inputs,
            vec![Metric::Training, Metric::Others, Metric::TotalDrivers]
        );
    }
}
