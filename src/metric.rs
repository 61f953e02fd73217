// The closed set of fields on a daily depot sheet.
//
// Every metric has a storage column name (the canonical key used in
// `MetricMap`), the label shown on the grid, and a kind: raw inputs are typed
// in by depot staff, derived fields are only ever produced by the engine.
// Declaration order follows the row order of the input sheet.
use crate::error::Error;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Key → value mapping for one record. `None` is a blank cell.
pub type MetricMap = BTreeMap<String, Option<f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Input,
    Derived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    Schedules,
    SchedulesServices,
    SchedulesKms,
    PlannedSchedules,
    PlannedServices,
    PlannedKm,
    ActualServices,
    ActualKm,
    ServiceVariance,
    KmVariance,
    TotalDrivers,
    MedicallyUnfit,
    SuspendedDrivers,
    AvailableDrivers1,
    PctAvailableDrivers1,
    WeeklyOff,
    PctWeeklyOff,
    SpecialOff,
    PctSpecialOff,
    Training,
    Others,
    PctOthers,
    LeaveAbsent,
    PctLeaveAbsent,
    SickLeave,
    PctSickLeave,
    AvailableDrivers2,
    PctAvailableDrivers2,
    SpotAbsent,
    PctSpotAbsent,
    AttendingDrivers,
    PctAttendingDrivers,
    DriversRequired,
    DriverSchedule,
    DriverShortage,
    DoubleDuty,
    PctDoubleDuty,
    OffCancellation,
    PctOffCancellation,
    DriversAsConductors,
    DriversOnDuty,
    DriverForBusServices,
    KmPerDriver,
    ServicePerDriverCheck,
    Spondilitis,
    SpinalDisc,
    VisionColorBlindness,
    NeuroParalysisMedical,
    Ortho,
    TotalDriversMuReasons,
    DiffMuReasons,
    FluFever,
    Bp,
    Orthopedic,
    Heart,
    Weakness,
    Eye,
    AccidentInjuries,
    NeuroParalysisSickLeave,
    Piles,
    Diabetes,
    Thyroid,
    Gas,
    Dental,
    Ear,
    SkinAllergy,
    GeneralSurgery,
    Obesity,
    Cancer,
    TotalDriversSlReasons,
    DiffSlReasons,
}

/// Medically-unfit breakdown; must add up to `MedicallyUnfit`.
pub const MU_REASONS: [Metric; 5] = [
    Metric::Spondilitis,
    Metric::SpinalDisc,
    Metric::VisionColorBlindness,
    Metric::NeuroParalysisMedical,
    Metric::Ortho,
];

/// Sick-leave breakdown; must add up to `SickLeave`.
pub const SL_REASONS: [Metric; 18] = [
    Metric::FluFever,
    Metric::Bp,
    Metric::Orthopedic,
    Metric::Heart,
    Metric::Weakness,
    Metric::Eye,
    Metric::AccidentInjuries,
    Metric::NeuroParalysisSickLeave,
    Metric::Piles,
    Metric::Diabetes,
    Metric::Thyroid,
    Metric::Gas,
    Metric::Dental,
    Metric::Ear,
    Metric::SkinAllergy,
    Metric::GeneralSurgery,
    Metric::Obesity,
    Metric::Cancer,
];

impl Metric {
    pub const ALL: [Metric; 71] = {
        use Metric::*;
        [
            Schedules,
            SchedulesServices,
            SchedulesKms,
            PlannedSchedules,
            PlannedServices,
            PlannedKm,
            ActualServices,
            ActualKm,
            ServiceVariance,
            KmVariance,
            TotalDrivers,
            MedicallyUnfit,
            SuspendedDrivers,
            AvailableDrivers1,
            PctAvailableDrivers1,
            WeeklyOff,
            PctWeeklyOff,
            SpecialOff,
            PctSpecialOff,
            Training,
            Others,
            PctOthers,
            LeaveAbsent,
            PctLeaveAbsent,
            SickLeave,
            PctSickLeave,
            AvailableDrivers2,
            PctAvailableDrivers2,
            SpotAbsent,
            PctSpotAbsent,
            AttendingDrivers,
            PctAttendingDrivers,
            DriversRequired,
            DriverSchedule,
            DriverShortage,
            DoubleDuty,
            PctDoubleDuty,
            OffCancellation,
            PctOffCancellation,
            DriversAsConductors,
            DriversOnDuty,
            DriverForBusServices,
            KmPerDriver,
            ServicePerDriverCheck,
            Spondilitis,
            SpinalDisc,
            VisionColorBlindness,
            NeuroParalysisMedical,
            Ortho,
            TotalDriversMuReasons,
            DiffMuReasons,
            FluFever,
            Bp,
            Orthopedic,
            Heart,
            Weakness,
            Eye,
            AccidentInjuries,
            NeuroParalysisSickLeave,
            Piles,
            Diabetes,
            Thyroid,
            Gas,
            Dental,
            Ear,
            SkinAllergy,
            GeneralSurgery,
            Obesity,
            Cancer,
            TotalDriversSlReasons,
            DiffSlReasons,
        ]
    };

    fn describe(self) -> (&'static str, &'static str, MetricKind) {
        use Metric::*;
        use MetricKind::{Derived, Input};
        match self {
            Schedules => ("Schedules", "Schedules", Input),
            SchedulesServices => ("Schedules_Services", "Schedules Services", Input),
            SchedulesKms => ("Schedules_Kms", "Schedules Kms", Input),
            PlannedSchedules => ("Planned_Schedules", "Planned Schedules", Input),
            PlannedServices => ("Planned_Services", "Planned Services", Input),
            PlannedKm => ("Planned_KM", "Planned KM", Input),
            ActualServices => ("Actual_Services", "Actual Services", Input),
            ActualKm => ("Actual_KM", "Actual KM", Input),
            ServiceVariance => ("Service_Variance", "Service Variance", Derived),
            KmVariance => ("KM_Variance", "KM Variance", Derived),
            TotalDrivers => ("Total_Drivers", "Total Drivers", Input),
            MedicallyUnfit => ("Medically_Unfit", "Medically Unfit", Input),
            SuspendedDrivers => ("Suspended_Drivers", "Suspended Drivers", Input),
            AvailableDrivers1 => ("Available_Drivers_1", "Available Drivers-1", Derived),
            PctAvailableDrivers1 => ("Pct_Available_Drivers_1", "% Available Drivers-1", Derived),
            WeeklyOff => ("Weekly_Off_National_Off", "Weekly Off & National Off", Input),
            PctWeeklyOff => ("Pct_Weekly_Off_National_Off", "% Weekly Off & National Off", Derived),
            SpecialOff => ("Special_Off_Night_Out_IC_Online", "Special Off (Night Out/IC, Online)", Input),
            PctSpecialOff => ("Pct_Special_Off_Night_Out_IC_Online", "% Special Off (Night Out/IC, Online)", Derived),
            Training => ("Training_PME_medical", "Training, PME(medical)", Input),
            Others => ("Others", "Others", Input),
            PctOthers => ("Pct_Others", "% Others", Derived),
            LeaveAbsent => ("Leave_Absent", "Leave & Absent", Input),
            PctLeaveAbsent => ("Pct_Leave_Absent", "% Leave & Absent", Derived),
            SickLeave => ("Sick_Leave", "Sick Leave", Input),
            PctSickLeave => ("Pct_Sick_Leave", "% Sick Leave", Derived),
            AvailableDrivers2 => ("Available_Drivers_2", "Available Drivers-2", Derived),
            PctAvailableDrivers2 => ("Pct_Available_Drivers_2", "% Available Drivers-2", Derived),
            SpotAbsent => ("Spot_Absent", "Spot Absent", Input),
            PctSpotAbsent => ("Pct_Spot_Absent", "% Spot Absent", Derived),
            AttendingDrivers => ("Attending_Drivers", "Attending Drivers", Derived),
            PctAttendingDrivers => ("Pct_Attending_Drivers", "% Attending Drivers", Derived),
            DriversRequired => ("Drivers_Required", "Drivers Required", Input),
            DriverSchedule => ("Driver_Schedule", "Driver Schedule", Derived),
            DriverShortage => ("Driver_Shortage", "Driver Shortage", Derived),
            DoubleDuty => ("Double_Duty", "Double Duty", Input),
            PctDoubleDuty => ("Pct_Double_Duty", "% Double Duty", Derived),
            OffCancellation => ("Off_Cancellation", "Off Cancellation", Input),
            PctOffCancellation => ("Pct_Off_Cancellation", "% Off Cancellation", Derived),
            DriversAsConductors => ("Drivers_as_Conductors", "Drivers as Conductors", Input),
            DriversOnDuty => ("Drivers_on_Duty", "Drivers on Duty", Derived),
            DriverForBusServices => ("Driver_for_Bus_Services", "Driver for Bus Services", Derived),
            KmPerDriver => ("KM_per_Driver", "KM/Driver", Derived),
            ServicePerDriverCheck => ("Service_per_Driver_Check", "Service/Driver Check", Derived),
            Spondilitis => ("Spondilitis", "Spondilitis", Input),
            SpinalDisc => ("Spinal_Disc", "Spinal Disc", Input),
            VisionColorBlindness => ("Vision_Color_Blindness", "Vision/Color Blindness", Input),
            NeuroParalysisMedical => ("Neuro_Paralysis_Medical", "Neuro/Paralysis (Medical)", Input),
            Ortho => ("Ortho", "Ortho", Input),
            TotalDriversMuReasons => ("Total_Drivers_MU_Reasons", "Total Drivers (MU Reasons)", Derived),
            DiffMuReasons => ("Diff_MU_Reasons", "Diff (MU Reasons)", Derived),
            FluFever => ("Flu_Fever", "Flu/Fever", Input),
            Bp => ("BP", "BP", Input),
            Orthopedic => ("Orthopedic", "Orthopedic", Input),
            Heart => ("Heart", "Heart", Input),
            Weakness => ("Weakness", "Weakness", Input),
            Eye => ("Eye", "Eye", Input),
            AccidentInjuries => ("Accident_Injuries", "Accident/Injuries", Input),
            NeuroParalysisSickLeave => ("Neuro_Paralysis_Sick_Leave", "Neuro/Paralysis (Sick Leave)", Input),
            Piles => ("Piles", "Piles", Input),
            Diabetes => ("Diabetes", "Diabetes", Input),
            Thyroid => ("Thyroid", "Thyroid", Input),
            Gas => ("Gas", "Gas", Input),
            Dental => ("Dental", "Dental", Input),
            Ear => ("Ear", "Ear", Input),
            SkinAllergy => ("Skin_Allergy", "Skin/Allergy", Input),
            GeneralSurgery => ("General_Surgery", "General Surgery", Input),
            Obesity => ("Obesity", "Obesity", Input),
            Cancer => ("Cancer", "Cancer", Input),
            TotalDriversSlReasons => ("Total_Drivers_SL_Reasons", "Total Drivers (SL Reasons)", Derived),
            DiffSlReasons => ("Diff_SL_Reasons", "Diff (SL Reasons)", Derived),
        }
    }

    /// Storage column name, e.g. `Total_Drivers`.
    pub fn column(self) -> &'static str {
        self.describe().0
    }

    /// Grid label, e.g. `Total Drivers`.
    pub fn label(self) -> &'static str {
        self.describe().1
    }

    pub fn kind(self) -> MetricKind {
        self.describe().2
    }

    pub fn is_input(self) -> bool {
        self.kind() == MetricKind::Input
    }

    pub fn inputs() -> impl Iterator<Item = Metric> {
        Self::ALL.into_iter().filter(|m| m.is_input())
    }

    /// Resolve either a column name or a label, ignoring case and
    /// surrounding whitespace.
    pub fn from_key(key: &str) -> Option<Metric> {
        let key = key.trim();
        Self::ALL.into_iter().find(|m| {
            m.column().eq_ignore_ascii_case(key) || m.label().eq_ignore_ascii_case(key)
        })
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::from_key(s).ok_or_else(|| Error::UnknownMetric(s.trim().to_string()))
    }
}

/// Read a metric out of a map. Blank and absent cells are both `None`.
pub fn get(values: &MetricMap, metric: Metric) -> Option<f64> {
    values.get(metric.column()).copied().flatten()
}

/// One (depot, date) observation.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub depot: String,
    pub date: NaiveDate,
    pub values: MetricMap,
}

impl MetricRecord {
    pub fn new(depot: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            depot: depot.into(),
            date,
            values: MetricMap::new(),
        }
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        get(&self.values, metric)
    }

    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        self.values.insert(metric.column().to_string(), value);
    }

    pub fn key(&self) -> (String, NaiveDate) {
        (self.depot.clone(), self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn columns_and_labels_are_unique() {
        let columns: HashSet<_> = Metric::ALL.iter().map(|m| m.column()).collect();
        let labels: HashSet<_> = Metric::ALL.iter().map(|m| m.label().to_lowercase()).collect();
        assert_eq!(columns.len(), Metric::ALL.len());
        assert_eq!(labels.len(), Metric::ALL.len());
    }

    #[test]
    fn all_is_in_declaration_order() {
        let mut sorted = Metric::ALL;
        sorted.sort();
        assert_eq!(sorted, Metric::ALL);
    }

    #[test]
    fn lookup_by_column_or_label() {
        assert_eq!(Metric::from_key("Total_Drivers"), Some(Metric::TotalDrivers));
        assert_eq!(Metric::from_key("  total drivers "), Some(Metric::TotalDrivers));
        assert_eq!(Metric::from_key("KM/Driver"), Some(Metric::KmPerDriver));
        assert_eq!(Metric::from_key("driver shortage"), Some(Metric::DriverShortage));
        assert!(Metric::from_key("Conductors").is_none());
        assert!("Conductors".parse::<Metric>().is_err());
    }

    #[test]
    fn reason_breakdowns_are_inputs() {
        assert!(MU_REASONS.iter().all(|m| m.is_input()));
        assert!(SL_REASONS.iter().all(|m| m.is_input()));
        assert_eq!(Metric::inputs().count(), 45);
    }
}
