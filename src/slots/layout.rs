//! Slot layout calculation for chassis and their blades.
//!
//! Everything in here is pure; the API calls and CSV output live in the
//! parent module and feed through these functions.
use serde::Serialize;
use serde_json::Value;

use std::collections::BTreeMap;

use crate::client::{Blade, Chassis};

/// Slot count used for chassis models missing from `SLOT_COUNTS`.
pub const DEFAULT_SLOT_COUNT: u32 = 8;

/// Known chassis models and their number of blade slots.
pub const SLOT_COUNTS: &[(&str, u32)] = &[
    ("UCSB-5108-AC2", 8),
    ("UCSB-5108-DC2", 8),
    ("UCSX-9508", 8),
];

/// Blade models occupying two adjacent slots.
pub const TWO_SLOT_MODELS: &[&str] = &["UCSX-410C-M7", "UCSB-B480-M5"];

/// Placeholder model for chassis without one.
pub const UNKNOWN_MODEL: &str = "UNKNOWN_MODEL";

/// `OperState` written for unpopulated slots.
pub const EMPTY: &str = "Empty";

/// Looks up the slot count of a known chassis model.
pub fn slot_count(model: &str) -> Option<u32> {
    SLOT_COUNTS
        .iter()
        .find(|(known, _)| *known == model)
        .map(|(_, count)| *count)
}

/// Determines if a blade model spans two slots.
pub fn is_two_slot(model: &str) -> bool {
    TWO_SLOT_MODELS.iter().any(|known| *known == model)
}

/// Normalized view of a chassis with all fallbacks applied.
#[derive(Clone, Debug, PartialEq)]
pub struct ChassisInfo {
    pub name: String,
    pub moid: String,
    pub model: String,
    pub serial: String,
    pub state: String,
    pub slots: u32,
}

impl ChassisInfo {
    /// Normalizes a `Chassis`, logging any missing attributes.
    pub fn from_chassis(chassis: &Chassis) -> Self {
        let name = non_empty(&chassis.name).unwrap_or("UnknownChassis").to_string();
        let moid = chassis.moid.as_deref().unwrap_or("UnknownMoid").to_string();
        let model = non_empty(&chassis.model).unwrap_or(UNKNOWN_MODEL).to_string();
        let serial = non_empty(&chassis.serial).unwrap_or("UnknownSerial").to_string();

        let state = match &chassis.oper_state {
            None => {
                warn!("Chassis '{}' (Moid: {}) is missing OperState attribute", name, moid);
                "UnknownChassisState".to_string()
            }
            Some(None) => "NotReported (ChassisState_is_None)".to_string(),
            Some(Some(state)) if state.trim().is_empty() => {
                debug!("Chassis '{}' (Moid: {}) reported a blank OperState, using 'operable'", name, moid);
                "operable".to_string()
            }
            Some(Some(state)) => state.trim().to_string(),
        };

        let slots = match slot_count(&model) {
            Some(slots) => slots,
            None if model == UNKNOWN_MODEL => {
                warn!(
                    "Chassis model is unknown for '{}' (Moid: {}), defaulting to {} slots",
                    name, moid, DEFAULT_SLOT_COUNT
                );
                DEFAULT_SLOT_COUNT
            }
            None => {
                warn!(
                    "Chassis model '{}' for '{}' (Moid: {}) has no known slot count, defaulting to {} slots",
                    model, name, moid, DEFAULT_SLOT_COUNT
                );
                DEFAULT_SLOT_COUNT
            }
        };

        Self {
            name,
            moid,
            model,
            serial,
            state,
            slots,
        }
    }
}

/// Model and serial of the blade in a slot.
#[derive(Clone, Debug, PartialEq)]
pub struct BladeInfo {
    pub model: String,
    pub serial: String,
}

/// Maps slot ids to the blades which report them.
///
/// Blades without a usable `SlotId` are logged and skipped; a later
/// blade reporting the same slot replaces an earlier one.
pub fn populated_slots(chassis: &str, blades: &[Blade]) -> BTreeMap<u32, BladeInfo> {
    let mut populated = BTreeMap::new();

    for blade in blades {
        let moid = blade.moid.as_deref().unwrap_or("N/A");
        let info = BladeInfo {
            model: non_empty(&blade.model).unwrap_or("UnknownBladeModel").to_string(),
            serial: non_empty(&blade.serial).unwrap_or("UnknownBladeSerial").to_string(),
        };

        let slot = match &blade.slot_id {
            None | Some(Value::Null) => {
                warn!(
                    "Blade (Moid: {}) in chassis '{}' is missing SlotId, skipping",
                    moid, chassis
                );
                continue;
            }
            Some(value) => match parse_slot(value) {
                Some(slot) => slot,
                None => {
                    warn!(
                        "Could not parse SlotId '{}' for blade (Moid: {}) in chassis '{}', skipping",
                        value, moid, chassis
                    );
                    continue;
                }
            },
        };

        debug!(
            "Chassis '{}': blade (Moid: {}, Model: {}, Serial: {}) found in slot {}",
            chassis, moid, info.model, info.serial, slot
        );
        populated.insert(slot, info);
    }

    populated
}

/// Parses a `SlotId` value, accepting integers, whole floats and numeric strings.
pub fn parse_slot(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|slot| *slot >= 0.0 && slot.fract() == 0.0)
                    .map(|slot| slot as u64)
            })
            .and_then(|slot| u32::try_from(slot).ok()),
        Value::String(string) => string.trim().parse().ok(),
        _ => None,
    }
}

/// Expands populated slots to cover both slots of two-slot blades.
///
/// The second slot is only claimed when it exists within the chassis.
pub fn expand_slots(populated: &BTreeMap<u32, BladeInfo>, slots: u32) -> BTreeMap<u32, &BladeInfo> {
    let mut expanded = BTreeMap::new();

    for (slot, info) in populated {
        expanded.insert(*slot, info);
        if is_two_slot(&info.model) && *slot < slots {
            expanded.insert(slot + 1, info);
        }
    }

    expanded
}

/// A single row of the slot report.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SlotRow {
    pub chassis: String,
    pub chassis_model: String,
    pub chassis_serial: String,
    pub slot: u32,
    pub blade_model: String,
    pub blade_serial: String,
    pub oper_state: String,
}

/// Column names of the slot report, in order.
pub const HEADERS: [&str; 7] = [
    "Chassis",
    "ChassisModel",
    "ChassisSerial",
    "Slot",
    "BladeModel",
    "BladeSerial",
    "OperState",
];

/// Builds one row per slot of the chassis, in slot order.
///
/// Populated slots carry the chassis' reported state, as blades are not
/// queried for their own state.
pub fn slot_rows(chassis: &ChassisInfo, populated: &BTreeMap<u32, BladeInfo>) -> Vec<SlotRow> {
    let expanded = expand_slots(populated, chassis.slots);

    (1..=chassis.slots)
        .map(|slot| {
            let (blade_model, blade_serial, oper_state) = match expanded.get(&slot) {
                Some(info) => (info.model.clone(), info.serial.clone(), chassis.state.clone()),
                None => (String::new(), String::new(), EMPTY.to_string()),
            };

            SlotRow {
                chassis: chassis.name.clone(),
                chassis_model: chassis.model.clone(),
                chassis_serial: chassis.serial.clone(),
                slot,
                blade_model,
                blade_serial,
                oper_state,
            }
        })
        .collect()
}

/// Slot status counts per chassis model, in first-seen order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Summary {
    models: Vec<(String, Vec<(String, u64)>)>,
}

impl Summary {
    /// Constructs an empty `Summary`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the populated and empty slots of a chassis.
    ///
    /// Each blade counts once under the chassis state; the remaining
    /// capacity (two-slot blades occupying two) counts as `Empty`.
    pub fn record(&mut self, chassis: &ChassisInfo, populated: &BTreeMap<u32, BladeInfo>) {
        let occupied: u64 = populated
            .values()
            .map(|info| if is_two_slot(&info.model) { 2 } else { 1 })
            .sum();

        let statuses = self.statuses(&chassis.model);
        if !populated.is_empty() {
            bump(statuses, &chassis.state, populated.len() as u64);
        }

        let empty = u64::from(chassis.slots).saturating_sub(occupied);
        if empty > 0 {
            bump(statuses, EMPTY, empty);
        }
    }

    /// Builds the summary section rows, padded to the report width.
    pub fn rows(&self) -> Vec<[String; 7]> {
        let mut rows = vec![
            pad(&[]),
            pad(&[]),
            pad(&["--- Summary by Chassis Model ---"]),
            pad(&["Chassis Model", "Slot Status", "Count"]),
        ];

        for (model, statuses) in &self.models {
            for (status, count) in statuses {
                let count = count.to_string();
                rows.push(pad(&[model.as_str(), status.as_str(), count.as_str()]));
            }
        }

        rows
    }

    /// Retrieves (or creates) the status list of a chassis model.
    fn statuses(&mut self, model: &str) -> &mut Vec<(String, u64)> {
        let idx = match self.models.iter().position(|(known, _)| known == model) {
            Some(idx) => idx,
            None => {
                self.models.push((model.to_string(), Vec::new()));
                self.models.len() - 1
            }
        };
        &mut self.models[idx].1
    }
}

/// Adds to the count of a status, inserting it when first seen.
fn bump(statuses: &mut Vec<(String, u64)>, status: &str, by: u64) {
    match statuses.iter_mut().find(|(known, _)| known == status) {
        Some((_, count)) => *count += by,
        None => statuses.push((status.to_string(), by)),
    }
}

/// Pads a set of leading values out to the report width.
fn pad(values: &[&str]) -> [String; 7] {
    let mut row: [String; 7] = Default::default();
    for (cell, value) in row.iter_mut().zip(values) {
        *cell = value.to_string();
    }
    row
}

/// Treats empty strings as missing.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{BladeInfo, ChassisInfo, Summary};
    use crate::client::{Blade, Chassis};

    use serde_json::json;

    use std::collections::BTreeMap;

    fn blade(slot: serde_json::Value, model: &str, serial: &str) -> Blade {
        Blade {
            moid: Some(format!("moid-{}", serial)),
            model: Some(model.to_string()),
            serial: Some(serial.to_string()),
            slot_id: Some(slot),
        }
    }

    fn chassis(model: &str, state: Option<Option<&str>>) -> ChassisInfo {
        ChassisInfo::from_chassis(&Chassis {
            moid: Some("5f0c0f1a6176752d30000001".to_string()),
            name: Some("chassis-1".to_string()),
            model: Some(model.to_string()),
            serial: Some("FOX1234".to_string()),
            oper_state: state.map(|state| state.map(str::to_string)),
        })
    }

    #[test]
    fn normalizing_chassis_fallbacks() {
        let info = ChassisInfo::from_chassis(&Chassis {
            name: Some(String::new()),
            ..Chassis::default()
        });

        assert_eq!(info.name, "UnknownChassis");
        assert_eq!(info.moid, "UnknownMoid");
        assert_eq!(info.model, "UNKNOWN_MODEL");
        assert_eq!(info.serial, "UnknownSerial");
        assert_eq!(info.state, "UnknownChassisState");
        assert_eq!(info.slots, 8);
    }

    #[test]
    fn normalizing_chassis_oper_states() {
        assert_eq!(chassis("UCSX-9508", Some(Some(" operable "))).state, "operable");
        assert_eq!(chassis("UCSX-9508", Some(Some("  "))).state, "operable");
        assert_eq!(chassis("UCSX-9508", Some(Some("degraded"))).state, "degraded");
        assert_eq!(
            chassis("UCSX-9508", Some(None)).state,
            "NotReported (ChassisState_is_None)"
        );
        assert_eq!(chassis("UCSX-9508", None).state, "UnknownChassisState");
    }

    #[test]
    fn looking_up_slot_counts() {
        assert_eq!(super::slot_count("UCSB-5108-AC2"), Some(8));
        assert_eq!(super::slot_count("UCSX-9508"), Some(8));
        assert_eq!(super::slot_count("N20-C6508"), None);
        assert_eq!(chassis("N20-C6508", None).slots, super::DEFAULT_SLOT_COUNT);
    }

    #[test]
    fn parsing_slot_ids() {
        assert_eq!(super::parse_slot(&json!(3)), Some(3));
        assert_eq!(super::parse_slot(&json!(" 4 ")), Some(4));
        assert_eq!(super::parse_slot(&json!("four")), None);
        assert_eq!(super::parse_slot(&json!(-1)), None);
        assert_eq!(super::parse_slot(&json!(3.0)), Some(3));
        assert_eq!(super::parse_slot(&json!(3.5)), None);
        assert_eq!(super::parse_slot(&json!(-2.0)), None);
        assert_eq!(super::parse_slot(&json!(true)), None);
    }

    #[test]
    fn collecting_populated_slots() {
        let blades = vec![
            blade(json!(1), "UCSX-210C-M6", "S1"),
            blade(json!("3"), "UCSX-210C-M6", "S3"),
            blade(json!(null), "UCSX-210C-M6", "SN"),
            blade(json!("x"), "UCSX-210C-M6", "SX"),
            Blade {
                slot_id: Some(json!(5)),
                ..Blade::default()
            },
            blade(json!(3), "UCSX-210C-M7", "S3B"),
        ];
        let populated = super::populated_slots("chassis-1", &blades);

        assert_eq!(populated.len(), 3);
        assert_eq!(populated[&1].serial, "S1");
        assert_eq!(populated[&3].serial, "S3B");
        assert_eq!(populated[&5].model, "UnknownBladeModel");
        assert_eq!(populated[&5].serial, "UnknownBladeSerial");
    }

    #[test]
    fn building_slot_rows_with_two_slot_blades() {
        let info = chassis("UCSX-9508", Some(Some("operable")));
        let mut populated = BTreeMap::new();
        populated.insert(1, BladeInfo { model: "UCSX-410C-M7".into(), serial: "A".into() });
        populated.insert(4, BladeInfo { model: "UCSX-210C-M6".into(), serial: "B".into() });
        populated.insert(8, BladeInfo { model: "UCSB-B480-M5".into(), serial: "C".into() });

        let rows = super::slot_rows(&info, &populated);
        let states: Vec<&str> = rows.iter().map(|row| row.oper_state.as_str()).collect();
        let serials: Vec<&str> = rows.iter().map(|row| row.blade_serial.as_str()).collect();

        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0].slot, 1);
        assert_eq!(rows[7].slot, 8);
        assert_eq!(serials, vec!["A", "A", "", "B", "", "", "", "C"]);
        assert_eq!(
            states,
            vec!["operable", "operable", "Empty", "operable", "Empty", "Empty", "Empty", "operable"]
        );
        assert_eq!(rows[2].blade_model, "");
        assert_eq!(rows[0].chassis_serial, "FOX1234");
    }

    #[test]
    fn summarizing_slot_statuses() {
        let mut summary = Summary::new();
        let info = chassis("UCSX-9508", Some(Some("operable")));

        let mut populated = BTreeMap::new();
        populated.insert(1, BladeInfo { model: "UCSX-410C-M7".into(), serial: "A".into() });
        populated.insert(3, BladeInfo { model: "UCSX-210C-M6".into(), serial: "B".into() });
        summary.record(&info, &populated);

        let degraded = chassis("UCSX-9508", Some(Some("degraded")));
        summary.record(&degraded, &BTreeMap::new());

        let rows = summary.rows();
        assert_eq!(rows.len(), 6);
        assert!(rows[0].iter().all(String::is_empty));
        assert_eq!(rows[2][0], "--- Summary by Chassis Model ---");
        assert_eq!(rows[3][..3], ["Chassis Model", "Slot Status", "Count"]);
        assert_eq!(rows[4][..3], ["UCSX-9508", "operable", "2"]);
        assert_eq!(rows[5][..3], ["UCSX-9508", "Empty", "13"]);
    }

    #[test]
    fn full_chassis_records_no_empty_slots() {
        let mut summary = Summary::new();
        let info = chassis("UCSB-5108-AC2", Some(Some("operable")));

        let populated: BTreeMap<u32, BladeInfo> = (1..=8)
            .map(|slot| (slot, BladeInfo { model: "UCSB-B200-M5".into(), serial: slot.to_string() }))
            .collect();
        summary.record(&info, &populated);

        let rows = summary.rows();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[4][..3], ["UCSB-5108-AC2", "operable", "8"]);
    }
}
