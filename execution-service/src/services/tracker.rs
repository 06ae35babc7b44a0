//! Update path for line items: date tracking, field history and plain
//! assignment, applied to a loaded snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::de::{flexible_date, optional_label, optional_number};
use crate::models::{
    ApprovalStatus, FieldValue, HistoryEntry, LineItem, LineItemMaterial, MaterialStatus,
    TrackedField,
};

/// An update request. Fields not listed here (derived values, counters,
/// flags, history, photos) cannot be patched and are dropped on input.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LineItemPatch {
    #[serde(default, deserialize_with = "flexible_date")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub end_date: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "optional_number")]
    #[validate(range(min = 0.0, message = "Quantity cannot be negative"))]
    pub quantity: Option<f64>,
    #[serde(default, deserialize_with = "optional_number")]
    #[validate(range(min = 0.0, message = "Work status cannot be negative"))]
    pub work_status_in_units: Option<f64>,
    #[serde(default)]
    pub material_status: Option<MaterialStatus>,

    #[serde(default)]
    pub materials: Option<Vec<LineItemMaterial>>,
    #[serde(default)]
    pub shop_drawing: Option<ApprovalStatus>,
    #[serde(default, rename = "TDS")]
    pub tds: Option<ApprovalStatus>,
    #[serde(default, rename = "Samples")]
    pub samples: Option<ApprovalStatus>,

    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default, deserialize_with = "optional_label")]
    pub sno: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub item_description: Option<String>,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default, deserialize_with = "optional_number")]
    pub rate: Option<f64>,
}

impl LineItemPatch {
    pub fn material_status(status: MaterialStatus) -> Self {
        Self {
            material_status: Some(status),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DateField {
    #[serde(rename = "startDate")]
    Start,
    #[serde(rename = "endDate")]
    End,
}

/// A rescheduling of an already-set date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateChange {
    pub field: DateField,
    pub previous: DateTime<Utc>,
    pub current: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub item: LineItem,
    pub history: Vec<HistoryEntry>,
    pub date_changes: Vec<DateChange>,
}

impl UpdateOutcome {
    pub fn is_audited(&self) -> bool {
        !self.history.is_empty() || !self.date_changes.is_empty()
    }
}

/// Applies `patch` to `existing`. The returned item already carries the new
/// history entries and recomputed derived fields; it still has to be
/// validated and persisted by the caller.
pub fn apply_update(existing: LineItem, patch: &LineItemPatch, now: DateTime<Utc>) -> UpdateOutcome {
    let mut item = existing;
    let mut date_changes = Vec::new();

    if let Some(new_start) = patch.start_date {
        if let Some(change) = track_date(&mut item, DateField::Start, new_start) {
            date_changes.push(change);
        }
    }
    if let Some(new_end) = patch.end_date {
        if let Some(change) = track_date(&mut item, DateField::End, new_end) {
            date_changes.push(change);
        }
    }

    let mut history = Vec::new();
    if let Some(quantity) = patch.quantity {
        if quantity != item.quantity {
            history.push(entry(
                TrackedField::Quantity,
                FieldValue::Number(item.quantity),
                FieldValue::Number(quantity),
                now,
            ));
            item.quantity = quantity;
        }
    }
    if let Some(done) = patch.work_status_in_units {
        if done != item.work_status_in_units {
            history.push(entry(
                TrackedField::WorkStatusInUnits,
                FieldValue::Number(item.work_status_in_units),
                FieldValue::Number(done),
                now,
            ));
            item.work_status_in_units = done;
        }
    }
    if let Some(status) = patch.material_status {
        if status != item.material_status {
            history.push(entry(
                TrackedField::MaterialStatus,
                FieldValue::Status(item.material_status),
                FieldValue::Status(status),
                now,
            ));
            item.material_status = status;
        }
    }
    item.history.extend(history.iter().cloned());

    if let Some(materials) = &patch.materials {
        item.materials = materials.clone();
    }
    if let Some(status) = patch.shop_drawing {
        item.shop_drawing = Some(status);
    }
    if let Some(status) = patch.tds {
        item.tds = Some(status);
    }
    if let Some(status) = patch.samples {
        item.samples = Some(status);
    }

    assign_trimmed(&mut item.site_name, &patch.site_name);
    assign_trimmed(&mut item.sno, &patch.sno);
    assign_trimmed(&mut item.category, &patch.category);
    assign_trimmed(&mut item.item_description, &patch.item_description);
    assign_trimmed(&mut item.units, &patch.units);
    if let Some(project_name) = &patch.project_name {
        item.project_name = Some(project_name.trim().to_string()).filter(|p| !p.is_empty());
    }
    if let Some(rate) = patch.rate {
        item.rate = rate;
    }

    item.recompute_derived();
    item.updated_at = now;

    UpdateOutcome {
        item,
        history,
        date_changes,
    }
}

fn track_date(item: &mut LineItem, field: DateField, new_value: DateTime<Utc>) -> Option<DateChange> {
    let (slot, previous_list, counter) = match field {
        DateField::Start => (
            &mut item.start_date,
            &mut item.previous_dates.start_dates,
            &mut item.start_date_counter,
        ),
        DateField::End => (
            &mut item.end_date,
            &mut item.previous_dates.end_dates,
            &mut item.end_date_counter,
        ),
    };

    let change = match *slot {
        Some(previous) if previous != new_value => {
            previous_list.push(previous);
            *counter += 1;
            Some(DateChange {
                field,
                previous,
                current: new_value,
            })
        }
        _ => None,
    };
    *slot = Some(new_value);

    if change.is_some() {
        item.date_flag = true;
    }
    change
}

fn entry(field: TrackedField, old_value: FieldValue, new_value: FieldValue, now: DateTime<Utc>) -> HistoryEntry {
    HistoryEntry {
        field,
        old_value,
        new_value,
        changed_at: now,
    }
}

fn assign_trimmed(target: &mut String, value: &Option<String>) {
    if let Some(value) = value {
        *target = value.trim().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewLineItem;
    use chrono::TimeZone;

    fn item() -> LineItem {
        LineItem::new(NewLineItem {
            site_name: "Tower A".into(),
            sno: "1".into(),
            category: "Civil".into(),
            item_description: "Brickwork".into(),
            quantity: 10.0,
            units: "sqm".into(),
            rate: 100.0,
            ..Default::default()
        })
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn quantity_change_appends_one_entry() {
        let patch = LineItemPatch {
            quantity: Some(15.0),
            ..Default::default()
        };
        let outcome = apply_update(item(), &patch, Utc::now());
        assert_eq!(outcome.history.len(), 1);
        assert_eq!(outcome.item.history.len(), 1);
        let entry = &outcome.item.history[0];
        assert_eq!(entry.field, TrackedField::Quantity);
        assert_eq!(entry.old_value, FieldValue::Number(10.0));
        assert_eq!(entry.new_value, FieldValue::Number(15.0));
        assert_eq!(outcome.item.amount, 1500.0);
    }

    #[test]
    fn unchanged_quantity_appends_nothing() {
        let patch = LineItemPatch {
            quantity: Some(10.0),
            ..Default::default()
        };
        let outcome = apply_update(item(), &patch, Utc::now());
        assert!(outcome.history.is_empty());
        assert!(outcome.item.history.is_empty());
        assert!(!outcome.is_audited());
    }

    #[test]
    fn history_follows_fixed_field_order() {
        let patch = LineItemPatch {
            material_status: Some(MaterialStatus::Completed),
            work_status_in_units: Some(5.0),
            quantity: Some(20.0),
            ..Default::default()
        };
        let outcome = apply_update(item(), &patch, Utc::now());
        let fields: Vec<_> = outcome.history.iter().map(|h| h.field).collect();
        assert_eq!(
            fields,
            vec![
                TrackedField::Quantity,
                TrackedField::WorkStatusInUnits,
                TrackedField::MaterialStatus
            ]
        );
        assert_eq!(
            outcome.history[2].old_value,
            FieldValue::Status(MaterialStatus::Pending)
        );
        assert_eq!(outcome.item.work_completion_percentage, 25.0);
        assert!(outcome.is_audited());
    }

    #[test]
    fn first_end_date_is_not_a_reschedule() {
        let patch = LineItemPatch {
            end_date: Some(day(10)),
            ..Default::default()
        };
        let outcome = apply_update(item(), &patch, Utc::now());
        assert_eq!(outcome.item.end_date, Some(day(10)));
        assert!(outcome.item.previous_dates.end_dates.is_empty());
        assert_eq!(outcome.item.end_date_counter, 0);
        assert!(!outcome.item.date_flag);
        assert!(outcome.date_changes.is_empty());
    }

    #[test]
    fn rescheduled_end_date_is_tracked() {
        let mut existing = item();
        existing.end_date = Some(day(10));
        let patch = LineItemPatch {
            end_date: Some(day(20)),
            ..Default::default()
        };
        let outcome = apply_update(existing, &patch, Utc::now());
        assert_eq!(outcome.item.end_date, Some(day(20)));
        assert_eq!(outcome.item.previous_dates.end_dates, vec![day(10)]);
        assert_eq!(outcome.item.end_date_counter, 1);
        assert_eq!(outcome.item.start_date_counter, 0);
        assert!(outcome.item.date_flag);
        assert_eq!(
            outcome.date_changes,
            vec![DateChange {
                field: DateField::End,
                previous: day(10),
                current: day(20),
            }]
        );
        assert!(outcome.history.is_empty());
        assert!(outcome.is_audited());
    }

    #[test]
    fn same_instant_in_another_offset_is_unchanged() {
        let mut existing = item();
        existing.start_date = Some(day(10));
        let patch: LineItemPatch =
            serde_json::from_str(r#"{"startDate":"2024-05-10T05:30:00+05:30"}"#).unwrap();
        let outcome = apply_update(existing, &patch, Utc::now());
        assert_eq!(outcome.item.start_date_counter, 0);
        assert!(outcome.item.previous_dates.start_dates.is_empty());
    }

    #[test]
    fn date_flag_stays_set() {
        let mut existing = item();
        existing.start_date = Some(day(1));
        existing.date_flag = true;
        existing.start_date_counter = 3;
        let patch = LineItemPatch {
            quantity: Some(12.0),
            ..Default::default()
        };
        let outcome = apply_update(existing, &patch, Utc::now());
        assert!(outcome.item.date_flag);
        assert_eq!(outcome.item.start_date_counter, 3);
    }

    #[test]
    fn derived_and_protected_fields_are_ignored() {
        let patch: LineItemPatch = serde_json::from_str(
            r#"{"amount":1,"workCompletionPercentage":99,"dateFlag":true,"history":[],"rate":"20"}"#,
        )
        .unwrap();
        let outcome = apply_update(item(), &patch, Utc::now());
        assert_eq!(outcome.item.amount, 200.0);
        assert_eq!(outcome.item.work_completion_percentage, 0.0);
        assert!(!outcome.item.date_flag);
    }

    #[test]
    fn pass_through_and_generic_fields_are_assigned() {
        let patch: LineItemPatch = serde_json::from_str(
            r#"{"TDS":"Submitted","shopDrawing":"Approved","siteName":" Tower B ","sno":7,
                "materials":[{"materialId":"m-1","name":"Cement","quantity":3,"unit":"bag"}]}"#,
        )
        .unwrap();
        let outcome = apply_update(item(), &patch, Utc::now());
        assert_eq!(outcome.item.tds, Some(ApprovalStatus::Submitted));
        assert_eq!(outcome.item.shop_drawing, Some(ApprovalStatus::Approved));
        assert_eq!(outcome.item.samples, None);
        assert_eq!(outcome.item.site_name, "Tower B");
        assert_eq!(outcome.item.sno, "7");
        assert_eq!(outcome.item.materials.len(), 1);
        assert_eq!(outcome.item.materials[0].tds_status, ApprovalStatus::Pending);
    }
}
