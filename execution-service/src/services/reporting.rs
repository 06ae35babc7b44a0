//! Dashboard figures computed over loaded line items.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{LineItem, MaterialStatus};
use crate::services::derived::round2;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_project_value: f64,
    pub total_work_completion_percentage: f64,
    pub total_work_completion_amount: f64,
    pub item_count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteSummary {
    pub site_name: String,
    #[serde(flatten)]
    pub summary: Summary,
}

pub fn summarize<'a, I>(items: I) -> Summary
where
    I: IntoIterator<Item = &'a LineItem>,
{
    let mut total_value = 0.0;
    let mut total_done = 0.0;
    let mut count = 0;
    for item in items {
        total_value += item.amount;
        total_done += item.work_completion_amount;
        count += 1;
    }

    let percentage = if total_value > 0.0 {
        round2(total_done / total_value * 100.0)
    } else {
        0.0
    };

    Summary {
        total_project_value: round2(total_value),
        total_work_completion_percentage: percentage,
        total_work_completion_amount: round2(total_done),
        item_count: count,
    }
}

pub fn summarize_by_site(items: &[LineItem]) -> Vec<SiteSummary> {
    let mut by_site: BTreeMap<&str, Vec<&LineItem>> = BTreeMap::new();
    for item in items {
        by_site.entry(item.site_name.as_str()).or_default().push(item);
    }

    by_site
        .into_iter()
        .map(|(site, site_items)| SiteSummary {
            site_name: site.to_string(),
            summary: summarize(site_items),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DelayedItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub site_name: String,
    pub sno: String,
    pub item_description: String,
    pub material_status: MaterialStatus,
    pub end_date: DateTime<Utc>,
    pub delay_days: i64,
    pub amount: f64,
    pub work_completion_percentage: f64,
    pub work_completion_amount: f64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAlert {
    pub count: usize,
    pub total_amount: f64,
    pub total_delay_days: i64,
    pub items: Vec<DelayedItem>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionAlert {
    pub count: usize,
    pub total_amount: f64,
    pub total_remaining_amount: f64,
    pub average_completion_percentage: f64,
    pub total_delay_days: i64,
    pub items: Vec<DelayedItem>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertCards {
    pub material_not_delivered: DeliveryAlert,
    pub execution_delayed: ExecutionAlert,
}

/// Whole days between `end_date` and the start of today, rounded up.
fn delay_days(end_date: DateTime<Utc>, today_start: DateTime<Utc>) -> i64 {
    let seconds = (today_start - end_date).num_seconds() as f64;
    ((seconds / SECONDS_PER_DAY).ceil() as i64).max(0)
}

fn delayed(item: &LineItem, end_date: DateTime<Utc>, today_start: DateTime<Utc>) -> DelayedItem {
    DelayedItem {
        id: item.id.clone(),
        site_name: item.site_name.clone(),
        sno: item.sno.clone(),
        item_description: item.item_description.clone(),
        material_status: item.material_status,
        end_date,
        delay_days: delay_days(end_date, today_start),
        amount: item.amount,
        work_completion_percentage: item.work_completion_percentage,
        work_completion_amount: item.work_completion_amount,
    }
}

/// Overdue items: those whose end date falls before `today_start`.
pub fn alert_cards(items: &[LineItem], today_start: DateTime<Utc>) -> AlertCards {
    let mut cards = AlertCards::default();
    let mut completion_sum = 0.0;

    for item in items {
        let Some(end_date) = item.end_date.filter(|end| *end < today_start) else {
            continue;
        };

        match item.material_status {
            MaterialStatus::NotDelivered => {
                let entry = delayed(item, end_date, today_start);
                let bucket = &mut cards.material_not_delivered;
                bucket.count += 1;
                bucket.total_amount += item.amount;
                bucket.total_delay_days += entry.delay_days;
                bucket.items.push(entry);
            }
            MaterialStatus::Delivered if item.work_completion_percentage < 100.0 => {
                let entry = delayed(item, end_date, today_start);
                let bucket = &mut cards.execution_delayed;
                bucket.count += 1;
                bucket.total_amount += item.amount;
                bucket.total_remaining_amount += item.amount - item.work_completion_amount;
                bucket.total_delay_days += entry.delay_days;
                completion_sum += item.work_completion_percentage;
                bucket.items.push(entry);
            }
            _ => {}
        }
    }

    let delivery = &mut cards.material_not_delivered;
    delivery.total_amount = round2(delivery.total_amount);

    let execution = &mut cards.execution_delayed;
    execution.total_amount = round2(execution.total_amount);
    execution.total_remaining_amount = round2(execution.total_remaining_amount);
    if execution.count > 0 {
        execution.average_completion_percentage = round2(completion_sum / execution.count as f64);
    }

    cards
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsedMaterial {
    pub material_id: String,
    pub name: String,
    pub unit: String,
    pub line_item_count: usize,
}

/// Materials referenced by the given items, in first-seen order. Entries are
/// keyed by material id; the first occurrence supplies name and unit.
pub fn unique_materials(items: &[LineItem]) -> Vec<UsedMaterial> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut used: Vec<UsedMaterial> = Vec::new();

    for item in items {
        let mut seen_here: HashSet<&str> = HashSet::new();
        for material in &item.materials {
            let id = material.material_id.as_str();
            if !seen_here.insert(id) {
                continue;
            }
            match index.get(id) {
                Some(&pos) => used[pos].line_item_count += 1,
                None => {
                    index.insert(id, used.len());
                    used.push(UsedMaterial {
                        material_id: material.material_id.clone(),
                        name: material.name.clone(),
                        unit: material.unit.clone(),
                        line_item_count: 1,
                    });
                }
            }
        }
    }

    used
}
