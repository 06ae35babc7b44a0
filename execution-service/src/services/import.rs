//! Spreadsheet import of line items for one site.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use service_core::error::AppError;
use std::collections::HashMap;
use std::io::Cursor;
use validator::{Validate, ValidationErrors};

use crate::models::{LineItem, MaterialStatus, NewLineItem};

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => n.to_string(),
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Sno,
    Category,
    ItemDescription,
    Quantity,
    Units,
    Rate,
    MaterialStatus,
    WorkStatusInUnits,
}

/// Lowercase, whitespace removed, `%` spelled out.
pub fn normalize_header(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .replace('%', "percent")
}

fn column_for(header: &str) -> Option<Column> {
    match header {
        "s.no" | "s.no." | "sno" => Some(Column::Sno),
        "category" => Some(Column::Category),
        "itemdescription" => Some(Column::ItemDescription),
        "quantity" => Some(Column::Quantity),
        "units" => Some(Column::Units),
        "rate" => Some(Column::Rate),
        "materialstatus" => Some(Column::MaterialStatus),
        "workstatusinunits" => Some(Column::WorkStatusInUnits),
        _ => None,
    }
}

#[derive(Debug, Default)]
pub struct ParsedSheet {
    pub items: Vec<LineItem>,
    pub errors: Vec<String>,
}

fn number(cell: Option<&Cell>, label: &str, row: usize) -> Result<f64, String> {
    match cell {
        None | Some(Cell::Empty) => Ok(0.0),
        Some(Cell::Number(n)) => Ok(*n),
        Some(Cell::Text(s)) => {
            let cleaned = s.trim().replace(',', "");
            if cleaned.is_empty() {
                return Ok(0.0);
            }
            cleaned
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| format!("Row {}: Invalid {} '{}'", row, label, s.trim()))
        }
    }
}

/// Turns sheet rows into new line items. The first row is the header; blank
/// rows are skipped and do not count towards row numbers.
pub fn parse_rows(rows: &[Vec<Cell>], site_name: &str) -> ParsedSheet {
    let mut parsed = ParsedSheet::default();
    let Some((header, body)) = rows.split_first() else {
        return parsed;
    };

    let columns: HashMap<Column, usize> = header
        .iter()
        .enumerate()
        .filter_map(|(idx, cell)| column_for(&normalize_header(&cell.text())).map(|c| (c, idx)))
        .collect();

    let mut row_number = 0;
    for row in body {
        if row.iter().all(Cell::is_blank) {
            continue;
        }
        row_number += 1;

        let get = |column: Column| columns.get(&column).and_then(|&idx| row.get(idx));
        let text = |column: Column| get(column).map(Cell::text).unwrap_or_default();

        let category = text(Column::Category);
        let item_description = text(Column::ItemDescription);
        if category.is_empty() || item_description.is_empty() {
            parsed
                .errors
                .push(format!("Row {}: Missing required fields", row_number));
            continue;
        }

        let numbers = (
            number(get(Column::Quantity), "quantity", row_number),
            number(get(Column::Rate), "rate", row_number),
            number(get(Column::WorkStatusInUnits), "work status", row_number),
        );
        let (quantity, rate, work_status_in_units) = match numbers {
            (Ok(q), Ok(r), Ok(w)) => (q, r, w),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                parsed.errors.push(e);
                continue;
            }
        };

        let status_text = text(Column::MaterialStatus);
        let material_status = if status_text.is_empty() {
            MaterialStatus::Pending
        } else {
            match status_text.parse::<MaterialStatus>() {
                Ok(status) => status,
                Err(_) => {
                    parsed.errors.push(format!(
                        "Row {}: Invalid material status '{}'",
                        row_number, status_text
                    ));
                    continue;
                }
            }
        };

        let sno = Some(text(Column::Sno))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| row_number.to_string());

        let item = LineItem::new(NewLineItem {
            site_name: site_name.to_string(),
            sno,
            project_name: Some(site_name.to_string()),
            category,
            item_description,
            quantity,
            units: text(Column::Units),
            rate,
            material_status,
            work_status_in_units,
            ..Default::default()
        });
        match item.validate() {
            Ok(()) => parsed.items.push(item),
            Err(e) => parsed
                .errors
                .push(format!("Row {}: {}", row_number, validation_summary(&e))),
        }
    }

    parsed
}

fn validation_summary(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid {}", field))
            })
        })
        .collect();
    messages.sort();
    messages.join(", ")
}

/// Reads the first worksheet of an `.xlsx`/`.xls` workbook.
pub fn read_first_sheet(bytes: Vec<u8>) -> Result<Vec<Vec<Cell>>, AppError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| AppError::bad_request(format!("Unable to read spreadsheet: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::bad_request("Spreadsheet has no worksheets"))?
        .map_err(|e| AppError::bad_request(format!("Unable to read worksheet: {}", e)))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(Cell::from).collect())
        .collect())
}

pub fn is_spreadsheet(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    lower.ends_with(".xlsx") || lower.ends_with(".xls")
}
