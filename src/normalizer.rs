//! Turning located table rows into typed [`TradeRecord`]s.

use chrono::{NaiveDate, Utc};
use tracing::debug;

use crate::bulletin::{Column, TableView};
use crate::models::TradeRecord;

/// Converts each qualifying row of the table into a [`TradeRecord`].
///
/// A row qualifies when its contract count parses to a number greater than
/// zero and the instrument name is present. Disqualified rows are dropped
/// silently; an empty result means "nothing to persist", not an error.
/// Output order matches input row order.
pub fn normalize(table: &TableView, trade_date: NaiveDate) -> Vec<TradeRecord> {
    let now = Utc::now();
    let mut records = Vec::new();

    for row in table.rows() {
        // Unparsable counts coerce to missing, which fails the filter.
        let contract_count = match table.cell(row, Column::ContractCount).as_f64() {
            Some(count) if count > 0.0 => count as i64,
            _ => continue,
        };
        if table.cell(row, Column::InstrumentName).is_empty() {
            continue;
        }

        let instrument_code = table
            .cell(row, Column::InstrumentCode)
            .as_str()
            .unwrap_or_default()
            .to_string();
        let instrument_name = table
            .cell(row, Column::InstrumentName)
            .as_str()
            .unwrap_or_default()
            .to_string();
        let delivery_basis_name = table
            .cell(row, Column::DeliveryBasis)
            .as_str()
            .unwrap_or_default()
            .to_string();

        let (oil_id, delivery_basis_id, delivery_type_id) = slice_instrument_code(&instrument_code);

        records.push(TradeRecord {
            id: None,
            instrument_code,
            instrument_name,
            oil_id,
            delivery_basis_id,
            delivery_basis_name,
            delivery_type_id,
            volume: table.cell(row, Column::Volume).as_f64().unwrap_or(0.0),
            total: table.cell(row, Column::Total).as_f64().unwrap_or(0.0),
            contract_count,
            trade_date,
            created_at: now,
            updated_at: now,
        });
    }

    debug!("Normalized {} records for {}", records.len(), trade_date);
    records
}

/// Derives (oil_id, delivery_basis_id, delivery_type_id) by fixed-offset
/// slicing: chars 0..4, 4..7, and the last char. Instrument codes are ASCII
/// in practice, but slicing is by chars so a malformed code cannot panic.
fn slice_instrument_code(code: &str) -> (String, String, String) {
    let chars: Vec<char> = code.chars().collect();
    let oil_id: String = chars.iter().take(4).collect();
    let delivery_basis_id: String = chars.iter().skip(4).take(3).collect();
    let delivery_type_id = chars.last().map(|c| c.to_string()).unwrap_or_default();
    (oil_id, delivery_basis_id, delivery_type_id)
}
