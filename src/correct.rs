use crate::decode;
use crate::models::InstallmentRecord;
use crate::pix;
use crate::preflight::payload_issues;
use crate::reference::{is_known_status, is_valid_amount, STATUS_PENDING};

use std::path::Path;

#[derive(Debug, Clone)]
pub struct CorrectSummary {
    pub total_records: usize,
    pub corrected_records: usize,
    pub amount_fixed: usize,
    pub status_fixed: usize,
    pub merchant_name_restored: usize,
    pub payload_reencoded: usize,
}

impl CorrectSummary {
    fn new() -> Self {
        Self {
            total_records: 0,
            corrected_records: 0,
            amount_fixed: 0,
            status_fixed: 0,
            merchant_name_restored: 0,
            payload_reencoded: 0,
        }
    }
}

pub fn correct_csv(input: &Path, output: &Path) -> Result<CorrectSummary, String> {
    let mut reader = csv::Reader::from_path(input).map_err(|err| err.to_string())?;
    let mut records: Vec<InstallmentRecord> = Vec::new();
    for result in reader.deserialize() {
        let record: InstallmentRecord = result.map_err(|err| err.to_string())?;
        records.push(record);
    }

    let mut summary = CorrectSummary::new();
    for record in &mut records {
        summary.total_records += 1;
        if correct_record(record, &mut summary)? {
            summary.corrected_records += 1;
        }
    }

    let mut writer = csv::Writer::from_path(output).map_err(|err| err.to_string())?;
    for record in records {
        writer.serialize(record).map_err(|err| err.to_string())?;
    }
    writer.flush().map_err(|err| err.to_string())?;

    Ok(summary)
}

fn correct_record(
    record: &mut InstallmentRecord,
    summary: &mut CorrectSummary,
) -> Result<bool, String> {
    let mut corrected = false;

    let amount_value = match recover_amount(record) {
        Some((value, canonical)) => {
            if canonical != record.amount {
                record.amount = canonical;
                summary.amount_fixed += 1;
                corrected = true;
            }
            value
        }
        None => {
            return Err(format!(
                "carne {} installment {}: amount cannot be recovered",
                record.carne_id, record.installment_number
            ))
        }
    };

    if !is_known_status(&record.status) {
        record.status = STATUS_PENDING.to_string();
        summary.status_fixed += 1;
        corrected = true;
    }

    if record.merchant_name.trim().is_empty() {
        if let Ok(decoded) = decode::decode_payload(&record.pix_payload) {
            if !decoded.merchant_name.is_empty() {
                record.merchant_name = decoded.merchant_name;
                summary.merchant_name_restored += 1;
                corrected = true;
            }
        }
    }

    if !payload_issues(record).is_empty() {
        record.pix_payload = pix::encode_pix_payload(
            &record.pix_key,
            &record.merchant_name,
            &record.merchant_city,
            amount_value,
            Some(&record.txid),
        );
        summary.payload_reencoded += 1;
        corrected = true;
    }

    Ok(corrected)
}

// The record column wins; a payload amount is only trusted when the
// column is unreadable.
fn recover_amount(record: &InstallmentRecord) -> Option<(f64, String)> {
    if let Ok(value) = record.amount.parse::<f64>() {
        if is_valid_amount(value) {
            return Some((value, pix::format_amount(value)));
        }
    }
    let normalized = record.amount.trim().replace(',', ".");
    if let Ok(value) = normalized.parse::<f64>() {
        if is_valid_amount(value) {
            return Some((value, pix::format_amount(value)));
        }
    }
    if let Ok(decoded) = decode::decode_payload(&record.pix_payload) {
        if let Ok(value) = decoded.amount.parse::<f64>() {
            if is_valid_amount(value) {
                return Some((value, pix::format_amount(value)));
            }
        }
    }
    None
}
