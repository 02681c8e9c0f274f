use crate::decode;
use crate::models::InstallmentRecord;
use crate::pix;
use crate::reference::{is_known_status, is_valid_amount, key_kind, STATUS_PAID};
use crate::util::parse_due_date;

use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct PreflightIssue {
    pub level: IssueLevel,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct PreflightReport {
    pub total_records: usize,
    pub total_carnes: usize,
    pub issues: Vec<PreflightIssue>,
}

impl PreflightReport {
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.level == IssueLevel::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.level == IssueLevel::Warning)
            .count()
    }
}

pub fn preflight_csv(path: &Path) -> Result<PreflightReport, String> {
    let mut reader = csv::Reader::from_path(path).map_err(|err| err.to_string())?;
    let mut issues = Vec::new();
    let mut seen: HashSet<(String, u32)> = HashSet::new();
    let mut carnes: HashSet<String> = HashSet::new();
    let mut total_records = 0usize;

    for result in reader.deserialize() {
        let record: InstallmentRecord = result.map_err(|err| err.to_string())?;
        total_records += 1;
        validate_record(&record, &mut issues);

        carnes.insert(record.carne_id.clone());
        if !seen.insert((record.carne_id.clone(), record.installment_number)) {
            issues.push(issue(
                IssueLevel::Error,
                "duplicate installment number within carne",
            ));
        }
    }

    Ok(PreflightReport {
        total_records,
        total_carnes: carnes.len(),
        issues,
    })
}

pub fn validate_record(record: &InstallmentRecord, issues: &mut Vec<PreflightIssue>) {
    if record.carne_id.trim().is_empty() {
        issues.push(issue(IssueLevel::Error, "carne_id is required"));
    }
    if record.customer_name.trim().is_empty() {
        issues.push(issue(IssueLevel::Error, "customer_name is required"));
    }
    if record.title.trim().is_empty() {
        issues.push(issue(IssueLevel::Error, "title is required"));
    }
    if record.installment_number == 0 {
        issues.push(issue(IssueLevel::Error, "installment_number starts at 1"));
    } else if record.installment_number > record.total_installments {
        issues.push(issue(
            IssueLevel::Error,
            "installment_number exceeds total_installments",
        ));
    }
    if !is_two_decimal_amount(&record.amount) {
        issues.push(issue(
            IssueLevel::Error,
            "amount must be a decimal with two digits",
        ));
    } else if !record
        .amount
        .parse::<f64>()
        .map(is_valid_amount)
        .unwrap_or(false)
    {
        issues.push(issue(IssueLevel::Error, "amount outside accepted range"));
    }
    if parse_due_date(&record.due_date).is_err() {
        issues.push(issue(IssueLevel::Error, "due_date must be YYYY-MM-DD"));
    }
    if !is_known_status(&record.status) {
        issues.push(issue(
            IssueLevel::Error,
            "status must be pending/paid/overdue",
        ));
    } else if record.status == STATUS_PAID && record.payment_date.is_none() {
        issues.push(issue(
            IssueLevel::Warning,
            "paid installment has no payment_date",
        ));
    } else if record.status != STATUS_PAID && record.payment_date.is_some() {
        issues.push(issue(
            IssueLevel::Warning,
            "payment_date set on unpaid installment",
        ));
    }
    if record.txid.trim().is_empty() {
        issues.push(issue(IssueLevel::Error, "txid is required"));
    } else if pix::sanitize_txid(&record.txid) != record.txid {
        issues.push(issue(
            IssueLevel::Warning,
            "txid is altered by payload sanitization",
        ));
    }
    if pix::sanitize_key(&record.pix_key).is_empty() {
        issues.push(issue(
            IssueLevel::Error,
            "pix_key is empty after sanitization",
        ));
    } else if key_kind(&record.pix_key).is_none() {
        issues.push(issue(
            IssueLevel::Warning,
            "pix_key does not match a known key shape",
        ));
    }

    for problem in payload_issues(record) {
        issues.push(PreflightIssue {
            level: IssueLevel::Error,
            message: problem,
        });
    }
}

// Also used by the correct pass to decide which payloads to re-encode.
pub fn payload_issues(record: &InstallmentRecord) -> Vec<String> {
    let mut problems = Vec::new();
    if record.pix_payload.trim().is_empty() {
        problems.push("pix_payload is missing".to_string());
        return problems;
    }
    let decoded = match decode::decode_payload(&record.pix_payload) {
        Ok(decoded) => decoded,
        Err(err) => {
            problems.push(format!("pix_payload does not verify: {}", err));
            return problems;
        }
    };

    if decoded.amount != record.amount {
        problems.push(format!(
            "payload amount {} does not match record amount {}",
            decoded.amount, record.amount
        ));
    }
    if decoded.key != pix::sanitize_key(&record.pix_key) {
        problems.push("payload key does not match record pix_key".to_string());
    }
    if decoded.merchant_name != pix::sanitize_text(&record.merchant_name, pix::MAX_MERCHANT_NAME_LEN)
    {
        problems.push("payload merchant name does not match record".to_string());
    }
    if decoded.merchant_city != pix::sanitize_text(&record.merchant_city, pix::MAX_MERCHANT_CITY_LEN)
    {
        problems.push("payload merchant city does not match record".to_string());
    }
    if decoded.txid != pix::sanitize_txid(&record.txid) {
        problems.push("payload txid does not match record".to_string());
    }
    if decoded.currency != "986" {
        problems.push(format!("payload currency is {}, expected 986", decoded.currency));
    }
    if decoded.country != "BR" {
        problems.push(format!("payload country is {}, expected BR", decoded.country));
    }
    problems
}

fn issue(level: IssueLevel, message: &str) -> PreflightIssue {
    PreflightIssue {
        level,
        message: message.to_string(),
    }
}

fn is_two_decimal_amount(amount: &str) -> bool {
    let mut parts = amount.split('.');
    let whole = match parts.next() {
        Some(part) if !part.is_empty() => part,
        _ => return false,
    };
    let frac = match parts.next() {
        Some(part) if part.len() == 2 => part,
        _ => return false,
    };
    if parts.next().is_some() {
        return false;
    }
    whole.chars().all(|ch| ch.is_ascii_digit()) && frac.chars().all(|ch| ch.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_record() -> InstallmentRecord {
        let payload =
            pix::encode_pix_payload("11999999999", "Loja", "Recife", 100.0, Some("CARNE1IDAAAA"));
        InstallmentRecord {
            carne_id: "c1".to_string(),
            customer_name: "Maria Souza".to_string(),
            customer_document: None,
            title: "Mensalidade".to_string(),
            installment_number: 1,
            total_installments: 12,
            due_date: "2026-02-10".to_string(),
            amount: "100.00".to_string(),
            status: "pending".to_string(),
            payment_date: None,
            txid: "CARNE1IDAAAA".to_string(),
            pix_key: "11999999999".to_string(),
            merchant_name: "Loja".to_string(),
            merchant_city: "Recife".to_string(),
            pix_payload: payload,
        }
    }

    #[test]
    fn test_valid_record_has_no_issues() {
        let mut issues = Vec::new();
        validate_record(&valid_record(), &mut issues);
        assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
    }

    #[test]
    fn test_corrupted_payload_is_an_error() {
        let mut record = valid_record();
        record.pix_payload.replace_range(10..11, "X");
        let mut issues = Vec::new();
        validate_record(&record, &mut issues);
        assert!(issues
            .iter()
            .any(|issue| issue.level == IssueLevel::Error
                && issue.message.contains("does not verify")));
    }

    #[test]
    fn test_amount_mismatch_detected() {
        let mut record = valid_record();
        record.amount = "999.00".to_string();
        let problems = payload_issues(&record);
        assert!(problems.iter().any(|p| p.contains("payload amount")));
    }

    #[test]
    fn test_field_level_issues() {
        let mut record = valid_record();
        record.status = "cancelled".to_string();
        record.amount = "12,50".to_string();
        record.due_date = "10/02/2026".to_string();
        record.installment_number = 13;
        let mut issues = Vec::new();
        validate_record(&record, &mut issues);
        let errors: Vec<&str> = issues
            .iter()
            .filter(|issue| issue.level == IssueLevel::Error)
            .map(|issue| issue.message.as_str())
            .collect();
        assert!(errors.contains(&"status must be pending/paid/overdue"));
        assert!(errors.contains(&"amount must be a decimal with two digits"));
        assert!(errors.contains(&"due_date must be YYYY-MM-DD"));
        assert!(errors.contains(&"installment_number exceeds total_installments"));
    }

    #[test]
    fn test_paid_without_payment_date_is_a_warning() {
        let mut record = valid_record();
        record.status = "paid".to_string();
        let mut issues = Vec::new();
        validate_record(&record, &mut issues);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].level, IssueLevel::Warning);
    }

    #[test]
    fn test_unknown_key_shape_is_a_warning() {
        let mut record = valid_record();
        record.pix_key = "just some words".to_string();
        let mut issues = Vec::new();
        validate_record(&record, &mut issues);
        assert!(issues
            .iter()
            .any(|issue| issue.level == IssueLevel::Warning
                && issue.message.contains("key shape")));
    }

    #[test]
    fn test_two_decimal_amount_format() {
        assert!(is_two_decimal_amount("0.01"));
        assert!(is_two_decimal_amount("100.00"));
        assert!(!is_two_decimal_amount("100"));
        assert!(!is_two_decimal_amount("100.0"));
        assert!(!is_two_decimal_amount("100.000"));
        assert!(!is_two_decimal_amount(".50"));
        assert!(!is_two_decimal_amount("1a.00"));
        assert!(!is_two_decimal_amount("12,50"));
    }
}
