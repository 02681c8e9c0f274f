use crate::models::InstallmentRecord;
use crate::reference::STATUS_PAID;
use crate::util::parse_due_date;

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct FinancialReport {
    pub as_of: NaiveDate,
    pub total_installments: usize,
    pub total_amount: f64,
    pub paid_count: usize,
    pub paid_amount: f64,
    pub open_count: usize,
    pub open_amount: f64,
    pub overdue_count: usize,
    pub overdue_amount: f64,
    pub collection_rate: f64,
    pub monthly_flow: Vec<MonthlyFlow>,
}

#[derive(Debug, Clone)]
pub struct MonthlyFlow {
    pub month: String,
    pub total: f64,
    pub paid: f64,
    pub overdue: f64,
}

pub fn analyze_financials_csv(path: &Path, as_of: NaiveDate) -> Result<FinancialReport, String> {
    let mut reader = csv::Reader::from_path(path).map_err(|err| err.to_string())?;
    let mut records = Vec::new();
    for result in reader.deserialize() {
        let record: InstallmentRecord = result.map_err(|err| err.to_string())?;
        records.push(record);
    }
    analyze_financial_records(&records, as_of)
}

pub fn analyze_financial_records(
    records: &[InstallmentRecord],
    as_of: NaiveDate,
) -> Result<FinancialReport, String> {
    let mut report = FinancialReport {
        as_of,
        total_installments: 0,
        total_amount: 0.0,
        paid_count: 0,
        paid_amount: 0.0,
        open_count: 0,
        open_amount: 0.0,
        overdue_count: 0,
        overdue_amount: 0.0,
        collection_rate: 0.0,
        monthly_flow: Vec::new(),
    };
    let mut months: BTreeMap<String, MonthlyFlow> = BTreeMap::new();

    for record in records {
        let amount = record
            .amount
            .parse::<f64>()
            .map_err(|_| format!("unreadable amount for txid {}: {}", record.txid, record.amount))?;
        let due_date = parse_due_date(&record.due_date)?;
        let paid = record.status == STATUS_PAID;
        // Overdue is recomputed from the due date; a stored "overdue"
        // status on a future installment does not count.
        let overdue = !paid && due_date < as_of;

        report.total_installments += 1;
        report.total_amount += amount;

        let month_key = due_date.format("%Y-%m").to_string();
        let flow = months.entry(month_key.clone()).or_insert(MonthlyFlow {
            month: month_key,
            total: 0.0,
            paid: 0.0,
            overdue: 0.0,
        });
        flow.total += amount;

        if paid {
            report.paid_count += 1;
            report.paid_amount += amount;
            flow.paid += amount;
        } else if overdue {
            report.overdue_count += 1;
            report.overdue_amount += amount;
            flow.overdue += amount;
        } else {
            report.open_count += 1;
            report.open_amount += amount;
        }
    }

    if report.total_amount > 0.0 {
        report.collection_rate = report.paid_amount / report.total_amount * 100.0;
    }
    report.monthly_flow = months.into_values().collect();
    Ok(report)
}
