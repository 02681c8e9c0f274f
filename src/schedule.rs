use crate::models::InstallmentRecord;
use crate::pix;
use crate::reference::{is_valid_amount, MAX_AMOUNT, MAX_INSTALLMENTS, MIN_NAME_LEN, STATUS_PENDING};
use crate::util::random_alphanum_upper;

use chrono::{Days, Months, NaiveDate};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PlanConfig {
    pub customer_name: String,
    pub customer_document: Option<String>,
    pub title: String,
    pub total_amount: f64,
    pub installments: u32,
    pub first_due_date: NaiveDate,
    pub pix_key: String,
    pub merchant_name: String,
    pub merchant_city: String,
}

pub fn build_installments(
    config: &PlanConfig,
    seed: u64,
) -> Result<Vec<InstallmentRecord>, String> {
    validate_plan(config)?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let carne_id = Uuid::new_v4().to_string();
    let installment_amount = config.total_amount / config.installments as f64;

    // Vouchers fall one day after the chosen start date, then monthly.
    let base_date = config
        .first_due_date
        .checked_add_days(Days::new(1))
        .ok_or_else(|| "first due date out of range".to_string())?;

    let customer_document = config
        .customer_document
        .clone()
        .filter(|doc| !doc.trim().is_empty());

    let mut records = Vec::with_capacity(config.installments as usize);
    for number in 1..=config.installments {
        let due_date = base_date
            .checked_add_months(Months::new(number - 1))
            .ok_or_else(|| format!("due date out of range for installment {}", number))?;
        let txid = format!("CARNE{}ID{}", number, random_alphanum_upper(&mut rng, 4));
        let payload = pix::encode_pix_payload(
            &config.pix_key,
            &config.merchant_name,
            &config.merchant_city,
            installment_amount,
            Some(&txid),
        );

        records.push(InstallmentRecord {
            carne_id: carne_id.clone(),
            customer_name: config.customer_name.trim().to_string(),
            customer_document: customer_document.clone(),
            title: config.title.trim().to_string(),
            installment_number: number,
            total_installments: config.installments,
            due_date: due_date.format("%Y-%m-%d").to_string(),
            amount: pix::format_amount(installment_amount),
            status: STATUS_PENDING.to_string(),
            payment_date: None,
            txid,
            pix_key: config.pix_key.clone(),
            merchant_name: config.merchant_name.clone(),
            merchant_city: config.merchant_city.clone(),
            pix_payload: payload,
        });
    }

    Ok(records)
}

fn validate_plan(config: &PlanConfig) -> Result<(), String> {
    if config.customer_name.trim().chars().count() < MIN_NAME_LEN {
        return Err(format!(
            "customer name must have at least {} characters",
            MIN_NAME_LEN
        ));
    }
    if config.title.trim().chars().count() < MIN_NAME_LEN {
        return Err(format!(
            "title must have at least {} characters",
            MIN_NAME_LEN
        ));
    }
    if !is_valid_amount(config.total_amount) {
        return Err(format!(
            "total amount must be greater than 0.00 and at most {:.2}",
            MAX_AMOUNT
        ));
    }
    if config.installments == 0 || config.installments > MAX_INSTALLMENTS {
        return Err(format!("installments must be 1..={}", MAX_INSTALLMENTS));
    }
    if pix::sanitize_key(&config.pix_key).is_empty() {
        return Err("pix key is empty after sanitization".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode;

    fn plan() -> PlanConfig {
        PlanConfig {
            customer_name: "Maria Souza".to_string(),
            customer_document: Some("123.456.789-00".to_string()),
            title: "Mensalidade 2026".to_string(),
            total_amount: 1200.0,
            installments: 12,
            first_due_date: NaiveDate::from_ymd_opt(2026, 1, 9).unwrap(),
            pix_key: "11999999999".to_string(),
            merchant_name: "Minha Empresa Ltda".to_string(),
            merchant_city: "São Paulo".to_string(),
        }
    }

    #[test]
    fn test_builds_one_record_per_installment() {
        let records = build_installments(&plan(), 42).unwrap();
        assert_eq!(records.len(), 12);
        for (idx, record) in records.iter().enumerate() {
            assert_eq!(record.installment_number, idx as u32 + 1);
            assert_eq!(record.total_installments, 12);
            assert_eq!(record.status, "pending");
            assert_eq!(record.amount, "100.00");
            assert_eq!(record.carne_id, records[0].carne_id);
        }
    }

    #[test]
    fn test_due_dates_advance_monthly_from_day_after_start() {
        let records = build_installments(&plan(), 42).unwrap();
        assert_eq!(records[0].due_date, "2026-01-10");
        assert_eq!(records[1].due_date, "2026-02-10");
        assert_eq!(records[11].due_date, "2026-12-10");
    }

    #[test]
    fn test_month_end_due_dates_clamp() {
        let mut config = plan();
        config.first_due_date = NaiveDate::from_ymd_opt(2026, 1, 30).unwrap();
        config.installments = 3;
        config.total_amount = 300.0;
        let records = build_installments(&config, 1).unwrap();
        assert_eq!(records[0].due_date, "2026-01-31");
        assert_eq!(records[1].due_date, "2026-02-28");
        assert_eq!(records[2].due_date, "2026-03-31");
    }

    #[test]
    fn test_txid_shape_and_payload_round_trip() {
        let records = build_installments(&plan(), 42).unwrap();
        for record in &records {
            assert!(record.txid.starts_with(&format!(
                "CARNE{}ID",
                record.installment_number
            )));
            assert!(record.txid.len() <= pix::MAX_TXID_LEN);
            let decoded = decode::decode_payload(&record.pix_payload).unwrap();
            assert_eq!(decoded.txid, record.txid);
            assert_eq!(decoded.amount, record.amount);
            assert_eq!(decoded.merchant_name, "MINHA EMPRESA LTDA");
            assert_eq!(decoded.merchant_city, "SAO PAULO");
        }
    }

    #[test]
    fn test_same_seed_same_txids() {
        let first = build_installments(&plan(), 7).unwrap();
        let second = build_installments(&plan(), 7).unwrap();
        let txids = |records: &[InstallmentRecord]| {
            records.iter().map(|r| r.txid.clone()).collect::<Vec<_>>()
        };
        assert_eq!(txids(&first), txids(&second));
    }

    #[test]
    fn test_plan_validation() {
        let mut config = plan();
        config.customer_name = "Jo".to_string();
        assert!(build_installments(&config, 1).is_err());

        let mut config = plan();
        config.title = "  x ".to_string();
        assert!(build_installments(&config, 1).is_err());

        let mut config = plan();
        config.total_amount = 0.0;
        assert!(build_installments(&config, 1).is_err());

        let mut config = plan();
        config.total_amount = 1_500_000.0;
        assert!(build_installments(&config, 1).is_err());

        let mut config = plan();
        config.installments = 61;
        assert!(build_installments(&config, 1).is_err());

        let mut config = plan();
        config.pix_key = "!!!".to_string();
        assert!(build_installments(&config, 1).is_err());
    }
}
