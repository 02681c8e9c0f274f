use crate::models::InstallmentRecord;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct CorruptSummary {
    pub total_records: usize,
    pub records_targeted: usize,
    pub payload_char_flipped: usize,
    pub payload_truncated: usize,
    pub merchant_name_missing: usize,
    pub amount_invalid: usize,
}

impl CorruptSummary {
    pub fn new() -> Self {
        Self {
            total_records: 0,
            records_targeted: 0,
            payload_char_flipped: 0,
            payload_truncated: 0,
            merchant_name_missing: 0,
            amount_invalid: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RecordCorruption {
    FlipPayloadChar,
    TruncatePayload,
    MissingMerchantName,
    InvalidAmount,
}

pub fn corrupt_csv(
    input: &Path,
    output: &Path,
    error_rate: f64,
    seed: u64,
) -> Result<CorruptSummary, String> {
    if !(0.0..=1.0).contains(&error_rate) {
        return Err("error_rate must be 0..1".to_string());
    }

    let mut reader = csv::Reader::from_path(input).map_err(|err| err.to_string())?;
    let mut records: Vec<InstallmentRecord> = Vec::new();
    for result in reader.deserialize() {
        let record: InstallmentRecord = result.map_err(|err| err.to_string())?;
        records.push(record);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut summary = CorruptSummary::new();
    summary.total_records = records.len();

    for record in &mut records {
        if !rng.gen_bool(error_rate) {
            continue;
        }
        summary.records_targeted += 1;
        let corruption = pick_corruption(&mut rng);
        apply_corruption(record, corruption, &mut summary, &mut rng);
    }

    let mut writer = csv::Writer::from_path(output).map_err(|err| err.to_string())?;
    for record in records {
        writer.serialize(record).map_err(|err| err.to_string())?;
    }
    writer.flush().map_err(|err| err.to_string())?;

    Ok(summary)
}

fn pick_corruption<R: Rng + ?Sized>(rng: &mut R) -> RecordCorruption {
    let options = [
        RecordCorruption::FlipPayloadChar,
        RecordCorruption::TruncatePayload,
        RecordCorruption::MissingMerchantName,
        RecordCorruption::InvalidAmount,
    ];
    *options.choose(rng).unwrap_or(&RecordCorruption::FlipPayloadChar)
}

fn apply_corruption<R: Rng + ?Sized>(
    record: &mut InstallmentRecord,
    corruption: RecordCorruption,
    summary: &mut CorruptSummary,
    rng: &mut R,
) {
    match corruption {
        RecordCorruption::FlipPayloadChar => {
            if flip_payload_char(record, rng) {
                summary.payload_char_flipped += 1;
            }
        }
        RecordCorruption::TruncatePayload => {
            let chars: Vec<char> = record.pix_payload.chars().collect();
            if chars.len() > 4 {
                let cut = rng.gen_range(1..=4);
                record.pix_payload = chars[..chars.len() - cut].iter().collect();
                summary.payload_truncated += 1;
            }
        }
        RecordCorruption::MissingMerchantName => {
            record.merchant_name.clear();
            summary.merchant_name_missing += 1;
        }
        RecordCorruption::InvalidAmount => {
            record.amount = record.amount.replace('.', ",");
            if !record.amount.contains(',') {
                record.amount = "R$ 10".to_string();
            }
            summary.amount_invalid += 1;
        }
    }
}

fn flip_payload_char<R: Rng + ?Sized>(record: &mut InstallmentRecord, rng: &mut R) -> bool {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut chars: Vec<char> = record.pix_payload.chars().collect();
    if chars.is_empty() {
        return false;
    }
    let idx = rng.gen_range(0..chars.len());
    let old = chars[idx];
    let mut replacement = char::from(CHARSET[rng.gen_range(0..CHARSET.len())]);
    while replacement == old {
        replacement = char::from(CHARSET[rng.gen_range(0..CHARSET.len())]);
    }
    chars[idx] = replacement;
    record.pix_payload = chars.into_iter().collect();
    true
}
