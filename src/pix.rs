use unicode_normalization::UnicodeNormalization;

pub const PIX_GUI: &str = "br.gov.bcb.pix";
pub const DEFAULT_TXID: &str = "CPX";
pub const TXID_PLACEHOLDER: &str = "***";

pub const MAX_MERCHANT_NAME_LEN: usize = 25;
pub const MAX_MERCHANT_CITY_LEN: usize = 15;
pub const MAX_TXID_LEN: usize = 25;

pub fn encode_pix_payload(
    key: &str,
    merchant_name: &str,
    merchant_city: &str,
    amount: f64,
    txid: Option<&str>,
) -> String {
    let clean_key = sanitize_key(key);
    let clean_name = sanitize_text(merchant_name, MAX_MERCHANT_NAME_LEN);
    let clean_city = sanitize_text(merchant_city, MAX_MERCHANT_CITY_LEN);
    let clean_txid = sanitize_txid(txid.unwrap_or(DEFAULT_TXID));
    let amount_str = format_amount(amount);

    let merchant_account = format!(
        "{}{}",
        emv_field("00", PIX_GUI),
        emv_field("01", &clean_key)
    );

    let mut payload = String::with_capacity(128);
    payload.push_str(&emv_field("00", "01")); // payload format indicator
    payload.push_str(&emv_field("26", &merchant_account)); // merchant account information
    payload.push_str(&emv_field("52", "0000")); // merchant category code
    payload.push_str(&emv_field("53", "986")); // transaction currency (BRL)
    payload.push_str(&emv_field("54", &amount_str));
    payload.push_str(&emv_field("58", "BR"));
    payload.push_str(&emv_field("59", &clean_name));
    payload.push_str(&emv_field("60", &clean_city));
    payload.push_str(&emv_field("62", &emv_field("05", &clean_txid))); // additional data (txid)
    payload.push_str("6304");

    let checksum = crc16(&payload);
    payload.push_str(&checksum);
    payload
}

pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '@' | '.' | '-'))
        .collect()
}

pub fn sanitize_text(input: &str, max_len: usize) -> String {
    input
        .nfd()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == ' ')
        .map(|ch| ch.to_ascii_uppercase())
        .take(max_len)
        .collect()
}

pub fn sanitize_txid(txid: &str) -> String {
    let clean: String = txid
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .take(MAX_TXID_LEN)
        .collect();
    if clean.is_empty() {
        TXID_PLACEHOLDER.to_string()
    } else {
        clean
    }
}

pub fn format_amount(value: f64) -> String {
    format!("{:.2}", value)
}

// Sanitized values stay under 100 characters, so the two-digit length
// header never overflows.
pub fn emv_field(id: &str, value: &str) -> String {
    format!("{}{:02}{}", id, value.chars().count(), value)
}

// CRC-16/CCITT-FALSE over one code unit per character. The payload is
// ASCII after sanitization; inputs must not be UTF-8-expanded first.
pub fn crc16(data: &str) -> String {
    let mut crc: u16 = 0xFFFF;
    for ch in data.chars() {
        crc ^= (ch as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    format!("{:04X}", crc)
}
