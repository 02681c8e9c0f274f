use crate::pix;

#[derive(Debug, Clone)]
pub struct TlvField {
    pub id: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPix {
    pub key: String,
    pub merchant_name: String,
    pub merchant_city: String,
    pub amount: String,
    pub txid: String,
    pub currency: String,
    pub country: String,
}

pub fn parse_fields(data: &str) -> Result<Vec<TlvField>, String> {
    let mut fields = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        let id = rest
            .get(0..2)
            .ok_or_else(|| "truncated field id".to_string())?;
        if !id.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(format!("invalid field id: {}", id));
        }
        let len_digits = rest
            .get(2..4)
            .ok_or_else(|| format!("truncated length for field {}", id))?;
        if !len_digits.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(format!("invalid length for field {}: {}", id, len_digits));
        }
        let len: usize = len_digits.parse().map_err(|_| "unreadable field length".to_string())?;
        let value = rest
            .get(4..4 + len)
            .ok_or_else(|| format!("field {} value runs past end of payload", id))?;
        fields.push(TlvField {
            id: id.to_string(),
            value: value.to_string(),
        });
        rest = &rest[4 + len..];
    }
    Ok(fields)
}

pub fn verify_crc(payload: &str) -> Result<(), String> {
    if !payload.is_ascii() {
        return Err("payload contains non-ASCII characters".to_string());
    }
    if payload.len() < 8 {
        return Err("payload too short to carry a checksum".to_string());
    }
    let (body, tail) = payload.split_at(payload.len() - 4);
    if !body.ends_with("6304") {
        return Err("payload does not end with a checksum field".to_string());
    }
    let expected = pix::crc16(body);
    if expected != tail {
        return Err(format!(
            "checksum mismatch: payload carries {}, recomputed {}",
            tail, expected
        ));
    }
    Ok(())
}

pub fn decode_payload(payload: &str) -> Result<DecodedPix, String> {
    verify_crc(payload)?;
    let fields = parse_fields(payload)?;

    match fields.first() {
        Some(field) if field.id == "00" && field.value == "01" => {}
        Some(field) if field.id == "00" => {
            return Err(format!("unsupported payload format: {}", field.value));
        }
        _ => return Err("payload does not start with a format indicator".to_string()),
    }

    let mut decoded = DecodedPix {
        key: String::new(),
        merchant_name: String::new(),
        merchant_city: String::new(),
        amount: String::new(),
        txid: String::new(),
        currency: String::new(),
        country: String::new(),
    };

    for field in &fields {
        match field.id.as_str() {
            "26" => {
                for inner in parse_fields(&field.value)? {
                    match inner.id.as_str() {
                        "00" => {
                            if inner.value != pix::PIX_GUI {
                                return Err(format!(
                                    "unexpected merchant account domain: {}",
                                    inner.value
                                ));
                            }
                        }
                        "01" => decoded.key = inner.value,
                        _ => {}
                    }
                }
            }
            "53" => decoded.currency = field.value.clone(),
            "54" => decoded.amount = field.value.clone(),
            "58" => decoded.country = field.value.clone(),
            "59" => decoded.merchant_name = field.value.clone(),
            "60" => decoded.merchant_city = field.value.clone(),
            "62" => {
                for inner in parse_fields(&field.value)? {
                    if inner.id == "05" {
                        decoded.txid = inner.value;
                    }
                }
            }
            _ => {}
        }
    }

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pix::encode_pix_payload;

    #[test]
    fn test_round_trip_recovers_sanitized_fields() {
        let payload = encode_pix_payload(
            "11999999999",
            "João da Silva",
            "São Paulo",
            150.00,
            Some("TX01"),
        );
        let decoded = decode_payload(&payload).expect("payload should decode");
        assert_eq!(decoded.key, "11999999999");
        assert_eq!(decoded.merchant_name, "JOAO DA SILVA");
        assert_eq!(decoded.merchant_city, "SAO PAULO");
        assert_eq!(decoded.amount, "150.00");
        assert_eq!(decoded.txid, "TX01");
        assert_eq!(decoded.currency, "986");
        assert_eq!(decoded.country, "BR");
    }

    #[test]
    fn test_parse_fields_walks_tag_dictionary() {
        let fields = parse_fields("000201530398662080504TX01").expect("should parse");
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].id, "00");
        assert_eq!(fields[0].value, "01");
        assert_eq!(fields[1].id, "53");
        assert_eq!(fields[1].value, "986");
        assert_eq!(fields[2].id, "62");
        assert_eq!(fields[2].value, "0504TX01");
    }

    #[test]
    fn test_tampered_payload_fails_verification() {
        let payload = encode_pix_payload("chave", "Loja", "Recife", 10.0, None);
        let mut chars: Vec<char> = payload.chars().collect();
        let idx = chars.len() / 2;
        chars[idx] = if chars[idx] == '9' { '8' } else { '9' };
        let tampered: String = chars.into_iter().collect();
        assert!(verify_crc(&tampered).is_err());
    }

    #[test]
    fn test_truncated_payload_fails_parse() {
        assert!(parse_fields("0002").is_err());
        assert!(parse_fields("000299").is_err());
        assert!(parse_fields("00").is_err());
    }

    #[test]
    fn test_non_numeric_length_rejected() {
        assert!(parse_fields("00xz01").is_err());
    }

    #[test]
    fn test_short_or_headerless_payload_rejected() {
        assert!(verify_crc("6304").is_err());
        assert!(verify_crc("0002011234ABCD").is_err());
    }

    #[test]
    fn test_foreign_account_domain_rejected() {
        // well-formed TLV with a non-PIX merchant account group
        let account = crate::pix::emv_field("00", "com.example.pay");
        let mut body = String::from("000201");
        body.push_str(&crate::pix::emv_field("26", &account));
        body.push_str("6304");
        let checksum = crate::pix::crc16(&body);
        let payload = format!("{}{}", body, checksum);
        assert!(decode_payload(&payload).is_err());
    }
}
