use chrono::NaiveDate;
use rand::Rng;

pub fn random_alphanum_upper<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut out = String::with_capacity(len);
    for _ in 0..len {
        let idx = rng.gen_range(0..CHARSET.len());
        out.push(char::from(CHARSET[idx]));
    }
    out
}

// Accepts bare dates and RFC3339-ish timestamps; only the date part is used.
pub fn parse_due_date(value: &str) -> Result<NaiveDate, String> {
    let date_part = value.split('T').next().unwrap_or(value);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|err| format!("invalid date {}: {}", value, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_random_alphanum_upper_charset() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let out = random_alphanum_upper(&mut rng, 32);
        assert_eq!(out.len(), 32);
        assert!(out
            .chars()
            .all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit()));
    }

    #[test]
    fn test_parse_due_date_accepts_both_forms() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        assert_eq!(parse_due_date("2026-03-10").unwrap(), expected);
        assert_eq!(parse_due_date("2026-03-10T12:00:00Z").unwrap(), expected);
        assert!(parse_due_date("10/03/2026").is_err());
        assert!(parse_due_date("").is_err());
    }
}
