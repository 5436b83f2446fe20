use once_cell::sync::Lazy;
use regex::Regex;

static SERIAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Z]{4})-?(\d{5})$").expect("valid regex"));

/// Identifier type used when a record is keyed by its title.
pub const NAME_ID_TYPE: &str = "name";

/// How a source spells its game identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdConvention {
    /// Fixed-width hex title id, e.g. 3DS `0004000000055D00` or Xbox 360 `4D5307E6`
    HexTitleId { digits: usize, uppercase: bool },
    /// Disc serials such as `SLUS-20312` / `BLUS30443`
    Serial { dashed: bool },
    /// Fixed-width alphanumeric product code, e.g. Dolphin `GZLE01`
    ProductCode { len: usize },
    Verbatim,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdForm {
    Canonical(String),
    /// Did not fit the convention; kept as given (trimmed)
    Preserved(String),
}

impl IdConvention {
    pub fn normalize(&self, raw: &str) -> IdForm {
        let trimmed = raw.trim();
        match self {
            IdConvention::Verbatim => IdForm::Canonical(trimmed.to_string()),
            IdConvention::HexTitleId { digits, uppercase } => {
                let body = trimmed
                    .strip_prefix("0x")
                    .or_else(|| trimmed.strip_prefix("0X"))
                    .unwrap_or(trimmed);
                if body.len() == *digits && body.chars().all(|c| c.is_ascii_hexdigit()) {
                    let cased = if *uppercase {
                        body.to_ascii_uppercase()
                    } else {
                        body.to_ascii_lowercase()
                    };
                    IdForm::Canonical(cased)
                } else {
                    IdForm::Preserved(trimmed.to_string())
                }
            }
            IdConvention::Serial { dashed } => {
                let compact: String = trimmed
                    .to_ascii_uppercase()
                    .replace('_', "-")
                    .chars()
                    .filter(|c| !c.is_whitespace() && *c != '.')
                    .collect();
                match SERIAL.captures(&compact) {
                    Some(caps) if *dashed => IdForm::Canonical(format!("{}-{}", &caps[1], &caps[2])),
                    Some(caps) => IdForm::Canonical(format!("{}{}", &caps[1], &caps[2])),
                    None => IdForm::Preserved(trimmed.to_string()),
                }
            }
            IdConvention::ProductCode { len } => {
                let upper = trimmed.to_ascii_uppercase();
                if upper.len() == *len && upper.chars().all(|c| c.is_ascii_alphanumeric()) {
                    IdForm::Canonical(upper)
                } else {
                    IdForm::Preserved(trimmed.to_string())
                }
            }
        }
    }
}
