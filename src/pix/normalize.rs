pub const MERCHANT_NAME_MAX: usize = 25;
pub const MERCHANT_CITY_MAX: usize = 15;
pub const REFERENCE_MAX: usize = 25;

pub const DEFAULT_MERCHANT_NAME: &str = "RESTAURANTE";
pub const DEFAULT_MERCHANT_CITY: &str = "SAO PAULO";
pub const WILDCARD_REFERENCE: &str = "***";

const COUNTRY_PREFIX: &str = "+55";

/// Routing key as it must appear inside the merchant account template.
///
/// Emails and random (UUID shaped) keys pass through after control characters
/// are removed. Anything else loses its punctuation; a bare 11-digit mobile
/// number (third digit `9`) gains the country prefix.
pub fn normalize_key(raw: &str) -> String {
    let printable: String = raw.chars().filter(|c| (' '..='~').contains(c)).collect();
    let key = printable.trim();

    if key.contains('@') || is_random_key(key) {
        return key.to_string();
    }

    let stripped: String = key
        .chars()
        .filter(|c| !c.is_ascii_punctuation() && !c.is_ascii_whitespace())
        .collect();

    if stripped.is_empty() || !stripped.chars().all(|c| c.is_ascii_digit()) {
        return stripped;
    }

    if key.starts_with('+') {
        return format!("+{stripped}");
    }

    if stripped.len() == 11 && stripped.as_bytes()[2] == b'9' {
        return format!("{COUNTRY_PREFIX}{stripped}");
    }

    stripped
}

/// `8-4-4-4-12` hexadecimal groups.
pub fn is_random_key(key: &str) -> bool {
    let groups: Vec<&str> = key.split('-').collect();
    let expected = [8, 4, 4, 4, 12];

    groups.len() == expected.len()
        && groups
            .iter()
            .zip(expected)
            .all(|(group, len)| group.len() == len && group.chars().all(|c| c.is_ascii_hexdigit()))
}

pub fn merchant_name(raw: &str) -> String {
    plain_upper(raw, MERCHANT_NAME_MAX, DEFAULT_MERCHANT_NAME)
}

pub fn merchant_city(raw: &str) -> String {
    plain_upper(raw, MERCHANT_CITY_MAX, DEFAULT_MERCHANT_CITY)
}

pub fn reference(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return WILDCARD_REFERENCE.to_string();
    };
    if raw.trim() == WILDCARD_REFERENCE {
        return WILDCARD_REFERENCE.to_string();
    }

    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(REFERENCE_MAX)
        .collect();

    if cleaned.is_empty() {
        WILDCARD_REFERENCE.to_string()
    } else {
        cleaned
    }
}

fn plain_upper(raw: &str, max: usize, fallback: &str) -> String {
    let folded: String = raw
        .chars()
        .flat_map(char::to_lowercase)
        .filter_map(|c| {
            let c = fold_diacritic(c);
            if c.is_ascii_alphanumeric() {
                Some(c.to_ascii_uppercase())
            } else if c.is_whitespace() {
                Some(' ')
            } else {
                None
            }
        })
        .collect();

    let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(max).collect();
    let truncated = truncated.trim_end();

    if truncated.is_empty() {
        fallback.to_string()
    } else {
        truncated.to_string()
    }
}

fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}
