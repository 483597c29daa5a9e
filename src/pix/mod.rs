//! BR Code ("Pix copia e cola") charge payloads.
//!
//! The payload is a flat TLV string closed by a CRC-16 over everything that
//! precedes the checksum value, including the `6304` header of the checksum
//! field itself. Banking apps recompute that checksum, so the output must be
//! byte-exact for a given input.

pub mod crc;
pub mod normalize;
pub mod tlv;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::pix::tlv::TlvWriter;

const ID_PAYLOAD_FORMAT: u8 = 0;
const ID_POINT_OF_INITIATION: u8 = 1;
const ID_MERCHANT_ACCOUNT: u8 = 26;
const ID_MERCHANT_CATEGORY: u8 = 52;
const ID_CURRENCY: u8 = 53;
const ID_AMOUNT: u8 = 54;
const ID_COUNTRY: u8 = 58;
const ID_MERCHANT_NAME: u8 = 59;
const ID_MERCHANT_CITY: u8 = 60;
const ID_ADDITIONAL_DATA: u8 = 62;

const ID_GUI: u8 = 0;
const ID_KEY: u8 = 1;
const ID_REFERENCE: u8 = 5;

const PAYLOAD_FORMAT: &str = "01";
const ONE_TIME_CHARGE: &str = "12";
const PIX_GUI: &str = "br.gov.bcb.pix";
const CATEGORY_UNSPECIFIED: &str = "0000";
const CURRENCY_BRL: &str = "986";
const COUNTRY_BR: &str = "BR";
const CHECKSUM_HEADER: &str = "6304";
const CHECKSUM_LEN: usize = 4;

/// Inputs of a single charge, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PixCharge {
    pub key: String,
    pub merchant_name: String,
    pub merchant_city: String,
    pub amount: Decimal,
    pub reference: Option<String>,
}

impl PixCharge {
    pub fn encode(&self) -> Result<String, AppError> {
        build_payload(
            &self.key,
            &self.merchant_name,
            &self.merchant_city,
            self.amount,
            self.reference.as_deref(),
        )
    }
}

pub fn build_payload(
    key: &str,
    merchant_name: &str,
    merchant_city: &str,
    amount: Decimal,
    reference: Option<&str>,
) -> Result<String, AppError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AppError::InvalidAmount(format!(
            "pix amount must be non-negative, got {amount}"
        )));
    }

    let key = normalize::normalize_key(key);
    if key.is_empty() {
        return Err(AppError::BadRequest("pix key is empty".to_string()));
    }

    let account = TlvWriter::new()
        .field(ID_GUI, PIX_GUI)?
        .field(ID_KEY, &key)?;
    let additional = TlvWriter::new().field(ID_REFERENCE, &normalize::reference(reference))?;

    let body = TlvWriter::new()
        .field(ID_PAYLOAD_FORMAT, PAYLOAD_FORMAT)?
        .field(ID_POINT_OF_INITIATION, ONE_TIME_CHARGE)?
        .nested(ID_MERCHANT_ACCOUNT, account)?
        .field(ID_MERCHANT_CATEGORY, CATEGORY_UNSPECIFIED)?
        .field(ID_CURRENCY, CURRENCY_BRL)?
        .field(ID_AMOUNT, &format_amount(amount))?
        .field(ID_COUNTRY, COUNTRY_BR)?
        .field(ID_MERCHANT_NAME, &normalize::merchant_name(merchant_name))?
        .field(ID_MERCHANT_CITY, &normalize::merchant_city(merchant_city))?
        .nested(ID_ADDITIONAL_DATA, additional)?
        .into_string();

    let mut payload = body;
    payload.push_str(CHECKSUM_HEADER);
    let checksum = crc::checksum_hex(payload.as_bytes());
    payload.push_str(&checksum);

    Ok(payload)
}

/// Recomputes the trailing checksum of a complete payload.
pub fn verify_checksum(payload: &str) -> bool {
    if !payload.is_ascii() || payload.len() < CHECKSUM_HEADER.len() + CHECKSUM_LEN {
        return false;
    }

    let (signed, checksum) = payload.split_at(payload.len() - CHECKSUM_LEN);
    signed.ends_with(CHECKSUM_HEADER) && crc::checksum_hex(signed.as_bytes()) == checksum
}

fn format_amount(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.abs().to_string()
}
