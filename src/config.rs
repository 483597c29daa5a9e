use std::env;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::AppError;
use crate::pix::normalize::{DEFAULT_MERCHANT_CITY, DEFAULT_MERCHANT_NAME};

#[derive(Debug, Clone)]
pub struct PixSettings {
    /// House key; no payloads are produced without one.
    pub key: Option<String>,
    pub merchant_name: String,
    pub merchant_city: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub default_delivery_fee: Decimal,
    pub pix: PixSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            default_delivery_fee: parse_or_default("DEFAULT_DELIVERY_FEE", dec!(5.00))?,
            pix: PixSettings {
                key: env::var("PIX_KEY").ok().filter(|key| !key.trim().is_empty()),
                merchant_name: env::var("PIX_MERCHANT_NAME")
                    .unwrap_or_else(|_| DEFAULT_MERCHANT_NAME.to_string()),
                merchant_city: env::var("PIX_MERCHANT_CITY")
                    .unwrap_or_else(|_| DEFAULT_MERCHANT_CITY.to_string()),
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            event_buffer_size: 1024,
            default_delivery_fee: dec!(5.00),
            pix: PixSettings {
                key: None,
                merchant_name: DEFAULT_MERCHANT_NAME.to_string(),
                merchant_city: DEFAULT_MERCHANT_CITY.to_string(),
            },
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
