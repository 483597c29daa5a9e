use crate::error::AppError;

/// Largest value a two-digit length prefix can describe.
pub const MAX_VALUE_LEN: usize = 99;

/// Accumulates `ID + LL + value` fields. Nested templates are built with their
/// own writer and pushed as a single value, so every length prefix is derived
/// from the bytes actually emitted.
#[derive(Debug, Default, Clone)]
pub struct TlvWriter {
    buf: String,
}

impl TlvWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, id: u8, value: &str) -> Result<Self, AppError> {
        if id > 99 {
            return Err(AppError::Internal(format!("tlv id {id} is not two digits")));
        }
        if !value.is_ascii() {
            return Err(AppError::BadRequest(format!(
                "tlv field {id:02} contains non-ascii characters"
            )));
        }
        if value.len() > MAX_VALUE_LEN {
            return Err(AppError::BadRequest(format!(
                "tlv field {id:02} is {} characters, limit is {MAX_VALUE_LEN}",
                value.len()
            )));
        }

        self.buf.push_str(&format!("{id:02}{:02}", value.len()));
        self.buf.push_str(value);
        Ok(self)
    }

    pub fn nested(self, id: u8, inner: TlvWriter) -> Result<Self, AppError> {
        self.field(id, &inner.buf)
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::TlvWriter;
    use crate::error::AppError;

    #[test]
    fn emits_id_length_value() {
        let out = TlvWriter::new().field(0, "01").unwrap().into_string();
        assert_eq!(out, "000201");
    }

    #[test]
    fn nested_block_length_covers_inner_fields() {
        let inner = TlvWriter::new()
            .field(0, "br.gov.bcb.pix")
            .unwrap()
            .field(1, "abc")
            .unwrap();
        let out = TlvWriter::new().nested(26, inner).unwrap().into_string();
        assert_eq!(out, "26250014br.gov.bcb.pix0103abc");
    }

    #[test]
    fn rejects_values_longer_than_two_digit_length() {
        let long = "x".repeat(100);
        let result = TlvWriter::new().field(59, &long);
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn rejects_non_ascii_values() {
        let result = TlvWriter::new().field(60, "SÃO");
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
