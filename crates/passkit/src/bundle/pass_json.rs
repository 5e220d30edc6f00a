//! Encoding and decoding of `pass.json`.

use crate::model::Pass;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the pass document inside the bundle.
pub const PASS_JSON_FILE_NAME: &str = "pass.json";

/// Validate `pass` and encode it as pretty-printed JSON.
///
/// # Errors
///
/// - [`Error::InvalidPass`] if [`Pass::validate`] rejects the pass
/// - [`Error::InvalidPassJson`] if encoding fails
pub fn encode_pass(pass: &Pass) -> Result<Vec<u8>> {
    pass.validate()?;
    serde_json::to_vec_pretty(pass).map_err(|e| Error::InvalidPassJson(e.to_string()))
}

/// Decode a `pass.json` document.
pub fn decode_pass(data: &[u8]) -> Result<Pass> {
    serde_json::from_slice(data).map_err(|e| Error::InvalidPassJson(e.to_string()))
}

/// Write `pass.json` into `bundle_dir` and return its path.
pub async fn write_pass_json(pass: &Pass, bundle_dir: &Path) -> Result<PathBuf> {
    let data = encode_pass(pass)?;
    let path = bundle_dir.join(PASS_JSON_FILE_NAME);
    tokio::fs::write(&path, &data).await?;
    debug!(bytes = data.len(), serial = %pass.serial_number, "Wrote pass.json");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PassField, PassStructure, PassStyle};
    use chrono::{FixedOffset, TimeZone};
    use tempfile::tempdir;

    fn coupon() -> Pass {
        Pass::new(
            "Test",
            "Example",
            "pass.com.example.coupon",
            "42",
            "TEAM123456",
            PassStyle::Coupon(PassStructure::new().primary(PassField::new("offer", "20% off"))),
        )
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let mut pass = coupon();
        pass.relevant_date = Some(
            FixedOffset::east_opt(3600)
                .unwrap()
                .with_ymd_and_hms(2025, 3, 9, 10, 15, 0)
                .unwrap(),
        );
        let data = encode_pass(&pass).unwrap();
        let text = String::from_utf8(data.clone()).unwrap();
        assert!(text.contains("\"relevantDate\": \"2025-03-09T10:15+01:00\""));
        assert_eq!(decode_pass(&data).unwrap(), pass);
    }

    #[test]
    fn test_date_like_text_value_is_preserved() {
        let mut pass = coupon();
        pass.style = PassStyle::Coupon(
            PassStructure::new().primary(PassField::new("when", "2024-05-01T18:30:45Z")),
        );
        let decoded = decode_pass(&encode_pass(&pass).unwrap()).unwrap();
        assert_eq!(decoded, pass);

        let text = String::from_utf8(encode_pass(&decoded).unwrap()).unwrap();
        assert!(text.contains("\"value\": \"2024-05-01T18:30:45Z\""));
    }

    #[test]
    fn test_invalid_pass_is_rejected_before_encoding() {
        let mut pass = coupon();
        pass.style = PassStyle::BoardingPass(PassStructure::new());
        assert!(matches!(encode_pass(&pass), Err(Error::InvalidPass(_))));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(decode_pass(b"not json"), Err(Error::InvalidPassJson(_))));
        assert!(matches!(decode_pass(b"{\"description\": \"x\"}"), Err(Error::InvalidPassJson(_))));
    }

    #[tokio::test]
    async fn test_write_pass_json() {
        let dir = tempdir().unwrap();
        let path = write_pass_json(&coupon(), dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join(PASS_JSON_FILE_NAME));
        let decoded = decode_pass(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(decoded.serial_number, "42");
    }
}
