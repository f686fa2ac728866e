//! Payload handling: transport decoding and source-kind sniffing.
//!
//! Uploads arrive base64-encoded from the transport layer. Once decoded, the
//! only format detection done is a magic-number check on the first four
//! bytes; everything that is not `%PDF` is handed to the image decoder and
//! fails there if it is not an image.

use crate::error::IntakeError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signature that marks a paginated (PDF) payload.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// How a payload will be rasterised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Multi-page document, rendered page by page.
    Pdf,
    /// A single encoded raster image.
    Image,
}

impl SourceKind {
    /// Classify a payload by its leading bytes.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.len() >= PDF_MAGIC.len() && &bytes[..PDF_MAGIC.len()] == PDF_MAGIC {
            SourceKind::Pdf
        } else {
            SourceKind::Image
        }
    }

    pub fn is_paginated(self) -> bool {
        self == SourceKind::Pdf
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Pdf => f.write_str("pdf"),
            SourceKind::Image => f.write_str("image"),
        }
    }
}

/// Decode a base64 transport payload into raw document bytes.
///
/// Accepts an optional `data:<mime>;base64,` prefix and ignores embedded
/// whitespace (line-wrapped encoders are common).
pub fn decode_transport(encoded: &str) -> Result<Vec<u8>, IntakeError> {
    let body = match encoded.trim_start().strip_prefix("data:") {
        Some(rest) => match rest.split_once(',') {
            Some((_, data)) => data,
            None => {
                return Err(IntakeError::Payload(
                    "data URI has no ',' separator".into(),
                ))
            }
        },
        None => encoded,
    };

    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(IntakeError::Payload("document payload is empty".into()));
    }

    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| IntakeError::Payload(format!("base64 decode failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_pdf_signature() {
        assert_eq!(SourceKind::sniff(b"%PDF-1.7\n..."), SourceKind::Pdf);
        assert_eq!(SourceKind::sniff(b"%PDF"), SourceKind::Pdf);
        assert_eq!(SourceKind::sniff(b"\x89PNG\r\n"), SourceKind::Image);
        assert_eq!(SourceKind::sniff(b"%PD"), SourceKind::Image);
        assert_eq!(SourceKind::sniff(b""), SourceKind::Image);
        // Case matters.
        assert_eq!(SourceKind::sniff(b"%pdf-1.4"), SourceKind::Image);
    }

    #[test]
    fn decode_plain_and_wrapped_base64() {
        let encoded = STANDARD.encode(b"%PDF-1.4 hello");
        assert_eq!(decode_transport(&encoded).unwrap(), b"%PDF-1.4 hello");

        let wrapped = format!("{}\n{}", &encoded[..8], &encoded[8..]);
        assert_eq!(decode_transport(&wrapped).unwrap(), b"%PDF-1.4 hello");
    }

    #[test]
    fn decode_data_uri() {
        let uri = format!("data:image/png;base64,{}", STANDARD.encode([1u8, 2, 3]));
        assert_eq!(decode_transport(&uri).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn decode_rejects_garbage_and_empty() {
        assert!(matches!(
            decode_transport("not base64 !!!"),
            Err(IntakeError::Payload(_))
        ));
        assert!(matches!(decode_transport("   "), Err(IntakeError::Payload(_))));
        assert!(matches!(
            decode_transport("data:image/png;base64"),
            Err(IntakeError::Payload(_))
        ));
    }
}
