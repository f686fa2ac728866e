//! Result types returned by the conversion orchestrator.

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Dimensions of one persisted page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub filename: String,
    pub width: u32,
    pub height: u32,
}

/// Outcome of one upload conversion.
///
/// Serialises with a `status` discriminant (`"success"` / `"error"`); each
/// variant carries only the fields meaningful for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ConversionResult {
    Success {
        document_id: String,
        /// One entry per page, in page order.
        saved_paths: Vec<PathBuf>,
        /// Parallel to `saved_paths`.
        page_metadata: Vec<PageInfo>,
        /// Rasterisation + persistence only.
        service_time_seconds: f64,
        /// Whole call, including id resolution.
        total_time_seconds: f64,
    },
    Error {
        document_id: String,
        error_kind: ErrorKind,
        error_detail: String,
        /// Time spent in rasterisation + persistence before the failure.
        service_time_seconds: f64,
        total_time_seconds: f64,
    },
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionResult::Success { .. })
    }

    /// `"success"` or `"error"`.
    pub fn status(&self) -> &'static str {
        match self {
            ConversionResult::Success { .. } => "success",
            ConversionResult::Error { .. } => "error",
        }
    }

    pub fn document_id(&self) -> &str {
        match self {
            ConversionResult::Success { document_id, .. }
            | ConversionResult::Error { document_id, .. } => document_id,
        }
    }

    /// Saved pages; empty for an error result.
    pub fn saved_paths(&self) -> &[PathBuf] {
        match self {
            ConversionResult::Success { saved_paths, .. } => saved_paths,
            ConversionResult::Error { .. } => &[],
        }
    }

    /// Page metadata; empty for an error result.
    pub fn page_metadata(&self) -> &[PageInfo] {
        match self {
            ConversionResult::Success { page_metadata, .. } => page_metadata,
            ConversionResult::Error { .. } => &[],
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match self {
            ConversionResult::Success { .. } => None,
            ConversionResult::Error { error_detail, .. } => Some(error_detail),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ConversionResult::Success { .. } => None,
            ConversionResult::Error { error_kind, .. } => Some(*error_kind),
        }
    }

    pub fn service_time_seconds(&self) -> f64 {
        match self {
            ConversionResult::Success {
                service_time_seconds,
                ..
            }
            | ConversionResult::Error {
                service_time_seconds,
                ..
            } => *service_time_seconds,
        }
    }

    pub fn total_time_seconds(&self) -> f64 {
        match self {
            ConversionResult::Success {
                total_time_seconds, ..
            }
            | ConversionResult::Error {
                total_time_seconds, ..
            } => *total_time_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_serialises_with_status_tag() {
        let r = ConversionResult::Success {
            document_id: "d1".into(),
            saved_paths: vec![PathBuf::from("/out/d1/x_uploaded.png")],
            page_metadata: vec![PageInfo {
                filename: "x_uploaded.png".into(),
                width: 10,
                height: 20,
            }],
            service_time_seconds: 0.25,
            total_time_seconds: 0.5,
        };
        let v: serde_json::Value = serde_json::to_value(&r).unwrap();
        assert_eq!(v["status"], "success");
        assert_eq!(v["document_id"], "d1");
        assert_eq!(v["page_metadata"][0]["width"], 10);
        assert!(v.get("error_detail").is_none());
    }

    #[test]
    fn error_carries_detail_and_no_paths() {
        let r = ConversionResult::Error {
            document_id: "d2".into(),
            error_kind: ErrorKind::Decode,
            error_detail: "bad bytes".into(),
            service_time_seconds: 0.0,
            total_time_seconds: 0.1,
        };
        assert_eq!(r.status(), "error");
        assert_eq!(r.error_detail(), Some("bad bytes"));
        assert!(r.saved_paths().is_empty());
        assert_eq!(r.saved_paths().len(), r.page_metadata().len());

        let v: serde_json::Value = serde_json::to_value(&r).unwrap();
        assert_eq!(v["status"], "error");
        assert_eq!(v["error_kind"], "decode");
        assert!(v.get("saved_paths").is_none());

        let back: ConversionResult = serde_json::from_value(v).unwrap();
        assert_eq!(back, r);
    }
}
