//! Local validation of a selected document before any network call.

use crate::api::types::DocumentUpload;
use crate::config::ClientConfig;
use crate::error::UploadRejection;

/// Validates selected files against an accepted MIME set and a size
/// ceiling. Rejections never reach the network.
#[derive(Debug, Clone)]
pub struct UploadGate {
    accepted_mime_types: Vec<String>,
    max_bytes: u64,
}

impl UploadGate {
    pub fn new(accepted_mime_types: Vec<String>, max_bytes: u64) -> Self {
        Self {
            accepted_mime_types,
            max_bytes,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.accepted_mime_types.clone(), config.max_upload_bytes)
    }

    /// Pure check over file metadata; no side effects.
    ///
    /// An empty file is rejected as `empty_selection` before any size
    /// comparison, and a file whose type cannot be resolved at all is
    /// rejected as `unsupported_type`.
    pub fn check(&self, upload: &DocumentUpload) -> Result<(), UploadRejection> {
        if upload.size() == 0 {
            return Err(UploadRejection::EmptySelection);
        }

        let mime_type = upload
            .resolved_mime_type()
            .ok_or_else(|| UploadRejection::UnsupportedType {
                mime_type: "unknown".to_string(),
            })?;
        if !self
            .accepted_mime_types
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(&mime_type))
        {
            return Err(UploadRejection::UnsupportedType { mime_type });
        }

        if upload.size() > self.max_bytes {
            return Err(UploadRejection::TooLarge {
                size: upload.size(),
                limit: self.max_bytes,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> UploadGate {
        UploadGate::from_config(&ClientConfig::default())
    }

    #[test]
    fn test_accepts_pdf_within_limit() {
        let upload = DocumentUpload::new("contract.pdf", vec![0u8; 2 * 1024 * 1024]);
        assert!(gate().check(&upload).is_ok());
    }

    #[test]
    fn test_accepts_declared_mime_over_extension() {
        let upload = DocumentUpload::new("contract.bin", vec![1]).with_mime_type("image/png");
        assert!(gate().check(&upload).is_ok());
    }

    #[test]
    fn test_rejects_empty_file_distinctly() {
        let upload = DocumentUpload::new("contract.pdf", vec![]);
        let rejection = gate().check(&upload).unwrap_err();
        assert_eq!(rejection, UploadRejection::EmptySelection);
        assert_eq!(rejection.reason(), "empty_selection");
    }

    #[test]
    fn test_rejects_oversized_file() {
        let upload = DocumentUpload::new("contract.pdf", vec![0u8; 11 * 1024 * 1024]);
        let rejection = gate().check(&upload).unwrap_err();
        assert_eq!(rejection.reason(), "too_large");
        assert!(matches!(
            rejection,
            UploadRejection::TooLarge {
                limit: 10_485_760,
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_unsupported_type() {
        let upload = DocumentUpload::new("notes.csv", vec![1, 2, 3]);
        let rejection = gate().check(&upload).unwrap_err();
        assert_eq!(rejection.reason(), "unsupported_type");
    }

    #[test]
    fn test_rejects_unresolvable_type() {
        let upload = DocumentUpload::new("mystery", vec![1, 2, 3]);
        let rejection = gate().check(&upload).unwrap_err();
        assert_eq!(rejection.reason(), "unsupported_type");
    }

    #[test]
    fn test_check_is_idempotent() {
        let upload = DocumentUpload::new("scan.jpeg", vec![0u8; 512]);
        let gate = gate();
        assert_eq!(gate.check(&upload), gate.check(&upload));
    }

    #[test]
    fn test_mime_match_is_case_insensitive() {
        let gate = UploadGate::new(vec!["application/pdf".to_string()], 1024);
        let upload = DocumentUpload::new("contract.bin", vec![1]).with_mime_type("Application/PDF");
        assert!(gate.check(&upload).is_ok());
    }
}
