//! Human review of server-extracted fields and the confirm call.
//!
//! The form is seeded once from the extraction result and mutated only
//! by its caller afterwards. Validation gates both submission variants
//! (create and replace) identically.

pub mod name_check;

pub use name_check::{NameCheckState, NameUniquenessChecker};

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::api::types::{ConfirmVendorRequest, ExtractedFields, VendorCreated};
use crate::api::IntakeApi;
use crate::dates::parse_flexible_date;
use crate::error::{DriftError, ReviewError};
use crate::intake::IntakeTarget;

/// Minimum length for a submittable vendor name.
pub const MIN_NAME_LENGTH: usize = 2;

/// Editable form model seeded from extraction.
#[derive(Debug, Clone, Default)]
pub struct ReviewFields {
    pub primary_vendor_name: String,
    pub dba_display_name: Option<String>,
    pub effective_date: Option<String>,
    pub renewal_end_date: Option<String>,
    pub category: Option<String>,
    /// Read-only passthrough; never edited, never validated.
    pub contract_reconciliation_summary: Option<String>,
}

impl From<ExtractedFields> for ReviewFields {
    fn from(extracted: ExtractedFields) -> Self {
        Self {
            primary_vendor_name: extracted.primary_vendor_name,
            dba_display_name: extracted.dba_display_name,
            effective_date: extracted.effective_date,
            renewal_end_date: extracted.renewal_end_date,
            category: extracted.category,
            contract_reconciliation_summary: extracted.contract_reconciliation_summary,
        }
    }
}

fn clean_optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn validate_date(
    field: &'static str,
    value: &Option<String>,
) -> Result<Option<String>, ReviewError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => {
            parse_flexible_date(value).ok_or_else(|| ReviewError::InvalidDate {
                field,
                value: value.to_string(),
            })?;
            Ok(Some(value.to_string()))
        }
    }
}

/// One review session for a completed extraction job.
pub struct ReviewForm {
    api: Arc<dyn IntakeApi>,
    target: IntakeTarget,
    job_id: String,
    fields: ReviewFields,
    checker: NameUniquenessChecker,
}

impl ReviewForm {
    /// Seeds a form from the extraction result. If a vendor name was
    /// extracted, its uniqueness check starts immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn seed(
        api: Arc<dyn IntakeApi>,
        target: IntakeTarget,
        job_id: String,
        extracted: ExtractedFields,
        name_check_debounce: Duration,
    ) -> Self {
        let fields = ReviewFields::from(extracted);
        let checker = NameUniquenessChecker::new(Arc::clone(&api), name_check_debounce);
        if !fields.primary_vendor_name.trim().is_empty() {
            checker.edit(&fields.primary_vendor_name);
        }
        Self {
            api,
            target,
            job_id,
            fields,
            checker,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn target(&self) -> &IntakeTarget {
        &self.target
    }

    pub fn fields(&self) -> &ReviewFields {
        &self.fields
    }

    pub fn name_check(&self) -> NameCheckState {
        self.checker.state()
    }

    /// Edits the vendor name, restarting the debounced uniqueness
    /// check.
    pub fn set_primary_vendor_name(&mut self, name: &str) {
        self.fields.primary_vendor_name = name.to_string();
        self.checker.edit(name);
    }

    pub fn set_dba_display_name(&mut self, value: Option<String>) {
        self.fields.dba_display_name = value;
    }

    pub fn set_effective_date(&mut self, value: Option<String>) {
        self.fields.effective_date = value;
    }

    pub fn set_renewal_end_date(&mut self, value: Option<String>) {
        self.fields.renewal_end_date = value;
    }

    pub fn set_category(&mut self, value: Option<String>) {
        self.fields.category = value;
    }

    /// Waits for a pending uniqueness check to finish.
    pub async fn settle_name_check(&self) {
        self.checker.settle().await;
    }

    /// Validates the current fields and builds the confirm payload.
    ///
    /// Submission is blocked while a uniqueness check is running and
    /// when the name is a known duplicate. A duplicate that points at
    /// the vendor being replaced is not a conflict. No ordering is
    /// enforced between the effective and renewal dates; open-ended
    /// contracts are legal.
    pub fn validate(&self) -> Result<ConfirmVendorRequest, ReviewError> {
        let name = self.fields.primary_vendor_name.trim();
        if name.is_empty() {
            return Err(ReviewError::MissingField("primaryVendorName"));
        }
        if name.chars().count() < MIN_NAME_LENGTH {
            return Err(ReviewError::NameTooShort {
                min: MIN_NAME_LENGTH,
            });
        }

        match self.checker.state() {
            NameCheckState::Checking => return Err(ReviewError::CheckPending),
            NameCheckState::Duplicate { existing_vendor_id } => {
                let replacing_self = matches!(
                    (&self.target, existing_vendor_id.as_deref()),
                    (IntakeTarget::ReplaceContract { vendor_id }, Some(existing))
                        if vendor_id.as_str() == existing
                );
                if !replacing_self {
                    return Err(ReviewError::DuplicateName {
                        name: name.to_string(),
                        existing_vendor_id,
                    });
                }
            }
            NameCheckState::Idle | NameCheckState::Unique => {}
        }

        let effective_date = validate_date("effectiveDate", &self.fields.effective_date)?
            .ok_or(ReviewError::MissingField("effectiveDate"))?;
        let renewal_end_date = validate_date("renewalEndDate", &self.fields.renewal_end_date)?;

        Ok(ConfirmVendorRequest {
            primary_vendor_name: name.to_string(),
            dba_display_name: clean_optional(&self.fields.dba_display_name),
            effective_date,
            renewal_end_date,
            category: clean_optional(&self.fields.category),
            job_id: self.job_id.clone(),
        })
    }

    /// Validates and issues the confirm call for this form's target.
    ///
    /// On failure the form keeps its state, so the caller can correct
    /// the fields and resubmit.
    pub async fn confirm(&self) -> Result<VendorCreated, DriftError> {
        let request = self.validate()?;
        let created = match &self.target {
            IntakeTarget::CreateVendor => self.api.confirm_vendor(&request).await?,
            IntakeTarget::ReplaceContract { vendor_id } => {
                self.api.confirm_replacement(vendor_id, &request).await?
            }
        };
        info!(
            "confirmed vendor {} with contract {}",
            created.vendor_id, created.contract_id
        );
        Ok(created)
    }
}
