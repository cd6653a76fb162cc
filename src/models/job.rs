//! Job domain models and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::channel::ReferenceView;
use crate::services::capture::CaptureError;

/// Reserved location value meaning "dimensions did not match, no diff was
/// computed". Never a real storage key.
pub const SIZE_MISMATCH_SENTINEL: &str = "size-mismatch";

/// Typed form of a comparison's diff artifact location.
///
/// The persisted layout stores one opaque string column; this enum keeps the
/// sentinel handling in a single place instead of ad-hoc string comparisons
/// at every call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffArtifact {
    /// S3 key of a rendered diff image.
    Location(String),
    /// Pixel comparison was skipped because the dimensions differed.
    SizeMismatch,
}

impl DiffArtifact {
    /// The string persisted in the `diff_location` column.
    pub fn as_location_str(&self) -> &str {
        match self {
            DiffArtifact::Location(key) => key,
            DiffArtifact::SizeMismatch => SIZE_MISMATCH_SENTINEL,
        }
    }

    /// Reconstruct from a persisted `diff_location` value.
    pub fn from_location(location: &str) -> Self {
        if location == SIZE_MISMATCH_SENTINEL {
            DiffArtifact::SizeMismatch
        } else {
            DiffArtifact::Location(location.to_string())
        }
    }

    pub fn is_size_mismatch(&self) -> bool {
        matches!(self, DiffArtifact::SizeMismatch)
    }
}

/// Kind of a per-link capture failure, for the job's failure list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Navigation,
    SelectorNotFound,
    BypassScript,
    CaptureInFlight,
    BrowserSession,
    Storage,
    Internal,
}

impl From<&CaptureError> for FailureKind {
    fn from(err: &CaptureError) -> Self {
        match err {
            CaptureError::Navigation { .. } => FailureKind::Navigation,
            CaptureError::SelectorNotFound { .. } => FailureKind::SelectorNotFound,
            CaptureError::BypassScript(_) => FailureKind::BypassScript,
            CaptureError::LinkBusy(_) => FailureKind::CaptureInFlight,
            CaptureError::Session(_) => FailureKind::BrowserSession,
        }
    }
}

/// One per-link failure recorded during a job run.
///
/// Failures never abort the run; they are embedded in the job record so the
/// job view can show "capture failed" distinctly from "no changes detected".
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CaptureFailure {
    pub channel: String,
    pub url: String,
    pub kind: FailureKind,
    pub detail: String,
}

/// One unresolved comparison as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImageComparisonView {
    pub image_name: String,
    pub reference_location: String,
    pub test_location: String,
    /// Diff artifact location, or the size-mismatch sentinel.
    pub diff_location: String,
    /// True when no diff was computed because dimensions differed.
    pub size_mismatch: bool,
}

impl From<crate::entity::image_comparison::Model> for ImageComparisonView {
    fn from(model: crate::entity::image_comparison::Model) -> Self {
        let artifact = DiffArtifact::from_location(&model.diff_location);
        ImageComparisonView {
            image_name: model.image_name,
            reference_location: model.reference_location,
            test_location: model.test_location,
            size_mismatch: artifact.is_size_mismatch(),
            diff_location: model.diff_location,
        }
    }
}

/// All unresolved comparisons of one channel within a job.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlatformResultView {
    pub platform_name: String,
    pub images: Vec<ImageComparisonView>,
}

/// Short form of a job for listings.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobSummary {
    pub id: Uuid,
    pub run_at: DateTime<Utc>,
    pub comparison_count: u64,
    pub failure_count: u64,
}

/// Full job record: platform → comparison tree plus capture failures.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobDetailResponse {
    pub id: Uuid,
    pub run_at: DateTime<Utc>,
    pub platforms: Vec<PlatformResultView>,
    pub failures: Vec<CaptureFailure>,
    pub total_comparisons: u64,
}

/// Response for the job listing endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobListResponse {
    pub jobs: Vec<JobSummary>,
}

/// Response for the most-recent-job endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LatestJobResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_at: Option<DateTime<Utc>>,
}

/// Request to accept ("fix") a comparison, promoting its test image to
/// become the channel/scenario's new baseline.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AcceptComparisonRequest {
    pub channel: String,
    pub url: String,
}

/// Response after a successful accept.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AcceptComparisonResponse {
    pub reference: ReferenceView,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_artifact_sentinel_round_trip() {
        let mismatch = DiffArtifact::SizeMismatch;
        assert_eq!(mismatch.as_location_str(), SIZE_MISMATCH_SENTINEL);
        assert_eq!(
            DiffArtifact::from_location(SIZE_MISMATCH_SENTINEL),
            DiffArtifact::SizeMismatch
        );

        let real = DiffArtifact::Location("jobs/abc/facebook/post_diff.png".to_string());
        assert!(!real.is_size_mismatch());
        assert_eq!(DiffArtifact::from_location(real.as_location_str()), real);
    }

    #[test]
    fn test_failure_kind_serializes_snake_case() {
        let failure = CaptureFailure {
            channel: "facebook".to_string(),
            url: "https://www.facebook.com/p/posts/1".to_string(),
            kind: FailureKind::SelectorNotFound,
            detail: "selector 'div[role=article]' not found within 60s".to_string(),
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["kind"], "selector_not_found");

        let back: CaptureFailure = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind, FailureKind::SelectorNotFound);
    }
}
