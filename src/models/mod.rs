//! Domain models for the socialshot server.

pub mod channel;
pub mod job;

// Re-export commonly used types
pub use channel::{
    AddLinkRequest, AddLinkResponse, ChannelDetail, ChannelListResponse, CreateChannelRequest,
    DeleteLinkRequest, LinkSummary, ReferenceView, UpdateChannelRequest, canonicalize_url,
    normalize_channel_name,
};
pub use job::{
    AcceptComparisonRequest, AcceptComparisonResponse, CaptureFailure, DiffArtifact, FailureKind,
    ImageComparisonView, JobDetailResponse, JobListResponse, JobSummary, LatestJobResponse,
    PlatformResultView, SIZE_MISMATCH_SENTINEL,
};
