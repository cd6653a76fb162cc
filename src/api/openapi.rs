//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Socialshot Server",
        version = "0.3.0",
        description = "API server for visual regression testing of social media post embeds"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Channel endpoints
        api::channels::create_channel,
        api::channels::list_channels,
        api::channels::get_channel,
        api::channels::update_channel,
        api::channels::delete_channel,
        api::channels::add_link,
        api::channels::delete_link,
        // Job endpoints
        api::jobs::run_job,
        api::jobs::list_jobs,
        api::jobs::latest_job,
        api::jobs::get_job,
        api::jobs::delete_job,
        api::jobs::accept_comparison,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // Channels
            models::CreateChannelRequest,
            models::UpdateChannelRequest,
            models::ChannelDetail,
            models::ChannelListResponse,
            models::LinkSummary,
            models::AddLinkRequest,
            models::AddLinkResponse,
            models::DeleteLinkRequest,
            models::ReferenceView,
            // Jobs
            models::JobSummary,
            models::JobListResponse,
            models::JobDetailResponse,
            models::LatestJobResponse,
            models::PlatformResultView,
            models::ImageComparisonView,
            models::CaptureFailure,
            models::FailureKind,
            models::AcceptComparisonRequest,
            models::AcceptComparisonResponse,
        )
    ),
    tags(
        (name = "Health", description = "Service health endpoints"),
        (name = "Channels", description = "Channel and link management"),
        (name = "Jobs", description = "Visual regression job runs"),
    )
)]
pub struct ApiDoc;
