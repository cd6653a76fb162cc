//! Channel API handlers.

use actix_web::{HttpResponse, delete, get, post, put, web};
use tracing::info;

use crate::db::DbPool;
use crate::entity::channel;
use crate::error::{AppError, AppResult};
use crate::models::{
    AddLinkRequest, ChannelDetail, ChannelListResponse, CreateChannelRequest, DeleteLinkRequest,
    LinkSummary, UpdateChannelRequest, normalize_channel_name,
};
use crate::services::BaselineService;

/// Assemble a channel with its links and their baseline locations.
async fn channel_detail(pool: &DbPool, channel: channel::Model) -> AppResult<ChannelDetail> {
    let links = pool.list_links(channel.id).await?;

    let mut summaries = Vec::with_capacity(links.len());
    for link in links {
        let baseline = pool.find_reference(&channel.name, &link.url).await?;
        summaries.push(LinkSummary {
            id: link.id,
            url: link.url,
            scenario: link.scenario,
            baseline_location: baseline.map(|r| r.image_location),
            test_location: link.test_location,
        });
    }

    Ok(ChannelDetail {
        id: channel.id,
        name: channel.name,
        selector: channel.selector,
        bypass_script: channel.bypass_script,
        links: summaries,
        created_at: channel.created_at,
    })
}

/// Create a channel.
#[utoipa::path(
    post,
    path = "/api/v1/channels",
    tag = "Channels",
    request_body = CreateChannelRequest,
    responses(
        (status = 201, description = "Channel created", body = ChannelDetail),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 409, description = "Channel name already exists", body = crate::error::ErrorResponse),
    )
)]
#[post("/channels")]
pub async fn create_channel(
    pool: web::Data<DbPool>,
    body: web::Json<CreateChannelRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    req.validate()?;

    let name = normalize_channel_name(&req.name);

    if pool.find_channel_by_name(&name).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "Channel {} already exists",
            name
        )));
    }

    let channel = pool
        .insert_channel(&name, req.selector.trim(), req.bypass_script)
        .await?;

    info!(channel = %name, "channel created");

    let detail = channel_detail(&pool, channel).await?;
    Ok(HttpResponse::Created().json(detail))
}

/// List all channels with their links.
#[utoipa::path(
    get,
    path = "/api/v1/channels",
    tag = "Channels",
    responses(
        (status = 200, description = "Channels", body = ChannelListResponse)
    )
)]
#[get("/channels")]
pub async fn list_channels(pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    let channels = pool.list_channels().await?;

    let mut details = Vec::with_capacity(channels.len());
    for channel in channels {
        details.push(channel_detail(&pool, channel).await?);
    }

    Ok(HttpResponse::Ok().json(ChannelListResponse { channels: details }))
}

/// Get one channel by name.
#[utoipa::path(
    get,
    path = "/api/v1/channels/{name}",
    tag = "Channels",
    params(
        ("name" = String, Path, description = "Channel name")
    ),
    responses(
        (status = 200, description = "Channel", body = ChannelDetail),
        (status = 404, description = "Channel not found", body = crate::error::ErrorResponse),
    )
)]
#[get("/channels/{name}")]
pub async fn get_channel(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let name = normalize_channel_name(&path.into_inner());
    let channel = pool
        .find_channel_by_name(&name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Channel {}", name)))?;

    let detail = channel_detail(&pool, channel).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// Update a channel's selector or bypass script.
#[utoipa::path(
    put,
    path = "/api/v1/channels/{name}",
    tag = "Channels",
    params(
        ("name" = String, Path, description = "Channel name")
    ),
    request_body = UpdateChannelRequest,
    responses(
        (status = 200, description = "Channel updated", body = ChannelDetail),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 404, description = "Channel not found", body = crate::error::ErrorResponse),
    )
)]
#[put("/channels/{name}")]
pub async fn update_channel(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
    body: web::Json<UpdateChannelRequest>,
) -> AppResult<HttpResponse> {
    let name = normalize_channel_name(&path.into_inner());
    let req = body.into_inner();

    if let Some(ref selector) = req.selector
        && selector.trim().is_empty()
    {
        return Err(AppError::Validation("Selector is required".to_string()));
    }

    let channel = pool
        .update_channel(&name, req.selector, req.bypass_script)
        .await?;

    info!(channel = %name, "channel updated");

    let detail = channel_detail(&pool, channel).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// Delete a channel and all of its links and baselines.
#[utoipa::path(
    delete,
    path = "/api/v1/channels/{name}",
    tag = "Channels",
    params(
        ("name" = String, Path, description = "Channel name")
    ),
    responses(
        (status = 204, description = "Channel deleted"),
        (status = 404, description = "Channel not found", body = crate::error::ErrorResponse),
    )
)]
#[delete("/channels/{name}")]
pub async fn delete_channel(
    baselines: web::Data<BaselineService>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    baselines.delete_channel(&path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Add a link to a channel and establish its baseline.
///
/// The baseline capture runs first; if it fails, the link is not created.
#[utoipa::path(
    post,
    path = "/api/v1/channels/{name}/links",
    tag = "Channels",
    params(
        ("name" = String, Path, description = "Channel name")
    ),
    request_body = AddLinkRequest,
    responses(
        (status = 201, description = "Link created, baseline established", body = crate::models::AddLinkResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 404, description = "Channel not found or selector never appeared", body = crate::error::ErrorResponse),
        (status = 409, description = "URL already exists", body = crate::error::ErrorResponse),
        (status = 502, description = "Navigation failed", body = crate::error::ErrorResponse),
    )
)]
#[post("/channels/{name}/links")]
pub async fn add_link(
    baselines: web::Data<BaselineService>,
    path: web::Path<String>,
    body: web::Json<AddLinkRequest>,
) -> AppResult<HttpResponse> {
    let response = baselines
        .establish_baseline(&path.into_inner(), &body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(response))
}

/// Delete a link and its baseline from a channel.
#[utoipa::path(
    delete,
    path = "/api/v1/channels/{name}/links",
    tag = "Channels",
    params(
        ("name" = String, Path, description = "Channel name")
    ),
    request_body = DeleteLinkRequest,
    responses(
        (status = 204, description = "Link deleted"),
        (status = 404, description = "Channel or link not found", body = crate::error::ErrorResponse),
    )
)]
#[delete("/channels/{name}/links")]
pub async fn delete_link(
    baselines: web::Data<BaselineService>,
    path: web::Path<String>,
    body: web::Json<DeleteLinkRequest>,
) -> AppResult<HttpResponse> {
    baselines
        .delete_link(&path.into_inner(), &body.into_inner().url)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Configure channel routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_channel)
        .service(list_channels)
        .service(get_channel)
        .service(update_channel)
        .service(delete_channel)
        .service(add_link)
        .service(delete_link);
}
