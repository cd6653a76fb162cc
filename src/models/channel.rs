//! Channel domain models, DTOs, and per-channel URL canonicalization.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Normalize a channel name for storage and lookups.
pub fn normalize_channel_name(name: &str) -> String {
    name.trim().to_lowercase()
}

static FACEBOOK_PERMALINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://(?:www\.)?facebook\.com/permalink\.php\?story_fbid=([^&]+)&id=([^&]+)")
        .expect("valid regex")
});

static FACEBOOK_POSTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://(?:www\.)?facebook\.com/([^/]+)/posts/([^/]+)").expect("valid regex")
});

static INSTAGRAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://(?:www\.)?instagram\.com/p/([^/]+)").expect("valid regex")
});

static TWITTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://x\.com/(?:\w+)/status(?:es)?/(\d+)").expect("valid regex")
});

static LINKEDIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)https?://(?:www\.)?linkedin\.com/(?:feed/update/|in/|pub/|profile/view\?id=|pulse/|learning/|events/urn:li:activity:|groups/)",
    )
    .expect("valid regex")
});

static REDDIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://(?:www\.)?reddit\.com/(?:r|user)/[^/]+/comments/[^/]+/[^/]+")
        .expect("valid regex")
});

/// Validate and canonicalize a post URL according to the channel's URL-shape
/// rules. Facebook permalink URLs are rewritten to the posts form; the other
/// known channels are validated as-is. Unknown channels pass through.
pub fn canonicalize_url(channel_name: &str, url: &str) -> AppResult<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(AppError::Validation("URL is required".to_string()));
    }

    match normalize_channel_name(channel_name).as_str() {
        "facebook" => {
            if let Some(caps) = FACEBOOK_PERMALINK_RE.captures(url) {
                // permalink.php?story_fbid=<post>&id=<page> -> /<page>/posts/<post>
                return Ok(format!(
                    "https://www.facebook.com/{}/posts/{}",
                    &caps[2], &caps[1]
                ));
            }
            if FACEBOOK_POSTS_RE.is_match(url) {
                return Ok(url.to_string());
            }
            Err(AppError::Validation(
                "Invalid Facebook URL format".to_string(),
            ))
        }
        "instagram" => {
            if INSTAGRAM_RE.is_match(url) {
                Ok(url.to_string())
            } else {
                Err(AppError::Validation(
                    "Invalid Instagram URL format".to_string(),
                ))
            }
        }
        "twitter" => {
            if TWITTER_RE.is_match(url) {
                Ok(url.to_string())
            } else {
                Err(AppError::Validation(
                    "Invalid Twitter URL format".to_string(),
                ))
            }
        }
        "linkedin" => {
            if LINKEDIN_RE.is_match(url) {
                Ok(url.to_string())
            } else {
                Err(AppError::Validation(
                    "Invalid LinkedIn URL format".to_string(),
                ))
            }
        }
        "reddit" => {
            if REDDIT_RE.is_match(url) {
                Ok(url.to_string())
            } else {
                Err(AppError::Validation(
                    "Invalid Reddit URL format".to_string(),
                ))
            }
        }
        _ => Ok(url.to_string()),
    }
}

/// Request to create a channel.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateChannelRequest {
    /// Channel name, unique across all channels (case-insensitive).
    pub name: String,
    /// CSS selector identifying the region to screenshot.
    pub selector: String,
    /// Operator-authored script run in-page before capture.
    #[serde(default)]
    pub bypass_script: Option<String>,
}

impl CreateChannelRequest {
    /// Reject missing/empty required fields before any side effect.
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("Channel name is required".to_string()));
        }
        if self.selector.trim().is_empty() {
            return Err(AppError::Validation("Selector is required".to_string()));
        }
        Ok(())
    }
}

/// Request to update a channel's selector or bypass script.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateChannelRequest {
    #[serde(default)]
    pub selector: Option<String>,
    /// New bypass script; an empty string clears it.
    #[serde(default)]
    pub bypass_script: Option<String>,
}

/// One link (scenario) of a channel as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LinkSummary {
    pub id: Uuid,
    pub url: String,
    pub scenario: String,
    /// S3 key of the current baseline image, if established.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_location: Option<String>,
    /// S3 key of the latest test capture, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_location: Option<String>,
}

/// A channel with its links.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChannelDetail {
    pub id: Uuid,
    pub name: String,
    pub selector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bypass_script: Option<String>,
    pub links: Vec<LinkSummary>,
    pub created_at: DateTime<Utc>,
}

/// Response for the channel listing endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChannelListResponse {
    pub channels: Vec<ChannelDetail>,
}

/// Request to add a link to a channel (establishes the baseline).
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddLinkRequest {
    pub url: String,
    pub scenario: String,
}

impl AddLinkRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.url.trim().is_empty() {
            return Err(AppError::Validation("URL is required".to_string()));
        }
        if self.scenario.trim().is_empty() {
            return Err(AppError::Validation("Scenario is required".to_string()));
        }
        Ok(())
    }
}

/// A screenshot reference (baseline) as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReferenceView {
    pub id: Uuid,
    pub channel: String,
    pub url: String,
    pub image_location: String,
    pub viewport: String,
}

impl From<crate::entity::screenshot_reference::Model> for ReferenceView {
    fn from(model: crate::entity::screenshot_reference::Model) -> Self {
        ReferenceView {
            id: model.id,
            channel: model.channel_name,
            url: model.url,
            image_location: model.image_location,
            viewport: model.viewport,
        }
    }
}

/// Response after establishing a baseline for a new link.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AddLinkResponse {
    pub link: LinkSummary,
    pub reference: ReferenceView,
}

/// Request to delete one link from a channel.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DeleteLinkRequest {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_channel_name() {
        assert_eq!(normalize_channel_name("  Facebook "), "facebook");
        assert_eq!(normalize_channel_name("LinkedIn"), "linkedin");
    }

    #[test]
    fn test_facebook_permalink_is_rewritten() {
        let url = "https://www.facebook.com/permalink.php?story_fbid=123456&id=mypage";
        let canonical = canonicalize_url("facebook", url).unwrap();
        assert_eq!(canonical, "https://www.facebook.com/mypage/posts/123456");
    }

    #[test]
    fn test_facebook_posts_url_passes_through() {
        let url = "https://www.facebook.com/mypage/posts/123456";
        assert_eq!(canonicalize_url("facebook", url).unwrap(), url);
    }

    #[test]
    fn test_facebook_rejects_other_urls() {
        assert!(canonicalize_url("facebook", "https://www.facebook.com/mypage").is_err());
        assert!(canonicalize_url("Facebook", "https://example.com").is_err());
    }

    #[test]
    fn test_instagram_validation() {
        assert!(canonicalize_url("instagram", "https://www.instagram.com/p/Cxyz123").is_ok());
        assert!(canonicalize_url("instagram", "https://www.instagram.com/someuser").is_err());
    }

    #[test]
    fn test_twitter_validation() {
        assert!(canonicalize_url("twitter", "https://x.com/user/status/123456789").is_ok());
        assert!(canonicalize_url("twitter", "https://x.com/user/statuses/123456789").is_ok());
        assert!(canonicalize_url("twitter", "https://x.com/user").is_err());
    }

    #[test]
    fn test_linkedin_validation() {
        assert!(
            canonicalize_url(
                "linkedin",
                "https://www.linkedin.com/feed/update/urn:li:activity:7000000000000000000"
            )
            .is_ok()
        );
        assert!(canonicalize_url("linkedin", "https://www.linkedin.com/jobs/view/1").is_err());
    }

    #[test]
    fn test_reddit_validation() {
        assert!(
            canonicalize_url(
                "reddit",
                "https://www.reddit.com/r/rust/comments/abc123/some_title"
            )
            .is_ok()
        );
        assert!(canonicalize_url("reddit", "https://www.reddit.com/r/rust").is_err());
    }

    #[test]
    fn test_unknown_channel_passes_through() {
        let url = "https://mastodon.social/@user/123";
        assert_eq!(canonicalize_url("mastodon", url).unwrap(), url);
    }

    #[test]
    fn test_empty_url_is_rejected() {
        assert!(canonicalize_url("facebook", "  ").is_err());
    }

    #[test]
    fn test_create_channel_request_validation() {
        let ok = CreateChannelRequest {
            name: "facebook".to_string(),
            selector: "div[role=article]".to_string(),
            bypass_script: None,
        };
        assert!(ok.validate().is_ok());

        let missing_selector = CreateChannelRequest {
            name: "facebook".to_string(),
            selector: "  ".to_string(),
            bypass_script: None,
        };
        assert!(missing_selector.validate().is_err());
    }
}
