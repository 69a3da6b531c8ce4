//! # Game Database Integration
//!
//! Token management, query building and the HTTP client for the external
//! game database, plus helpers that derive media URLs from stored ids.

pub mod client;
pub mod query;
pub mod token;
pub mod types;

pub use client::IgdbClient;
pub use token::TokenManager;
pub use types::GameBundle;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Size variants served by the image CDN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImageSize {
    CoverSmall,
    CoverBig,
    ScreenshotMed,
    ScreenshotBig,
    ScreenshotHuge,
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    Hd1080,
    Original,
}

impl ImageSize {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageSize::CoverSmall => "cover_small",
            ImageSize::CoverBig => "cover_big",
            ImageSize::ScreenshotMed => "screenshot_med",
            ImageSize::ScreenshotBig => "screenshot_big",
            ImageSize::ScreenshotHuge => "screenshot_huge",
            ImageSize::Hd720 => "720p",
            ImageSize::Hd1080 => "1080p",
            ImageSize::Original => "original",
        }
    }
}

/// `{base}/t_{size}/{image_id}.jpg`
pub fn image_url(base: &str, image_id: &str, size: ImageSize) -> String {
    format!(
        "{}/t_{}/{}.jpg",
        base.trim_end_matches('/'),
        size.as_str(),
        image_id
    )
}

pub fn youtube_watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

pub fn youtube_thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{video_id}/hqdefault.jpg")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_urls_use_size_prefix() {
        assert_eq!(
            image_url(
                "https://images.igdb.com/igdb/image/upload/",
                "co1wyy",
                ImageSize::CoverBig
            ),
            "https://images.igdb.com/igdb/image/upload/t_cover_big/co1wyy.jpg"
        );
        assert_eq!(
            image_url("https://cdn.test", "sc6lhf", ImageSize::Hd1080),
            "https://cdn.test/t_1080p/sc6lhf.jpg"
        );
    }

    #[test]
    fn image_size_serializes_like_cdn_names() {
        assert_eq!(
            serde_json::to_string(&ImageSize::Hd720).unwrap(),
            "\"720p\""
        );
        assert_eq!(
            serde_json::from_str::<ImageSize>("\"screenshot_huge\"").unwrap(),
            ImageSize::ScreenshotHuge
        );
    }

    #[test]
    fn youtube_urls() {
        assert_eq!(
            youtube_watch_url("dQw4w9WgXcQ"),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert!(youtube_thumbnail_url("abc").ends_with("/vi/abc/hqdefault.jpg"));
    }
}
