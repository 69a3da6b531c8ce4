//! Wire types for the game database API.
//!
//! Every record tolerates unknown fields. Sub-resources that the API may
//! return either as bare ids or as expanded objects are modelled with
//! [`Expandable`].

use serde::{Deserialize, Serialize};

/// Records that carry the external numeric identifier.
pub trait ExternalRecord {
    fn external_id(&self) -> i64;
}

/// A sub-resource reference that is either a bare id or an expanded object.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    Id(i64),
    Object(T),
}

impl<T: ExternalRecord> Expandable<T> {
    pub fn id(&self) -> i64 {
        match self {
            Expandable::Id(id) => *id,
            Expandable::Object(record) => record.external_id(),
        }
    }
}

impl<T> Expandable<T> {
    pub fn as_object(&self) -> Option<&T> {
        match self {
            Expandable::Id(_) => None,
            Expandable::Object(record) => Some(record),
        }
    }
}

/// Ids of the references that still need a lookup, in order, without duplicates.
pub fn unresolved_ids<T>(refs: &[Expandable<T>]) -> Vec<i64> {
    let mut ids = Vec::new();
    for reference in refs {
        if let Expandable::Id(id) = reference
            && !ids.contains(id)
        {
            ids.push(*id);
        }
    }
    ids
}

/// Replaces bare ids with the fetched records, keeping the original order.
///
/// Ids the lookup did not return are dropped.
pub fn merge_resolved<T: ExternalRecord + Clone>(
    refs: Vec<Expandable<T>>,
    fetched: Vec<T>,
) -> Vec<T> {
    refs.into_iter()
        .filter_map(|reference| match reference {
            Expandable::Object(record) => Some(record),
            Expandable::Id(id) => fetched
                .iter()
                .find(|record| record.external_id() == id)
                .cloned(),
        })
        .collect()
}

/// OAuth2 client-credentials token response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

/// A game record from the `/games` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct IgdbGame {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub storyline: Option<String>,
    /// Unix epoch seconds
    #[serde(default)]
    pub first_release_date: Option<i64>,
    /// User rating, 0-100
    #[serde(default)]
    pub rating: Option<f64>,
    /// Combined user and critic rating, 0-100
    #[serde(default)]
    pub total_rating: Option<f64>,
    #[serde(default)]
    pub total_rating_count: Option<i64>,
    /// Lifecycle status code
    #[serde(default)]
    pub status: Option<i32>,
    #[serde(default)]
    pub cover: Option<Expandable<IgdbImage>>,
    #[serde(default)]
    pub screenshots: Vec<Expandable<IgdbImage>>,
    #[serde(default)]
    pub videos: Vec<Expandable<IgdbVideo>>,
    #[serde(default)]
    pub platforms: Vec<Expandable<IgdbPlatform>>,
    #[serde(default)]
    pub genres: Vec<Expandable<IgdbGenre>>,
    #[serde(default)]
    pub external_games: Vec<Expandable<IgdbExternalGame>>,
    #[serde(default)]
    pub websites: Vec<Expandable<IgdbWebsite>>,
}

impl ExternalRecord for IgdbGame {
    fn external_id(&self) -> i64 {
        self.id
    }
}

/// Cover or screenshot image.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct IgdbImage {
    pub id: i64,
    #[serde(default)]
    pub image_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
}

impl ExternalRecord for IgdbImage {
    fn external_id(&self) -> i64 {
        self.id
    }
}

/// A video hosted on YouTube.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct IgdbVideo {
    pub id: i64,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl ExternalRecord for IgdbVideo {
    fn external_id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct IgdbPlatform {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub abbreviation: Option<String>,
}

impl ExternalRecord for IgdbPlatform {
    fn external_id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct IgdbGenre {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

impl ExternalRecord for IgdbGenre {
    fn external_id(&self) -> i64 {
        self.id
    }
}

/// A store listing of the game (Steam, GOG, ...).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct IgdbExternalGame {
    pub id: i64,
    #[serde(default)]
    pub category: Option<i32>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
}

impl ExternalRecord for IgdbExternalGame {
    fn external_id(&self) -> i64 {
        self.id
    }
}

/// An official or community website.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct IgdbWebsite {
    pub id: i64,
    #[serde(default)]
    pub category: Option<i32>,
    #[serde(default)]
    pub url: Option<String>,
}

impl ExternalRecord for IgdbWebsite {
    fn external_id(&self) -> i64 {
        self.id
    }
}

/// A game with every sub-resource resolved to a full record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameBundle {
    pub game: IgdbGame,
    pub cover: Option<IgdbImage>,
    pub screenshots: Vec<IgdbImage>,
    pub videos: Vec<IgdbVideo>,
    pub platforms: Vec<IgdbPlatform>,
    pub genres: Vec<IgdbGenre>,
}
