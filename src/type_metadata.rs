//! Compact routing token for queue entries.
//!
//! A token is `<entity_type>:<tag>[,<tag>...]`, e.g. `catalog_product:video_youtube`.
//! Tags keep the order the caller passed them in, so callers must build the
//! tag list in a canonical order for tokens to compare equal.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::error::{Result, SyncError};

const ENTITY_SEPARATOR: char = ':';
const TAG_SEPARATOR: &str = ",";
const VIDEO_FAMILY: &str = "video";

static TOKEN_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_\-]*$").expect("valid token regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Product,
    Category,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Product => "catalog_product",
            EntityType::Category => "catalog_category",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "catalog_product" => Some(EntityType::Product),
            "catalog_category" => Some(EntityType::Category),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeMetadata {
    pub entity_type: EntityType,
    pub asset_types: Vec<String>,
}

impl TypeMetadata {
    pub fn new(entity_type: EntityType, asset_types: Vec<String>) -> Self {
        Self {
            entity_type,
            asset_types,
        }
    }

    pub fn product_video(source: &VideoSource) -> Self {
        Self::new(EntityType::Product, vec![source.type_tag()])
    }

    pub fn encode(&self) -> String {
        format!(
            "{}{}{}",
            self.entity_type.as_str(),
            ENTITY_SEPARATOR,
            self.asset_types.join(TAG_SEPARATOR)
        )
    }

    pub fn decode(token: &str) -> Result<Self> {
        let (entity, tags) = token
            .split_once(ENTITY_SEPARATOR)
            .ok_or_else(|| SyncError::Format(format!("missing entity separator in '{token}'")))?;
        let entity_type = EntityType::parse(entity)
            .ok_or_else(|| SyncError::Format(format!("unknown entity type '{entity}'")))?;

        let asset_types = tags
            .split(TAG_SEPARATOR)
            .map(|tag| {
                if TOKEN_PART.is_match(tag) {
                    Ok(tag.to_string())
                } else {
                    Err(SyncError::Format(format!("invalid asset tag '{tag}' in '{token}'")))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            entity_type,
            asset_types,
        })
    }

    /// Coarse family check, e.g. "is this any flavor of video".
    pub fn has_family(&self, family: &str) -> bool {
        self.asset_types
            .iter()
            .any(|t| t == family || t.starts_with(&format!("{family}_")))
    }
}

impl fmt::Display for TypeMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Video providers known to the pipeline. Anything else is carried through as
/// `Unsupported` so the handler can skip it explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VideoSource {
    Youtube,
    Vimeo,
    Unsupported(String),
}

impl VideoSource {
    pub fn from_format(format: &str) -> Self {
        match format {
            "youtube" => VideoSource::Youtube,
            "vimeo" => VideoSource::Vimeo,
            other => VideoSource::Unsupported(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            VideoSource::Youtube => "youtube",
            VideoSource::Vimeo => "vimeo",
            VideoSource::Unsupported(other) => other,
        }
    }

    pub fn type_tag(&self) -> String {
        format!("{VIDEO_FAMILY}_{}", self.as_str())
    }
}

/// Asset kinds with a registered handler family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetKind {
    ProductVideo(VideoSource),
}

impl AssetKind {
    pub fn from_metadata(metadata: &TypeMetadata) -> Result<Self> {
        if metadata.entity_type == EntityType::Product && metadata.has_family(VIDEO_FAMILY) {
            let source = metadata
                .asset_types
                .iter()
                .find_map(|t| {
                    if t == VIDEO_FAMILY {
                        Some(VideoSource::Unsupported(String::new()))
                    } else {
                        t.strip_prefix("video_").map(VideoSource::from_format)
                    }
                })
                .unwrap_or(VideoSource::Unsupported(String::new()));
            return Ok(AssetKind::ProductVideo(source));
        }
        Err(SyncError::UnsupportedType(metadata.encode()))
    }

    pub fn from_token(token: &str) -> Result<Self> {
        Self::from_metadata(&TypeMetadata::decode(token)?)
    }
}
