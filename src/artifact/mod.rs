//! Artifact records and their on-disk materialization.
//!
//! An [`Artifact`] is one downloadable item found on a list page: its
//! metadata plus a torrent file, a primary image and zero or more secondary
//! images. [`Materializer`] turns one artifact into a directory:
//!
//! ```text
//! <output>/<id>/metadata.json
//! <output>/<id>/<torrent file>
//! <output>/<id>/<thumbnail file>
//! <output>/<id>/extrafanart/<extra image files>
//! ```

mod error;
mod materializer;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::ser::PrettyFormatter;

pub use error::{ArtifactFailure, FailureReason, FileTarget, MaterializeError};
pub use materializer::{
    EXTRA_IMAGE_CONCURRENCY, EXTRA_IMAGE_DIR, METADATA_FILE, MaterializeReport, Materializer,
};

/// One item discovered on a list page.
///
/// Field names serialize exactly as they appear in `metadata.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Site-unique identifier; also the artifact's directory name.
    #[serde(rename = "ID")]
    pub id: String,
    /// Display name.
    #[serde(rename = "Name")]
    pub name: String,
    /// Size label as shown on the page (e.g. `1.2 GB`).
    #[serde(rename = "Size")]
    pub size: String,
    /// Publish date string derived from a URL path, e.g. `2022-03-11`.
    #[serde(rename = "Time")]
    pub time: String,
    /// Absolute torrent URL.
    #[serde(rename = "TorrentUrl")]
    pub torrent_url: String,
    /// Tag texts in page order.
    #[serde(rename = "Tag", default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    /// Performer names. Never populated by the extractor.
    #[serde(rename = "Actress", default, deserialize_with = "null_as_empty")]
    pub actresses: Vec<String>,
    /// Primary image URL; empty when the card had none.
    #[serde(rename = "ImageUrl")]
    pub image_url: String,
    /// Secondary image URLs in page order.
    #[serde(rename = "ExtraImageUrl", default, deserialize_with = "null_as_empty")]
    pub extra_image_urls: Vec<String>,
}

impl Artifact {
    /// Serializes the artifact as tab-indented JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; plain string fields cannot fail in practice.
    pub fn to_metadata_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut out = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"\t"));
        self.serialize(&mut serializer)?;
        Ok(out)
    }

    /// Parses a previously written `metadata.json`.
    ///
    /// Sequences written as `null` read back as empty.
    ///
    /// # Errors
    ///
    /// Returns the deserializer error for malformed input.
    pub fn from_metadata_json(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
