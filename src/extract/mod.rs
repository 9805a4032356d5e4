//! List-page extraction.
//!
//! Turns one fetched list page into its artifact cards and a flag telling
//! whether the pagination control offers a further page. Parsing is fully
//! synchronous; the parsed document never crosses an `.await`.

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::artifact::Artifact;

const CARD: &str = ".card > .container > .columns";
const CARD_IMAGE: &str = ".column img";
const TITLE_ID: &str = ".card-content .title a";
const TITLE_SIZE: &str = ".card-content .title span";
const SUBTITLE_LINK: &str = ".card-content .subtitle a";
const TAG_LINK: &str = ".card-content .tags a";
const NAME: &str = ".card-content .level";
const TORRENT_LINK: &str = ".card-content .field > .control > a";
const LAST_PAGINATION_LINK: &str = ".pagination-list li:last-child > a";

/// Marker class carried by the last pagination link while more pages follow.
const NEXT_PAGE_CLASS: &str = "is-inverted";

/// Publish path used when a card has no subtitle link.
const DEFAULT_TIME_PATH: &str = "/1970/01/01";

/// Errors that abort extraction of a whole page.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// A CSS selector failed to compile.
    #[error("invalid selector '{selector}': {message}")]
    Selector {
        /// The selector source text.
        selector: String,
        /// The parser's complaint.
        message: String,
    },
}

/// Everything extracted from one list page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Artifacts in document order. Cards without a usable torrent link are
    /// already dropped.
    pub artifacts: Vec<Artifact>,
    /// Whether the pagination control offers a further page.
    pub has_next_page: bool,
}

struct Selectors {
    card: Selector,
    image: Selector,
    id: Selector,
    size: Selector,
    subtitle: Selector,
    tag: Selector,
    name: Selector,
    torrent: Selector,
    last_pagination: Selector,
}

impl Selectors {
    fn compile() -> Result<Self, ExtractError> {
        Ok(Self {
            card: compile(CARD)?,
            image: compile(CARD_IMAGE)?,
            id: compile(TITLE_ID)?,
            size: compile(TITLE_SIZE)?,
            subtitle: compile(SUBTITLE_LINK)?,
            tag: compile(TAG_LINK)?,
            name: compile(NAME)?,
            torrent: compile(TORRENT_LINK)?,
            last_pagination: compile(LAST_PAGINATION_LINK)?,
        })
    }
}

fn compile(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Extracts artifacts and the next-page flag from a list page.
///
/// Relative torrent links and image sources are resolved against `page_url`.
/// Per-card anomalies are logged and recovered locally: an image without
/// `src` is skipped, a card without a resolvable torrent link is dropped.
///
/// # Errors
///
/// Returns [`ExtractError::Selector`] if a selector fails to compile.
#[instrument(skip(html, page_url), fields(url = %page_url))]
pub fn extract_page(html: &str, page_url: &Url) -> Result<ExtractedPage, ExtractError> {
    let selectors = Selectors::compile()?;
    let document = Html::parse_document(html);

    let cards: Vec<ElementRef<'_>> = document.select(&selectors.card).collect();
    debug!(cards = cards.len(), "found cards on page");

    let artifacts = cards
        .into_iter()
        .filter_map(|card| extract_card(card, &selectors, page_url))
        .collect();

    let has_next_page = document
        .select(&selectors.last_pagination)
        .any(|link| link.value().classes().any(|class| class == NEXT_PAGE_CLASS));

    Ok(ExtractedPage {
        artifacts,
        has_next_page,
    })
}

fn extract_card(card: ElementRef<'_>, selectors: &Selectors, page_url: &Url) -> Option<Artifact> {
    let mut artifact = Artifact::default();

    for (index, img) in card.select(&selectors.image).enumerate() {
        let Some(src) = img.value().attr("src") else {
            warn!(html = %img.html(), "image without src attribute, skipping");
            continue;
        };
        let Ok(resolved) = page_url.join(src) else {
            warn!(src, "cannot resolve image source, skipping");
            continue;
        };
        if index == 0 {
            artifact.image_url = resolved.into();
        } else {
            artifact.extra_image_urls.push(resolved.into());
        }
    }

    artifact.id = joined_text(card, &selectors.id);
    artifact.size = joined_text(card, &selectors.size);

    let time_path = card
        .select(&selectors.subtitle)
        .next()
        .and_then(|link| link.value().attr("href"))
        .unwrap_or(DEFAULT_TIME_PATH);
    artifact.time = time_path.replace('/', "-").trim_matches('-').to_string();

    artifact.tags = card
        .select(&selectors.tag)
        .map(|tag| tag.text().collect::<String>().trim().to_string())
        .collect();

    artifact.name = joined_text(card, &selectors.name);

    let Some(href) = card
        .select(&selectors.torrent)
        .next()
        .and_then(|link| link.value().attr("href"))
    else {
        warn!(id = %artifact.id, "card has no torrent link, skipping");
        return None;
    };
    match page_url.join(href) {
        Ok(torrent_url) => artifact.torrent_url = torrent_url.into(),
        Err(e) => {
            warn!(id = %artifact.id, href, error = %e, "cannot resolve torrent link, skipping");
            return None;
        }
    }

    debug!(id = %artifact.id, name = %artifact.name, "extracted artifact");
    Some(artifact)
}

/// Concatenated text of every match, trimmed.
fn joined_text(scope: ElementRef<'_>, selector: &Selector) -> String {
    scope
        .select(selector)
        .flat_map(|el| el.text())
        .collect::<String>()
        .trim()
        .to_string()
}
