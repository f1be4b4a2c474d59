//! Reading the block table and build version out of the loaded editor.

use crate::renderer::BrowsingSession;
use crate::types::{Catalog, ExtractError, ExtractResult};

/// Keys of the in-page block registry, in registration order.
pub const BLOCK_TABLE_SCRIPT: &str = "Object.keys(_Blockly.Blocks)";

/// Every script's `src` as resolved by the browser, in document order.
/// Inline scripts report an empty string.
pub const SCRIPT_SOURCES_SCRIPT: &str = "Array.from(document.scripts, s => s.src)";

/// Substring identifying the editor's main bundle among script resources.
pub const VERSION_MARKER: &str = "main";

/// Reads the block catalog from a ready session.
#[derive(Debug, Default, Clone, Copy)]
pub struct CatalogExtractor;

impl CatalogExtractor {
    pub async fn extract(&self, session: &dyn BrowsingSession) -> ExtractResult<Catalog> {
        let value = session.evaluate(BLOCK_TABLE_SCRIPT).await?;
        let keys: Vec<String> = serde_json::from_value(value)
            .map_err(|e| ExtractError::UnexpectedShape(e.to_string()))?;

        tracing::info!("got {} blocks", keys.len());
        Ok(Catalog::from_candidates(keys))
    }
}

/// Find the deployed editor version from the page's script tags.
///
/// Returns `None` when no script looks like the main bundle.
pub async fn detect_version(session: &dyn BrowsingSession) -> ExtractResult<Option<u64>> {
    let value = session.evaluate(SCRIPT_SOURCES_SCRIPT).await?;
    let sources: Vec<String> = serde_json::from_value(value)
        .map_err(|e| ExtractError::UnexpectedShape(e.to_string()))?;
    tracing::debug!(scripts = sources.len(), "Read script sources");

    version_from_sources(
        sources.iter().map(String::as_str).filter(|src| !src.is_empty()),
        VERSION_MARKER,
    )
}

/// First source (in document order) whose file name contains `marker` wins;
/// its parent path segment is the version.
pub fn version_from_sources<'a, I>(sources: I, marker: &str) -> ExtractResult<Option<u64>>
where
    I: IntoIterator<Item = &'a str>,
{
    for src in sources {
        let path = src.split(|c| c == '?' || c == '#').next().unwrap_or(src);
        let mut segments = path.rsplit('/');
        let Some(file) = segments.next() else {
            continue;
        };
        if !file.contains(marker) {
            continue;
        }

        return segments
            .next()
            .and_then(|segment| segment.parse::<u64>().ok())
            .map(Some)
            .ok_or_else(|| ExtractError::VersionSegment {
                src: src.to_string(),
            });
    }
    Ok(None)
}
