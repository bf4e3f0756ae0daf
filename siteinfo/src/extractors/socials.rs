//! Social-media handle and link resolution.

use std::collections::BTreeMap;
use tracing::{debug, warn};
use url::Url;

use super::name::resolve_name;
use super::pages::guess_page_url;
use super::{batch_outcome, ExtractionContext};
use crate::errors::ExtractionError;
use crate::matching;
use crate::registry::SocialPlatformRegistry;
use crate::request::FieldKey;
use crate::result::{FieldFailure, FieldOutcome, FieldValue, Leaf};

/// Pages searched for social links before the site itself.
const PROFILE_PAGES: [&str; 2] = ["contact", "about"];

/// Links containing `needle`, case-insensitively, in their original order.
#[must_use]
pub fn links_related_to<'a>(links: &'a [String], needle: &str) -> Vec<&'a String> {
    let needle = needle.to_lowercase();
    links
        .iter()
        .filter(|link| link.to_lowercase().contains(&needle))
        .collect()
}

/// Finds the site's profile URL on one social platform.
///
/// The contact and about pages are searched first. When neither yields a
/// link, the base site's own links are searched and the one closest to the
/// site's name is picked.
///
/// # Errors
///
/// Returns an error if the target page cannot be read or the request was
/// cancelled. Sub-page failures are skipped.
pub async fn find_social_handle(
    ctx: &ExtractionContext,
    platform: &str,
) -> Result<Option<String>, ExtractionError> {
    ctx.ensure_active()?;

    for label in PROFILE_PAGES {
        match handle_on_profile_page(ctx, label, platform).await {
            Ok(Some(handle)) => {
                debug!(platform, page = label, handle = %handle, "Found social handle");
                return Ok(Some(handle));
            }
            Ok(None) => {}
            Err(ExtractionError::Provider(err)) => {
                warn!(platform, page = label, error = %err, "Skipping profile page");
            }
            Err(err) => return Err(err),
        }
    }

    let name = resolve_name(ctx).await?;
    let links = ctx.provider().find_links(ctx.url(), ctx.depth()).await?;
    let related = links_related_to(&links, platform);

    if let Some(name) = name {
        if let Some(best) = matching::best_match(
            &name.to_lowercase(),
            &related,
            ctx.config().handle_cutoff,
        ) {
            debug!(platform, handle = %best, "Picked social handle by site name");
            return Ok(Some(best));
        }
    }
    Ok(related.first().map(|link| (*link).clone()))
}

async fn handle_on_profile_page(
    ctx: &ExtractionContext,
    label: &str,
    platform: &str,
) -> Result<Option<String>, ExtractionError> {
    let Some(page_url) = guess_page_url(ctx, label).await? else {
        return Ok(None);
    };
    let is_web = Url::parse(&page_url)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false);
    if !is_web {
        return Ok(None);
    }
    let Some(sub) = ctx.scoped_to(page_url) else {
        return Ok(None);
    };

    if let Some(handle) = guess_page_url(&sub, platform).await? {
        return Ok(Some(handle));
    }
    let links = sub.provider().find_links(sub.url(), sub.depth()).await?;
    Ok(links_related_to(&links, platform)
        .first()
        .map(|link| (*link).clone()))
}

/// Finds the site's handles on several platforms concurrently.
///
/// `None` searches every registered platform except the site's own. Only
/// platforms with a handle appear in the result.
pub async fn resolve_social_handles(
    ctx: &ExtractionContext,
    platforms: Option<Vec<String>>,
) -> FieldOutcome {
    let platforms = match platforms {
        Some(platforms) => platforms,
        None => match ctx.base_url() {
            Ok(base) => SocialPlatformRegistry::default_platforms_for(&base),
            Err(err) => {
                return FieldOutcome::from(FieldValue::empty_for(FieldKey::SiteSocials))
                    .with_failures(vec![FieldFailure::new(
                        FieldKey::SiteSocials.as_str(),
                        err.to_string(),
                    )]);
            }
        },
    };

    let lookup_ctx = ctx.clone();
    let results = ctx
        .resolver()
        .resolve_all(platforms, move |platform: String| {
            let ctx = lookup_ctx.clone();
            async move { find_social_handle(&ctx, &platform).await }
        })
        .await;

    let (entries, failures) =
        batch_outcome(FieldKey::SiteSocials, results, |handle| handle.flatten().map(Leaf::Text));
    FieldOutcome::from(FieldValue::Map(entries)).with_failures(failures)
}

/// Collects every link of the site that mentions each platform.
///
/// `None` searches every registered platform except the site's own.
/// Platforms without links map to empty.
///
/// # Errors
///
/// Returns an error if the target page cannot be read.
pub async fn resolve_social_links(
    ctx: &ExtractionContext,
    platforms: Option<Vec<String>>,
) -> Result<FieldValue, ExtractionError> {
    ctx.ensure_active()?;
    let platforms = match platforms {
        Some(platforms) => platforms,
        None => SocialPlatformRegistry::default_platforms_for(&ctx.base_url()?),
    };

    let links = ctx.provider().find_links(ctx.url(), ctx.depth()).await?;
    let entries: BTreeMap<String, Leaf> = platforms
        .into_iter()
        .map(|platform| {
            let related = links_related_to(&links, &platform)
                .into_iter()
                .cloned()
                .collect();
            (platform, Leaf::from_list(related))
        })
        .collect();
    Ok(FieldValue::Map(entries))
}
