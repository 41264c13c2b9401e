//! 广告平台适配器：Meta、Google Ads、TikTok 与 LinkedIn 的具体错误约定。
//!
//! Concrete platform adapters.
//!
//! Each adapter encodes one platform's credential placement, success rule
//! and error taxonomy. They hold only immutable settings and can be shared
//! across any number of concurrent calls.

pub mod google_ads;
pub mod linkedin;
pub mod meta;
pub mod tiktok;

pub use google_ads::GoogleAdsAdapter;
pub use linkedin::LinkedInAdapter;
pub use meta::MetaAdapter;
pub use tiktok::TikTokAdapter;

use crate::adapter::PlatformAdapter;
use crate::config::PlatformSettings;
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;

/// Identifiers accepted by [`adapter_for`].
pub const PLATFORM_IDS: &[&str] = &[meta::PLATFORM_ID, google_ads::PLATFORM_ID, tiktok::PLATFORM_ID, linkedin::PLATFORM_ID];

/// Build the adapter for `platform_id` from its settings block.
pub fn adapter_for(platform_id: &str, settings: &PlatformSettings) -> Result<Arc<dyn PlatformAdapter>> {
    let adapter: Arc<dyn PlatformAdapter> = match platform_id {
        meta::PLATFORM_ID => Arc::new(MetaAdapter::from_settings(settings)),
        google_ads::PLATFORM_ID => Arc::new(GoogleAdsAdapter::from_settings(settings)),
        tiktok::PLATFORM_ID => Arc::new(TikTokAdapter::from_settings(settings)),
        linkedin::PLATFORM_ID => Arc::new(LinkedInAdapter::from_settings(settings)),
        other => {
            return Err(Error::configuration_with_context(
                format!("unknown platform '{}'", other),
                ErrorContext::new()
                    .with_field_path(format!("platforms.{}", other))
                    .with_details(format!("expected one of: {}", PLATFORM_IDS.join(", ")))
                    .with_source("platforms"),
            ))
        }
    };
    Ok(adapter)
}

/// Parse a duration like `"30s"` or `"1.5s"` into milliseconds.
pub(crate) fn parse_seconds_ms(raw: &str) -> Option<u64> {
    let secs: f64 = raw.trim().trim_end_matches('s').parse().ok()?;
    if secs.is_finite() && secs >= 0.0 {
        Some((secs * 1000.0) as u64)
    } else {
        None
    }
}
