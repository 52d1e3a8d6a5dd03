//! Publish policy: drafts, future-dated and expired pages.

use crate::config::BuildConfig;
use crate::page::PageMeta;
use crate::utils::date::DateTimeUtc;

pub fn is_draft(meta: &PageMeta) -> bool {
    meta.draft
}

/// Publish date (or date) lies after `now`.
pub fn is_future(meta: &PageMeta, now: DateTimeUtc) -> bool {
    meta.publish_date().is_some_and(|date| date > now)
}

/// Expiry date is at or before `now`.
pub fn is_expired(meta: &PageMeta, now: DateTimeUtc) -> bool {
    meta.expiry_date().is_some_and(|date| date <= now)
}

/// Which pages make it into the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishPolicy {
    pub drafts: bool,
    pub future: bool,
    pub expired: bool,
}

impl PublishPolicy {
    pub fn from_config(build: &BuildConfig) -> Self {
        Self {
            drafts: build.drafts,
            future: build.future,
            expired: build.expired,
        }
    }

    /// Reason a page is skipped, `None` when it is published.
    pub fn skip_reason(&self, meta: &PageMeta, now: DateTimeUtc) -> Option<&'static str> {
        if !self.drafts && is_draft(meta) {
            Some("draft")
        } else if !self.future && is_future(meta, now) {
            Some("future")
        } else if !self.expired && is_expired(meta, now) {
            Some("expired")
        } else {
            None
        }
    }

    pub fn includes(&self, meta: &PageMeta, now: DateTimeUtc) -> bool {
        self.skip_reason(meta, now).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTimeUtc {
        DateTimeUtc::from_ymd(2024, 6, 1)
    }

    fn strict() -> PublishPolicy {
        PublishPolicy::from_config(&BuildConfig::default())
    }

    #[test]
    fn test_draft_skipped_unless_enabled() {
        let meta = PageMeta {
            draft: true,
            ..PageMeta::default()
        };
        assert_eq!(strict().skip_reason(&meta, now()), Some("draft"));

        let lenient = PublishPolicy {
            drafts: true,
            ..strict()
        };
        assert!(lenient.includes(&meta, now()));
    }

    #[test]
    fn test_future_and_expired() {
        let future = PageMeta {
            date: Some("2024-07-01".into()),
            ..PageMeta::default()
        };
        assert!(is_future(&future, now()));
        assert_eq!(strict().skip_reason(&future, now()), Some("future"));

        let expired = PageMeta {
            expiry_date: Some("2024-06-01".into()),
            ..PageMeta::default()
        };
        assert!(is_expired(&expired, now()));
        assert!(!strict().includes(&expired, now()));

        let plain = PageMeta::default();
        assert!(strict().includes(&plain, now()));
    }
}
