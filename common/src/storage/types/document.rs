use std::time::Duration;

use uuid::Uuid;

use crate::{storage::blob::PresignedLink, stored_object};

stored_object!(Document, "document", {
    file_name: String,
    link: String,
    collection_id: String,
    #[serde(serialize_with = "serialize_datetime", deserialize_with = "deserialize_datetime")]
    link_expiry: DateTime<Utc>
});

impl Document {
    pub fn new(id: Uuid, file_name: String, collection_id: Uuid, link: &PresignedLink) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            created_at: now,
            updated_at: now,
            file_name,
            link: link.url.to_string(),
            collection_id: collection_id.to_string(),
            link_expiry: link.expires_at,
        }
    }

    /// A link is stale once its expiry is no longer strictly after `now + margin`.
    pub fn link_is_stale(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        let margin =
            chrono::Duration::from_std(margin).unwrap_or_else(|_| chrono::Duration::days(36_500));
        match now.checked_add_signed(margin) {
            Some(threshold) => self.link_expiry <= threshold,
            None => true,
        }
    }
}

/// What callers see of a document: its display name, a valid link and its identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentLink {
    pub filename: String,
    pub link: String,
    pub document_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document_expiring_at(expiry: DateTime<Utc>) -> Document {
        let link = PresignedLink {
            url: url::Url::parse("http://localhost/blob").expect("url"),
            expires_at: expiry,
        };
        Document::new(Uuid::new_v4(), "report.pdf".into(), Uuid::new_v4(), &link)
    }

    #[test]
    fn new_document_copies_link_state() {
        let expiry = Utc::now() + chrono::Duration::days(7);
        let doc = document_expiring_at(expiry);
        assert_eq!(doc.link, "http://localhost/blob");
        assert_eq!(doc.link_expiry, expiry);
        assert_eq!(doc.file_name, "report.pdf");
    }

    #[test]
    fn link_staleness_is_literal_without_margin() {
        let now = Utc::now();
        let past = document_expiring_at(now - chrono::Duration::hours(1));
        let exact = document_expiring_at(now);
        let future = document_expiring_at(now + chrono::Duration::seconds(30));

        assert!(past.link_is_stale(now, Duration::ZERO));
        assert!(exact.link_is_stale(now, Duration::ZERO));
        assert!(!future.link_is_stale(now, Duration::ZERO));
    }

    #[test]
    fn refresh_margin_pulls_staleness_forward() {
        let now = Utc::now();
        let soon = document_expiring_at(now + chrono::Duration::hours(2));
        assert!(!soon.link_is_stale(now, Duration::ZERO));
        assert!(soon.link_is_stale(now, Duration::from_secs(24 * 60 * 60)));
    }
}
