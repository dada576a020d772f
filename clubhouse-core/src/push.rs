//! Push notification boundary.
//!
//! Delivery fan-out belongs to the hosted messaging gateway; the core only
//! shapes the message and defines the dispatch seam. Pushes are a side
//! effect of notice creation and nothing else.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ClubResult;
use crate::notice::Notice;

/// Tag prepended to push titles for important notices.
const IMPORTANT_TAG: &str = "【重要】";

/// Longest body forwarded to the gateway; the rest is elided.
const BODY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    /// None broadcasts to every member with a registered device token.
    pub target_user_id: Option<Uuid>,
}

impl PushMessage {
    /// Shape the push for a freshly created notice.
    pub fn for_notice(notice: &Notice) -> Self {
        let title = if notice.is_important {
            format!("{IMPORTANT_TAG}{}", notice.title)
        } else {
            notice.title.clone()
        };
        let body = if notice.content.chars().count() > BODY_LIMIT {
            let truncated: String = notice.content.chars().take(BODY_LIMIT).collect();
            format!("{truncated}...")
        } else {
            notice.content.clone()
        };
        PushMessage {
            title,
            body,
            target_user_id: notice.target_user_id,
        }
    }
}

/// Messaging gateway seam. Implementations resolve device tokens and
/// request delivery; they return how many devices were reached.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, message: &PushMessage) -> ClubResult<usize>;
}

/// Dispatcher that drops everything; used when no gateway is configured.
pub struct NoopDispatcher;

#[async_trait]
impl NotificationDispatcher for NoopDispatcher {
    async fn dispatch(&self, message: &PushMessage) -> ClubResult<usize> {
        tracing::debug!(title = %message.title, "push gateway not configured, dropping message");
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn notice(title: &str, content: &str, important: bool) -> Notice {
        Notice {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            is_important: important,
            target_user_id: None,
            expires_at: None,
            attachment_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn important_notices_get_a_tagged_title() {
        let message = PushMessage::for_notice(&notice("例会変更", "会場が変わります", true));
        assert_eq!(message.title, "【重要】例会変更");
        assert_eq!(message.body, "会場が変わります");
    }

    #[test]
    fn long_bodies_are_elided_at_fifty_chars() {
        let content = "あ".repeat(60);
        let message = PushMessage::for_notice(&notice("連絡", &content, false));
        assert_eq!(message.body.chars().count(), 53);
        assert!(message.body.ends_with("..."));
    }

    #[test]
    fn target_carries_through() {
        let mut n = notice("個別連絡", "会費について", false);
        let target = Uuid::new_v4();
        n.target_user_id = Some(target);
        assert_eq!(
            PushMessage::for_notice(&n).target_user_id,
            Some(target)
        );
    }
}
