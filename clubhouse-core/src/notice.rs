//! Announcements from the club office.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_important: bool,
    /// None means the notice is addressed to every member.
    pub target_user_id: Option<Uuid>,
    /// None means the notice never expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// Link to an attached document in object storage.
    pub attachment_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notice {
    /// A notice is shown to a member when it is broadcast or addressed to
    /// them, and has not expired.
    pub fn is_visible_to(&self, user_id: Uuid, now: DateTime<Utc>) -> bool {
        let addressed = match self.target_user_id {
            None => true,
            Some(target) => target == user_id,
        };
        let current = match self.expires_at {
            None => true,
            Some(expires) => expires > now,
        };
        addressed && current
    }
}

/// Fields supplied when creating or editing a notice.
#[derive(Debug, Clone, Deserialize)]
pub struct NoticeDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_important: bool,
    pub target_user_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
    pub attachment_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn notice(target: Option<Uuid>, expires: Option<DateTime<Utc>>) -> Notice {
        Notice {
            id: Uuid::new_v4(),
            title: "総会のお知らせ".to_string(),
            content: "次回例会は第2会議室です".to_string(),
            is_important: false,
            target_user_id: target,
            expires_at: expires,
            attachment_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn broadcast_notice_is_visible_to_everyone() {
        let user = Uuid::new_v4();
        assert!(notice(None, None).is_visible_to(user, Utc::now()));
    }

    #[test]
    fn targeted_notice_is_only_visible_to_its_target() {
        let target = Uuid::new_v4();
        let other = Uuid::new_v4();
        let n = notice(Some(target), None);
        assert!(n.is_visible_to(target, Utc::now()));
        assert!(!n.is_visible_to(other, Utc::now()));
    }

    #[test]
    fn expired_notice_is_hidden() {
        let user = Uuid::new_v4();
        let now = Utc::now();
        assert!(!notice(None, Some(now - Duration::hours(1))).is_visible_to(user, now));
        assert!(notice(None, Some(now + Duration::hours(1))).is_visible_to(user, now));
    }
}
