use iso8601_timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use strum::EnumIter;
use typed_builder::TypedBuilder;
use uuid::Uuid;

/// A notification as delivered to one recipient
///
/// Category, title and message are immutable once created; the only legal
/// mutation is flipping `read` from `false` to `true`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub category: NotificationCategory,
    pub title: SmolStr,
    pub message: String,
    pub read: bool,
    pub created_at: Timestamp,
}

/// Closed set of notification categories
///
/// Adding a category is a compile-time-checked change: `presentation`
/// matches exhaustively.
#[derive(Clone, Copy, Debug, Deserialize, EnumIter, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Spark,
    ForumReply,
    Achievement,
    System,
    ProfileView,
}

/// Presentation metadata for a notification category
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CategoryPresentation {
    pub icon: &'static str,
    pub accent: &'static str,
}

impl NotificationCategory {
    #[must_use]
    pub fn presentation(self) -> CategoryPresentation {
        match self {
            Self::Spark => CategoryPresentation {
                icon: "sparkles",
                accent: "yellow",
            },
            Self::ForumReply => CategoryPresentation {
                icon: "chat-bubble-left-right",
                accent: "blue",
            },
            Self::Achievement => CategoryPresentation {
                icon: "trophy",
                accent: "green",
            },
            Self::System => CategoryPresentation {
                icon: "information-circle",
                accent: "gray",
            },
            Self::ProfileView => CategoryPresentation {
                icon: "eye",
                accent: "purple",
            },
        }
    }
}

/// A notification that has not been persisted yet
#[derive(Clone, Debug, TypedBuilder)]
pub struct NewNotification {
    #[builder(default = Uuid::now_v7())]
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub category: NotificationCategory,
    #[builder(setter(into))]
    pub title: SmolStr,
    #[builder(setter(into))]
    pub message: String,
    #[builder(default = Timestamp::now_utc())]
    pub created_at: Timestamp,
}

impl NewNotification {
    #[must_use]
    pub fn spark(recipient_id: Uuid, sender_name: &str, post_title: Option<&str>) -> Self {
        let message = match post_title {
            Some(title) => format!("{sender_name} sent you a spark on \"{title}\""),
            None => format!("{sender_name} sent you a spark"),
        };

        Self::builder()
            .recipient_id(recipient_id)
            .category(NotificationCategory::Spark)
            .title("You received a spark!")
            .message(message)
            .build()
    }

    #[must_use]
    pub fn forum_reply(recipient_id: Uuid, replier_name: &str, post_title: &str) -> Self {
        Self::builder()
            .recipient_id(recipient_id)
            .category(NotificationCategory::ForumReply)
            .title("New Reply")
            .message(format!(
                "{replier_name} replied to your post \"{post_title}\""
            ))
            .build()
    }

    #[must_use]
    pub fn achievement(recipient_id: Uuid, achievement: &str) -> Self {
        Self::builder()
            .recipient_id(recipient_id)
            .category(NotificationCategory::Achievement)
            .title("Achievement Unlocked!")
            .message(format!("You've {achievement}!"))
            .build()
    }

    #[must_use]
    pub fn system(recipient_id: Uuid, title: &str, message: &str) -> Self {
        Self::builder()
            .recipient_id(recipient_id)
            .category(NotificationCategory::System)
            .title(title)
            .message(message)
            .build()
    }

    #[must_use]
    pub fn profile_view(recipient_id: Uuid, viewer_name: &str) -> Self {
        Self::builder()
            .recipient_id(recipient_id)
            .category(NotificationCategory::ProfileView)
            .title("Profile view")
            .message(format!("{viewer_name} viewed your profile"))
            .build()
    }
}

impl From<NewNotification> for Notification {
    fn from(value: NewNotification) -> Self {
        Self {
            id: value.id,
            recipient_id: value.recipient_id,
            category: value.category,
            title: value.title,
            message: value.message,
            read: false,
            created_at: value.created_at,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{NewNotification, Notification, NotificationCategory};
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use strum::IntoEnumIterator;
    use uuid::Uuid;

    #[test]
    fn presentation_is_distinct_per_category() {
        let icons: HashSet<&str> = NotificationCategory::iter()
            .map(|category| category.presentation().icon)
            .collect();

        assert_eq!(icons.len(), NotificationCategory::iter().count());
    }

    #[test]
    fn category_wire_names() {
        let mut serialised =
            simd_json::to_vec(&NotificationCategory::ForumReply).expect("serialise");
        let parsed: NotificationCategory =
            simd_json::from_slice(&mut serialised).expect("deserialise");

        assert_eq!(parsed, NotificationCategory::ForumReply);
        assert_eq!(
            String::from_utf8(simd_json::to_vec(&NotificationCategory::ForumReply).unwrap())
                .unwrap(),
            "\"forum_reply\""
        );
    }

    #[test]
    fn new_notifications_start_unread() {
        let recipient = Uuid::now_v7();
        let notification: Notification =
            NewNotification::spark(recipient, "Mina", Some("Saying no at work")).into();

        assert!(!notification.read);
        assert_eq!(notification.recipient_id, recipient);
        assert_eq!(notification.category, NotificationCategory::Spark);
        assert!(notification.message.contains("Saying no at work"));
    }
}
