//! Webhook payload parsing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Webhook action type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookAction {
    /// Entity created (label attached, page saved, ...)
    Created,
    /// Entity updated
    Updated,
    /// Entity deleted
    Deleted,
    /// Unknown action (catch-all to avoid parse failures)
    #[serde(other)]
    Unknown,
}

/// Label section of a label webhook
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelPayload {
    /// Article the labels belong to
    #[serde(default)]
    pub page_id: Option<String>,
    /// Labels as delivered. Kept untyped so that one malformed entry does
    /// not reject the whole delivery.
    #[serde(default)]
    pub labels: Vec<Value>,
}

/// Page section of a page webhook
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePayload {
    /// Article ID
    #[serde(default)]
    pub id: Option<String>,
    /// Article title
    #[serde(default)]
    pub title: Option<String>,
    /// Original URL
    #[serde(default)]
    pub original_url: Option<String>,
}

/// Main webhook payload structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    /// Action type
    pub action: WebhookAction,
    /// User the event belongs to
    #[serde(default)]
    pub user_id: Option<String>,
    /// Label payload (label events)
    #[serde(default)]
    pub label: Option<LabelPayload>,
    /// Page payload (page events)
    #[serde(default)]
    pub page: Option<PagePayload>,
}

impl WebhookEvent {
    /// Article the event refers to: `label.pageId`, falling back to `page.id`.
    #[must_use]
    pub fn page_id(&self) -> Option<&str> {
        let non_empty = |id: &&str| !id.is_empty();
        self.label
            .as_ref()
            .and_then(|l| l.page_id.as_deref())
            .filter(non_empty)
            .or_else(|| {
                self.page
                    .as_ref()
                    .and_then(|p| p.id.as_deref())
                    .filter(non_empty)
            })
    }

    /// Raw label entries of a label event.
    #[must_use]
    pub fn labels(&self) -> &[Value] {
        self.label.as_ref().map_or(&[], |l| l.labels.as_slice())
    }
}
