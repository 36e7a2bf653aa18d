use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "mocks"))]
use mockall::{automock, predicate::*};

/// Snapshot of a product document as stored in the products table.
/// Read-only for this component.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProductRecord {
    pub price: f64,
    pub name: Option<String>,
    #[serde(rename = "favoritedBy", default)]
    pub favorited_by: Vec<String>,
}

/// Before/after pair delivered by the change feed for one product update.
#[derive(Debug, Clone)]
pub struct ProductChangeEvent {
    pub product_id: String,
    pub before: ProductRecord,
    pub after: ProductRecord,
}

/// User document from the users table, keyed by userId. Either field may be
/// missing; a user with neither is simply not a recipient.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserRecord {
    pub email: Option<String>,
    #[serde(rename = "fcmToken")]
    pub fcm_token: Option<String>,
}

/// Where a notification can be delivered. A user contributes one entry per
/// channel they have an address for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecipientAddress {
    Email(String),
    PushToken(String),
}

/// One price-drop notification to fan out, derived from a single change
/// event. Owns the message templates for both channels.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationJob {
    pub product_id: String,
    pub old_price: f64,
    pub new_price: f64,
    pub product_name: String,
}

impl NotificationJob {
    pub fn subject(&self) -> String {
        format!(
            "One of your favorite products dropped in price on SeneMarket: {}",
            self.product_name
        )
    }

    pub fn body(&self) -> String {
        format!(
            "Hi, the price of your favorite product {} dropped. It went from ${} to ${}. This is a great moment to buy, don't miss out on it.",
            self.product_name, self.old_price, self.new_price
        )
    }
}

/// Per-recipient delivery result. Kept for logging only, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOutcome {
    pub recipient: RecipientAddress,
    pub success: bool,
    pub error_detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
}

/// Result of one token within a bulk push send.
#[derive(Debug, Clone, PartialEq)]
pub struct PushSendResult {
    pub token: String,
    pub error: Option<String>,
}

#[cfg_attr(any(test, feature = "mocks"), automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, String>;
}

#[cfg_attr(any(test, feature = "mocks"), automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), String>;
}

#[cfg_attr(any(test, feature = "mocks"), automock)]
#[async_trait]
pub trait PushSender: Send + Sync {
    /// One bulk call covering every token, returning a result per token in
    /// input order.
    async fn send_to_tokens(
        &self,
        tokens: &[String],
        notification: &PushNotification,
        product_id: &str,
    ) -> Result<Vec<PushSendResult>, String>;
}
