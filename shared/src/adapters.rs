use crate::core::{
    EmailMessage, EmailSender, PushNotification, PushSendResult, PushSender, UserRecord, UserStore,
};
use async_trait::async_trait;
use aws_sdk_dynamodb::{types::AttributeValue, Client};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";
const FCM_SEND_URL: &str = "https://fcm.googleapis.com/fcm/send";

/// Point lookups against the users table.
#[derive(Debug)]
pub struct DynamoDbUserStore {
    table_name: String,
    dynamodb_client: Client,
}

impl DynamoDbUserStore {
    pub fn new(table_name: String, dynamodb_client: Client) -> Self {
        Self {
            table_name,
            dynamodb_client,
        }
    }
}

#[async_trait]
impl UserStore for DynamoDbUserStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, String> {
        let result = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .key("userId", AttributeValue::S(user_id.to_string()))
            .send()
            .await
            .map_err(|e| format!("Error fetching user {}: {:?}", user_id, e))?;

        Ok(result.item.map(user_record_from_item))
    }
}

/// A malformed attribute degrades to a missing field rather than an error;
/// the caller decides what a record without addresses means.
fn user_record_from_item(item: HashMap<String, AttributeValue>) -> UserRecord {
    UserRecord {
        email: item.get("email").and_then(|v| v.as_s().cloned().ok()),
        fcm_token: item.get("fcmToken").and_then(|v| v.as_s().cloned().ok()),
    }
}

/// Transactional email via the SendGrid v3 send API. The API key is injected
/// from configuration and never logged or echoed in errors.
#[derive(Debug)]
pub struct SendGridEmailSender {
    http_client: HttpClient,
    api_key: String,
}

impl SendGridEmailSender {
    pub fn new(http_client: HttpClient, api_key: String) -> Self {
        Self {
            http_client,
            api_key,
        }
    }
}

#[async_trait]
impl EmailSender for SendGridEmailSender {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), String> {
        let payload = json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": message.from },
            "subject": message.subject,
            "content": [{ "type": "text/plain", "value": message.text }],
        });

        let response = self
            .http_client
            .post(SENDGRID_SEND_URL)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| format!("Error calling SendGrid: {}", e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(format!("SendGrid rejected the send: {} {}", status, body))
        }
    }
}

/// Bulk push via the FCM send API: one request carrying every token, one
/// result per token in the response.
#[derive(Debug)]
pub struct FcmPushSender {
    http_client: HttpClient,
    server_key: String,
}

impl FcmPushSender {
    pub fn new(http_client: HttpClient, server_key: String) -> Self {
        Self {
            http_client,
            server_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FcmResponse {
    #[serde(default)]
    results: Vec<FcmTokenResult>,
}

#[derive(Debug, Deserialize)]
struct FcmTokenResult {
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl PushSender for FcmPushSender {
    async fn send_to_tokens(
        &self,
        tokens: &[String],
        notification: &PushNotification,
        product_id: &str,
    ) -> Result<Vec<PushSendResult>, String> {
        let payload = json!({
            "registration_ids": tokens,
            "notification": { "title": notification.title, "body": notification.body },
            "data": { "productId": product_id },
        });

        let response = self
            .http_client
            .post(FCM_SEND_URL)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| format!("Error calling FCM: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("FCM rejected the send: {} {}", status, body));
        }

        let parsed: FcmResponse = response
            .json()
            .await
            .map_err(|e| format!("Error parsing FCM response: {}", e))?;

        push_results_from_response(tokens, parsed)
    }
}

/// The results array must line up one-to-one with the tokens sent; anything
/// else means the batch outcome is unknown and the whole call is an error, so
/// no token silently drops out of the outcome list.
fn push_results_from_response(
    tokens: &[String],
    response: FcmResponse,
) -> Result<Vec<PushSendResult>, String> {
    if response.results.len() != tokens.len() {
        return Err(format!(
            "FCM returned {} results for {} tokens",
            response.results.len(),
            tokens.len()
        ));
    }
    Ok(tokens
        .iter()
        .zip(response.results)
        .map(|(token, result)| PushSendResult {
            token: token.clone(),
            error: result.error,
        })
        .collect())
}
