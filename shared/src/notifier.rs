use std::collections::HashSet;

use futures::future::join_all;
use tracing::{error, info, warn};

use crate::core::{
    DeliveryOutcome, EmailMessage, EmailSender, NotificationJob, ProductChangeEvent,
    PushNotification, PushSender, RecipientAddress, UserStore,
};

/// Display name used when a product document carries no name.
const DEFAULT_PRODUCT_NAME: &str = "Your product";

/// How a price-drop job ended. Per job the pipeline moves
/// RECEIVED -> (SKIPPED | EVALUATING) -> (NO_RECIPIENTS | DISPATCHING) -> DONE,
/// with nothing persisted between invocations.
#[derive(Debug, PartialEq)]
pub enum JobOutcome {
    /// The price did not drop; nothing was fetched or sent.
    Skipped,
    /// The price dropped but nobody resolved to a deliverable address.
    NoRecipients,
    /// Dispatch was attempted for every resolved recipient, successful or not.
    Dispatched(Vec<DeliveryOutcome>),
}

/// Reacts to a product update: decides whether the price dropped, resolves
/// the favoriting users to addresses and fans the notification out, tolerating
/// individual delivery failures. Constructed once at process start with the
/// real store and provider clients; tests inject mocks.
pub struct PriceDropNotifier<S: UserStore, E: EmailSender, P: PushSender> {
    user_store: S,
    email_sender: E,
    push_sender: P,
    from_address: String,
}

impl<S: UserStore, E: EmailSender, P: PushSender> PriceDropNotifier<S, E, P> {
    pub fn new(user_store: S, email_sender: E, push_sender: P, from_address: String) -> Self {
        Self {
            user_store,
            email_sender,
            push_sender,
            from_address,
        }
    }

    /// Runs one change event through the whole pipeline.
    pub async fn handle(&self, event: &ProductChangeEvent) -> JobOutcome {
        let Some(job) = self.evaluate(event) else {
            return JobOutcome::Skipped;
        };
        let recipients = self.resolve_recipients(&event.after.favorited_by).await;
        if recipients.is_empty() {
            info!(
                "No deliverable recipients for product {}, nothing to send",
                job.product_id
            );
            return JobOutcome::NoRecipients;
        }
        let outcomes = self.dispatch(&job, &recipients).await;
        info!(
            "Finished job for product {}: {} of {} deliveries succeeded",
            job.product_id,
            outcomes.iter().filter(|outcome| outcome.success).count(),
            outcomes.len()
        );
        JobOutcome::Dispatched(outcomes)
    }

    /// Decides whether the event warrants a notification. Only a strict price
    /// drop triggers; any other change is a normal skip, not an error.
    pub fn evaluate(&self, event: &ProductChangeEvent) -> Option<NotificationJob> {
        if event.after.price >= event.before.price {
            info!(
                "Price of product {} did not drop ({} -> {}), skipping",
                event.product_id, event.before.price, event.after.price
            );
            return None;
        }
        info!(
            "Product {}: price before = {}, price now = {}",
            event.product_id, event.before.price, event.after.price
        );
        Some(NotificationJob {
            product_id: event.product_id.clone(),
            old_price: event.before.price,
            new_price: event.after.price,
            product_name: event
                .after
                .name
                .clone()
                .unwrap_or_else(|| DEFAULT_PRODUCT_NAME.to_string()),
        })
    }

    /// Looks up every distinct favoriting user concurrently and collects the
    /// addresses they can be reached at, deduplicated per channel. A missing
    /// or malformed record never blocks resolution of the others.
    pub async fn resolve_recipients(&self, favorited_by: &[String]) -> Vec<RecipientAddress> {
        let mut seen_ids = HashSet::new();
        let distinct_ids: Vec<&str> = favorited_by
            .iter()
            .map(String::as_str)
            .filter(|user_id| seen_ids.insert(*user_id))
            .collect();

        let fetches = distinct_ids
            .iter()
            .map(|&user_id| async move { (user_id, self.user_store.get_user(user_id).await) });
        let fetched_users = join_all(fetches).await;

        let mut seen_addresses = HashSet::new();
        let mut recipients = Vec::new();
        for (user_id, fetched) in fetched_users {
            let record = match fetched {
                Ok(Some(record)) => record,
                Ok(None) => {
                    warn!("User {} not found, skipping", user_id);
                    continue;
                }
                Err(detail) => {
                    warn!("Failed to fetch user {}: {}", user_id, detail);
                    continue;
                }
            };
            if let Some(email) = record.email {
                let address = RecipientAddress::Email(email);
                if seen_addresses.insert(address.clone()) {
                    recipients.push(address);
                }
            }
            if let Some(token) = record.fcm_token {
                let address = RecipientAddress::PushToken(token);
                if seen_addresses.insert(address.clone()) {
                    recipients.push(address);
                }
            }
        }
        info!(
            "Resolved {} recipients from {} favoriting users",
            recipients.len(),
            distinct_ids.len()
        );
        recipients
    }

    /// Fans deliveries out and waits for all of them to settle. A failure for
    /// one recipient is logged and recorded, never raised, and never cancels
    /// the others.
    pub async fn dispatch(
        &self,
        job: &NotificationJob,
        recipients: &[RecipientAddress],
    ) -> Vec<DeliveryOutcome> {
        let mut emails = Vec::new();
        let mut tokens = Vec::new();
        for recipient in recipients {
            match recipient {
                RecipientAddress::Email(email) => emails.push(email.clone()),
                RecipientAddress::PushToken(token) => tokens.push(token.clone()),
            }
        }

        let email_sends = emails.iter().map(|to| self.send_one_email(job, to));
        let (mut outcomes, push_outcomes) = futures::join!(
            async { join_all(email_sends).await },
            self.send_push_batch(job, &tokens)
        );
        outcomes.extend(push_outcomes);
        outcomes
    }

    async fn send_one_email(&self, job: &NotificationJob, to: &str) -> DeliveryOutcome {
        let message = EmailMessage {
            to: to.to_string(),
            from: self.from_address.clone(),
            subject: job.subject(),
            text: job.body(),
        };
        match self.email_sender.send_email(&message).await {
            Ok(()) => {
                info!("Email sent to {}", to);
                DeliveryOutcome {
                    recipient: RecipientAddress::Email(to.to_string()),
                    success: true,
                    error_detail: None,
                }
            }
            Err(detail) => {
                error!("Failed to send email to {}: {}", to, detail);
                DeliveryOutcome {
                    recipient: RecipientAddress::Email(to.to_string()),
                    success: false,
                    error_detail: Some(detail),
                }
            }
        }
    }

    /// One bulk call for all tokens; the per-token result list is walked and
    /// each token's error logged individually.
    async fn send_push_batch(
        &self,
        job: &NotificationJob,
        tokens: &[String],
    ) -> Vec<DeliveryOutcome> {
        if tokens.is_empty() {
            return Vec::new();
        }
        let notification = PushNotification {
            title: job.subject(),
            body: job.body(),
        };
        match self
            .push_sender
            .send_to_tokens(tokens, &notification, &job.product_id)
            .await
        {
            Ok(results) => results
                .into_iter()
                .map(|result| {
                    if let Some(detail) = &result.error {
                        error!("Push delivery to token {} failed: {}", result.token, detail);
                    }
                    let success = result.error.is_none();
                    DeliveryOutcome {
                        recipient: RecipientAddress::PushToken(result.token),
                        success,
                        error_detail: result.error,
                    }
                })
                .collect(),
            Err(detail) => {
                error!("Bulk push send for product {} failed: {}", job.product_id, detail);
                tokens
                    .iter()
                    .map(|token| DeliveryOutcome {
                        recipient: RecipientAddress::PushToken(token.clone()),
                        success: false,
                        error_detail: Some(detail.clone()),
                    })
                    .collect()
            }
        }
    }
}
