use aws_lambda_events::event::dynamodb::{Event, EventRecord};
use lambda_runtime::{tracing, Error, LambdaEvent};
use serde::Deserialize;
use shared::core::{EmailSender, ProductChangeEvent, ProductRecord, PushSender, UserStore};
use shared::notifier::PriceDropNotifier;

pub(crate) struct HandlerDeps<S: UserStore, E: EmailSender, P: PushSender> {
    pub notifier: PriceDropNotifier<S, E, P>,
}

#[derive(Debug, Deserialize)]
struct ProductKey {
    #[serde(rename = "productId")]
    product_id: String,
}

pub(crate) async fn function_handler<S: UserStore, E: EmailSender, P: PushSender>(
    deps: &HandlerDeps<S, E, P>,
    event: LambdaEvent<Event>,
) -> Result<(), Error> {
    for record in &event.payload.records {
        if record.event_name != "MODIFY" {
            tracing::debug!("Ignoring {} stream record", record.event_name);
            continue;
        }
        match parse_change(record) {
            Ok(change) => {
                let outcome = deps.notifier.handle(&change).await;
                tracing::info!("Product {} handled: {:?}", change.product_id, outcome);
            }
            Err(detail) => {
                // A malformed record must not fail the batch; these are never
                // retried, only logged.
                tracing::warn!("Skipping unparseable stream record: {}", detail);
            }
        }
    }
    Ok(())
}

fn parse_change(record: &EventRecord) -> Result<ProductChangeEvent, String> {
    let key: ProductKey = serde_dynamo::from_item(record.change.keys.clone())
        .map_err(|e| format!("bad keys: {}", e))?;
    let before: ProductRecord = serde_dynamo::from_item(record.change.old_image.clone())
        .map_err(|e| format!("bad old image for product {}: {}", key.product_id, e))?;
    let after: ProductRecord = serde_dynamo::from_item(record.change.new_image.clone())
        .map_err(|e| format!("bad new image for product {}: {}", key.product_id, e))?;
    Ok(ProductChangeEvent {
        product_id: key.product_id,
        before,
        after,
    })
}
