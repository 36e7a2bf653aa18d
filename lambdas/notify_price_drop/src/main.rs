use lambda_runtime::{run, service_fn, tracing, Error};
use shared::adapters::{DynamoDbUserStore, FcmPushSender, SendGridEmailSender};
use shared::configuration::load_secret_parameter;
use shared::notifier::PriceDropNotifier;

mod config;
mod event_handler;

use event_handler::{function_handler, HandlerDeps};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let config = config::Config::load()?;

    let ssm_client = aws_sdk_ssm::Client::new(&aws_config);
    let sendgrid_key = load_secret_parameter(&ssm_client, &config.sendgrid_key_parameter).await?;
    let fcm_key = load_secret_parameter(&ssm_client, &config.fcm_key_parameter).await?;

    let http_client = shared::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()?;
    let user_store = DynamoDbUserStore::new(
        config.user_table_name,
        aws_sdk_dynamodb::Client::new(&aws_config),
    );
    let email_sender = SendGridEmailSender::new(http_client.clone(), sendgrid_key);
    let push_sender = FcmPushSender::new(http_client, fcm_key);
    let notifier = PriceDropNotifier::new(user_store, email_sender, push_sender, config.from_address);

    let deps = HandlerDeps { notifier };

    run(service_fn(|event| function_handler(&deps, event))).await
}
