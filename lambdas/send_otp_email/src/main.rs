use lambda_http::{run, service_fn, tracing, Error};
use shared::adapters::SendGridEmailSender;
use shared::configuration::load_secret_parameter;

mod config;
mod http_handler;

use http_handler::{function_handler, HandlerDeps};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let config = config::Config::load()?;

    let ssm_client = aws_sdk_ssm::Client::new(&aws_config);
    let sendgrid_key = load_secret_parameter(&ssm_client, &config.sendgrid_key_parameter).await?;

    let http_client = shared::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()?;
    let deps = HandlerDeps {
        email_sender: SendGridEmailSender::new(http_client, sendgrid_key),
        from_address: config.from_address,
    };

    run(service_fn(|event| function_handler(&deps, event))).await
}
