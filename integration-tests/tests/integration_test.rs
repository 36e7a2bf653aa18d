use aws_sdk_cloudformation::types::Output;
use reqwest::Client;
use std::env;

#[ignore]
#[tokio::test]
async fn when_caller_is_unauthenticated_otp_endpoint_should_reject() {
    let api_endpoint = retrieve_api_endpoint().await;

    let http_client = Client::builder()
        .timeout(std::time::Duration::from_secs(2))
        .build()
        .unwrap();

    let response = http_client
        .post(format!("{}otp", api_endpoint))
        .header("Content-Type", "application/json")
        .body(serde_json::json!({"email": "a@x.com", "code": "123456"}).to_string())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);

    let body: serde_json::Value =
        serde_json::from_str(response.text().await.unwrap().as_str()).unwrap();
    assert_eq!(body, serde_json::json!({"error": "unauthenticated"}));
}

async fn retrieve_api_endpoint() -> String {
    let config = aws_config::load_from_env().await;
    let cloudformation_client = aws_sdk_cloudformation::Client::new(&config);
    let stack_name = env::var("STACK_NAME").unwrap_or("senemarket-notifications".to_string());

    let get_stacks = cloudformation_client
        .describe_stacks()
        .set_stack_name(Some(stack_name))
        .send()
        .await
        .unwrap();

    let outputs = get_stacks.stacks.unwrap()[0].clone().outputs.unwrap();
    let api_outputs: Vec<Output> = outputs
        .into_iter()
        .filter(|output| output.output_key.clone().unwrap() == "NotificationsApiEndpoint")
        .collect();

    api_outputs[0].clone().output_value.unwrap()
}
