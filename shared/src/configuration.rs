use aws_sdk_ssm::Client;

/// Reads a decrypted SecureString parameter. Provider API keys are only ever
/// supplied this way; the value must never be logged.
pub async fn load_secret_parameter(ssm_client: &Client, name: &str) -> Result<String, String> {
    let response = ssm_client
        .get_parameter()
        .name(name)
        .with_decryption(true)
        .send()
        .await
        .map_err(|e| format!("Failed to read SSM parameter {}: {:?}", name, e))?;

    response
        .parameter
        .and_then(|parameter| parameter.value)
        .ok_or_else(|| format!("SSM parameter {} has no value", name))
}
