use figment::providers::Env;
use figment::Figment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Config {
    pub user_table_name: String,
    pub from_address: String,
    pub sendgrid_key_parameter: String,
    pub fcm_key_parameter: String,
}

impl Config {
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Env::raw().only(&[
                "USER_TABLE_NAME",
                "FROM_ADDRESS",
                "SENDGRID_KEY_PARAMETER",
                "FCM_KEY_PARAMETER",
            ]))
            .extract()
    }
}
