use chrono::NaiveDate;
use serde::Deserialize;

// Query parameters for the available-slots endpoint
#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub date: NaiveDate,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

pub fn default_timezone() -> String {
    "UTC".to_string()
}
