use jiff::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateUrlRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct CreateUrlResponse {
    pub short_key: String,
    pub short_url: String,
}

#[derive(Debug, Serialize)]
pub struct MappingResponse {
    pub short_key: String,
    pub short_url: String,
    pub original_url: String,
    pub created_at: Timestamp,
}
