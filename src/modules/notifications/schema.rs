use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::push::{DevicePlatform, DeviceToken};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterDeviceRequest {
    #[validate(length(min = 1, max = 512, message = "Device token must be 1-512 characters"))]
    pub device_token: String,
    pub platform: DevicePlatform,
}

#[derive(Debug, Serialize)]
pub struct DeviceTokenResponse {
    pub device_token: String,
    pub platform: DevicePlatform,
    pub last_seen_at: chrono::DateTime<chrono::Utc>,
}

impl From<DeviceToken> for DeviceTokenResponse {
    fn from(token: DeviceToken) -> Self {
        Self {
            device_token: token.device_token,
            platform: token.platform,
            last_seen_at: token.last_seen_at,
        }
    }
}
