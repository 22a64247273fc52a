use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Profile;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub display_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl From<UpdateProfileRequest> for Profile {
    fn from(request: UpdateProfileRequest) -> Self {
        Self {
            display_name: Some(request.display_name.trim().to_string()),
            phone: request
                .phone
                .map(|phone| phone.trim().to_string())
                .filter(|phone| !phone.is_empty()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileView {
    pub display_name: String,
    pub phone: Option<String>,
}

impl ProfileView {
    pub fn new(profile: Option<Profile>, email: Option<&str>) -> Self {
        let profile = profile.unwrap_or_default();
        let fallback = email
            .and_then(|email| email.split('@').next())
            .unwrap_or_default()
            .to_string();

        Self {
            display_name: profile
                .display_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(fallback),
            phone: profile.phone,
        }
    }
}
