use avatarai_shared::feed::UpdateProfile;
use avatarai_shared::User;

use super::ApiClient;
use crate::error::Result;

impl ApiClient {
    /// `GET /api/avatar/profile`: the signed-in user.
    pub async fn get_current_user(&self) -> Result<User> {
        self.get_json("/api/avatar/profile").await
    }

    /// `POST /api/avatar/profile`.
    pub async fn update_profile(&self, update: &UpdateProfile) -> Result<serde_json::Value> {
        self.post_json("/api/avatar/profile", update).await
    }
}
