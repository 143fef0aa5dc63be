use avatarai_shared::chat::HistoryPage;

use super::ApiClient;
use crate::error::Result;

impl ApiClient {
    /// `GET /api/messages/history`.
    pub async fn get_chat_history(
        &self,
        room_id: &str,
        thread_id: &str,
        limit: u32,
    ) -> Result<HistoryPage> {
        let limit = limit.to_string();
        self.get_json_with_query(
            "/api/messages/history",
            &[
                ("roomId", room_id),
                ("threadId", thread_id),
                ("limit", limit.as_str()),
            ],
        )
        .await
    }
}
