use reqwest::multipart::{Form, Part};
use reqwest::Method;
use tracing::info;

use avatarai_shared::types::UploadResult;

use super::{decode, ApiClient};
use crate::error::Result;

impl ApiClient {
    /// `POST /api/blobs` as multipart with a single `file` field.
    pub async fn upload_blob(
        &self,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<UploadResult> {
        let size = data.len();
        let part = Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(content_type)?;
        let form = Form::new().part("file", part);

        let response = self
            .send(self.request(Method::POST, "/api/blobs").multipart(form))
            .await?;
        let result: UploadResult = decode(response).await?;

        info!(cid = %result.cid, file = file_name, size, "Blob uploaded");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::api::test_support::client_for;

    #[tokio::test]
    async fn upload_is_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/blobs"))
            .and(header_regex("content-type", "^multipart/form-data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cid": "bafy1"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = client_for(&server, Some("tok"));
        let result = api
            .upload_blob("cat.png", "image/png", vec![0u8; 16])
            .await
            .unwrap();
        assert_eq!(result.cid, "bafy1");
        assert_eq!(result.display_url(), "/api/blobs?id=bafy1");
    }
}
