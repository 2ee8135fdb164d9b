use crate::config::MediaConfig;
use crate::error::{AppError, AppResult};
use serde::Deserialize;
use sha2::{Digest, Sha256};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Client for the Cloudinary image-hosting API.
///
/// Uploads and deletions are authenticated with a request signature:
/// the signed parameters are sorted, joined as `k=v` pairs with `&`,
/// the API secret is appended, and the whole string is SHA-256 hashed.
#[derive(Clone)]
pub struct MediaClient {
    cloud_name: String,
    api_key: String,
    api_secret: String,
    http: reqwest::Client,
}

/// Result of a successful image upload
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedImage {
    #[serde(rename = "secure_url")]
    pub url: String,
    pub public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

impl MediaClient {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            http: reqwest::Client::new(),
        }
    }

    /// Upload an image and return its hosted URL and public id
    pub async fn upload_image(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        folder: Option<&str>,
    ) -> AppResult<UploadedImage> {
        let timestamp = chrono::Utc::now().timestamp().to_string();

        let mut signed_params = vec![("timestamp".to_string(), timestamp.clone())];
        if let Some(folder) = folder {
            signed_params.push(("folder".to_string(), folder.to_string()));
        }
        let signature = self.sign(&signed_params);

        let mut form = reqwest::multipart::Form::new()
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string()),
            );
        if let Some(folder) = folder {
            form = form.text("folder", folder.to_string());
        }

        let url = format!("{}/{}/image/upload", API_BASE, self.cloud_name);
        let response = self.http.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, %body, "Image upload rejected");
            return Err(AppError::Internal(format!(
                "Image upload failed with status {}",
                status
            )));
        }

        Ok(response.json::<UploadedImage>().await?)
    }

    /// Remove a previously uploaded image by its public id
    pub async fn destroy_image(&self, public_id: &str) -> AppResult<()> {
        let timestamp = chrono::Utc::now().timestamp().to_string();

        let signed_params = vec![
            ("public_id".to_string(), public_id.to_string()),
            ("timestamp".to_string(), timestamp.clone()),
        ];
        let signature = self.sign(&signed_params);

        let url = format!("{}/{}/image/destroy", API_BASE, self.cloud_name);
        let response = self
            .http
            .post(&url)
            .form(&[
                ("public_id", public_id),
                ("timestamp", &timestamp),
                ("api_key", &self.api_key),
                ("signature", &signature),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: DestroyResponse = response.json().await?;
        match body.result.as_str() {
            "ok" => Ok(()),
            "not found" => Err(AppError::NotFound(format!("image {}", public_id))),
            other => Err(AppError::Internal(format!(
                "Unexpected destroy result: {}",
                other
            ))),
        }
    }

    /// Compute the request signature over the signed parameters
    fn sign(&self, params: &[(String, String)]) -> String {
        let mut sorted: Vec<&(String, String)> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let joined = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(joined.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> MediaClient {
        MediaClient::new(&MediaConfig {
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
        })
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_signature_is_hex_sha256() {
        let client = test_client();
        let sig = client.sign(&params(&[("timestamp", "1700000000")]));
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signature_ignores_param_order() {
        let client = test_client();
        let a = client.sign(&params(&[("folder", "menu"), ("timestamp", "1700000000")]));
        let b = client.sign(&params(&[("timestamp", "1700000000"), ("folder", "menu")]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_signature_depends_on_secret() {
        let client = test_client();
        let other = MediaClient::new(&MediaConfig {
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "different".to_string(),
        });
        let p = params(&[("timestamp", "1700000000")]);
        assert_ne!(client.sign(&p), other.sign(&p));
    }

    #[test]
    fn test_signature_depends_on_params() {
        let client = test_client();
        let a = client.sign(&params(&[("timestamp", "1700000000")]));
        let b = client.sign(&params(&[("timestamp", "1700000001")]));
        assert_ne!(a, b);
    }
}
