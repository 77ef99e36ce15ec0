//! Face extraction over HTTP.
//!
//! Downloads the image, checks that it really is a JPEG or PNG, and hands
//! the bytes to an encoder service that does detection and encoding. The
//! encoder answers with a JSON array:
//!
//! ```json
//! [{"location": [top, right, bottom, left], "encoding": [0.01, -0.12, ...]}]
//! ```

use crate::NetError;
use async_trait::async_trait;
use image::ImageFormat;
use photier_core::extract::check_image_url;
use photier_core::{Config, ExtractError, FaceDescriptor, FaceExtractor};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct EncodedFace {
    location: [u32; 4],
    encoding: Vec<f64>,
}

/// Largest image body accepted for download.
pub const MAX_IMAGE_BYTES: u64 = 20 * 1024 * 1024;

pub struct HttpExtractor {
    client: reqwest::Client,
    encoder_url: String,
    max_image_bytes: u64,
}

impl HttpExtractor {
    pub fn new(
        encoder_url: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, NetError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            encoder_url: encoder_url.into(),
            max_image_bytes: MAX_IMAGE_BYTES,
        })
    }

    pub fn with_max_image_bytes(mut self, limit: u64) -> Self {
        self.max_image_bytes = limit;
        self
    }

    pub fn from_config(config: &Config) -> Result<Self, NetError> {
        Self::new(
            config.encoder_url.clone(),
            config.http_timeout(),
            &config.user_agent,
        )
    }

    /// Body of `url`, streamed and cut off at `max_image_bytes`.
    async fn download(&self, url: &str) -> Result<Vec<u8>, ExtractError> {
        let too_large = || {
            ExtractError::Fetch(format!(
                "{url}: image larger than {} bytes",
                self.max_image_bytes
            ))
        };
        let mut resp = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ExtractError::Fetch(format!("{url}: {e}")))?;
        if resp.content_length().is_some_and(|len| len > self.max_image_bytes) {
            return Err(too_large());
        }

        let mut image = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| ExtractError::Fetch(format!("{url}: {e}")))?
        {
            if (image.len() + chunk.len()) as u64 > self.max_image_bytes {
                return Err(too_large());
            }
            image.extend_from_slice(&chunk);
        }
        Ok(image)
    }

    async fn encode(&self, image: Vec<u8>) -> Result<Vec<FaceDescriptor>, ExtractError> {
        let resp = self
            .client
            .post(&self.encoder_url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ExtractError::Fetch(format!("encoder {}: {e}", self.encoder_url)))?;
        let body = resp
            .bytes()
            .await
            .map_err(|e| ExtractError::Fetch(format!("encoder {}: {e}", self.encoder_url)))?;
        parse_encoder_response(&body)
    }
}

#[async_trait]
impl FaceExtractor for HttpExtractor {
    async fn extract_faces(&self, url: &str) -> Result<Vec<FaceDescriptor>, ExtractError> {
        check_image_url(url)?;
        let image = self.download(url).await?;
        let format = sniff_image(&image, url)?;
        tracing::debug!(url, bytes = image.len(), ?format, "image downloaded");
        let faces = self.encode(image).await?;
        tracing::debug!(url, faces = faces.len(), "image encoded");
        Ok(faces)
    }
}

/// Accept only JPEG and PNG payloads, whatever the URL claims.
pub fn sniff_image(bytes: &[u8], url: &str) -> Result<ImageFormat, ExtractError> {
    match image::guess_format(bytes) {
        Ok(format @ (ImageFormat::Jpeg | ImageFormat::Png)) => Ok(format),
        Ok(other) => Err(ExtractError::UnsupportedFormat(format!("{url} ({other:?})"))),
        Err(_) => Err(ExtractError::UnsupportedFormat(format!("{url} (not an image)"))),
    }
}

pub fn parse_encoder_response(body: &[u8]) -> Result<Vec<FaceDescriptor>, ExtractError> {
    let faces: Vec<EncodedFace> =
        serde_json::from_slice(body).map_err(|e| ExtractError::Encoder(e.to_string()))?;
    faces
        .into_iter()
        .map(|f| {
            let face = FaceDescriptor::new(f.location, f.encoding);
            face.validate()
                .map_err(|e| ExtractError::Encoder(e.to_string()))?;
            Ok(face)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{serve, Route};

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const GIF_HEADER: &[u8] = b"GIF89a\x01\0\x01\0";

    fn extractor(encoder_url: String) -> HttpExtractor {
        HttpExtractor::new(encoder_url, Duration::from_secs(5), "photier-test").unwrap()
    }

    #[test]
    fn test_sniff_image() {
        assert_eq!(sniff_image(PNG_HEADER, "a.png").unwrap(), ImageFormat::Png);
        assert_eq!(
            sniff_image(b"\xFF\xD8\xFF\xE0\0\x10JFIF", "a.jpg").unwrap(),
            ImageFormat::Jpeg
        );
        assert!(matches!(
            sniff_image(GIF_HEADER, "a.jpg"),
            Err(ExtractError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            sniff_image(b"<html>", "a.jpg"),
            Err(ExtractError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_parse_encoder_response() {
        let faces = parse_encoder_response(
            br#"[{"location":[10,80,90,20],"encoding":[0.1,-0.2]},{"location":[1,2,3,4],"encoding":[0.3,0.4]}]"#,
        )
        .unwrap();
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].location.right, 80);
        assert_eq!(faces[1].encoding, vec![0.3, 0.4]);
        assert!(parse_encoder_response(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_encoder_response_rejects_garbage() {
        assert!(matches!(
            parse_encoder_response(b"{\"error\":\"boom\"}"),
            Err(ExtractError::Encoder(_))
        ));
        assert!(matches!(
            parse_encoder_response(br#"[{"location":[1,2,3,4],"encoding":[]}]"#),
            Err(ExtractError::Encoder(_))
        ));
    }

    #[tokio::test]
    async fn test_gif_url_rejected_without_network() {
        let ex = extractor("http://127.0.0.1:1/encode".into());
        let err = ex.extract_faces("http://127.0.0.1:1/anim.gif").await.unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_extract_end_to_end() {
        let base = serve(vec![
            Route::new("GET", "/a.png", 200, PNG_HEADER),
            Route::new(
                "POST",
                "/encode",
                200,
                br#"[{"location":[5,60,70,10],"encoding":[0.25,0.5,0.75]}]"#,
            ),
        ])
        .await;
        let ex = extractor(format!("{base}/encode"));

        let faces = ex.extract_faces(&format!("{base}/a.png")).await.unwrap();

        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].encoding, vec![0.25, 0.5, 0.75]);
    }

    #[tokio::test]
    async fn test_disguised_gif_rejected() {
        let base = serve(vec![Route::new("GET", "/a.jpg", 200, GIF_HEADER)]).await;
        let ex = extractor(format!("{base}/encode"));
        let err = ex.extract_faces(&format!("{base}/a.jpg")).await.unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_oversized_image_is_fetch_error() {
        static BIG: [u8; 4096] = [0xFF; 4096];
        let base = serve(vec![
            Route::new("GET", "/big.jpg", 200, &BIG),
            Route::new("GET", "/small.png", 200, PNG_HEADER),
            Route::new("POST", "/encode", 200, b"[]"),
        ])
        .await;
        let ex = extractor(format!("{base}/encode")).with_max_image_bytes(1024);

        let err = ex.extract_faces(&format!("{base}/big.jpg")).await.unwrap_err();
        assert!(matches!(err, ExtractError::Fetch(msg) if msg.contains("larger than 1024")));
        assert!(ex
            .extract_faces(&format!("{base}/small.png"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_http_error_is_fetch_error() {
        let base = serve(vec![Route::new("GET", "/missing.jpg", 404, b"not found")]).await;
        let ex = extractor(format!("{base}/encode"));
        let err = ex
            .extract_faces(&format!("{base}/missing.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Fetch(_)));
    }
}
