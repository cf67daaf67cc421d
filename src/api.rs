// API client module: a small async HTTP client for the meme service.
// Every request URL is built from the backend locator at call time, so a
// backend change applies to the very next call.

use crate::backend::{BackendLocator, FileStorage, MemoryStorage};
use crate::error::{MemeError, Result};
use crate::types::{
    GenerateRequest, ImageRef, ImageResponse, ListQuery, MemeInfo, MemeOptions, PreviewRequest,
    SearchQuery, SortBy, UploadImageResponse,
};
use reqwest::multipart;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Overrides where the backend override is persisted.
pub const STORAGE_ENV: &str = "MEME_GENERATOR_STORAGE";

/// Cheap to clone; clones share the HTTP connection pool and the locator.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    backend: Arc<BackendLocator>,
}

impl ApiClient {
    pub fn new(backend: Arc<BackendLocator>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("meme-generator-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(ApiClient { client, backend })
    }

    /// Create a client whose backend override lives in `MEME_GENERATOR_STORAGE`,
    /// else the platform config dir, else memory only. An unreadable storage
    /// file is left untouched and the session starts on the default backend.
    pub fn from_default_storage() -> Result<Self> {
        let path = std::env::var_os(STORAGE_ENV)
            .map(PathBuf::from)
            .or_else(FileStorage::default_path);
        let locator = match path.map(|path| (FileStorage::open(&path), path)) {
            Some((Ok(storage), _)) => {
                debug!(path = %storage.path().display(), "using backend storage");
                BackendLocator::new(storage)
            }
            Some((Err(err), path)) => {
                warn!(path = %path.display(), "ignoring unreadable backend storage: {}", err);
                BackendLocator::new(MemoryStorage::new())
            }
            None => BackendLocator::new(MemoryStorage::new()),
        };
        Self::new(Arc::new(locator))
    }

    pub fn backend(&self) -> &BackendLocator {
        &self.backend
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.backend.url(path);
        debug!(%method, %url, "sending request");
        self.client.request(method, url)
    }

    /// Send and return the raw body of a successful response; failures go
    /// through the structured error translation.
    async fn send(&self, req: RequestBuilder) -> Result<Vec<u8>> {
        let res = req.send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.bytes().await.unwrap_or_default();
            let err = MemeError::from_response(status, &body);
            warn!(status = status.as_u16(), code = err.code(), "request failed: {}", err);
            return Err(err);
        }
        Ok(res.bytes().await?.to_vec())
    }

    async fn execute<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let body = self.send(req).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn get_meme_keys(
        &self,
        sort_by: Option<SortBy>,
        sort_reverse: bool,
    ) -> Result<Vec<String>> {
        let query = ListQuery {
            sort_by,
            sort_reverse,
        };
        self.execute(self.request(Method::GET, "/meme/keys").query(&query))
            .await
    }

    pub async fn get_meme_infos(
        &self,
        sort_by: Option<SortBy>,
        sort_reverse: bool,
    ) -> Result<Vec<MemeInfo>> {
        let query = ListQuery {
            sort_by,
            sort_reverse,
        };
        self.execute(self.request(Method::GET, "/meme/infos").query(&query))
            .await
    }

    pub async fn get_meme_info(&self, key: &str) -> Result<MemeInfo> {
        self.execute(self.request(Method::GET, &format!("/memes/{key}/info")))
            .await
    }

    pub async fn search_memes(&self, query: &str, include_tags: bool) -> Result<Vec<String>> {
        let query = SearchQuery {
            query,
            include_tags,
        };
        self.execute(self.request(Method::GET, "/meme/search").query(&query))
            .await
    }

    /// Plain GET when there is nothing to customize, POST `{options}` otherwise.
    pub async fn get_meme_preview(
        &self,
        key: &str,
        options: Option<&MemeOptions>,
    ) -> Result<ImageResponse> {
        let path = format!("/memes/{key}/preview");
        match options.filter(|o| !o.is_empty()) {
            Some(options) => {
                let body = PreviewRequest { options };
                self.execute(self.request(Method::POST, &path).json(&body))
                    .await
            }
            None => self.execute(self.request(Method::GET, &path)).await,
        }
    }

    /// Upload image bytes as multipart field `file`. Failures carry only a
    /// message, not the structured code/data.
    pub async fn upload_image(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadImageResponse> {
        let mime = mime_guess::from_path(file_name).first_or_octet_stream();
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime.essence_str())?;
        let form = multipart::Form::new().part("file", part);

        let res = self
            .request(Method::POST, "/image/upload/multipart")
            .multipart(form)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.bytes().await.unwrap_or_default();
            let err = MemeError::upload_failed(status, &body);
            warn!(status = status.as_u16(), "upload failed: {}", err);
            return Err(err);
        }
        let body = res.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Read a local file and upload it under its own file name.
    pub async fn upload_image_file(&self, path: &Path) -> Result<UploadImageResponse> {
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                MemeError::InvalidInput(format!("not a file path: {}", path.display()))
            })?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        self.upload_image(&file_name, bytes).await
    }

    pub async fn generate_meme(
        &self,
        key: &str,
        images: &[ImageRef],
        texts: &[String],
        options: &MemeOptions,
    ) -> Result<ImageResponse> {
        let body = GenerateRequest {
            images,
            texts,
            options,
        };
        self.execute(self.request(Method::POST, &format!("/memes/{key}")).json(&body))
            .await
    }

    /// Displayable URL of a rendered or uploaded image. No request is made.
    pub fn image_url(&self, image_id: &str) -> String {
        self.backend.url(&format!("/image/{image_id}"))
    }

    /// Fetch the bytes behind `image_url`.
    pub async fn download_image(&self, image_id: &str) -> Result<Vec<u8>> {
        self.send(self.request(Method::GET, &format!("/image/{image_id}")))
            .await
    }

    /// Raw version text. The status is not inspected.
    pub async fn get_version(&self) -> Result<String> {
        let res = self.request(Method::GET, "/meme/version").send().await?;
        Ok(res.text().await?)
    }
}
