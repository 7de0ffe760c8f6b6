//! Drive v3 API client.

use bridge_http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::error::{Result, TransferError};
use crate::types::{DriveFile, FilesListResponse, ListedEntry, RemoteEntry, UploadedFile};

/// Drive API base URL
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Drive upload API base URL
const UPLOAD_API_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Maximum results per page (Drive API limit)
const MAX_PAGE_SIZE: u32 = 1000;

/// Fields to request for file resources
const FILE_FIELDS: &str = "id,name,mimeType,size,parents";

/// Default transfer chunk size. Drive requires upload chunks to be multiples
/// of 256 KiB; 8 MiB keeps request counts low without holding much in memory.
pub const DEFAULT_CHUNK_SIZE: u64 = 8 * 1024 * 1024;

/// Authenticated handle over the Drive v3 API.
///
/// Built from a valid credential's access token; every request carries it as
/// a bearer header. The client holds no other state, so a fresh one is
/// constructed per invocation.
pub struct DriveClient {
    http: Arc<dyn HttpClient>,
    access_token: String,
    chunk_size: u64,
}

impl DriveClient {
    pub fn new(http: Arc<dyn HttpClient>, access_token: String) -> Self {
        Self {
            http,
            access_token,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the transfer chunk size. Upload chunks must stay multiples
    /// of 256 KiB against the real API; tests use smaller values.
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// List one page of a folder's children (or of everything visible, when
    /// `parent_id` is absent).
    pub async fn list_page(
        &self,
        parent_id: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<(Vec<RemoteEntry>, Option<String>)> {
        let query = match parent_id {
            Some(id) => format!("'{}' in parents and trashed=false", id),
            None => "trashed=false".to_string(),
        };

        let mut url = format!(
            "{}/files?q={}&pageSize={}&fields=nextPageToken,files({})",
            DRIVE_API_BASE,
            urlencoding::encode(&query),
            MAX_PAGE_SIZE,
            FILE_FIELDS
        );
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        let request = HttpRequest::new(HttpMethod::Get, url)
            .bearer_token(self.access_token.as_str())
            .header("Accept", "application/json");
        let response = self.execute(request).await?;

        if !response.is_success() {
            return Err(self.status_error(&response, parent_id));
        }

        let list: FilesListResponse = response
            .json()
            .map_err(|e| TransferError::Parse(format!("bad files list response: {}", e)))?;

        let entries: Vec<RemoteEntry> = list.files.into_iter().map(DriveFile::into_entry).collect();
        debug!(count = entries.len(), "listed one page");
        Ok((entries, list.next_page_token))
    }

    /// All children of a folder, across every page.
    pub async fn list_all(&self, parent_id: Option<&str>) -> Result<Vec<RemoteEntry>> {
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let (mut page, next) = self.list_page(parent_id, page_token.as_deref()).await?;
            entries.append(&mut page);
            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(entries)
    }

    /// Recursive listing in preorder (each folder followed by its contents).
    ///
    /// Descent is driven by an explicit worklist rather than call recursion,
    /// so arbitrarily deep folder trees cannot exhaust the stack.
    pub async fn walk(&self, root: Option<&str>) -> Result<Vec<ListedEntry>> {
        let mut out = Vec::new();
        let mut stack: Vec<(RemoteEntry, usize)> = Vec::new();

        for child in self.list_all(root).await?.into_iter().rev() {
            stack.push((child, 0));
        }

        while let Some((entry, depth)) = stack.pop() {
            let folder_id = entry.is_folder().then(|| entry.id.clone());
            out.push(ListedEntry { entry, depth });

            if let Some(folder_id) = folder_id {
                for child in self.list_all(Some(&folder_id)).await?.into_iter().rev() {
                    stack.push((child, depth + 1));
                }
            }
        }

        info!(count = out.len(), "recursive listing complete");
        Ok(out)
    }

    /// Metadata for a single file or folder.
    pub async fn metadata(&self, file_id: &str) -> Result<RemoteEntry> {
        let url = format!("{}/files/{}?fields={}", DRIVE_API_BASE, file_id, FILE_FIELDS);
        let request = HttpRequest::new(HttpMethod::Get, url)
            .bearer_token(self.access_token.as_str())
            .header("Accept", "application/json");
        let response = self.execute(request).await?;

        if !response.is_success() {
            return Err(self.status_error(&response, Some(file_id)));
        }

        let file: DriveFile = response
            .json()
            .map_err(|e| TransferError::Parse(format!("bad file metadata: {}", e)))?;
        Ok(file.into_entry())
    }

    /// Download a file to `dest` in sequential ranged chunks.
    ///
    /// `progress` receives monotonically increasing fractions in `[0, 1]`
    /// (completed chunks over total). On failure the bytes already written
    /// stay on disk; the destination must then be treated as truncated.
    pub async fn download_to_path(
        &self,
        file_id: &str,
        dest: &Path,
        mut progress: impl FnMut(f64),
    ) -> Result<u64> {
        let meta = self.metadata(file_id).await?;
        let mut file = tokio::fs::File::create(dest).await?;

        let total = match meta.size {
            // Size unknown (Google-native documents): one unranged request.
            None => {
                let response = self.fetch_content(file_id, None).await?;
                file.write_all(&response.body).await?;
                file.flush().await?;
                progress(1.0);
                info!(file_id, bytes = response.body.len(), "download complete");
                return Ok(response.body.len() as u64);
            }
            Some(0) => {
                file.flush().await?;
                progress(1.0);
                info!(file_id, bytes = 0u64, "download complete");
                return Ok(0);
            }
            Some(total) => total,
        };

        let total_chunks = total.div_ceil(self.chunk_size);
        let mut written = 0u64;

        for chunk_index in 0..total_chunks {
            let start = chunk_index * self.chunk_size;
            let end = (start + self.chunk_size).min(total) - 1;

            let response = self
                .fetch_content(file_id, Some((start, end)))
                .await
                .map_err(|e| {
                    warn!(file_id, chunk = chunk_index + 1, total_chunks, "chunk download failed");
                    e
                })?;

            file.write_all(&response.body).await?;
            // Flushed per chunk so an abort leaves exactly the completed
            // chunks on disk.
            file.flush().await?;
            written += response.body.len() as u64;

            progress((chunk_index + 1) as f64 / total_chunks as f64);
        }

        info!(file_id, bytes = written, "download complete");
        Ok(written)
    }

    async fn fetch_content(&self, file_id: &str, range: Option<(u64, u64)>) -> Result<HttpResponse> {
        let url = format!("{}/files/{}?alt=media", DRIVE_API_BASE, file_id);
        let mut request =
            HttpRequest::new(HttpMethod::Get, url).bearer_token(self.access_token.as_str());
        if let Some((start, end)) = range {
            request = request.header("Range", format!("bytes={}-{}", start, end));
        }

        let response = self.execute(request).await?;
        if response.status == 200 || response.status == 206 {
            Ok(response)
        } else {
            Err(self.status_error(&response, Some(file_id)))
        }
    }

    /// Upload a local file under `display_name`, optionally into a folder.
    ///
    /// Uses a resumable session: one initiation request, then sequential
    /// `Content-Range` chunks. A 308 continues the session; the final 200
    /// carries the created file's id. `progress` reports bytes sent over
    /// total.
    pub async fn upload_file(
        &self,
        local_path: &Path,
        display_name: &str,
        parent_id: Option<&str>,
        mut progress: impl FnMut(f64),
    ) -> Result<String> {
        let size = tokio::fs::metadata(local_path).await?.len();
        let session_uri = self.open_upload_session(display_name, parent_id).await?;
        debug!(name = display_name, size, "resumable upload session opened");

        if size == 0 {
            let request = HttpRequest::new(HttpMethod::Put, session_uri)
                .bearer_token(self.access_token.as_str())
                .header("Content-Range", "bytes */0");
            let response = self.execute(request).await?;
            let id = self.finished_upload_id(&response)?;
            progress(1.0);
            info!(name = display_name, id = %id, "upload complete");
            return Ok(id);
        }

        let mut file = tokio::fs::File::open(local_path).await?;
        let mut offset = 0u64;

        while offset < size {
            let this_chunk = (size - offset).min(self.chunk_size);
            let mut buf = vec![0u8; this_chunk as usize];
            file.read_exact(&mut buf).await?;

            let request = HttpRequest::new(HttpMethod::Put, session_uri.clone())
                .bearer_token(self.access_token.as_str())
                .header(
                    "Content-Range",
                    format!("bytes {}-{}/{}", offset, offset + this_chunk - 1, size),
                )
                .body(Bytes::from(buf));

            let response = self.execute(request).await?;
            offset += this_chunk;
            let final_chunk = offset == size;

            match response.status {
                308 if !final_chunk => {
                    progress(offset as f64 / size as f64);
                }
                308 => {
                    return Err(TransferError::UploadIncomplete(
                        "session still open after the last chunk".to_string(),
                    ));
                }
                200 | 201 => {
                    let id = self.finished_upload_id(&response)?;
                    progress(1.0);
                    info!(name = display_name, id = %id, bytes = size, "upload complete");
                    return Ok(id);
                }
                _ => return Err(self.status_error(&response, None)),
            }
        }

        Err(TransferError::UploadIncomplete(
            "upload loop ended without a final response".to_string(),
        ))
    }

    async fn open_upload_session(
        &self,
        display_name: &str,
        parent_id: Option<&str>,
    ) -> Result<String> {
        let mut metadata = serde_json::Map::new();
        metadata.insert("name".to_string(), serde_json::json!(display_name));
        if let Some(parent) = parent_id {
            metadata.insert("parents".to_string(), serde_json::json!([parent]));
        }

        let request = HttpRequest::new(
            HttpMethod::Post,
            format!("{}/files?uploadType=resumable", UPLOAD_API_BASE),
        )
        .bearer_token(self.access_token.as_str())
        .json(&serde_json::Value::Object(metadata))
        .map_err(|e| TransferError::Parse(format!("bad upload metadata: {}", e)))?;

        let response = self.execute(request).await?;
        if !response.is_success() {
            return Err(self.status_error(&response, None));
        }

        response
            .header("Location")
            .map(str::to_string)
            .ok_or_else(|| {
                TransferError::Parse("upload session response carried no Location".to_string())
            })
    }

    fn finished_upload_id(&self, response: &HttpResponse) -> Result<String> {
        if !response.is_success() {
            return Err(self.status_error(response, None));
        }
        let uploaded: UploadedFile = response
            .json()
            .map_err(|e| TransferError::Parse(format!("bad upload response: {}", e)))?;
        Ok(uploaded.id)
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.http
            .execute(request)
            .await
            .map_err(|e| TransferError::NetworkFailure(e.to_string()))
    }

    fn status_error(&self, response: &HttpResponse, file_id: Option<&str>) -> TransferError {
        let message = response
            .text()
            .unwrap_or_else(|_| "unreadable error response".to_string());

        match response.status {
            401 => TransferError::TokenExpired,
            404 => TransferError::NotFound {
                file_id: file_id.unwrap_or("<unknown>").to_string(),
            },
            429 => TransferError::QuotaExceeded { message },
            403 if message.contains("quota") || message.contains("RateLimit") || message.contains("rateLimit") => {
                TransferError::QuotaExceeded { message }
            }
            status => TransferError::Api { status, message },
        }
    }
}
