//! Read-only document fetchers.
//!
//! A `FetchedDocument` owns the open resource; dropping it releases the file
//! handle or HTTP connection.

use crate::UpdateError;
use std::fmt;
use std::fs::File;
use std::io::Read;
use url::Url;

/// An open document and its declared content type.
pub struct FetchedDocument {
    /// The `Content-Type` the source declared, if any.
    pub content_type: Option<String>,
    pub body: Box<dyn Read>,
}

impl fmt::Debug for FetchedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchedDocument")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Opens documents by URL.
pub trait DocumentFetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> Result<FetchedDocument, UpdateError>;
}

/// Serves `file:` URLs. Files declare no content type.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

impl DocumentFetcher for FileFetcher {
    fn fetch(&self, url: &Url) -> Result<FetchedDocument, UpdateError> {
        let path = url
            .to_file_path()
            .map_err(|()| UpdateError::Io(format!("not a local file URL: {}", url)))?;
        let file = File::open(&path)
            .map_err(|e| UpdateError::Io(format!("{}: {}", path.display(), e)))?;
        Ok(FetchedDocument {
            content_type: None,
            body: Box::new(file),
        })
    }
}

/// Serves `http:` and `https:` URLs with a blocking client.
///
/// No read timeout is imposed; large documents stream for as long as the
/// server keeps sending.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    pub fn new() -> Result<Self, UpdateError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(None)
            .build()
            .map_err(|e| UpdateError::Io(e.to_string()))?;
        Ok(Self { http })
    }
}

#[cfg(feature = "http")]
impl DocumentFetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<FetchedDocument, UpdateError> {
        let resp = self
            .http
            .get(url.clone())
            .header(reqwest::header::ACCEPT, ACCEPT_HEADER)
            .send()
            .map_err(|e| UpdateError::Io(format!("cannot connect to {}: {}", url, e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(UpdateError::Io(format!("{} returned {}", url, status)));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(FetchedDocument {
            content_type,
            body: Box::new(resp),
        })
    }
}

#[cfg(feature = "http")]
const ACCEPT_HEADER: &str =
    "application/n-quads, application/n-triples;q=0.9, text/plain;q=0.5, */*;q=0.1";

/// Dispatches on the URL scheme.
#[derive(Debug, Clone)]
pub struct SchemeFetcher {
    file: FileFetcher,
    #[cfg(feature = "http")]
    http: HttpFetcher,
}

impl SchemeFetcher {
    pub fn new() -> Result<Self, UpdateError> {
        Ok(Self {
            file: FileFetcher,
            #[cfg(feature = "http")]
            http: HttpFetcher::new()?,
        })
    }
}

impl DocumentFetcher for SchemeFetcher {
    fn fetch(&self, url: &Url) -> Result<FetchedDocument, UpdateError> {
        match url.scheme() {
            "file" => self.file.fetch(url),
            #[cfg(feature = "http")]
            "http" | "https" => self.http.fetch(url),
            other => Err(UpdateError::Io(format!("no fetcher for scheme '{}'", other))),
        }
    }
}
