use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::Deserialize;

use super::{ScanRef, SliceSource};
use crate::error::SourceError;

/// Resource collection holding the slice files of a scan.
pub const DICOM_RESOURCE: &str = "DICOM";

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// REST client for one XNAT server.
#[derive(Debug)]
pub struct XnatClient {
    client: reqwest::Client,
    server: Url,
    credentials: Option<Credentials>,
    session_id: Option<String>,
}

impl XnatClient {
    pub fn new(server: &str) -> Result<Self, SourceError> {
        let invalid = || SourceError::InvalidServer(server.to_string());
        let url = Url::parse(server).map_err(|_| invalid())?;
        if url.cannot_be_a_base() {
            return Err(invalid());
        }

        Ok(Self {
            client: reqwest::Client::new(),
            server: url,
            credentials: None,
            session_id: None,
        })
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        });
        self
    }

    pub fn server(&self) -> &Url {
        &self.server
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Trade the credentials for a `JSESSIONID`, used by every later request.
    pub async fn login(&mut self) -> Result<(), SourceError> {
        let Some(credentials) = self.credentials.clone() else {
            log::debug!("No credentials configured, skipping login");
            return Ok(());
        };

        let url = self.endpoint(&["data", "JSESSION"])?;
        let response = self
            .client
            .post(url.clone())
            .basic_auth(&credentials.username, Some(&credentials.password))
            .send()
            .await?;
        let session_id = check_status(&url, response)?.text().await?.trim().to_string();
        log::info!("Logged in to {} as {}", self.server, credentials.username);
        self.session_id = Some(session_id);
        Ok(())
    }

    pub fn scan(self: &Arc<Self>, scan: ScanRef) -> XnatScan {
        XnatScan {
            client: Arc::clone(self),
            scan,
        }
    }

    pub fn files_url(&self, scan: &ScanRef) -> Result<Url, SourceError> {
        self.endpoint(&[
            "data",
            "archive",
            "experiments",
            scan.experiment.as_str(),
            "scans",
            scan.scan.as_str(),
            "resources",
            DICOM_RESOURCE,
            "files",
        ])
    }

    pub fn file_url(&self, scan: &ScanRef, name: &str) -> Result<Url, SourceError> {
        let mut url = self.files_url(scan)?;
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidServer(self.server.to_string()))?
            .push(name);
        Ok(url)
    }

    pub async fn list_scan_files(&self, scan: &ScanRef) -> Result<Vec<String>, SourceError> {
        let mut url = self.files_url(scan)?;
        url.query_pairs_mut().append_pair("format", "json");

        let response = self.request(Method::GET, url.clone()).send().await?;
        let body = check_status(&url, response)?.text().await?;
        let names = parse_file_listing(&body)?;
        log::info!("Listed {} files for scan {scan}", names.len());
        Ok(names)
    }

    pub async fn fetch_scan_file(
        &self,
        scan: &ScanRef,
        name: &str,
    ) -> Result<Vec<u8>, SourceError> {
        let url = self.file_url(scan, name)?;
        let response = self.request(Method::GET, url.clone()).send().await?;
        let bytes = check_status(&url, response)?.bytes().await?;
        log::debug!("Fetched {name} ({} bytes)", bytes.len());
        Ok(bytes.to_vec())
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match (&self.session_id, &self.credentials) {
            (Some(session_id), _) => builder.header(COOKIE, format!("JSESSIONID={session_id}")),
            (None, Some(credentials)) => {
                builder.basic_auth(&credentials.username, Some(&credentials.password))
            }
            (None, None) => builder,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, SourceError> {
        let mut url = self.server.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidServer(self.server.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn check_status(url: &Url, response: Response) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(SourceError::Status {
            url: url.to_string(),
            status,
        })
    }
}

/// The archive answers either with a `ResultSet` envelope or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FileListing {
    Envelope {
        #[serde(rename = "ResultSet")]
        result_set: ResultSet,
    },
    Bare(Vec<FileEntry>),
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    #[serde(rename = "Result", default)]
    result: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    #[serde(rename = "Name", alias = "name", default)]
    name: Option<String>,
}

/// File names in server order. Entries without a name are skipped.
pub fn parse_file_listing(body: &str) -> Result<Vec<String>, SourceError> {
    let listing: FileListing =
        serde_json::from_str(body).map_err(|err| SourceError::InvalidListing(err.to_string()))?;
    let entries = match listing {
        FileListing::Envelope { result_set } => result_set.result,
        FileListing::Bare(entries) => entries,
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| entry.name)
        .filter(|name| !name.is_empty())
        .collect())
}

/// A [`SliceSource`] for one scan on an XNAT server.
#[derive(Debug, Clone)]
pub struct XnatScan {
    client: Arc<XnatClient>,
    scan: ScanRef,
}

impl XnatScan {
    pub fn scan_ref(&self) -> &ScanRef {
        &self.scan
    }
}

#[async_trait]
impl SliceSource for XnatScan {
    async fn list(&self) -> Result<Vec<String>, SourceError> {
        self.client.list_scan_files(&self.scan).await
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>, SourceError> {
        self.client.fetch_scan_file(&self.scan, name).await
    }
}
