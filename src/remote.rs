//! Remote mirror of the ledger: one document per authenticated user, read and
//! written as a whole.

use crate::models::RemoteDocument;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tracing::debug;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait RemoteStore: Send + Sync {
    /// Reads the user's document; a user without one reads as empty.
    fn fetch<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<RemoteDocument, RemoteError>>;

    /// Overwrites the user's document.
    fn store<'a>(
        &'a self,
        user_id: &'a str,
        document: &'a RemoteDocument,
    ) -> BoxFuture<'a, Result<(), RemoteError>>;
}

#[derive(Debug)]
pub enum RemoteError {
    InvalidUrl(String),
    Request(reqwest::Error),
    Status(reqwest::StatusCode),
    Unavailable,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::InvalidUrl(url) => write!(f, "invalid remote store url: {url}"),
            RemoteError::Request(err) => write!(f, "remote store request failed: {err}"),
            RemoteError::Status(status) => write!(f, "remote store answered {status}"),
            RemoteError::Unavailable => write!(f, "remote store unavailable"),
        }
    }
}

impl std::error::Error for RemoteError {}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Request(err)
    }
}

/// Document store reached over HTTP at `{base}/users/{user}/ledger`.
pub struct HttpRemote {
    http: reqwest::Client,
    base: reqwest::Url,
}

impl HttpRemote {
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        let base = reqwest::Url::parse(base_url)
            .map_err(|_| RemoteError::InvalidUrl(base_url.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(RemoteError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    pub fn document_url(&self, user_id: &str) -> reqwest::Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["users", user_id, "ledger"]);
        }
        url
    }
}

impl RemoteStore for HttpRemote {
    fn fetch<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<RemoteDocument, RemoteError>> {
        Box::pin(async move {
            let url = self.document_url(user_id);
            debug!(%url, "fetching remote ledger");
            let response = self.http.get(url).send().await?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(RemoteDocument::default());
            }
            if !response.status().is_success() {
                return Err(RemoteError::Status(response.status()));
            }
            Ok(response.json().await?)
        })
    }

    fn store<'a>(
        &'a self,
        user_id: &'a str,
        document: &'a RemoteDocument,
    ) -> BoxFuture<'a, Result<(), RemoteError>> {
        Box::pin(async move {
            let url = self.document_url(user_id);
            debug!(%url, "writing remote ledger");
            let response = self.http.put(url).json(document).send().await?;
            if !response.status().is_success() {
                return Err(RemoteError::Status(response.status()));
            }
            Ok(())
        })
    }
}

/// In-process document store. Clones share the same documents.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    documents: Arc<Mutex<HashMap<String, RemoteDocument>>>,
    offline: Arc<Mutex<bool>>,
}

impl MemoryRemote {
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut flag) = self.offline.lock() {
            *flag = offline;
        }
    }

    pub fn document(&self, user_id: &str) -> Option<RemoteDocument> {
        self.documents.lock().ok()?.get(user_id).cloned()
    }

    pub fn insert(&self, user_id: &str, document: RemoteDocument) {
        if let Ok(mut documents) = self.documents.lock() {
            documents.insert(user_id.to_string(), document);
        }
    }

    fn is_offline(&self) -> bool {
        self.offline.lock().map(|flag| *flag).unwrap_or(true)
    }
}

impl RemoteStore for MemoryRemote {
    fn fetch<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<RemoteDocument, RemoteError>> {
        Box::pin(async move {
            if self.is_offline() {
                return Err(RemoteError::Unavailable);
            }
            Ok(self.document(user_id).unwrap_or_default())
        })
    }

    fn store<'a>(
        &'a self,
        user_id: &'a str,
        document: &'a RemoteDocument,
    ) -> BoxFuture<'a, Result<(), RemoteError>> {
        Box::pin(async move {
            if self.is_offline() {
                return Err(RemoteError::Unavailable);
            }
            self.insert(user_id, document.clone());
            Ok(())
        })
    }
}
