//! In-memory page source
//!
//! Serves pre-registered JSON documents by URL, records every request and
//! can be told to fail specific URLs. Drives the fetcher in tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::client::PageSource;
use super::types::JsonApiDocument;
use crate::error::{ExportError, Result};

#[derive(Debug, Default)]
pub struct ScriptedPageSource {
    pages: Mutex<HashMap<String, serde_json::Value>>,
    /// Remaining failures per URL
    failures: Mutex<HashMap<String, usize>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedPageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`ScriptedPageSource::set_page`]
    pub fn with_page(self, url: impl Into<String>, body: serde_json::Value) -> Self {
        self.set_page(url, body);
        self
    }

    /// Register or replace the document served for `url`
    pub fn set_page(&self, url: impl Into<String>, body: serde_json::Value) {
        self.pages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.into(), body);
    }

    /// Make every request for `url` fail with a transport error
    pub fn fail_on(&self, url: impl Into<String>) {
        self.fail_times(url, usize::MAX);
    }

    /// Fail the next `times` requests for `url`, then serve it normally
    pub fn fail_times(&self, url: impl Into<String>, times: usize) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.into(), times);
    }

    /// URLs requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl PageSource for ScriptedPageSource {
    async fn fetch_page(&self, url: &str) -> Result<JsonApiDocument> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());

        {
            let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(remaining) = failures.get_mut(url).filter(|n| **n > 0) {
                *remaining -= 1;
                return Err(ExportError::transport(url, "connection reset"));
            }
        }

        let body = self
            .pages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
            .cloned()
            .ok_or_else(|| ExportError::transport(url, "HTTP 404 Not Found"))?;

        serde_json::from_value(body)
            .map_err(|e| ExportError::Decode(format!("failed to parse page {}: {}", url, e)))
    }
}
