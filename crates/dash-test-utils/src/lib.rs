//! Testing utilities for the CI dashboard workspace
//!
//! In-memory artifact store, placeholder pages, and builders for the
//! artifacts Prow jobs leave behind.

#![allow(missing_docs)]

use dash_artifact::{Fingerprint, FingerprintAlgorithm};
use dash_fetch::{ArtifactFetcher, DiskCache, FetchError, NotFoundDetector, Origin};
use serde_json::json;
use std::cell::RefCell;
use std::collections::HashMap;
use tempfile::TempDir;

pub const BASE_URL: &str = "https://artifacts.test/gcs/logs";

const PLACEHOLDER_TEMPLATE: &str = r#"<!doctype html>
<html><head><title>GCS browser: {path}</title></head>
<body><header><h1>gs://test-platform-results/logs/{path}</h1></header>
<ul class="resource-grid"><li class="pure-g grid-row">
<div class="pure-u-2-5"><a href="/gcs/logs/{path}">{path}</a></div></li></ul>
<p>This directory is empty.</p></body></html>"#;

/// Placeholder page the test store serves for a missing path
pub fn placeholder_page(path: &str) -> String {
    PLACEHOLDER_TEMPLATE.replace("{path}", path)
}

pub fn placeholder_fingerprint() -> Fingerprint {
    let residue = PLACEHOLDER_TEMPLATE.replace("{path}", "");
    Fingerprint::compute(FingerprintAlgorithm::Md5, residue.as_bytes())
}

pub fn placeholder_detector() -> NotFoundDetector {
    NotFoundDetector::new(placeholder_fingerprint())
}

/// Builder for directory listing pages
#[derive(Debug, Default, Clone)]
pub struct ListingPage {
    rows: Vec<(String, bool)>,
}

impl ListingPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dir(mut self, name: &str) -> Self {
        self.rows.push((name.to_string(), true));
        self
    }

    pub fn dirs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.rows.push((name.as_ref().to_string(), true));
        }
        self
    }

    pub fn file(mut self, name: &str) -> Self {
        self.rows.push((name.to_string(), false));
        self
    }

    pub fn build(&self) -> String {
        let mut html = String::from(
            "<!doctype html><html><body><ul class=\"resource-grid\">\n\
             <li class=\"pure-g grid-row grid-header\"><div class=\"pure-u-2-5\">Name</div></li>\n\
             <li class=\"pure-g grid-row\"><img src=\"/icons/back.png\"> <a href=\"..\">..</a></li>\n",
        );
        for (name, is_dir) in &self.rows {
            let (icon, suffix) = if *is_dir { ("dir", "/") } else { ("file", "") };
            html.push_str(&format!(
                "<li class=\"pure-g grid-row\"><div class=\"pure-u-2-5\">\
                 <img src=\"/icons/{icon}.png\"> <a href=\"{name}{suffix}\">{name}{suffix}</a></div></li>\n"
            ));
        }
        html.push_str("</ul></body></html>");
        html
    }
}

pub fn finished_json(passed: bool, result: &str, timestamp: i64) -> String {
    json!({ "passed": passed, "result": result, "timestamp": timestamp }).to_string()
}

/// `_ansible.log.json` whose last play reports the given counts
pub fn ansible_log(ok: u64, failures: u64, ignored: u64) -> String {
    json!([
        { "stats": { "localhost": { "ok": 1, "failures": 0, "ignored": 0 } } },
        { "stats": { "localhost": { "ok": ok, "failures": failures, "ignored": ignored } } },
    ])
    .to_string()
}

/// In-memory artifact store
///
/// Unknown paths are answered with [`placeholder_page`], like the real store.
/// Every request is recorded.
#[derive(Debug)]
pub struct StaticOrigin {
    base_url: String,
    files: HashMap<String, Vec<u8>>,
    failing: Vec<String>,
    requests: RefCell<Vec<String>>,
}

impl StaticOrigin {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            files: HashMap::new(),
            failing: Vec::new(),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn insert(&mut self, path: &str, content: impl Into<Vec<u8>>) -> &mut Self {
        self.files.insert(path.to_string(), content.into());
        self
    }

    pub fn insert_listing(&mut self, dir: &str, page: &ListingPage) -> &mut Self {
        let dir = format!("{}/", dir.trim_end_matches('/'));
        self.insert(&dir, page.build())
    }

    /// Make requests for `path` fail with a network error
    pub fn fail(&mut self, path: &str) -> &mut Self {
        self.failing.push(path.to_string());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn calls_for(&self, path: &str) -> usize {
        let url = format!("{}/{path}", self.base_url);
        self.requests.borrow().iter().filter(|u| **u == url).count()
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl Default for StaticOrigin {
    fn default() -> Self {
        Self::new()
    }
}

impl Origin for StaticOrigin {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.borrow_mut().push(url.to_string());

        let path = url
            .strip_prefix(&self.base_url)
            .map(|p| p.trim_start_matches('/'))
            .unwrap_or(url);
        if self.failing.iter().any(|f| f == path) {
            return Err(FetchError::network(url, "connection reset by peer"));
        }
        Ok(self
            .files
            .get(path)
            .cloned()
            .unwrap_or_else(|| placeholder_page(path).into_bytes()))
    }
}

/// Fetcher over `origin` with a fresh temporary cache
///
/// Keep the returned [`TempDir`] alive for as long as the fetcher is used.
pub fn fixture_fetcher(origin: StaticOrigin) -> (ArtifactFetcher<StaticOrigin>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let base_url = origin.base_url().to_string();
    let fetcher = ArtifactFetcher::with_origin(origin, base_url, DiskCache::new(dir.path()))
        .with_detector(placeholder_detector());
    (fetcher, dir)
}
