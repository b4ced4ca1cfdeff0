//! Missing-page detection
//!
//! The GCS-backed artifact store never answers 404. A missing path gets a
//! generic "empty directory" page whose only variable content is the requested
//! path echoed back. Stripping the path out of the page leaves a constant
//! residue, recognised here by its fingerprint.
//!
//! The match is exact against one captured template: if the store changes its
//! placeholder page, every missing artifact reads as real content until the
//! configured fingerprint is updated.

use dash_artifact::Fingerprint;

/// Recognises the artifact store's missing-page placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotFoundDetector {
    fingerprint: Fingerprint,
}

impl NotFoundDetector {
    /// Create a detector matching `fingerprint`
    #[inline]
    #[must_use]
    pub const fn new(fingerprint: Fingerprint) -> Self {
        Self { fingerprint }
    }

    /// Fingerprint of the placeholder residue
    #[inline]
    #[must_use]
    pub const fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Check whether `content` is the placeholder served for `requested_path`
    #[must_use]
    pub fn is_not_found(&self, content: &[u8], requested_path: &str) -> bool {
        self.fingerprint.matches(&residue(content, requested_path))
    }
}

impl Default for NotFoundDetector {
    fn default() -> Self {
        Self::new(Fingerprint::default_missing_page())
    }
}

/// Content with every echo of the requested path removed
///
/// The full path goes first, then its parent prefix (up to and including the
/// last `/`).
#[must_use]
pub fn residue(content: &[u8], requested_path: &str) -> Vec<u8> {
    let without_path = remove_all(content, requested_path.as_bytes());
    let parent = match requested_path.rfind('/') {
        Some(pos) => &requested_path[..=pos],
        None => "",
    };
    remove_all(&without_path, parent.as_bytes())
}

fn remove_all(haystack: &[u8], needle: &[u8]) -> Vec<u8> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return haystack.to_vec();
    }

    let mut out = Vec::with_capacity(haystack.len());
    let mut i = 0;
    while i < haystack.len() {
        if haystack[i..].starts_with(needle) {
            i += needle.len();
        } else {
            out.push(haystack[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dash_artifact::FingerprintAlgorithm;

    const TEMPLATE: &str = "<!doctype html><html><head><title>gs://bucket/logs/{path}</title></head>\
        <body><ul class=\"breadcrumb\"><li>{path}</li></ul><p>empty directory</p></body></html>";

    fn placeholder(path: &str) -> String {
        TEMPLATE.replace("{path}", path)
    }

    fn detector(algorithm: FingerprintAlgorithm) -> NotFoundDetector {
        let residue = TEMPLATE.replace("{path}", "");
        NotFoundDetector::new(Fingerprint::compute(algorithm, residue.as_bytes()))
    }

    #[test]
    fn residue_strips_path_then_parent() {
        let content = b"a job/1/finished.json b job/1/ c";
        assert_eq!(residue(content, "job/1/finished.json"), b"a  b  c");
    }

    #[test]
    fn residue_without_parent_prefix() {
        assert_eq!(residue(b"x latest-build.txt y", "latest-build.txt"), b"x  y");
    }

    #[test]
    fn remove_all_handles_overlaps_and_edges() {
        assert_eq!(remove_all(b"aaaa", b"aa"), b"");
        assert_eq!(remove_all(b"abc", b""), b"abc");
        assert_eq!(remove_all(b"ab", b"abc"), b"ab");
    }

    #[test]
    fn placeholder_is_detected_for_any_path() {
        for algorithm in [FingerprintAlgorithm::Md5, FingerprintAlgorithm::Sha256] {
            let detector = detector(algorithm);
            for path in ["job/1/finished.json", "job/", "latest-build.txt", "a/b/c/d/e.log"] {
                assert!(
                    detector.is_not_found(placeholder(path).as_bytes(), path),
                    "placeholder for {path} not detected with {algorithm}"
                );
            }
        }
    }

    #[test]
    fn real_content_is_not_detected() {
        let detector = detector(FingerprintAlgorithm::Md5);
        let finished = br#"{"passed": true, "result": "SUCCESS", "timestamp": 1700000000}"#;
        assert!(!detector.is_not_found(finished, "job/1/finished.json"));
    }

    #[test]
    fn placeholder_for_another_path_is_not_detected() {
        let detector = detector(FingerprintAlgorithm::Md5);
        let page = placeholder("job/2/finished.json");
        assert!(!detector.is_not_found(page.as_bytes(), "job/1/finished.json"));
    }

    #[test]
    fn default_detector_uses_builtin_fingerprint() {
        assert_eq!(
            NotFoundDetector::default().fingerprint(),
            Fingerprint::default_missing_page()
        );
    }
}
