//! Directory listing scraper
//!
//! Listing pages are a list of `li.grid-row` rows, each with an icon and a
//! link. The icon source tells directories from files and the link text is
//! the entry name.

use crate::parsers::HtmlDocument;

/// Icon marking a directory row
pub const DIRECTORY_ICON: &str = "/icons/dir.png";

/// Conventional parent-directory entry
pub const PARENT_ENTRY: &str = "..";

const ROW_TAG: &str = "li";
const ROW_CLASS: &str = "grid-row";

/// Which entries a listing keeps
///
/// Both flags false keeps everything; both true keeps nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryFilter {
    /// Drop files
    pub dirs_only: bool,
    /// Drop directories
    pub files_only: bool,
}

impl EntryFilter {
    /// Keep directories only
    #[inline]
    #[must_use]
    pub const fn directories() -> Self {
        Self {
            dirs_only: true,
            files_only: false,
        }
    }

    /// Keep files only
    #[inline]
    #[must_use]
    pub const fn files() -> Self {
        Self {
            dirs_only: false,
            files_only: true,
        }
    }

    /// Keep every entry
    #[inline]
    #[must_use]
    pub const fn all() -> Self {
        Self {
            dirs_only: false,
            files_only: false,
        }
    }

    /// Check if an entry passes the filter
    #[inline]
    #[must_use]
    pub const fn keeps(self, is_dir: bool) -> bool {
        !((self.files_only && is_dir) || (self.dirs_only && !is_dir))
    }
}

/// One row of a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Entry name, without trailing `/`
    pub name: String,
    /// Whether the row carries the directory icon
    pub is_dir: bool,
}

/// Every entry of a listing page, in document order
///
/// Rows without an icon and the parent-directory entry are skipped.
#[must_use]
pub fn entries(document: &HtmlDocument) -> Vec<ListingEntry> {
    let mut out = Vec::new();
    for row in document.elements_with_class(ROW_TAG, ROW_CLASS) {
        let Some(icon) = row.find_first("img") else {
            continue;
        };
        let is_dir = icon.attr("src").as_deref() == Some(DIRECTORY_ICON);

        let text = row.find_first("a").map(|a| a.text()).unwrap_or_default();
        let trimmed = text.trim();
        let name = trimmed.strip_suffix('/').unwrap_or(trimmed);
        if name == PARENT_ENTRY {
            continue;
        }

        out.push(ListingEntry {
            name: name.to_string(),
            is_dir,
        });
    }
    out
}

/// Entry names of a listing page passing `filter`, in document order
#[must_use]
pub fn list_entries(document: &HtmlDocument, filter: EntryFilter) -> Vec<String> {
    entries(document)
        .into_iter()
        .filter(|entry| filter.keeps(entry.is_dir))
        .map(|entry| entry.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LISTING: &str = r#"<html><body><ul class="resource-grid">
<li class="grid-row grid-header"><div class="pure-u-2-5">Name</div></li>
<li class="grid-row"><img src="/icons/back.png"> <a href="/gcs/logs/">..</a></li>
<li class="grid-row"><img src="/icons/dir.png"> <a href="/gcs/logs/job/1/"> 1/ </a></li>
<li class="grid-row"><img src="/icons/dir.png"> <a href="/gcs/logs/job/2/">2/</a></li>
<li class="grid-row"><img src="/icons/file.png"> <a href="/gcs/logs/job/latest-build.txt">latest-build.txt</a></li>
</ul></body></html>"#;

    fn doc() -> HtmlDocument {
        HtmlDocument::parse(LISTING.as_bytes())
    }

    #[test]
    fn directories_only() {
        assert_eq!(list_entries(&doc(), EntryFilter::directories()), vec!["1", "2"]);
    }

    #[test]
    fn files_only() {
        assert_eq!(list_entries(&doc(), EntryFilter::files()), vec!["latest-build.txt"]);
    }

    #[test]
    fn both_false_keeps_everything() {
        assert_eq!(
            list_entries(&doc(), EntryFilter::all()),
            vec!["1", "2", "latest-build.txt"]
        );
    }

    #[test]
    fn both_true_keeps_nothing() {
        let filter = EntryFilter {
            dirs_only: true,
            files_only: true,
        };
        assert!(list_entries(&doc(), filter).is_empty());
    }

    #[test]
    fn header_row_without_icon_is_skipped() {
        let all = entries(&doc());
        assert!(all.iter().all(|e| e.name != "Name"));
        assert!(all.iter().all(|e| e.name != PARENT_ENTRY));
    }

    #[test]
    fn empty_page_lists_nothing() {
        let doc = HtmlDocument::parse(b"<html><body><p>empty directory</p></body></html>");
        assert!(list_entries(&doc, EntryFilter::all()).is_empty());
    }
}
