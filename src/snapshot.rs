use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

/// Per-post data a response needs without re-touching the parser output.
pub struct PostView {
    pub title: String,
    pub date: Option<i64>,
    pub full_html: String,
}

/// The complete, immutable content set served at one point in time.
///
/// `front_pages[n]` is the concatenated short-form HTML of page `n` of the
/// date-descending post sequence. Posts are keyed by their path relative to
/// the posts directory (the URL suffix under `/posts/`). Category members
/// keep compilation encounter order; the map itself iterates
/// lexicographically.
#[derive(Default)]
pub struct Snapshot {
    pub header: String,
    pub footer: String,
    pub front_pages: Vec<String>,
    pub posts: HashMap<String, PostView>,
    pub categories: BTreeMap<String, Vec<String>>,
}

impl Snapshot {
    /// Page fragment for the front page. Out-of-range pages are an empty
    /// fragment, not an error.
    pub fn page_fragment(&self, page: usize) -> &str {
        match self.front_pages.get(page) {
            Some(fragment) => fragment.as_str(),
            None => "",
        }
    }
}

/// Double-buffered holder of the served content.
///
/// A reader clones the current `Arc` once and reads that generation for its
/// whole response; the compiler swaps the pointer when a new snapshot is
/// ready. Content is always fully old or fully new from any reader's
/// perspective, and publication never waits on readers.
pub struct ContentStore {
    current: RwLock<Arc<Snapshot>>,
}

impl ContentStore {
    pub fn new() -> Self {
        ContentStore {
            current: RwLock::new(Arc::new(Snapshot::default())),
        }
    }

    pub fn current(&self) -> Arc<Snapshot> {
        self.current.read().unwrap().clone()
    }

    pub fn publish(&self, snapshot: Snapshot) {
        let mut current = self.current.write().unwrap();
        *current = Arc::new(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with_header(header: &str) -> Snapshot {
        Snapshot {
            header: header.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_publish_replaces_whole_snapshot() {
        let store = ContentStore::new();
        store.publish(snapshot_with_header("one"));
        assert_eq!(store.current().header, "one");

        store.publish(snapshot_with_header("two"));
        assert_eq!(store.current().header, "two");
    }

    #[test]
    fn test_reader_keeps_its_generation_across_a_swap() {
        let store = ContentStore::new();
        store.publish(snapshot_with_header("old"));

        let held = store.current();
        store.publish(snapshot_with_header("new"));

        // The in-flight reader still sees the generation it started with.
        assert_eq!(held.header, "old");
        assert_eq!(store.current().header, "new");
    }

    #[test]
    fn test_page_fragment_out_of_range_is_empty() {
        let snapshot = Snapshot {
            front_pages: vec!["p0".to_string(), "p1".to_string()],
            ..Default::default()
        };
        assert_eq!(snapshot.page_fragment(0), "p0");
        assert_eq!(snapshot.page_fragment(1), "p1");
        assert_eq!(snapshot.page_fragment(2), "");
    }
}
