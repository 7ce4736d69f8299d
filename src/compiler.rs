use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::{fs, io};

use spdlog::{error, info, warn};

use crate::paginator::Paginator;
use crate::post::{parse_post, ParsedPost};
use crate::snapshot::{ContentStore, PostView, Snapshot};

pub const CATEGORIES_MARKER: &str = "<!-- ######categories###### -->";
pub const POSTS_MARKER: &str = "<!-- ######posts###### -->";
pub const POST_TITLES_MARKER: &str = "<!-- ######post_titles###### -->";

const POST_EXTENSION: &str = ".blog";

struct CompiledPost {
    source: String,
    parsed: ParsedPost,
}

/// Walks the posts directory, re-parses what changed, and publishes a fresh
/// snapshot when anything did.
///
/// State between cycles is the last-seen source text per post plus the last
/// template text; comparing bytes (not mtimes) is what decides a rebuild.
/// Single writer: one compiler instance drives one store.
pub struct ContentCompiler {
    posts_dir: PathBuf,
    template_path: PathBuf,
    recent_posts_count: usize,
    post_titles_count: usize,
    posts: HashMap<String, CompiledPost>,
    order: Vec<String>,
    template: String,
}

impl ContentCompiler {
    pub fn new(
        posts_dir: PathBuf,
        template_path: PathBuf,
        recent_posts_count: usize,
        post_titles_count: usize,
    ) -> Self {
        ContentCompiler {
            posts_dir,
            template_path,
            recent_posts_count: recent_posts_count.max(1),
            post_titles_count,
            posts: HashMap::new(),
            order: vec![],
            template: String::new(),
        }
    }

    /// One polling cycle. `Ok(true)` means a new snapshot was published.
    ///
    /// An unreadable template is returned as an error so the caller can treat
    /// it as fatal at startup; a failed directory walk only skips this
    /// cycle's file pass (the previous file set keeps being served).
    pub fn run_cycle(&mut self, store: &ContentStore) -> io::Result<bool> {
        let mut changed = false;

        match self.walk_posts_dir() {
            Ok(files) => {
                let mut seen: Vec<String> = Vec::with_capacity(files.len());
                for path in files {
                    let rel = self.relative_key(&path);
                    let source = match fs::read_to_string(&path) {
                        Ok(source) => source,
                        Err(e) => {
                            // Skipped this cycle, retried next. Whatever was
                            // compiled before keeps being served.
                            warn!("could not read post {}: {}", rel, e);
                            if self.posts.contains_key(&rel) {
                                seen.push(rel);
                            }
                            continue;
                        }
                    };

                    let needs_compile = match self.posts.get(&rel) {
                        Some(compiled) => compiled.source != source,
                        None => true,
                    };
                    if needs_compile {
                        info!("compiling post {}", rel);
                        let parsed = parse_post(&rel, &source);
                        self.posts.insert(rel.clone(), CompiledPost { source, parsed });
                        changed = true;
                    }
                    seen.push(rel);
                }

                // Posts whose file disappeared drop out of the next snapshot.
                let seen_set: HashSet<&String> = seen.iter().collect();
                let removed: Vec<String> = self
                    .posts
                    .keys()
                    .filter(|k| !seen_set.contains(k))
                    .cloned()
                    .collect();
                for rel in removed {
                    info!("post {} removed from disk", rel);
                    self.posts.remove(&rel);
                    changed = true;
                }

                self.order = seen;
            }
            Err(e) => {
                // A broken walk must not masquerade as a mass deletion; the
                // previous file set stands until the walk succeeds again.
                error!("posts directory walk failed: {}", e);
            }
        }

        let template = fs::read_to_string(&self.template_path)?;
        if template != self.template {
            self.template = template;
            changed = true;
        }

        if !changed {
            return Ok(false);
        }

        store.publish(self.build_snapshot());
        Ok(true)
    }

    /// `.blog` files under the posts directory, in lexical order. Any other
    /// file is ignored without error; any other walk error aborts the walk.
    fn walk_posts_dir(&self) -> io::Result<Vec<PathBuf>> {
        fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
            let mut entries = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
            entries.sort_by_key(|e| e.file_name());
            for entry in entries {
                let file_type = entry.file_type()?;
                if file_type.is_dir() {
                    walk(&entry.path(), files)?;
                } else {
                    let name = entry.file_name();
                    if name.to_string_lossy().ends_with(POST_EXTENSION) {
                        files.push(entry.path());
                    }
                }
            }
            Ok(())
        }

        let mut files = vec![];
        walk(&self.posts_dir, &mut files)?;
        Ok(files)
    }

    fn relative_key(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.posts_dir).unwrap_or(path);
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        parts.join("/")
    }

    fn build_snapshot(&self) -> Snapshot {
        // Category members keep walk-encounter order; the BTreeMap gives the
        // category-list fragment its lexicographic order.
        let mut categories: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for rel in &self.order {
            let Some(compiled) = self.posts.get(rel) else { continue };
            for cat in &compiled.parsed.categories {
                categories.entry(cat.clone()).or_default().push(rel.clone());
            }
        }

        let mut categories_html = String::new();
        for cat in categories.keys() {
            categories_html += &format!(
                "<a href=\"/categories/{}\" class=\"categories_entry\">{}</a>",
                cat, cat
            );
        }

        // Date-descending sequence; the sort is stable, so posts sharing a
        // timestamp keep walk-encounter order.
        let mut dated: Vec<(&str, i64)> = self
            .order
            .iter()
            .filter_map(|rel| {
                let compiled = self.posts.get(rel)?;
                compiled.parsed.date.map(|d| (rel.as_str(), d))
            })
            .collect();
        dated.sort_by(|a, b| b.1.cmp(&a.1));

        let paginator = Paginator::from(&dated, self.recent_posts_count);
        let mut front_pages = Vec::with_capacity(paginator.page_count());
        for page in 0..paginator.page_count() {
            let mut fragment = String::new();
            for (rel, _) in paginator.get_page(page) {
                fragment += &self.posts[*rel].parsed.short_html;
            }
            front_pages.push(fragment);
        }

        let mut post_titles_html = String::new();
        // An empty title counts as absent, same as the original's
        // empty-value-means-delete merge rule.
        let titled = dated
            .iter()
            .filter_map(|(rel, _)| {
                let title = self.posts[*rel].parsed.title.as_deref()?;
                if title.is_empty() {
                    return None;
                }
                Some((*rel, title))
            })
            .take(self.post_titles_count);
        for (rel, title) in titled {
            post_titles_html += &format!(
                "<a href=\"/posts/{}\" class=\"post_titles_entry\">{}</a>",
                rel, title
            );
        }

        let (header, footer) = split_template(&self.template, &categories_html, &post_titles_html);

        let mut posts = HashMap::with_capacity(self.posts.len());
        for (rel, compiled) in &self.posts {
            posts.insert(
                rel.clone(),
                PostView {
                    title: compiled.parsed.title.clone().unwrap_or_default(),
                    date: compiled.parsed.date,
                    full_html: compiled.parsed.full_html.clone(),
                },
            );
        }

        Snapshot {
            header,
            footer,
            front_pages,
            posts,
            categories,
        }
    }
}

/// Splits the template at the posts marker into the shared header and footer,
/// substituting the categories and post-titles markers in place. The posts
/// marker line itself is consumed.
fn split_template(template: &str, categories_html: &str, post_titles_html: &str) -> (String, String) {
    let mut header = String::new();
    let mut footer = String::new();
    let mut in_footer = false;

    for line in template.split('\n') {
        if line.trim_end_matches('\r') == POSTS_MARKER {
            in_footer = true;
            continue;
        }
        let target = if in_footer { &mut footer } else { &mut header };
        target.push_str(line);
        target.push('\n');
    }

    let header = header
        .replacen(CATEGORIES_MARKER, categories_html, 1)
        .replacen(POST_TITLES_MARKER, post_titles_html, 1);
    let footer = footer
        .replacen(CATEGORIES_MARKER, categories_html, 1)
        .replacen(POST_TITLES_MARKER, post_titles_html, 1);

    (header, footer)
}
