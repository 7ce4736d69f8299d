use std::fs;
use std::path::PathBuf;

use uuid::Uuid;

pub const POST_SOURCE: &str = "// sample post used across tests
date: 1651363200
categories: rust, servers
title: Hello world


<p>A short greeting.</p>


<p>The full greeting, at length.</p>
";

pub const TEMPLATE_SOURCE: &str = "<html>
<head><title>blogd</title></head>
<body>
<div class=\"categories\">
<!-- ######categories###### -->
</div>
<div class=\"post_titles\">
<!-- ######post_titles###### -->
</div>
<div class=\"posts\">
<!-- ######posts###### -->
</div>
</body>
</html>
";

/// A throwaway site layout on disk: posts dir, template, public dir.
/// Removed when dropped.
pub struct TempSite {
    root: PathBuf,
}

impl TempSite {
    pub fn new() -> Self {
        let root = std::env::temp_dir().join(format!("blogd-test-{}", Uuid::new_v4().simple()));
        fs::create_dir_all(root.join("posts")).unwrap();
        fs::create_dir_all(root.join("public")).unwrap();
        fs::write(root.join("index.html"), TEMPLATE_SOURCE).unwrap();
        TempSite { root }
    }

    pub fn root(&self) -> PathBuf {
        self.root.clone()
    }

    pub fn posts_dir(&self) -> PathBuf {
        self.root.join("posts")
    }

    pub fn public_dir(&self) -> PathBuf {
        self.root.join("public")
    }

    pub fn template_path(&self) -> PathBuf {
        self.root.join("index.html")
    }

    pub fn write_post(&self, name: &str, content: &str) {
        let path = self.posts_dir().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn write_public(&self, name: &str, content: &[u8]) {
        let path = self.public_dir().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
}

impl Drop for TempSite {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}
