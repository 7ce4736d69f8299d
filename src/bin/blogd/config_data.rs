use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

const CONFIG_SAMPLE: &str = r#"# For the file locations, if you want a path relative to the executable
# directory, use ${exe_dir}/location
[paths]
posts_dir = "posts"
template_path = "main/index.html"
public_dir = "main"

[content]
# Posts per front page and titles in the all-posts list
recent_posts_count = 20
post_titles_count = 40
# Seconds between checks for changed files
refresh_secs = 60

[server]
address = "0.0.0.0"
port = 444

[tls]
# PEM encoded. Self-signed works for testing:
# openssl req -x509 -newkey rsa:2048 -nodes -keyout keys/server.key -out keys/server.crt -days 365
cert_path = "keys/server.crt"
key_path = "keys/server.key"

[admission]
window_secs = 60
max_per_window = 120
"#;

pub(crate) fn write_sample_cfg(file_path: &PathBuf) {
    let mut file = File::create(file_path).unwrap();
    file.write_all(CONFIG_SAMPLE.as_bytes()).unwrap();
}
