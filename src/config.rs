use std::io::ErrorKind;
use std::path::PathBuf;
use std::{env, fs, io};

use serde::Deserialize;

#[derive(Deserialize)]
pub struct Paths {
    pub posts_dir: PathBuf,
    pub template_path: PathBuf,
    pub public_dir: PathBuf,
}

#[derive(Deserialize)]
pub struct Content {
    /// Posts per front page.
    pub recent_posts_count: usize,
    /// Titles in the all-posts list fragment.
    pub post_titles_count: usize,
    /// Seconds between recompilation passes.
    pub refresh_secs: u64,
}

#[derive(Deserialize)]
pub struct Server {
    pub address: String,
    pub port: u16,
}

#[derive(Deserialize)]
pub struct Tls {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Deserialize)]
pub struct Admission {
    pub window_secs: u64,
    pub max_per_window: u32,
}

impl Default for Admission {
    fn default() -> Self {
        Admission {
            window_secs: 60,
            max_per_window: 120,
        }
    }
}

#[derive(Deserialize)]
pub struct Log {
    pub level: LogLevel,
    pub log_to_console: bool,
    pub location: Option<PathBuf>,
}

#[derive(Deserialize, Copy, Clone)]
pub enum LogLevel {
    Critical = 0,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize)]
pub struct Config {
    pub paths: Paths,
    pub content: Content,
    pub server: Server,
    pub tls: Tls,
    #[serde(default)]
    pub admission: Admission,
    pub log: Option<Log>,
}

fn parse_path(path: PathBuf) -> PathBuf {
    if path.starts_with("${exe_dir}") {
        let cur_exe = env::current_exe().unwrap();
        let exe_dir = cur_exe.parent().unwrap().to_str().unwrap();
        let str_path = path.to_str().unwrap();
        PathBuf::from(str_path.replace("${exe_dir}", exe_dir))
    } else {
        path
    }
}

pub fn read_config(cfg_path: &PathBuf) -> io::Result<Config> {
    let cfg_content = match fs::read_to_string(cfg_path) {
        Ok(content) => content,
        Err(e) => return Err(io::Error::new(e.kind(), format!("Error opening configuration file {}: {}", cfg_path.to_str().unwrap(), e))),
    };

    let mut cfg: Config = match toml::from_str::<Config>(cfg_content.as_str()) {
        Ok(cfg) => cfg,
        Err(e) => return Err(io::Error::new(
            ErrorKind::InvalidData, format!("Error parsing configuration file: {}", e))),
    };

    cfg.paths = Paths {
        posts_dir: parse_path(cfg.paths.posts_dir),
        template_path: parse_path(cfg.paths.template_path),
        public_dir: parse_path(cfg.paths.public_dir),
    };
    cfg.tls = Tls {
        cert_path: parse_path(cfg.tls.cert_path),
        key_path: parse_path(cfg.tls.key_path),
    };

    Ok(cfg)
}
