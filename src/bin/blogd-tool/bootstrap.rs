use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::{fs, io};

use chrono::Utc;
use regex::Regex;

use crate::decompress::decompress_files;
use crate::BootstrapArgs;

const SAMPLE_POST: &str = "posts/welcome.blog";
const SAMPLE_POST_DATE: &str = "date: 1700000000";

fn get_sample_cfg() -> &'static str {
    let sample_cfg = include_str!("../../../blogd.toml");
    sample_cfg
}

fn write_blogd_cfg(out_dir: &PathBuf) -> io::Result<()> {
    let file = File::create(out_dir.join("blogd.toml"))?;
    let mut writer = BufWriter::new(file);

    let sample_cfg = get_sample_cfg();
    let sample_cfg = replace_paths(out_dir, sample_cfg);

    writer.write_all(sample_cfg.as_bytes())?;

    writer.flush()
}

fn replace_paths(prefix: &PathBuf, config_data: &str) -> String {
    let prefix = prefix.to_str().unwrap();
    let prefix = if prefix.ends_with('/') {
        prefix[0..prefix.len() - 1].to_string()
    } else {
        prefix.to_string()
    };

    // Turn the relative sample paths into absolute ones under out_dir
    let path_regex = Regex::new(r#"= "(posts|main|keys)"#).unwrap();

    let result = path_regex.replace_all(config_data, |captures: &regex::Captures| {
        format!("= \"{}/{}", prefix, &captures[1])
    });

    result.to_string()
}

fn stamp_sample_post(out_dir: &PathBuf) -> io::Result<()> {
    // The bundled post carries a placeholder date; stamp it with now so a
    // fresh blog starts with a current entry.
    let post_path = out_dir.join(SAMPLE_POST);
    let content = fs::read_to_string(&post_path)?;
    let now = format!("date: {}", Utc::now().timestamp());
    fs::write(&post_path, content.replace(SAMPLE_POST_DATE, &now))
}

pub fn bootstrap_cmd(args: BootstrapArgs) {
    let out_path = PathBuf::from(&args.out_dir);
    let out_path = match fs::canonicalize(out_path) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error converting path to absolute: {} - {}", &args.out_dir, e);
            return;
        }
    };

    if !fs::metadata(&out_path).unwrap().is_dir() {
        eprintln!("Output path must be a directory: {}", out_path.to_str().unwrap());
        return;
    }

    if let Err(e) = decompress_files(&out_path) {
        eprintln!("Error bootstrapping: {}", e);
        return;
    };

    if let Err(e) = stamp_sample_post(&out_path) {
        eprintln!("Error stamping sample post: {}", e);
        return;
    }

    if let Err(e) = write_blogd_cfg(&out_path) {
        eprintln!("Error writing blogd configuration: {}", e);
        return;
    }
}
