use spdlog::warn;

const RP_TS_TOKEN: &str = "<!--######rp_ts######-->";
const RP_CATS_TOKEN: &str = "<!--######rp_cats######-->";

/// One parsed `.blog` file.
///
/// `short_html` is the fragment shown in listings, `full_html` the body of
/// the post's own page. A missing or unparseable `date:` header leaves `date`
/// unset; the post is then excluded from date-ordered structures but stays
/// addressable through `full_html`.
pub struct ParsedPost {
    pub title: Option<String>,
    pub date: Option<i64>,
    pub categories: Vec<String>,
    pub short_html: String,
    pub full_html: String,
}

/// Example of a post source file
/// ```text
/// date: 1651363200
/// categories: rust, servers
/// title: Why I still hand-roll HTTP
///
///
/// <p>A summary paragraph shown in listings.</p>
///
///
/// <p>The whole article.</p>
/// ```
///
/// Three line-oriented blocks: headers, short form, full form. Two
/// consecutive blank lines (empty, or a lone carriage return) advance the
/// block; a non-blank line resets the pair. Once the full-form block starts,
/// every remaining line belongs to it, blank or not. `//` lines are comments
/// in every block.
pub fn parse_post(post_path: &str, text: &str) -> ParsedPost {
    let mut title: Option<String> = None;
    let mut date: Option<i64> = None;
    let mut categories: Vec<String> = vec![];

    let mut short_html = String::new();
    let mut full_html = String::from("<div class=\"post\">");

    let mut title_string = String::new();
    let mut ts_string = String::new();
    let mut categories_string = String::new();
    let mut full_html_started = false;

    let mut blank_counter = 0;
    let mut block_counter = 0;

    for line in text.split('\n') {
        if line.starts_with("//") {
            // skip comment
            continue;
        }

        match block_counter {
            0 => {
                let line = line.trim_end_matches('\r');
                if let Some(rest) = line.strip_prefix("date: ") {
                    // unix timestamp, seconds since 1970
                    match rest.parse::<i64>() {
                        Ok(secs) => {
                            date = Some(secs);
                            ts_string = format!("<span class=\"unix_ts post_date\">{}</span>", secs);
                        }
                        Err(e) => {
                            warn!("error parsing date for file {}: {}", post_path, e);
                        }
                    }
                } else if let Some(rest) = line.strip_prefix("categories: ") {
                    for cat in rest.split(", ") {
                        categories.push(cat.to_string());
                        categories_string += &format!("<a href=\"/categories/{}\">{}</a>", cat, cat);
                    }
                } else if let Some(rest) = line.strip_prefix("title: ") {
                    title = Some(rest.to_string());
                    title_string = format!("<span class=\"post_title\">{}</span>", rest);

                    // Seed the listing entry. The timestamp and category
                    // slots are placeholders until the full-form block
                    // starts, since those headers may come in any order.
                    short_html += &format!(
                        "<div class=\"recent_posts_entry\">\
                         <a class=\"recent_post_title\" href=\"/posts/{}\">{}</a>\
                         <span class=\"unix_ts recent_post_date\">{}</span>\
                         <div class=\"recent_post_categories\">{}</div>\
                         <div class=\"recent_post_content\">\n",
                        post_path, rest, RP_TS_TOKEN, RP_CATS_TOKEN
                    );
                }
                // any other header line is ignored
            }
            1 => {
                short_html.push_str(line);
                short_html.push('\n');
            }
            _ => {
                if !full_html_started {
                    short_html.push_str("</div></div>\n");

                    let rp_ts = match date {
                        Some(secs) => secs.to_string(),
                        None => String::new(),
                    };
                    short_html = short_html.replacen(RP_TS_TOKEN, &rp_ts, 1);
                    short_html = short_html.replacen(RP_CATS_TOKEN, &categories_string, 1);

                    full_html += &title_string;
                    full_html += &ts_string;
                    full_html += &format!(
                        "<div class=\"post_categories\">\
                         <span class=\"post_categories_title\">Categories</span>{}</div>\
                         <div class=\"post_content\">",
                        categories_string
                    );
                    full_html_started = true;
                }

                full_html.push_str(line);
                full_html.push('\n');
            }
        }

        if block_counter < 2 {
            // Blank lines are only counted before the full-form block.
            if line.is_empty() || line == "\r" {
                blank_counter += 1;
                if blank_counter == 2 {
                    block_counter += 1;
                    blank_counter = 0;
                }
            } else {
                blank_counter = 0;
            }
        }
    }

    full_html.push_str("</div></div>");

    ParsedPost {
        title,
        date,
        categories,
        short_html,
        full_html,
    }
}

#[cfg(test)]
mod tests {
    use crate::test_data::POST_SOURCE;

    use super::*;

    #[test]
    fn test_parse_headers() {
        let post = parse_post("hello.blog", POST_SOURCE);
        assert_eq!(post.title.as_deref(), Some("Hello world"));
        assert_eq!(post.date, Some(1651363200));
        assert_eq!(post.categories, ["rust", "servers"]);
    }

    #[test]
    fn test_header_order_is_irrelevant() {
        let a = parse_post("p.blog", "date: 100\ncategories: c\ntitle: T\n\n\ns\n\n\nf\n");
        let b = parse_post("p.blog", "categories: c\ndate: 100\ntitle: T\n\n\ns\n\n\nf\n");
        assert_eq!(a.title, b.title);
        assert_eq!(a.date, b.date);
        assert_eq!(a.categories, b.categories);
        assert_eq!(a.full_html, b.full_html);
    }

    #[test]
    fn test_block_transitions() {
        let src = "title: T\n\n\nshort line\n\n\nfull line\n";
        let post = parse_post("p.blog", src);
        assert!(post.short_html.contains("short line"));
        assert!(!post.short_html.contains("full line"));
        assert!(post.full_html.contains("full line"));
        assert!(!post.full_html.contains("short line"));
    }

    #[test]
    fn test_single_blank_lines_do_not_advance() {
        // One blank between header lines must not start the short block.
        let src = "title: T\n\ndate: 42\n\n\nshort\n\n\nfull\n";
        let post = parse_post("p.blog", src);
        assert_eq!(post.date, Some(42));
        assert!(post.short_html.contains("short"));
    }

    #[test]
    fn test_blocks_never_regress() {
        // Blank pairs inside the full block stay in the full block.
        let src = "title: T\n\n\ns\n\n\nf1\n\n\n\n\nf2\n";
        let post = parse_post("p.blog", src);
        assert!(post.full_html.contains("f1"));
        assert!(post.full_html.contains("f2"));
        assert!(!post.short_html.contains("f2"));
    }

    #[test]
    fn test_comments_skipped_everywhere() {
        let src = "// header comment\ntitle: T\n\n\n// short comment\ns\n\n\n// full comment\nf\n";
        let post = parse_post("p.blog", src);
        assert!(!post.short_html.contains("comment"));
        assert!(!post.full_html.contains("comment"));
    }

    #[test]
    fn test_comment_does_not_reset_blank_pair() {
        // A comment between two blanks is invisible to the transition rule.
        let src = "title: T\n\n// note\n\nshort\n\n\nfull\n";
        let post = parse_post("p.blog", src);
        assert!(post.short_html.contains("short"));
        assert!(post.full_html.contains("full"));
    }

    #[test]
    fn test_bad_date_is_unset() {
        let src = "date: not-a-number\ntitle: T\n\n\ns\n\n\nf\n";
        let post = parse_post("p.blog", src);
        assert_eq!(post.date, None);
        assert_eq!(post.title.as_deref(), Some("T"));
        // The listing timestamp slot resolves to empty.
        assert!(post.short_html.contains("<span class=\"unix_ts recent_post_date\"></span>"));
    }

    #[test]
    fn test_crlf_input() {
        let src = "title: T\r\ndate: 7\r\n\r\n\r\nshort\r\n\r\n\r\nfull\r\n";
        let post = parse_post("p.blog", src);
        assert_eq!(post.title.as_deref(), Some("T"));
        assert_eq!(post.date, Some(7));
        assert!(post.short_html.contains("short"));
        assert!(post.full_html.contains("full"));
    }

    #[test]
    fn test_placeholders_resolved() {
        let post = parse_post("hello.blog", POST_SOURCE);
        assert!(!post.short_html.contains("######"));
        assert!(post.short_html.contains("<span class=\"unix_ts recent_post_date\">1651363200</span>"));
        assert!(post.short_html.contains("<a href=\"/categories/rust\">rust</a>"));
    }

    #[test]
    fn test_full_html_markup_order() {
        let post = parse_post("hello.blog", POST_SOURCE);
        let title_at = post.full_html.find("post_title").unwrap();
        let date_at = post.full_html.find("post_date").unwrap();
        let cats_at = post.full_html.find("post_categories").unwrap();
        let content_at = post.full_html.find("post_content").unwrap();
        assert!(title_at < date_at && date_at < cats_at && cats_at < content_at);
        assert!(post.full_html.ends_with("</div></div>"));
    }
}
