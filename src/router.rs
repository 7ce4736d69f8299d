use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::AsyncWrite;

use crate::http::request::Request;
use crate::http::response::Response;
use crate::snapshot::ContentStore;
use crate::static_files;

pub const PAGE_CACHE_CONTROL: &str = "max-age=600";

/// Maps a framed request to a response drawn from the content store, or to a
/// static file under the public root.
pub struct Router {
    store: Arc<ContentStore>,
    public_dir: PathBuf,
}

impl Router {
    pub fn new(store: Arc<ContentStore>, public_dir: PathBuf) -> Self {
        Router { store, public_dir }
    }

    /// Each branch takes the snapshot once and reads only that generation,
    /// so a response is never split across a publish.
    ///
    /// The traversal guard runs before any prefix dispatch: `/..` anywhere
    /// in the path is rejected without touching the filesystem, including
    /// under `/posts/`.
    pub async fn respond<S>(&self, req: &Request, stream: &mut S) -> io::Result<()>
    where
        S: AsyncWrite + Unpin,
    {
        if req.path.contains("/..") {
            return Response::unauthorized().write_to(stream).await;
        }

        if req.path == "/" {
            let snapshot = self.store.current();
            let body = format!(
                "{}{}{}",
                snapshot.header,
                snapshot.page_fragment(req.page()),
                snapshot.footer
            );
            return Response::html(body)
                .header("Cache-Control", PAGE_CACHE_CONTROL)
                .write_to(stream)
                .await;
        }

        if let Some(cat) = req.path.strip_prefix("/categories/") {
            let snapshot = self.store.current();
            let members = snapshot.categories.get(cat).filter(|m| !m.is_empty());
            return match members {
                Some(members) => {
                    let mut listing = format!("<span class=\"category_title\">{}</span>", cat);
                    for rel in members {
                        let (title, ts) = match snapshot.posts.get(rel) {
                            Some(view) => (
                                view.title.as_str(),
                                view.date.map(|d| d.to_string()).unwrap_or_default(),
                            ),
                            None => ("", String::new()),
                        };
                        listing += &format!(
                            "<div class=\"category_post_entry\">\
                             <a href=\"/posts/{}\" class=\"category_post_link\">{}</a>\
                             <span class=\"unix_ts category_post_date\">{}</span></div>",
                            rel, title, ts
                        );
                    }
                    let body = format!("{}{}{}", snapshot.header, listing, snapshot.footer);
                    Response::html(body)
                        .header("Cache-Control", PAGE_CACHE_CONTROL)
                        .write_to(stream)
                        .await
                }
                None => Response::not_found().write_to(stream).await,
            };
        }

        if let Some(rel) = req.path.strip_prefix("/posts/") {
            let snapshot = self.store.current();
            return match snapshot.posts.get(rel) {
                Some(view) => {
                    let body = format!("{}{}{}", snapshot.header, view.full_html, snapshot.footer);
                    Response::html(body)
                        .header("Cache-Control", PAGE_CACHE_CONTROL)
                        .write_to(stream)
                        .await
                }
                None => Response::not_found().write_to(stream).await,
            };
        }

        static_files::serve(stream, &self.public_dir, &req.path).await
    }
}
