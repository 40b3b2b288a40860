use axum::{
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, error};

/// Serves files from one directory, refusing any path that would leave it.
#[derive(Clone)]
pub struct StaticFileHandler {
    root: PathBuf,
    index_file: Option<&'static str>,
}

impl StaticFileHandler {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            index_file: None,
        }
    }

    /// File to serve for the directory root and for paths ending in `/`.
    pub fn with_index(mut self, index_file: &'static str) -> Self {
        self.index_file = Some(index_file);
        self
    }

    pub async fn serve(&self, path: &str) -> Response {
        let Some(relative) = sanitize(path) else {
            error!("Path traversal attempt: {:?}", path);
            return (StatusCode::FORBIDDEN, "Forbidden").into_response();
        };

        let wants_index = relative.as_os_str().is_empty() || path.ends_with('/');
        let file_path = match (wants_index, self.index_file) {
            (true, Some(index)) => self.root.join(&relative).join(index),
            (true, None) => return (StatusCode::NOT_FOUND, "File not found").into_response(),
            (false, _) => self.root.join(&relative),
        };

        debug!("Attempting to serve file: {:?}", file_path);

        let metadata = match tokio::fs::metadata(&file_path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return (StatusCode::NOT_FOUND, "File not found").into_response(),
            Err(e) => {
                debug!("Failed to get metadata for {:?}: {}", file_path, e);
                return (StatusCode::NOT_FOUND, "File not found").into_response();
            }
        };

        let file = match File::open(&file_path).await {
            Ok(file) => file,
            Err(e) => {
                debug!("Failed to open file {:?}: {}", file_path, e);
                return (StatusCode::NOT_FOUND, "File not found").into_response();
            }
        };

        let content_type = mime_guess::from_path(&file_path)
            .first_or_octet_stream()
            .to_string();

        let cache_control = if content_type.starts_with("image/") {
            // Photo contents never change under the same name
            "public, max-age=86400"
        } else if content_type.starts_with("text/html") {
            "no-cache"
        } else if content_type.starts_with("text/css")
            || content_type.starts_with("application/javascript")
            || content_type.starts_with("text/javascript")
        {
            "public, max-age=300, must-revalidate"
        } else {
            "public, max-age=3600"
        };

        let mut response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, metadata.len())
            .header(header::CACHE_CONTROL, cache_control);

        if let Ok(modified) = metadata.modified()
            && let Ok(duration) = modified.duration_since(UNIX_EPOCH)
        {
            response = response.header(header::LAST_MODIFIED, httpdate::fmt_http_date(modified));

            // ETag based on modification time and file size
            let etag = format!("\"{}-{}\"", duration.as_secs(), metadata.len());
            response = response.header(header::ETAG, etag);
        }

        let body = Body::from_stream(ReaderStream::new(file));
        response.body(body).unwrap_or_else(|e| {
            error!("Failed to build response for {:?}: {}", file_path, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
    }
}

/// Relative path made only of normal components, or `None` if the request
/// tries to climb out of the root.
fn sanitize(path: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("Vacation/beach.jpg"), Some(PathBuf::from("Vacation/beach.jpg")));
        assert_eq!(sanitize("/a/./b.png"), Some(PathBuf::from("a/b.png")));
        assert_eq!(sanitize(""), Some(PathBuf::new()));
        assert_eq!(sanitize("../etc/passwd"), None);
        assert_eq!(sanitize("a/../../b"), None);
    }

    #[tokio::test]
    async fn test_serves_file_with_headers() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("Vacation")).unwrap();
        std::fs::write(temp_dir.path().join("Vacation/beach.jpg"), b"jpeg bytes").unwrap();

        let handler = StaticFileHandler::new(temp_dir.path().to_path_buf());
        let response = handler.serve("Vacation/beach.jpg").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
        assert!(response.headers().contains_key(header::ETAG));
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"jpeg bytes");
    }

    #[tokio::test]
    async fn test_index_only_when_configured() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("index.html"), "<html></html>").unwrap();

        let plain = StaticFileHandler::new(temp_dir.path().to_path_buf());
        assert_eq!(plain.serve("").await.status(), StatusCode::NOT_FOUND);

        let with_index = plain.clone().with_index("index.html");
        let response = with_index.serve("").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    }

    #[tokio::test]
    async fn test_missing_and_forbidden() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("album")).unwrap();
        let handler = StaticFileHandler::new(temp_dir.path().to_path_buf());

        assert_eq!(handler.serve("nope.jpg").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(handler.serve("album").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(handler.serve("../secret").await.status(), StatusCode::FORBIDDEN);
    }
}
