/// Static assets served under `/static/`
use crate::error::{Result, SiteError};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Map a request path below `/static/` onto a file under `root`.
///
/// Returns `None` for anything that would leave `root`.
pub fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(request_path).ok()?;
    let relative = Path::new(&*decoded);

    let mut resolved = root.to_path_buf();
    let mut depth = 0;
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if depth == 0 {
        return None;
    }
    Some(resolved)
}

/// Read an asset; `Ok(None)` when it doesn't exist
pub async fn load(root: &Path, request_path: &str) -> Result<Option<(Vec<u8>, &'static str)>> {
    let Some(path) = resolve(root, request_path) else {
        return Ok(None);
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(Some((bytes, content_type(&path)))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        // Directories read as errors on most platforms
        Err(_) if path.is_dir() => Ok(None),
        Err(e) => Err(SiteError::Io(e)),
    }
}

pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript; charset=utf-8",
        "json" => "application/json; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_stays_inside_root() {
        let root = Path::new("/srv/static");
        assert_eq!(
            resolve(root, "js/main.js"),
            Some(PathBuf::from("/srv/static/js/main.js"))
        );
        assert_eq!(resolve(root, "../secret"), None);
        assert_eq!(resolve(root, "js/../../secret"), None);
        assert_eq!(resolve(root, "%2E%2E/secret"), None);
        assert_eq!(resolve(root, "/etc/passwd"), None);
        assert_eq!(resolve(root, ""), None);
    }

    #[test]
    fn test_content_type_by_extension() {
        assert_eq!(content_type(Path::new("a/site.CSS")), "text/css; charset=utf-8");
        assert_eq!(content_type(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(content_type(Path::new("blob")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_load_existing_and_missing() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("js")).unwrap();
        std::fs::write(temp_dir.path().join("js/main.js"), "console.log(1);").unwrap();

        let (bytes, ct) = load(temp_dir.path(), "js/main.js").await.unwrap().unwrap();
        assert_eq!(bytes, b"console.log(1);");
        assert_eq!(ct, "application/javascript; charset=utf-8");

        assert!(load(temp_dir.path(), "js/missing.js").await.unwrap().is_none());
        assert!(load(temp_dir.path(), "js").await.unwrap().is_none());
    }
}
