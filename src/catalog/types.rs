//! Catalog wire types.

use serde::Deserialize;

/// A file reference inside a post (`file` or `sample`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FileRef {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// One catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub file: Option<FileRef>,
    #[serde(default)]
    pub sample: Option<FileRef>,
}

impl Post {
    /// URL to download: the primary file, else the sample.
    ///
    /// Returns None when the post has nothing downloadable (e.g. the
    /// catalog hides the file from unauthenticated users).
    pub fn resolve_url(&self) -> Option<&str> {
        fn pick(f: &Option<FileRef>) -> Option<&str> {
            f.as_ref()
                .and_then(|f| f.url.as_deref())
                .filter(|u| !u.is_empty())
        }
        pick(&self.file).or_else(|| pick(&self.sample))
    }

    /// Declared size of the primary file.
    pub fn declared_size(&self) -> Option<u64> {
        self.file.as_ref().and_then(|f| f.size).filter(|s| *s > 0)
    }
}

/// Posts returned by a single page request, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogPage {
    #[serde(default)]
    pub posts: Vec<Post>,
}

impl CatalogPage {
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// Parameters for one page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub tags: String,
    pub limit: usize,
    pub page: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page() {
        let body = r#"{
            "posts": [
                {"id": 1, "file": {"url": "https://cdn.example.net/1.png", "size": 2048}},
                {"id": 2, "file": {"url": null, "size": 99}, "sample": {"url": "https://cdn.example.net/s2.jpg"}},
                {"id": 3, "file": {"url": null}, "sample": {"url": null}},
                {"id": 4, "tags": {"general": ["x"]}}
            ]
        }"#;
        let page: CatalogPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.len(), 4);

        assert_eq!(page.posts[0].resolve_url(), Some("https://cdn.example.net/1.png"));
        assert_eq!(page.posts[0].declared_size(), Some(2048));
        assert_eq!(page.posts[1].resolve_url(), Some("https://cdn.example.net/s2.jpg"));
        assert_eq!(page.posts[2].resolve_url(), None);
        assert_eq!(page.posts[3].resolve_url(), None);
    }

    #[test]
    fn test_parse_missing_posts_is_empty() {
        let page: CatalogPage = serde_json::from_str("{}").unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn test_empty_url_is_unresolvable() {
        let post = Post {
            id: Some(5),
            file: Some(FileRef {
                url: Some(String::new()),
                size: None,
            }),
            sample: None,
        };
        assert_eq!(post.resolve_url(), None);
    }

    #[test]
    fn test_empty_file_url_falls_back_to_sample() {
        let post = Post {
            id: Some(6),
            file: Some(FileRef {
                url: Some(String::new()),
                size: Some(10),
            }),
            sample: Some(FileRef {
                url: Some("https://cdn.example.net/s6.jpg".to_string()),
                size: None,
            }),
        };
        let url = post.resolve_url();
        assert_eq!(url, Some("https://cdn.example.net/s6.jpg"));
    }
}
