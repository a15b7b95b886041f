//! Where a URL lands on disk.
//!
//! `https://example.com/pub/doc/paper.ps` under prefix `~/Downloads` maps to
//! `~/Downloads/example.com/pub/doc/paper.ps`. Everything here is pure: no
//! directory is created and nothing is fetched.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{DlmError, Result};

/// File name used when the URL path ends in a slash
pub const INDEX_FILE_NAME: &str = "index.html";

/// Parse a user-supplied URL, accepting only http and https
pub fn parse_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DlmError::UnsupportedScheme {
            scheme: other.to_string(),
        }),
    }
}

/// `prefix/<host[:port]>/<directory part of the URL path>`
///
/// A non-default port stays in the host directory, so two servers on the same
/// host never share files.
/// The last path segment is treated as the file name and dropped, so a
/// trailing slash keeps the final directory.
pub fn destination_dir(url: &Url, prefix: &Path) -> Result<PathBuf> {
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| DlmError::MissingHost {
            url: url.to_string(),
        })?;

    let host = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let mut dir = prefix.join(&*sanitize_segment(&host));
    let segments: Vec<&str> = url.path_segments().map(Iterator::collect).unwrap_or_default();
    if let Some((_, parents)) = segments.split_last() {
        for segment in parents.iter().filter(|s| !s.is_empty()) {
            dir.push(&*sanitize_segment(&decode(segment)));
        }
    }

    Ok(dir)
}

/// Name of the local file for `url`
pub fn file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|last| !last.is_empty())
        .map(|last| sanitize_segment(&decode(last)).into_owned())
        .unwrap_or_else(|| INDEX_FILE_NAME.to_string())
}

/// Full local path for `url`: [`destination_dir`] joined with [`file_name`]
pub fn destination_path(url: &Url, prefix: &Path) -> Result<PathBuf> {
    Ok(destination_dir(url, prefix)?.join(file_name(url)))
}

fn decode(segment: &str) -> Cow<'_, str> {
    urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment))
}

/// Keep a decoded segment inside its parent directory
fn sanitize_segment(segment: &str) -> Cow<'_, str> {
    match segment {
        "." | ".." => Cow::Owned(segment.replace('.', "_")),
        _ if segment.contains(['/', '\\', '\0']) => {
            Cow::Owned(segment.replace(['/', '\\', '\0'], "_"))
        }
        _ => Cow::Borrowed(segment),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir(raw: &str, prefix: &str) -> PathBuf {
        destination_dir(&parse_url(raw).unwrap(), Path::new(prefix)).unwrap()
    }

    #[test]
    fn test_destination_dir() {
        let cases = [
            ("basic", "http://example.com", "aaa/example.com"),
            ("with 1 subdirectory", "http://example.com/bbb", "aaa/example.com"),
            (
                "with 1 subdirectory ended by a slash",
                "http://example.com/bbb/",
                "aaa/example.com/bbb",
            ),
            (
                "nested file",
                "https://example.com/pub/doc/paper.ps",
                "aaa/example.com/pub/doc",
            ),
            ("with port", "http://example.com:8080/a/b", "aaa/example.com:8080/a"),
            ("default port", "https://example.com:443/a/b", "aaa/example.com/a"),
        ];

        for (desc, url, want) in cases {
            assert_eq!(dir(url, "aaa"), PathBuf::from(want), "{desc}");
        }
    }

    #[test]
    fn test_file_name() {
        let name = |raw: &str| file_name(&parse_url(raw).unwrap());

        assert_eq!(name("http://example.com/pub/paper.ps"), "paper.ps");
        assert_eq!(name("http://example.com/a%20b.tar.gz"), "a b.tar.gz");
        assert_eq!(name("http://example.com/file.gz?x=1#top"), "file.gz");
        assert_eq!(name("http://example.com/bbb/"), INDEX_FILE_NAME);
        assert_eq!(name("http://example.com"), INDEX_FILE_NAME);
    }

    #[test]
    fn test_destination_path() {
        let url = parse_url("https://ftp.gnu.org/gnu/hello/hello-2.12.tar.gz").unwrap();
        assert_eq!(
            destination_path(&url, Path::new("/home/me/Downloads")).unwrap(),
            PathBuf::from("/home/me/Downloads/ftp.gnu.org/gnu/hello/hello-2.12.tar.gz")
        );
    }

    #[test]
    fn test_encoded_separators_stay_in_one_segment() {
        let url = parse_url("http://example.com/a%2F..%2Fb/c%2Fd").unwrap();
        let path = destination_path(&url, Path::new("p")).unwrap();
        assert_eq!(path, PathBuf::from("p/example.com/a_.._b/c_d"));
    }

    #[test]
    fn test_dot_segments_are_neutralised() {
        assert_eq!(sanitize_segment(".."), "__");
        assert_eq!(sanitize_segment("."), "_");
        assert_eq!(sanitize_segment("ok"), "ok");
    }

    #[test]
    fn test_rejects_unsupported_urls() {
        assert!(matches!(
            parse_url("ftp://example.com/file"),
            Err(DlmError::UnsupportedScheme { .. })
        ));
        assert!(matches!(parse_url("not a url"), Err(DlmError::InvalidUrl(_))));
    }
}
