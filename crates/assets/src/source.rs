use crate::AssetError;
use percent_encoding::percent_decode_str;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use url::Url;

/// Where an asset's bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    Path(PathBuf),
    Url(Url),
}

fn has_http_scheme(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

impl AssetSource {
    /// `http://` and `https://` strings are URLs, anything else is a path.
    pub fn parse(s: &str) -> Result<Self, AssetError> {
        let trimmed = s.trim();
        if has_http_scheme(trimmed) {
            let url = Url::parse(trimmed).map_err(|source| AssetError::InvalidUrl {
                url: trimmed.to_string(),
                source,
            })?;
            Ok(Self::Url(url))
        } else {
            Ok(Self::Path(PathBuf::from(trimmed)))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Url(_))
    }

    /// Resolve a URI reference found inside this asset (e.g. a glTF buffer)
    /// against it.
    ///
    /// Against a URL base this is RFC 3986 reference resolution, so escapes
    /// stay encoded in the request. Against a path base the reference is
    /// percent-decoded into a file name relative to the base's directory.
    pub fn join(&self, reference: &str) -> Result<Self, AssetError> {
        let invalid = |source| AssetError::InvalidUrl {
            url: reference.to_string(),
            source,
        };
        match self {
            Self::Url(base) => Ok(Self::Url(base.join(reference).map_err(invalid)?)),
            Self::Path(_) if has_http_scheme(reference) => Self::parse(reference),
            Self::Path(path) => {
                let decoded = percent_decode_str(reference).decode_utf8_lossy();
                let rel = Path::new(decoded.as_ref());
                if rel.is_absolute() {
                    return Ok(Self::Path(rel.to_path_buf()));
                }
                let dir = path.parent().unwrap_or_else(|| Path::new(""));
                Ok(Self::Path(dir.join(rel)))
            }
        }
    }
}

impl fmt::Display for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Url(u) => f.write_str(u.as_str()),
        }
    }
}

/// On-disk cache for downloaded assets.
///
/// Files are named by the hex SHA-256 of the URL, so the same URL always
/// maps to the same file regardless of its query string or name.
#[derive(Debug, Clone)]
pub struct AssetCache {
    dir: PathBuf,
}

impl AssetCache {
    /// Open (creating if needed) a cache directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, AssetError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key(url: &str) -> String {
        let digest = Sha256::digest(url.as_bytes());
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(Self::key(url))
    }

    pub fn get(&self, url: &str) -> Option<Vec<u8>> {
        std::fs::read(self.path_for(url)).ok()
    }

    /// Write through a temp file so a crash never leaves a truncated entry.
    pub fn put(&self, url: &str, bytes: &[u8]) -> Result<(), AssetError> {
        let final_path = self.path_for(url);
        let tmp_path = final_path.with_extension("partial");
        std::fs::write(&tmp_path, bytes)?;
        std::fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }
}

/// Read all bytes of `source`, consulting `cache` for URLs.
pub fn fetch(source: &AssetSource, cache: Option<&AssetCache>) -> Result<Vec<u8>, AssetError> {
    fetch_with_progress(source, cache, |_, _| {})
}

/// Like [`fetch`], reporting `(bytes_read, total)` while downloading.
///
/// `total` is `None` when the server sends no content length. Local files and
/// cache hits report once, on completion.
pub fn fetch_with_progress(
    source: &AssetSource,
    cache: Option<&AssetCache>,
    mut on_progress: impl FnMut(u64, Option<u64>),
) -> Result<Vec<u8>, AssetError> {
    match source {
        AssetSource::Path(path) => {
            let bytes = std::fs::read(path)?;
            on_progress(bytes.len() as u64, Some(bytes.len() as u64));
            Ok(bytes)
        }
        AssetSource::Url(url) => {
            let url = url.as_str();
            if let Some(bytes) = cache.and_then(|c| c.get(url)) {
                tracing::debug!("cache hit for {url}");
                on_progress(bytes.len() as u64, Some(bytes.len() as u64));
                return Ok(bytes);
            }
            let bytes = download(url, &mut on_progress)?;
            if let Some(cache) = cache {
                if let Err(e) = cache.put(url, &bytes) {
                    tracing::warn!("failed to cache {url}: {e}");
                }
            }
            Ok(bytes)
        }
    }
}

fn download(url: &str, on_progress: &mut impl FnMut(u64, Option<u64>)) -> Result<Vec<u8>, AssetError> {
    let _span = tracing::info_span!("download", url).entered();
    let http_err = |source| AssetError::Http {
        url: url.to_string(),
        source,
    };

    let mut response = reqwest::blocking::get(url).map_err(http_err)?;
    let status = response.status();
    if !status.is_success() {
        return Err(AssetError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let total = response.content_length();
    let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut chunk = [0u8; 64 * 1024];
    let mut last_decile = 0;
    loop {
        let n = response.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..n]);
        let loaded = bytes.len() as u64;
        on_progress(loaded, total);
        if let Some(total) = total.filter(|t| *t > 0) {
            let decile = loaded * 10 / total;
            if decile > last_decile {
                last_decile = decile;
                tracing::debug!("{}% loaded", decile * 10);
            }
        }
    }
    tracing::info!("downloaded {} bytes", bytes.len());
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> AssetSource {
        AssetSource::Url(Url::parse(s).unwrap())
    }

    #[test]
    fn parse_detects_urls() {
        assert!(AssetSource::parse("https://example.com/a.hdr").unwrap().is_remote());
        assert!(AssetSource::parse("HTTP://example.com/a.hdr").unwrap().is_remote());
        assert_eq!(
            AssetSource::parse("models/helmet.gltf").unwrap(),
            AssetSource::Path(PathBuf::from("models/helmet.gltf"))
        );
    }

    #[test]
    fn malformed_url_is_rejected() {
        let err = AssetSource::parse("https://exa mple.com/a.hdr").unwrap_err();
        assert!(matches!(err, AssetError::InvalidUrl { .. }));
    }

    #[test]
    fn join_relative_to_url() {
        let base = AssetSource::parse("https://cdn.example.com/models/helmet/Helmet.gltf?v=2").unwrap();
        assert_eq!(
            base.join("Helmet.bin").unwrap(),
            url("https://cdn.example.com/models/helmet/Helmet.bin")
        );
        assert_eq!(
            base.join("./tex/albedo%20map.png").unwrap(),
            url("https://cdn.example.com/models/helmet/tex/albedo%20map.png")
        );
    }

    #[test]
    fn join_root_relative_replaces_path() {
        let base = AssetSource::parse("https://cdn.example.com/models/helmet/Helmet.gltf").unwrap();
        assert_eq!(
            base.join("/shared/Helmet.bin").unwrap(),
            url("https://cdn.example.com/shared/Helmet.bin")
        );
    }

    #[test]
    fn join_normalizes_dot_segments() {
        let base = AssetSource::parse("https://cdn.example.com/models/helmet/Helmet.gltf").unwrap();
        assert_eq!(
            base.join("../textures/a.png").unwrap().to_string(),
            "https://cdn.example.com/models/textures/a.png"
        );
    }

    #[test]
    fn join_keeps_escaped_delimiters_in_path() {
        let base = AssetSource::parse("https://cdn.example.com/models/Helmet.gltf").unwrap();
        let AssetSource::Url(joined) = base.join("tex%231%3Fv.png").unwrap() else {
            panic!("expected a URL");
        };
        assert_eq!(joined.path(), "/models/tex%231%3Fv.png");
        assert_eq!(joined.fragment(), None);
        assert_eq!(joined.query(), None);
    }

    #[test]
    fn join_absolute_url_wins() {
        let base = AssetSource::parse("models/a.gltf").unwrap();
        assert_eq!(
            base.join("https://other.example.com/b.bin").unwrap(),
            url("https://other.example.com/b.bin")
        );
        let remote = AssetSource::parse("https://cdn.example.com/a.gltf").unwrap();
        assert_eq!(
            remote.join("https://other.example.com/b.bin").unwrap(),
            url("https://other.example.com/b.bin")
        );
    }

    #[test]
    fn join_relative_to_path() {
        let base = AssetSource::parse("assets/helmet/Helmet.gltf").unwrap();
        assert_eq!(
            base.join("Helmet.bin").unwrap(),
            AssetSource::Path(PathBuf::from("assets/helmet/Helmet.bin"))
        );
        assert_eq!(
            base.join("tex/albedo%20map%231.png").unwrap(),
            AssetSource::Path(PathBuf::from("assets/helmet/tex/albedo map#1.png"))
        );
        let bare = AssetSource::parse("Helmet.gltf").unwrap();
        assert_eq!(
            bare.join("Helmet.bin").unwrap(),
            AssetSource::Path(PathBuf::from("Helmet.bin"))
        );
    }

    #[test]
    fn cache_key_is_stable_hex() {
        let a = AssetCache::key("https://example.com/a.hdr");
        let b = AssetCache::key("https://example.com/a.hdr");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, AssetCache::key("https://example.com/b.hdr"));
    }

    #[test]
    fn cache_hit_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AssetCache::open(dir.path().join("cache")).unwrap();
        assert_eq!(cache.dir(), dir.path().join("cache").as_path());
        // Unroutable host: only a cache hit can satisfy this fetch.
        let source = AssetSource::parse("http://invalid.invalid/env.hdr").unwrap();
        cache.put(&source.to_string(), b"cached").unwrap();
        let bytes = fetch(&source, Some(&cache)).unwrap();
        assert_eq!(bytes, b"cached");
    }

    #[test]
    fn fetch_local_file_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();
        let mut seen = Vec::new();
        let bytes = fetch_with_progress(&AssetSource::Path(path), None, |n, t| seen.push((n, t)))
            .unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(seen, vec![(3, Some(3))]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = fetch(&AssetSource::parse("/no/such/file.hdr").unwrap(), None).unwrap_err();
        assert!(matches!(err, AssetError::Io(_)));
    }
}
