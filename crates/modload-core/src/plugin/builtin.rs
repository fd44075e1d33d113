//! Plugins shipped with the library.

use super::Plugin;
use crate::options::LoaderOptions;
use crate::result::{content_type, LoadResult};
use bytes::Bytes;
use modload_util::path::{join_under_root, trim_leading_slashes};
use std::path::PathBuf;

/// Content sniffer: claims inputs starting with a magic-byte signature and
/// passes them through with a fixed content type.
#[derive(Debug, Clone)]
pub struct SignaturePlugin {
    name: String,
    signature: Vec<u8>,
    content_type: String,
}

impl SignaturePlugin {
    /// Create a sniffer for `signature`.
    pub fn new(
        name: impl Into<String>,
        signature: impl Into<Vec<u8>>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            signature: signature.into(),
            content_type: content_type.into(),
        }
    }

    #[must_use]
    pub fn png() -> Self {
        Self::new("png", b"\x89PNG\r\n\x1a\n".as_slice(), "image/png")
    }

    #[must_use]
    pub fn jpeg() -> Self {
        Self::new("jpeg", b"\xff\xd8\xff".as_slice(), "image/jpeg")
    }

    #[must_use]
    pub fn gif() -> Self {
        Self::new("gif", b"GIF8".as_slice(), "image/gif")
    }

    #[must_use]
    pub fn pdf() -> Self {
        Self::new("pdf", b"%PDF-".as_slice(), "application/pdf")
    }

    #[must_use]
    pub fn wasm() -> Self {
        Self::new("wasm", b"\0asm".as_slice(), "application/wasm")
    }

    /// All built-in sniffers. WebP needs a non-prefix check and is included
    /// as its own plugin type.
    #[must_use]
    pub fn defaults() -> Vec<Box<dyn Plugin>> {
        vec![
            Box::new(Self::png()),
            Box::new(Self::jpeg()),
            Box::new(Self::gif()),
            Box::new(WebpPlugin),
            Box::new(Self::pdf()),
            Box::new(Self::wasm()),
        ]
    }
}

impl Plugin for SignaturePlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn test(&self, buf: &[u8], _source: &str) -> bool {
        !self.signature.is_empty() && buf.starts_with(&self.signature)
    }

    fn transform(&self, buf: &Bytes, _source: &str, _options: &LoaderOptions) -> LoadResult {
        LoadResult::buffer(self.content_type.clone(), buf.clone())
    }
}

/// `RIFF....WEBP`: the signature is split around a length field.
struct WebpPlugin;

impl Plugin for WebpPlugin {
    fn name(&self) -> &str {
        "webp"
    }

    fn test(&self, buf: &[u8], _source: &str) -> bool {
        buf.len() >= 12 && &buf[..4] == b"RIFF" && &buf[8..12] == b"WEBP"
    }

    fn transform(&self, buf: &Bytes, _source: &str, _options: &LoaderOptions) -> LoadResult {
        LoadResult::buffer("image/webp", buf.clone())
    }
}

/// Claims sources under a path prefix and hands back a [`FileReference`]
/// into a storage root, so the caller reads the file itself.
///
/// [`FileReference`]: crate::Payload::FileReference
#[derive(Debug, Clone)]
pub struct FileReferencePlugin {
    prefix: String,
    root: PathBuf,
    content_type: String,
}

impl FileReferencePlugin {
    /// Sources starting with `prefix` (leading slashes ignored) map to
    /// `root/<rest>`.
    pub fn new(prefix: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            prefix: trim_leading_slashes(&prefix.into()).to_string(),
            root: root.into(),
            content_type: content_type::OCTET_STREAM.to_string(),
        }
    }

    /// Override the advertised content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    fn target(&self, source: &str) -> Option<PathBuf> {
        let rest = trim_leading_slashes(source).strip_prefix(self.prefix.as_str())?;

        // The prefix must end on a segment boundary.
        let on_boundary = self.prefix.is_empty()
            || self.prefix.ends_with('/')
            || rest.is_empty()
            || rest.starts_with('/');
        if !on_boundary {
            return None;
        }

        join_under_root(&self.root, rest)
    }
}

impl Plugin for FileReferencePlugin {
    fn name(&self) -> &str {
        "file-reference"
    }

    fn test(&self, _buf: &[u8], source: &str) -> bool {
        self.target(source).is_some()
    }

    fn transform(&self, _buf: &Bytes, source: &str, _options: &LoaderOptions) -> LoadResult {
        // test() already rejected sources without a target
        let path = self.target(source).unwrap_or_else(|| self.root.clone());
        LoadResult::file_reference(self.content_type.clone(), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Payload;

    #[test]
    fn test_png_signature() {
        let plugin = SignaturePlugin::png();
        let png = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
        assert!(plugin.test(png, "image.bin"));
        assert!(!plugin.test(b"\x89PN", "image.png"));

        let result = plugin.transform(
            &Bytes::from_static(png),
            "image.bin",
            &LoaderOptions::default(),
        );
        assert_eq!(result.content_type, "image/png");
        assert_eq!(result.payload, Payload::Buffer(Bytes::from_static(png)));
    }

    #[test]
    fn test_empty_signature_never_matches() {
        let plugin = SignaturePlugin::new("empty", Vec::<u8>::new(), "x/y");
        assert!(!plugin.test(b"anything", "a"));
    }

    #[test]
    fn test_webp_signature() {
        let plugin = WebpPlugin;
        assert!(plugin.test(b"RIFF\x10\0\0\0WEBPVP8 ", "a"));
        assert!(!plugin.test(b"RIFF\x10\0\0\0WAVEfmt ", "a"));
        assert!(!plugin.test(b"RIFF", "a"));
    }

    #[test]
    fn test_defaults_cover_common_formats() {
        let names: Vec<String> = SignaturePlugin::defaults()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, ["png", "jpeg", "gif", "webp", "pdf", "wasm"]);
    }

    #[test]
    fn test_file_reference_plugin() {
        let plugin =
            FileReferencePlugin::new("/assets/", "/srv/blobs").with_content_type("video/mp4");

        assert!(plugin.test(b"", "/assets/intro.mp4"));
        assert!(!plugin.test(b"", "/src/intro.mp4"));
        assert!(!plugin.test(b"", "/assets/../secret"));

        let result = plugin.transform(
            &Bytes::new(),
            "/assets/clips/intro.mp4",
            &LoaderOptions::default(),
        );
        assert_eq!(
            result,
            LoadResult::file_reference("video/mp4", "/srv/blobs/clips/intro.mp4")
        );
    }

    #[test]
    fn test_file_reference_prefix_stops_at_segment_boundary() {
        let plugin = FileReferencePlugin::new("/assets", "/srv/blobs");

        assert!(plugin.test(b"", "/assets/logo.svg"));
        assert!(plugin.test(b"", "/assets"));
        assert!(!plugin.test(b"", "/assets-private/key.pem"));
        assert!(!plugin.test(b"", "/assetsx"));

        let result = plugin.transform(
            &Bytes::new(),
            "/assets/logo.svg",
            &LoaderOptions::default(),
        );
        assert_eq!(
            result,
            LoadResult::file_reference(content_type::OCTET_STREAM, "/srv/blobs/logo.svg")
        );
    }
}
