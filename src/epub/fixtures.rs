//! Test fixtures: in-memory EPUB builder and a map-backed fetcher.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::fetcher::{ArchiveFetcher, FetchError};

/// Write `entries` into a fresh ZIP archive.
pub fn zip_entries(entries: &[(&str, &[u8])]) -> Vec<u8> {
    zip_entries_with(entries, CompressionMethod::Deflated)
}

pub fn zip_entries_with(entries: &[(&str, &[u8])], method: CompressionMethod) -> Vec<u8> {
    let options = SimpleFileOptions::default().compression_method(method);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer.start_file(name.to_string(), options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Damage the first occurrence of `needle` in a stored archive so its
/// entry fails the checksum.
pub fn flip_byte_in(mut data: Vec<u8>, needle: &[u8]) -> Vec<u8> {
    let at = data
        .windows(needle.len())
        .position(|window| window == needle)
        .expect("needle present in archive");
    data[at] ^= 0x20;
    data
}

/// Builds EPUB archives with a container, an OPF and XHTML chapters.
pub struct EpubBuilder {
    title: Option<String>,
    opf_path: String,
    container: bool,
    opf: bool,
    /// (id, href, media type)
    manifest: Vec<(String, String, String)>,
    spine: Vec<String>,
    files: Vec<(String, Vec<u8>)>,
    method: CompressionMethod,
}

impl Default for EpubBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EpubBuilder {
    pub fn new() -> Self {
        Self {
            title: None,
            opf_path: "OEBPS/content.opf".to_string(),
            container: true,
            opf: true,
            manifest: Vec::new(),
            spine: Vec::new(),
            files: Vec::new(),
            method: CompressionMethod::Deflated,
        }
    }

    /// Store entries uncompressed so their bytes appear verbatim
    pub fn stored(mut self) -> Self {
        self.method = CompressionMethod::Stored;
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn opf_path(mut self, path: &str) -> Self {
        self.opf_path = path.to_string();
        self
    }

    pub fn without_container(mut self) -> Self {
        self.container = false;
        self
    }

    pub fn without_opf(mut self) -> Self {
        self.opf = false;
        self
    }

    /// Chapter with a `<title>` and the given body markup
    pub fn chapter(self, id: &str, title: &str, body: &str) -> Self {
        let markup = format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
             <html xmlns=\"http://www.w3.org/1999/xhtml\">\n\
             <head><title>{}</title></head>\n\
             <body>{}</body>\n</html>",
            title, body
        );
        self.raw_chapter(id, &markup)
    }

    /// Chapter whose document is exactly `markup`
    pub fn raw_chapter(self, id: &str, markup: &str) -> Self {
        self.raw_bytes_chapter(id, markup.as_bytes().to_vec())
    }

    pub fn raw_bytes_chapter(self, id: &str, data: Vec<u8>) -> Self {
        let href = format!("text/{}.xhtml", id);
        self.spine_resource(id, &href, "application/xhtml+xml", data)
    }

    /// Spine entry backed by a file of any media type
    pub fn spine_resource(mut self, id: &str, href: &str, media_type: &str, data: Vec<u8>) -> Self {
        self.files.push((self.resolve(href), data));
        self.manifest
            .push((id.to_string(), href.to_string(), media_type.to_string()));
        self.spine.push(id.to_string());
        self
    }

    /// Archive entry that is neither in the manifest nor the spine
    pub fn file(mut self, path: &str, data: Vec<u8>) -> Self {
        self.files.push((path.to_string(), data));
        self
    }

    /// Spine reference with no manifest item or file behind it
    pub fn spine_only(mut self, idref: &str) -> Self {
        self.spine.push(idref.to_string());
        self
    }

    /// Manifest item and spine reference whose file is absent
    pub fn manifest_only(mut self, id: &str, href: &str) -> Self {
        self.manifest.push((
            id.to_string(),
            href.to_string(),
            "application/xhtml+xml".to_string(),
        ));
        self.spine.push(id.to_string());
        self
    }

    fn resolve(&self, href: &str) -> String {
        match self.opf_path.rfind('/') {
            Some(i) => format!("{}{}", &self.opf_path[..=i], href),
            None => href.to_string(),
        }
    }

    fn container_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="{}" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
            self.opf_path
        )
    }

    fn opf_xml(&self) -> String {
        let items: String = self
            .manifest
            .iter()
            .map(|(id, href, media_type)| {
                format!(
                    "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"/>\n",
                    id, href, media_type
                )
            })
            .collect();
        let itemrefs: String = self
            .spine
            .iter()
            .map(|idref| format!("    <itemref idref=\"{}\"/>\n", idref))
            .collect();
        let title = self
            .title
            .as_ref()
            .map(|t| format!("    <dc:title>{}</dc:title>\n", t))
            .unwrap_or_default();

        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <package xmlns=\"http://www.idpf.org/2007/opf\" version=\"3.0\">\n\
             <metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\n{}</metadata>\n\
             <manifest>\n{}</manifest>\n\
             <spine>\n{}</spine>\n\
             </package>",
            title, items, itemrefs
        )
    }

    pub fn build(self) -> Vec<u8> {
        let container = self.container_xml();
        let opf = self.opf_xml();

        let mut entries: Vec<(&str, &[u8])> = vec![("mimetype", b"application/epub+zip".as_slice())];
        if self.container {
            entries.push(("META-INF/container.xml", container.as_bytes()));
        }
        if self.opf {
            entries.push((self.opf_path.as_str(), opf.as_bytes()));
        }
        for (path, data) in &self.files {
            entries.push((path.as_str(), data.as_slice()));
        }

        zip_entries_with(&entries, self.method)
    }
}

/// Fetcher serving payloads from a shared map; unknown names are 404.
#[derive(Clone, Default)]
pub struct StaticFetcher {
    books: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl StaticFetcher {
    pub fn with(self, filename: &str, data: Vec<u8>) -> Self {
        self.insert(filename, data);
        self
    }

    pub fn insert(&self, filename: &str, data: Vec<u8>) {
        self.books
            .lock()
            .unwrap()
            .insert(filename.to_string(), data);
    }
}

#[async_trait]
impl ArchiveFetcher for StaticFetcher {
    async fn fetch(&self, filename: &str) -> Result<Vec<u8>, FetchError> {
        self.books
            .lock()
            .unwrap()
            .get(filename)
            .cloned()
            .ok_or(FetchError::Status(404))
    }

    fn location(&self, filename: &str) -> String {
        format!("memory://{}", filename)
    }
}
