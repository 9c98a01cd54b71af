//! Read-only HTTP backend.
//!
//! HTML pages are browsed as directories: listing a page fetches it and
//! turns every same-host link into a child. Everything else is a plain file
//! whose content is the response body.
//!
//! Classification works in two steps:
//!
//! 1. A guess from the URL alone (trailing slash, no extension, or a
//!    page-like extension such as `.html` or `.php` means directory).
//! 2. A `HEAD` probe, whose answer wins: an HTML content type means
//!    directory, a definite content length means a file of that size. The
//!    guess is only kept when the probe says neither.
//!
//! The wire client sits behind [`HttpTransport`]. With the `http-client`
//! feature, [`UreqTransport`](crate::UreqTransport) implements it over `ureq`.

use std::io::{self, Read};
use std::sync::{Arc, LazyLock, Weak};
use std::time::{Duration, SystemTime};

use regex::Regex;
use tracing::{debug, trace};
use url::Url;

use crate::attrs::{AttributeSource, SyncedAttributes};
use crate::common::{ParentSlot, ls_filtered_via};
use crate::traits::{
    EntityAttributes, EntityContent, EntityCore, EntityListing, EntityMutation, EntityNavigation,
    EntitySpace,
};
use crate::{
    BackendKind, ChangeablePermissions, EntityFilter, EntityProvider, EntityRef, FileAttributes,
    FileEntity, FileError, FileOperation, FilePermissions, InputStream, Location, NativeHandle,
    OutputStream, RandomAccessInput, RandomAccessOutput,
};

/// Extensions of server-generated pages.
const PAGE_EXTENSIONS: &[&str] = &[
    "html", "htm", "xhtml", "shtml", "php", "asp", "aspx", "jsp", "cgi", "pl",
];

/// Upper bound on a page body parsed for links.
const MAX_LISTING_BYTES: u64 = 8 * 1024 * 1024;

static LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:href|src)\s*=\s*["']([^"'#]+)["']"#).expect("valid link pattern")
});

/// Response headers of a `HEAD` request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHead {
    /// Status code.
    pub status: u16,
    /// `Content-Type`, if sent.
    pub content_type: Option<String>,
    /// `Content-Length`, if sent.
    pub content_length: Option<u64>,
    /// Raw `Last-Modified`, if sent.
    pub last_modified: Option<String>,
}

/// Failure reported by an [`HttpTransport`].
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The server answered with an error status.
    #[error("HTTP status {status}")]
    Status {
        /// The status code.
        status: u16,
    },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(#[source] io::Error),
}

impl HttpError {
    /// Translate into the crate taxonomy.
    ///
    /// | Status | Error |
    /// |--------|-------|
    /// | 401 | [`FileError::AuthenticationRequired`] for the location's realm |
    /// | 403 | [`FileError::AccessDenied`] |
    /// | 404, 410 | [`FileError::NotFound`] |
    /// | other | [`FileError::Io`] |
    pub fn into_file_error(self, operation: &'static str, location: &Location) -> FileError {
        match self {
            HttpError::Status { status: 401 } => FileError::AuthenticationRequired {
                realm: location.realm(),
            },
            HttpError::Status { status: 403 } => FileError::access_denied(location),
            HttpError::Status { status: 404 | 410 } => FileError::not_found(location),
            HttpError::Status { status } => {
                FileError::io(operation, location, io::Error::other(format!("HTTP status {status}")))
            }
            HttpError::Transport(source) => FileError::io(operation, location, source),
        }
    }
}

/// Wire boundary of the HTTP backend.
pub trait HttpTransport: Send + Sync {
    /// Issue a `HEAD` request.
    fn head(&self, url: &Url) -> Result<HttpHead, HttpError>;

    /// Issue a `GET` request and return the body.
    fn get(&self, url: &Url) -> Result<Box<dyn Read + Send>, HttpError>;
}

/// Best-effort directory guess from the URL alone.
pub fn guess_directory(url: &Url) -> bool {
    let path = url.path();
    if path.is_empty() || path.ends_with('/') {
        return true;
    }
    let name = path.rsplit('/').next().unwrap_or_default();
    match name.rfind('.') {
        None | Some(0) => true,
        Some(idx) => {
            let extension = name[idx + 1..].to_ascii_lowercase();
            PAGE_EXTENSIONS.contains(&extension.as_str())
        }
    }
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

fn parse_http_date(value: &str) -> Option<SystemTime> {
    chrono::DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(SystemTime::from)
}

/// Classify a `HEAD` answer.
pub fn classify(head: &HttpHead, guessed_directory: bool) -> FileAttributes {
    let date = head.last_modified.as_deref().and_then(parse_http_date);
    let is_directory = match (&head.content_type, head.content_length) {
        (Some(content_type), _) if is_html(content_type) => true,
        (_, Some(_)) => false,
        _ => guessed_directory,
    };
    let attributes = if is_directory {
        FileAttributes::directory(date)
    } else {
        FileAttributes {
            size: head.content_length,
            ..FileAttributes::file(0, date)
        }
    };
    attributes.with_permissions(FilePermissions::new(0o444, 0o777))
}

struct HeadProbe {
    location: Location,
    url: Url,
    guessed_directory: bool,
    transport: Arc<dyn HttpTransport>,
}

impl AttributeSource for HeadProbe {
    fn fetch_attributes(&self) -> Result<FileAttributes, FileError> {
        trace!(url = %self.url, "HEAD probe");
        match self.transport.head(&self.url) {
            Ok(head) => Ok(classify(&head, self.guessed_directory)),
            Err(HttpError::Status { status: 404 | 410 }) => Ok(FileAttributes::missing()),
            Err(error) => Err(error.into_file_error("head", &self.location)),
        }
    }
}

/// A resource on an HTTP server.
pub struct HttpEntity {
    attributes: SyncedAttributes<HeadProbe>,
    parent: ParentSlot,
    this: Weak<HttpEntity>,
}

impl HttpEntity {
    /// Entity for an `http`/`https` location. Attributes are probed lazily
    /// and cached for `ttl`.
    pub fn new(location: Location, transport: Arc<dyn HttpTransport>, ttl: Duration) -> Result<Arc<HttpEntity>, FileError> {
        if !matches!(location.scheme(), "http" | "https") {
            return Err(FileError::InvalidLocation {
                input: location.to_string(),
                reason: "not an http location".to_string(),
            });
        }
        let url = Url::parse(&location.to_url_string(true)).map_err(|e| FileError::InvalidLocation {
            input: location.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::build(location, url, transport, ttl, None))
    }

    fn build(
        location: Location,
        url: Url,
        transport: Arc<dyn HttpTransport>,
        ttl: Duration,
        known: Option<FileAttributes>,
    ) -> Arc<HttpEntity> {
        let probe = HeadProbe {
            guessed_directory: guess_directory(&url),
            location,
            url,
            transport,
        };
        let attributes = match known {
            Some(known) => SyncedAttributes::prepopulated(probe, ttl, known),
            None => SyncedAttributes::new(probe, ttl, false),
        };
        Arc::new_cyclic(|this| HttpEntity {
            attributes,
            parent: ParentSlot::new(),
            this: this.clone(),
        })
    }

    /// The resolved URL, credentials included.
    pub fn url(&self) -> &Url {
        &self.probe().url
    }

    /// The URL-only directory guess.
    pub fn guessed_directory(&self) -> bool {
        self.probe().guessed_directory
    }

    /// Number of `HEAD` probes issued so far.
    pub fn probe_count(&self) -> u64 {
        self.attributes.refresh_count()
    }

    fn probe(&self) -> &HeadProbe {
        self.attributes.source()
    }

    fn transport(&self) -> Arc<dyn HttpTransport> {
        Arc::clone(&self.probe().transport)
    }

    fn related(&self, location: Location) -> Option<EntityRef> {
        let url = Url::parse(&location.to_url_string(true)).ok()?;
        Some(Self::build(location, url, self.transport(), self.attributes.ttl(), None))
    }

    /// Base for resolving relative links: directories resolve against
    /// themselves, not their parent.
    fn link_base(&self) -> Url {
        let mut base = self.url().clone();
        if self.is_directory() && !base.path().ends_with('/') && !guess_is_page(&base) {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base
    }

    fn child_for(&self, url: &Url) -> EntityRef {
        let mut location = Location::from_url(url);
        location.set_credentials(self.location().credentials().cloned());
        let child = Self::build(location, url.clone(), self.transport(), self.attributes.ttl(), None);
        child.parent.set(self.this.upgrade().map(|this| this as EntityRef));
        child
    }

    fn unsupported<T>(operation: FileOperation) -> Result<T, FileError> {
        Err(FileError::unsupported(operation))
    }
}

fn guess_is_page(url: &Url) -> bool {
    url.path()
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .is_some_and(|(_, ext)| PAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Absolute same-host links of an HTML page, in document order, without
/// duplicates, the page itself, fragments or query-only links.
pub fn extract_links(base: &Url, html: &str) -> Vec<Url> {
    let mut links: Vec<Url> = Vec::new();
    for capture in LINK_PATTERN.captures_iter(html) {
        let raw = capture[1].trim();
        if raw.is_empty() || raw.starts_with('?') || raw.starts_with("javascript:") || raw.starts_with("mailto:") {
            continue;
        }
        let Ok(mut link) = base.join(raw) else {
            continue;
        };
        link.set_fragment(None);
        if link.scheme() != base.scheme() || link.host_str() != base.host_str() || link.port() != base.port() {
            continue;
        }
        let same_as_base = link.path().trim_end_matches('/') == base.path().trim_end_matches('/');
        if same_as_base || links.contains(&link) {
            continue;
        }
        links.push(link);
    }
    links
}

impl EntityCore for HttpEntity {
    fn location(&self) -> &Location {
        &self.probe().location
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::Http
    }

    fn supports(&self, operation: FileOperation) -> bool {
        use FileOperation::*;
        !matches!(
            operation,
            ChangeDate
                | ChangePermissions
                | Owner
                | Group
                | WriteFile
                | AppendFile
                | RandomReadFile
                | RandomWriteFile
                | CreateDirectory
                | Delete
                | Rename
                | CopyRemotely
                | FreeSpace
                | TotalSpace
        )
    }
}

impl EntityAttributes for HttpEntity {
    fn exists(&self) -> bool {
        self.attributes.with(|a| a.exists)
    }

    fn is_directory(&self) -> bool {
        self.attributes.with(|a| a.is_directory)
    }

    fn is_symlink(&self) -> bool {
        false
    }

    fn is_hidden(&self) -> bool {
        false
    }

    fn is_system(&self) -> bool {
        false
    }

    fn size(&self) -> Option<u64> {
        self.attributes.with(|a| a.size)
    }

    fn date(&self) -> Option<SystemTime> {
        self.attributes.with(|a| a.date)
    }

    fn change_date(&self, _date: SystemTime) -> Result<(), FileError> {
        Self::unsupported(FileOperation::ChangeDate)
    }

    fn permissions(&self) -> FilePermissions {
        self.attributes.with(|a| a.permissions)
    }

    fn changeable_permissions(&self) -> ChangeablePermissions {
        ChangeablePermissions::NONE
    }

    fn change_permissions(&self, _permissions: u16) -> Result<(), FileError> {
        Self::unsupported(FileOperation::ChangePermissions)
    }

    fn owner(&self) -> Option<String> {
        None
    }

    fn group(&self) -> Option<String> {
        None
    }

    fn can_get_owner(&self) -> bool {
        false
    }

    fn can_get_group(&self) -> bool {
        false
    }
}

impl EntityNavigation for HttpEntity {
    fn parent(&self) -> Option<EntityRef> {
        self.parent
            .get_or_resolve(|| self.location().parent().and_then(|parent| self.related(parent)))
    }

    fn set_parent(&self, parent: Option<EntityRef>) {
        self.parent.set(parent);
    }

    fn root(&self) -> EntityRef {
        if self.is_root() {
            if let Some(this) = self.this.upgrade() {
                return this;
            }
        }
        let root = self.location().with_path("/");
        let url = Url::parse(&root.to_url_string(true)).unwrap_or_else(|_| {
            let mut url = self.url().clone();
            url.set_path("/");
            url.set_query(None);
            url
        });
        let known = FileAttributes::directory(None).with_permissions(FilePermissions::new(0o444, 0o777));
        Self::build(root, url, self.transport(), self.attributes.ttl(), Some(known))
    }

    fn is_root(&self) -> bool {
        self.location().is_root()
    }

    fn volume(&self) -> EntityRef {
        self.root()
    }
}

impl EntityContent for HttpEntity {
    fn input_stream(&self) -> Result<InputStream, FileError> {
        debug!(url = %self.location(), "GET");
        self.transport()
            .get(self.url())
            .map_err(|e| e.into_file_error("get", self.location()))
    }

    fn output_stream(&self) -> Result<OutputStream, FileError> {
        Self::unsupported(FileOperation::WriteFile)
    }

    fn append_stream(&self) -> Result<OutputStream, FileError> {
        Self::unsupported(FileOperation::AppendFile)
    }

    fn random_access_input(&self) -> Result<Box<dyn RandomAccessInput>, FileError> {
        Self::unsupported(FileOperation::RandomReadFile)
    }

    fn random_access_output(&self) -> Result<Box<dyn RandomAccessOutput>, FileError> {
        Self::unsupported(FileOperation::RandomWriteFile)
    }
}

impl EntityMutation for HttpEntity {
    fn mkdir(&self) -> Result<(), FileError> {
        Self::unsupported(FileOperation::CreateDirectory)
    }

    fn delete(&self) -> Result<(), FileError> {
        Self::unsupported(FileOperation::Delete)
    }

    fn rename_to(&self, _destination: &dyn FileEntity) -> Result<(), FileError> {
        Self::unsupported(FileOperation::Rename)
    }

    fn copy_remotely_to(&self, _destination: &dyn FileEntity) -> Result<(), FileError> {
        Self::unsupported(FileOperation::CopyRemotely)
    }
}

impl EntityListing for HttpEntity {
    /// Fetch the page and return its same-host links.
    ///
    /// A body that cannot be read or decoded fails with [`FileError::Io`];
    /// a page without links is an empty listing.
    fn ls(&self) -> Result<Vec<EntityRef>, FileError> {
        if !self.is_directory() {
            return Err(FileError::NotADirectory {
                location: self.location().to_string(),
            });
        }
        let mut body = Vec::new();
        self.input_stream()?
            .take(MAX_LISTING_BYTES + 1)
            .read_to_end(&mut body)
            .map_err(|e| FileError::io("ls", self.location(), e))?;
        if body.len() as u64 > MAX_LISTING_BYTES {
            return Err(FileError::protocol("ls", self.location(), "listing too large"));
        }
        let html = String::from_utf8(body)
            .map_err(|e| FileError::protocol("ls", self.location(), e.to_string()))?;

        let base = self.link_base();
        let children: Vec<EntityRef> = extract_links(&base, &html)
            .iter()
            .map(|link| self.child_for(link))
            .collect();
        debug!(url = %self.location(), children = children.len(), "parsed listing");
        Ok(children)
    }

    fn ls_filtered(&self, filter: &dyn EntityFilter) -> Result<Vec<EntityRef>, FileError> {
        ls_filtered_via(self, filter)
    }
}

impl EntitySpace for HttpEntity {
    fn free_space(&self) -> Result<u64, FileError> {
        Self::unsupported(FileOperation::FreeSpace)
    }

    fn total_space(&self) -> Result<u64, FileError> {
        Self::unsupported(FileOperation::TotalSpace)
    }
}

/// [`EntityProvider`] for `http` and `https`.
pub struct HttpProvider {
    transport: Arc<dyn HttpTransport>,
    ttl: Duration,
}

impl HttpProvider {
    /// Provider sharing one transport across every entity it creates.
    pub fn new(transport: Arc<dyn HttpTransport>, ttl: Duration) -> Self {
        Self { transport, ttl }
    }
}

impl EntityProvider for HttpProvider {
    fn create(&self, location: Location, _handle: Option<NativeHandle>) -> Result<EntityRef, FileError> {
        Ok(HttpEntity::new(location, Arc::clone(&self.transport), self.ttl)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn guesses_from_url_shape() {
        assert!(guess_directory(&url("http://h/")));
        assert!(guess_directory(&url("http://h/docs/")));
        assert!(guess_directory(&url("http://h/docs")));
        assert!(guess_directory(&url("http://h/index.php")));
        assert!(!guess_directory(&url("http://h/file.zip")));
    }

    #[test]
    fn probe_overrides_guess() {
        let html = HttpHead {
            status: 200,
            content_type: Some("text/html; charset=utf-8".into()),
            content_length: Some(512),
            last_modified: None,
        };
        assert!(classify(&html, false).is_directory);

        let sized = HttpHead {
            status: 200,
            content_type: Some("application/zip".into()),
            content_length: Some(42),
            last_modified: Some("Wed, 21 Oct 2015 07:28:00 GMT".into()),
        };
        let attributes = classify(&sized, true);
        assert!(!attributes.is_directory);
        assert_eq!(attributes.size, Some(42));
        assert!(attributes.date.is_some());

        let bare = HttpHead {
            status: 200,
            ..HttpHead::default()
        };
        assert!(classify(&bare, true).is_directory);
        assert!(!classify(&bare, false).is_directory);
    }

    #[test]
    fn links_are_resolved_and_filtered() {
        let base = url("http://h/dir/");
        let html = r##"
            <a href="a.txt">a</a>
            <a href='sub/'>sub</a>
            <a href="a.txt#frag">dup</a>
            <a href="http://other/x">external</a>
            <a href="?C=M;O=A">sort</a>
            <a href="/dir/">self</a>
            <img src="/img/logo.png">
        "##;
        let links: Vec<String> = extract_links(&base, html)
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            links,
            vec![
                "http://h/dir/a.txt".to_string(),
                "http://h/dir/sub/".to_string(),
                "http://h/img/logo.png".to_string(),
            ]
        );
    }

    #[test]
    fn status_translation() {
        let location = Location::parse("http://user:pw@h/x").unwrap();
        let err = HttpError::Status { status: 401 }.into_file_error("get", &location);
        assert_eq!(err.realm(), Some(&location.realm()));
        assert!(matches!(
            HttpError::Status { status: 403 }.into_file_error("get", &location),
            FileError::AccessDenied { .. }
        ));
        assert!(matches!(
            HttpError::Status { status: 404 }.into_file_error("get", &location),
            FileError::NotFound { .. }
        ));
        assert!(matches!(
            HttpError::Status { status: 500 }.into_file_error("get", &location),
            FileError::Io { .. }
        ));
    }
}
