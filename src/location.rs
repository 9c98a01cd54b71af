//! Resource locators and realms.
//!
//! A [`Location`] is the identity of every file entity. Its path is always
//! stored in a backend-agnostic form: `/`-separated, absolute, without `.` or
//! `..` segments and without a trailing separator (except for the root `/`).
//! Only a backend variant converts it to a native form (for example a Windows
//! drive path or a UNC share).
//!
//! ```rust
//! use anyfile::Location;
//!
//! let loc = Location::parse("s3://key:secret@storage.example:9000/bucket/a/b.txt").unwrap();
//! assert_eq!(loc.scheme(), "s3");
//! assert_eq!(loc.host(), Some("storage.example"));
//! assert_eq!(loc.port(), Some(9000));
//! assert_eq!(loc.path(), "/bucket/a/b.txt");
//! assert_eq!(loc.parent().unwrap().path(), "/bucket/a");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use url::Url;

use crate::{Credentials, FileError};

/// Scheme used for local (and UNC) files.
pub const FILE_SCHEME: &str = "file";

/// Characters escaped in a formatted path; `%` is included so decoded
/// paths format back to the same text.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Characters escaped in a formatted login or password.
const USERINFO: &AsciiSet = &PATH
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'=')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'|');

/// Returns the well-known port of a scheme, if any.
pub fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" | "s3" | "virt" => Some(443),
        "ftp" => Some(21),
        "sftp" => Some(22),
        "smb" => Some(445),
        "nfs" => Some(2049),
        _ => None,
    }
}

/// A parsed resource locator.
///
/// Equality and hashing consider scheme, host, effective port, path and
/// query. Credentials and properties are attached data, not identity.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    scheme: String,
    host: Option<String>,
    port: Option<u16>,
    path: String,
    query: Option<String>,
    credentials: Option<Credentials>,
    properties: BTreeMap<String, String>,
}

impl Location {
    /// Parse a URL-like string or a bare local path.
    ///
    /// Accepted forms:
    /// - `scheme://[login[:password]@]host[:port][/path][?query]`
    /// - `/absolute/unix/path`
    /// - `C:\windows\path` or `C:/windows/path`
    /// - `\\server\share\path` (UNC)
    ///
    /// # Errors
    ///
    /// [`FileError::InvalidLocation`] if there is no scheme or the URL does
    /// not parse (bad port, malformed host).
    pub fn parse(input: &str) -> Result<Self, FileError> {
        let invalid = |reason: &str| FileError::InvalidLocation {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if input.is_empty() {
            return Err(invalid("empty location"));
        }

        if let Some(rest) = input.strip_prefix("\\\\") {
            let rest = rest.replace('\\', "/");
            let (host, path) = match rest.find('/') {
                Some(idx) => (&rest[..idx], &rest[idx..]),
                None => (rest.as_str(), "/"),
            };
            if host.is_empty() {
                return Err(invalid("UNC path without a server"));
            }
            return Ok(Self::local_with_host(Some(host.to_lowercase()), path));
        }

        if is_drive_path(input) {
            let path = format!("/{}", input.replace('\\', "/"));
            return Ok(Self::local_with_host(None, &path));
        }

        if input.starts_with('/') {
            return Ok(Self::local_with_host(None, input));
        }

        if !input.contains("://") {
            return Err(invalid("missing scheme"));
        }
        let url = Url::parse(input).map_err(|e| invalid(&e.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(invalid("not a hierarchical URL"));
        }
        Ok(Self::from_url(&url))
    }

    /// Location of an already parsed URL.
    ///
    /// Userinfo and path are percent-decoded. The query is kept encoded and
    /// the fragment is dropped.
    pub fn from_url(url: &Url) -> Self {
        let scheme = url.scheme().to_ascii_lowercase();
        // file://localhost/path is a plain local path
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .map(str::to_lowercase)
            .filter(|host| !(scheme == FILE_SCHEME && host == "localhost"));
        let credentials = (!url.username().is_empty() || url.password().is_some()).then(|| {
            Credentials::new(
                percent_decoded(url.username()),
                url.password().map(percent_decoded).unwrap_or_default(),
            )
        });
        Self {
            scheme,
            host,
            port: url.port(),
            path: normalize_path(&percent_decoded(url.path())),
            query: url.query().map(str::to_string),
            credentials,
            properties: BTreeMap::new(),
        }
    }

    /// Create a local location from an absolute `/`-separated path.
    pub fn local(path: &str) -> Self {
        Self::local_with_host(None, path)
    }

    fn local_with_host(host: Option<String>, path: &str) -> Self {
        Self {
            scheme: FILE_SCHEME.to_string(),
            host,
            port: None,
            path: normalize_path(path),
            query: None,
            credentials: None,
            properties: BTreeMap::new(),
        }
    }

    /// Create a location from its parts.
    pub fn from_parts(scheme: &str, host: Option<&str>, port: Option<u16>, path: &str) -> Self {
        Self {
            scheme: scheme.to_ascii_lowercase(),
            host: host.map(str::to_lowercase),
            port,
            path: normalize_path(path),
            query: None,
            credentials: None,
            properties: BTreeMap::new(),
        }
    }

    /// The lowercase scheme.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The lowercase host, `None` for local paths.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// The explicitly given port.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// The explicit port, or the scheme's well-known port.
    pub fn effective_port(&self) -> Option<u16> {
        self.port.or_else(|| default_port(&self.scheme))
    }

    /// The normalized path, always starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The query string without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Attached credentials.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Replace the attached credentials.
    pub fn set_credentials(&mut self, credentials: Option<Credentials>) {
        self.credentials = credentials;
    }

    /// Builder form of [`set_credentials`](Self::set_credentials).
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Replace the query string.
    pub fn with_query(mut self, query: Option<&str>) -> Self {
        self.query = query.map(str::to_string);
        self
    }

    /// Look up a property.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Set a property, returning the previous value.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.properties.insert(key.into(), value.into())
    }

    /// Builder form of [`set_property`](Self::set_property).
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_property(key, value);
        self
    }

    /// Iterate over all properties.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Clone this location with its path replaced.
    ///
    /// Scheme, host, port, credentials and properties are kept; the query is
    /// dropped. This is how children are derived during listing.
    pub fn with_path(&self, path: &str) -> Self {
        Self {
            scheme: self.scheme.clone(),
            host: self.host.clone(),
            port: self.port,
            path: normalize_path(path),
            query: None,
            credentials: self.credentials.clone(),
            properties: self.properties.clone(),
        }
    }

    /// Location of a direct child named `name`.
    pub fn child(&self, name: &str) -> Self {
        if self.path == "/" {
            self.with_path(&format!("/{name}"))
        } else {
            self.with_path(&format!("{}/{name}", self.path))
        }
    }

    /// Location of the parent, `None` at the root.
    ///
    /// Strips exactly one path segment.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let idx = self.path.rfind('/')?;
        let parent = if idx == 0 { "/" } else { &self.path[..idx] };
        Some(self.with_path(parent))
    }

    /// Returns `true` if the path is `/`.
    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    /// The last path segment, `None` at the root.
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            None
        } else {
            self.path.rsplit('/').next()
        }
    }

    /// The extension of the last segment, without the dot.
    ///
    /// Dot-files such as `.profile` have no extension.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name()?;
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) if idx + 1 < name.len() => Some(&name[idx + 1..]),
            Some(_) => None,
        }
    }

    /// Path segments, root excluded.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|s| !s.is_empty())
    }

    /// Number of path segments.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// The realm this location belongs to.
    pub fn realm(&self) -> Realm {
        Realm {
            scheme: self.scheme.clone(),
            host: self.host.clone(),
            port: self.effective_port(),
            credentials: self.credentials.clone(),
        }
    }

    /// Returns `true` if scheme, host and effective port match, ignoring
    /// path and credentials.
    pub fn same_realm(&self, other: &Location) -> bool {
        self.scheme == other.scheme
            && self.host == other.host
            && self.effective_port() == other.effective_port()
    }

    /// Format back to a URL string.
    ///
    /// The password is only included when `include_password` is set.
    pub fn to_url_string(&self, include_password: bool) -> String {
        let mut out = format!("{}://", self.scheme);
        if let Some(creds) = &self.credentials {
            out.extend(utf8_percent_encode(creds.login(), USERINFO));
            if include_password && !creds.password().is_empty() {
                out.push(':');
                out.extend(utf8_percent_encode(creds.password(), USERINFO));
            }
            out.push('@');
        }
        if let Some(host) = &self.host {
            out.push_str(host);
        }
        if let Some(port) = self.port {
            out.push(':');
            out.push_str(&port.to_string());
        }
        out.extend(utf8_percent_encode(&self.path, PATH));
        if let Some(query) = &self.query {
            out.push('?');
            out.push_str(query);
        }
        out
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.same_realm(other) && self.path == other.path && self.query == other.query
    }
}

impl Eq for Location {}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.scheme.hash(state);
        self.host.hash(state);
        self.effective_port().hash(state);
        self.path.hash(state);
        self.query.hash(state);
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Location({})", self.to_url_string(false))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url_string(false))
    }
}

impl std::str::FromStr for Location {
    type Err = FileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// One authenticated endpoint: scheme, host, port and credentials.
///
/// This is the key of the connection pool. Two realms with different
/// credentials get separate sessions.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Realm {
    scheme: String,
    host: Option<String>,
    port: Option<u16>,
    credentials: Option<Credentials>,
}

impl Realm {
    /// The scheme.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The host.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// The effective port.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// The credentials used for this realm.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// The same realm with other credentials, used to retry after a
    /// credential re-prompt.
    pub fn with_credentials(&self, credentials: Option<Credentials>) -> Self {
        Self {
            credentials,
            ..self.clone()
        }
    }

    /// Root location of this realm.
    pub fn root_location(&self) -> Location {
        let mut loc = Location::from_parts(&self.scheme, self.host.as_deref(), self.port, "/");
        loc.set_credentials(self.credentials.clone());
        loc
    }
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://", self.scheme)?;
        if let Some(creds) = &self.credentials {
            write!(f, "{}@", creds.login())?;
        }
        if let Some(host) = &self.host {
            f.write_str(host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Realm({self})")
    }
}

fn is_drive_path(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.len() >= 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes.len() == 2 || bytes[2] == b'\\' || bytes[2] == b'/')
}

fn percent_decoded(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}

/// Normalize a path to the backend-agnostic form.
pub(crate) fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        "/".to_string()
    } else {
        let mut out = String::with_capacity(path.len() + 1);
        for segment in segments {
            out.push('/');
            out.push_str(segment);
        }
        out
    }
}
