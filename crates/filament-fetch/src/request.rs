use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use filament_store::CacheKey;

/// Credentials attached to a request as an `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic {
        username: String,
        password: Option<String>,
    },
    Bearer(String),
}

impl Credentials {
    pub fn basic(username: impl Into<String>, password: Option<String>) -> Self {
        Credentials::Basic {
            username: username.into(),
            password,
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self { Credentials::Bearer(token.into()) }

    pub fn header_value(&self) -> String {
        match self {
            Credentials::Basic { username, password } => {
                let pair = format!("{username}:{}", password.as_deref().unwrap_or_default());
                format!("Basic {}", STANDARD.encode(pair))
            }
            Credentials::Bearer(token) => format!("Bearer {token}"),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::Bearer(_) => f.debug_tuple("Bearer").field(&"<redacted>").finish(),
        }
    }
}

/// One remote file to acquire.
///
/// # Examples
///
/// ```
/// use filament_fetch::{AcquisitionRequest, Credentials};
///
/// let request = AcquisitionRequest::new("https://example.com/images/photo")
///     .name("cover")
///     .extension(".jpg")
///     .auth(Credentials::bearer("token"));
/// assert_eq!(request.extension_override(), Some("jpg"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionRequest {
    url:       String,
    parent:    Option<String>,
    name:      Option<String>,
    extension: Option<String>,
    auth:      Option<Credentials>,
    headers:   Vec<(String, String)>,
}

impl AcquisitionRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url:       url.into(),
            parent:    None,
            name:      None,
            extension: None,
            auth:      None,
            headers:   Vec::new(),
        }
    }

    /// Identity of the node the resulting file belongs to.
    #[must_use]
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Override the file stem derived from the URL.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Override the extension; a leading dot is optional.
    #[must_use]
    pub fn extension(mut self, extension: impl AsRef<str>) -> Self {
        let trimmed = extension.as_ref().trim_start_matches('.');
        self.extension = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    #[must_use]
    pub fn auth(mut self, credentials: Credentials) -> Self {
        self.auth = Some(credentials);
        self
    }

    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn url(&self) -> &str { &self.url }

    pub fn parent_id(&self) -> Option<&str> { self.parent.as_deref() }

    pub fn name_override(&self) -> Option<&str> { self.name.as_deref() }

    /// The explicit extension, without a leading dot.
    pub fn extension_override(&self) -> Option<&str> { self.extension.as_deref() }

    pub fn credentials(&self) -> Option<&Credentials> { self.auth.as_ref() }

    pub fn cache_key(&self) -> CacheKey { CacheKey::derive(&self.url, self.name.as_deref(), self.extension.as_deref()) }

    /// Headers sent with every attempt, credentials included.
    pub(crate) fn http_headers(&self) -> Vec<(String, String)> {
        let mut headers = self.headers.clone();
        if let Some(auth) = &self.auth {
            headers.push(("Authorization".to_string(), auth.header_value()));
        }
        headers
    }
}
