//! Local file names for remote resources.
//!
//! The stem comes from the explicit name or the last URL path segment. The extension comes
//! from the explicit override, a recognizable URL extension, or content sniffing, in that
//! order.

use url::Url;

/// Replacement for characters that are unsafe in file names.
const PLACEHOLDER: char = '-';
const UNSAFE: &[char] = &['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>'];
const MAX_STEM_BYTES: usize = 200;
const MAX_EXTENSION_LEN: usize = 5;
const FALLBACK_STEM: &str = "index";

/// Where the final extension will come from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ExtensionSource {
    Explicit(String),
    Url(String),
    Sniff,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePlan {
    stem:      String,
    extension: ExtensionSource,
}

impl NamePlan {
    pub fn new(url: &Url, name: Option<&str>, extension: Option<&str>) -> Self {
        let segment = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(percent_decode)
            .unwrap_or_default();
        let (url_stem, url_extension) = split_extension(&segment);

        let stem = sanitize(name.unwrap_or(url_stem));
        let extension = match (extension, url_extension) {
            (Some(explicit), _) => ExtensionSource::Explicit(sanitize_extension(explicit)),
            (None, Some(found)) => ExtensionSource::Url(found.to_string()),
            (None, None) => ExtensionSource::Sniff,
        };
        Self { stem, extension }
    }

    pub fn stem(&self) -> &str { &self.stem }

    pub fn needs_sniff(&self) -> bool { self.extension == ExtensionSource::Sniff }

    /// The final file name, using `sniffed` only when nothing better is known.
    pub fn file_name(&self, sniffed: Option<&str>) -> String {
        let extension = match &self.extension {
            ExtensionSource::Explicit(extension) | ExtensionSource::Url(extension) => Some(extension.as_str()),
            ExtensionSource::Sniff => sniffed,
        };
        match extension {
            Some(extension) if !extension.is_empty() => format!("{}.{extension}", self.stem),
            _ => self.stem.clone(),
        }
    }
}

/// Split `name` into stem and a recognizable extension (1 to 5 ASCII alphanumerics).
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, extension))
            if !stem.is_empty()
                && (1..=MAX_EXTENSION_LEN).contains(&extension.len())
                && extension.bytes().all(|b| b.is_ascii_alphanumeric()) =>
        {
            (stem, Some(extension))
        }
        _ => (name, None),
    }
}

/// Rewrite characters that are unsafe on common filesystems.
///
/// Never returns an empty string or a dot-only name.
pub fn sanitize(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if UNSAFE.contains(&c) || c.is_control() {
                PLACEHOLDER
            } else {
                c
            }
        })
        .collect();
    let trimmed = replaced.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        return FALLBACK_STEM.to_string();
    }
    truncate(trimmed, MAX_STEM_BYTES).to_string()
}

fn sanitize_extension(extension: &str) -> String {
    extension
        .trim_start_matches('.')
        .chars()
        .filter(|c| !UNSAFE.contains(c) && !c.is_control() && *c != '.')
        .collect()
}

fn truncate(value: &str, max_bytes: usize) -> &str {
    if value.len() <= max_bytes {
        return value;
    }
    let mut end = max_bytes;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// Decode `%XX` escapes; malformed escapes are kept verbatim.
fn percent_decode(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let Some(hex) = bytes.get(i + 1..i + 3)
            && let Ok(hex) = std::str::from_utf8(hex)
            && let Ok(byte) = u8::from_str_radix(hex, 16)
        {
            decoded.push(byte);
            i += 3;
            continue;
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}
