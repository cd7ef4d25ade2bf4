use std::fmt;

use url::Url;

use crate::error::{RelayError, Result};

/// Path prefix under which relayed images are served.
pub const IMAGE_PREFIX: &str = "/img";

/// An absolute http(s) image URL split into the parts that make up its
/// local relay path `/img/{scheme}/{host}{path}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub scheme: String,
    /// Host name, with `:port` when the URL names one explicitly.
    pub host: String,
    /// Always starts with `/`.
    pub path: String,
}

impl ImageReference {
    /// Rejects credentials, queries and fragments. An explicit default port
    /// (`https://h:443/...`) is normalised away.
    pub fn parse(url: &str) -> Result<Self> {
        let parsed =
            Url::parse(url).map_err(|e| RelayError::InvalidArgument(format!("{}: {}", url, e)))?;

        let scheme = parsed.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(RelayError::InvalidArgument(format!(
                "unsupported image scheme: {}",
                url
            )));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(RelayError::InvalidArgument(format!(
                "image url must not carry a query or fragment: {}",
                url
            )));
        }
        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(RelayError::InvalidArgument(format!(
                "image url must not carry credentials: {}",
                url
            )));
        }
        let host = parsed
            .host_str()
            .ok_or_else(|| RelayError::InvalidArgument(format!("image url has no host: {}", url)))?;
        let host = match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self {
            scheme: scheme.to_string(),
            host,
            path: parsed.path().to_string(),
        })
    }

    /// Rebuilds a reference from the pieces of a local relay path. `tail` is
    /// the rest of the original path and may contain slashes.
    pub fn from_local_parts(scheme: &str, host: &str, tail: &str) -> Result<Self> {
        let path = if tail.starts_with('/') {
            tail.to_string()
        } else {
            format!("/{}", tail)
        };
        let candidate = format!("{}://{}{}", scheme, host, path);
        let reference = Self::parse(&candidate)?;

        // Anything the URL parser would rewrite would not round-trip.
        if reference.scheme != scheme || reference.host != host || reference.path != path {
            return Err(RelayError::InvalidArgument(format!(
                "not a canonical image url: {}",
                candidate
            )));
        }
        Ok(reference)
    }

    /// Parses `/img/{scheme}/{host}/{tail...}`.
    pub fn from_local_path(local: &str) -> Result<Self> {
        let rest = local
            .strip_prefix(IMAGE_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| RelayError::InvalidArgument(format!("not an image path: {}", local)))?;

        let mut parts = rest.splitn(3, '/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(scheme), Some(host), Some(tail)) if !scheme.is_empty() && !host.is_empty() => {
                Self::from_local_parts(scheme, host, tail)
            }
            _ => Err(RelayError::InvalidArgument(format!(
                "incomplete image path: {}",
                local
            ))),
        }
    }

    pub fn to_local_path(&self) -> String {
        format!("{}/{}/{}{}", IMAGE_PREFIX, self.scheme, self.host, self.path)
    }

    pub fn to_url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.host, self.path)
    }

    pub fn media_type(&self) -> Result<MediaType> {
        MediaType::from_path(&self.path)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url())
    }
}

/// Local relay path for an absolute image URL.
pub fn encode_local_path(url: &str) -> Result<String> {
    Ok(ImageReference::parse(url)?.to_local_path())
}

/// Absolute image URL for the parts of a local relay path.
pub fn decode_to_absolute_url(scheme: &str, host: &str, tail: &str) -> Result<String> {
    Ok(ImageReference::from_local_parts(scheme, host, tail)?.to_url())
}

/// Image formats the relay will serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Jpeg,
    Png,
    Gif,
    Webp,
    Avif,
    Svg,
}

impl MediaType {
    /// Looks at the extension of the final path segment, ignoring case.
    pub fn from_path(path: &str) -> Result<Self> {
        let file = path.rsplit('/').next().unwrap_or(path);
        let ext = file
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "jpg" | "jpeg" => Ok(MediaType::Jpeg),
            "png" => Ok(MediaType::Png),
            "gif" => Ok(MediaType::Gif),
            "webp" => Ok(MediaType::Webp),
            "avif" => Ok(MediaType::Avif),
            "svg" => Ok(MediaType::Svg),
            _ => Err(RelayError::UnsupportedMediaType(path.to_string())),
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::Gif => "image/gif",
            MediaType::Webp => "image/webp",
            MediaType::Avif => "image/avif",
            MediaType::Svg => "image/svg+xml",
        }
    }
}
