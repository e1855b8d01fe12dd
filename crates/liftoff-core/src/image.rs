use std::fmt;

/// A versioned container image coordinate.
///
/// Either composed from Artifact Registry coordinates or taken verbatim from
/// the descriptor of the service that is currently deployed (which may use a
/// digest or a different registry).
///
/// # Examples
///
/// ```
/// use liftoff_core::ImageReference;
///
/// let image = ImageReference::compose("us-central1", "proj", "containers", "api", "abc123");
/// assert_eq!(image.as_str(), "us-central1-docker.pkg.dev/proj/containers/api:abc123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference(String);

impl ImageReference {
    pub fn compose(region: &str, project: &str, repository: &str, image: &str, tag: &str) -> Self {
        Self(format!(
            "{host}/{project}/{repository}/{image}:{tag}",
            host = registry_host(region),
        ))
    }

    /// Wrap an image string read back from the platform.
    pub fn deployed(image: impl Into<String>) -> Self {
        Self(image.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Tag portion, if the reference is tag-addressed.
    pub fn tag(&self) -> Option<&str> {
        if self.0.contains('@') {
            return None;
        }
        let last_segment = self.0.rsplit('/').next()?;
        last_segment.split_once(':').map(|(_, tag)| tag)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Artifact Registry Docker host for `region`.
pub fn registry_host(region: &str) -> String {
    format!("{region}-docker.pkg.dev")
}
