#[derive(Debug, thiserror::Error)]
pub enum GcloudError {
    #[error("gcloud CLI not found, install it from https://cloud.google.com/sdk/docs/install")]
    NotFound { source: std::io::Error },

    #[error("gcloud command failed: {args:?}\n{stderr}")]
    CommandFailed { args: Vec<String>, stderr: String },

    #[error("gcloud output was not valid UTF-8")]
    InvalidUtf8 { source: std::string::FromUtf8Error },

    #[error("failed to write to gcloud stdin")]
    StdinWrite { source: std::io::Error },
}

impl GcloudError {
    /// The platform refused a create because the resource exists.
    pub fn is_already_exists(&self) -> bool {
        self.stderr_matches(&["ALREADY_EXISTS", "already exists"])
    }

    /// The platform reported the addressed resource as absent.
    pub fn is_not_found(&self) -> bool {
        self.stderr_matches(&["NOT_FOUND", "not found", "could not be found", "does not exist"])
    }

    fn stderr_matches(&self, needles: &[&str]) -> bool {
        match self {
            Self::CommandFailed { stderr, .. } => {
                // The gcloud binary itself missing is reported as `NotFound`,
                // not through stderr, so it never classifies as absent.
                needles.iter().any(|n| stderr.contains(n))
            }
            Self::NotFound { .. } | Self::InvalidUtf8 { .. } | Self::StdinWrite { .. } => false,
        }
    }
}
