use thiserror::Error;

/// Everything that can end a fetch or download operation.
///
/// None of these are fatal to the application; the user can always retry.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{tool} is not installed or could not be started")]
    DependencyMissing { tool: String },

    #[error("Error: {0}")]
    FetchFailed(String),

    #[error("Failed to parse video information")]
    ParseFailed(#[source] serde_json::Error),

    #[error("No compatible video qualities found!")]
    NoQualitiesFound,

    /// Exit code of yt-dlp, `None` when it was killed by a signal.
    #[error("Download failed. Please try again.")]
    DownloadFailed(Option<i32>),

    #[error("Download already in progress!")]
    AlreadyInProgress,

    #[error("{0}")]
    InvalidUrl(String),

    #[error("Unexpected error: {0}")]
    Unexpected(#[from] std::io::Error),
}

impl AppError {
    /// Warnings are shown to the user but do not mark the operation as failed.
    pub const fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::DependencyMissing { .. }
                | Self::NoQualitiesFound
                | Self::AlreadyInProgress
                | Self::InvalidUrl(_)
        )
    }
}
