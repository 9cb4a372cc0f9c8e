use thiserror::Error;

/// Failure of a remote fetch collaborator.
///
/// Cache corruption never surfaces here: the stores recover it as a miss
/// and the repository refetches.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The remote endpoint could not be reached or returned an
    /// unparseable payload.
    #[error("network request failed: {0}")]
    Network(#[from] anyhow::Error),
}

/// Errors surfaced by the report pipeline. A caller gets a complete
/// report or exactly one of these; there is no partial report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The fund is unknown to the directory, or the fetch failed and no
    /// cached data exists to fall back on.
    #[error("no data available for fund {code}")]
    DataUnavailable { code: String },

    /// The NAV series was fetched but holds zero usable points.
    #[error("fund {code} returned an empty NAV series")]
    EmptySeries { code: String },
}
