//! GPU queries.

/// What a query counts between its begin and end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Number of samples that passed the depth and stencil tests.
    SamplesPassed,
    /// Non-zero if any sample passed the depth and stencil tests.
    AnySamplesPassed,
}

/// Lifecycle of a query object. Results can only be read once it has ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Idle,
    Active,
    Ended,
}

impl Default for QueryState {
    fn default() -> Self {
        QueryState::Idle
    }
}
