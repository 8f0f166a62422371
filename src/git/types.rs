use std::fmt;

/// What a pull did to the local branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullStatus {
    UpToDate,
    FastForwarded,
}

impl fmt::Display for PullStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PullStatus::UpToDate => write!(f, "up to date"),
            PullStatus::FastForwarded => write!(f, "fast-forwarded"),
        }
    }
}
