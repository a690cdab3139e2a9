use std::path::PathBuf;

use thiserror::Error;

use crate::process::Pid;

/// Result alias used by every MMU operation.
pub type Result<T> = std::result::Result<T, MmuError>;

/// Errors reported by the memory management unit.
///
/// `UnknownProcess`, `AddressOutOfRange` and `InvalidConfig` are caller
/// mistakes. `VictimSelectionFailure` and `InconsistentFrame` mean the frame
/// pool and the replacement policy disagree about which frames are resident,
/// which is a bug rather than bad input; see [`MmuError::is_internal`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MmuError {
    #[error("process {pid} not found")]
    UnknownProcess { pid: Pid },

    #[error("address out of bounds: page {page} of process {pid} (process has {num_pages} pages)")]
    AddressOutOfRange { pid: Pid, page: usize, num_pages: usize },

    #[error("no victim found: replacement policy tracks no resident frame while all {frames} frames are occupied")]
    VictimSelectionFailure { frames: usize },

    #[error("replacement policy chose frame {frame}, which holds no page")]
    InconsistentFrame { frame: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MmuError {
    /// True for invariant violations (a bug in the simulator, never bad input).
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            MmuError::VictimSelectionFailure { .. } | MmuError::InconsistentFrame { .. }
        )
    }
}

/// Errors raised while reading reference strings or writing results.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid reference: {token:?}")]
    InvalidReference { token: String },

    #[error("reference string is empty")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_classification() {
        assert!(MmuError::VictimSelectionFailure { frames: 3 }.is_internal());
        assert!(MmuError::InconsistentFrame { frame: 1 }.is_internal());
        assert!(!MmuError::UnknownProcess { pid: Pid(4) }.is_internal());
        assert!(
            !MmuError::AddressOutOfRange { pid: Pid(0), page: 9, num_pages: 8 }.is_internal()
        );
        assert!(!MmuError::InvalidConfig("zero frames".into()).is_internal());
    }

    #[test]
    fn test_messages() {
        let err = MmuError::UnknownProcess { pid: Pid(7) };
        assert_eq!(err.to_string(), "process P7 not found");

        let err = MmuError::AddressOutOfRange { pid: Pid(0), page: 9, num_pages: 8 };
        assert!(err.to_string().starts_with("address out of bounds"));
        assert!(err.to_string().contains("page 9"));

        let err = InputError::InvalidReference { token: "x1".into() };
        assert_eq!(err.to_string(), "invalid reference: \"x1\"");
    }
}
