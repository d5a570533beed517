//! Events emitted by a supervised streaming process

/// Output and lifecycle notifications from the child
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailEvent {
    /// One line from the child's stdout
    Stdout(String),
    /// One line from the child's stderr
    Stderr(String),
    /// The child has exited and been reaped
    Exited { code: Option<i32> },
}

impl TailEvent {
    pub fn is_exit(&self) -> bool {
        matches!(self, TailEvent::Exited { .. })
    }
}
