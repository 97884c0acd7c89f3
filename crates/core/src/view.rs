use std::time::Duration;

/// Outcome of a view request, as seen by the page-rendering layer.
///
/// The renderer only maps this to a page; it performs no lifecycle logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// Unknown identifier, or already removed.
    NotFound,
    /// This request started the countdown.
    FirstView {
        /// Time left in the view window.
        remaining: Duration,
    },
    /// The countdown was already running.
    Continuing {
        /// Time left in the view window.
        remaining: Duration,
    },
    /// The view window has closed.
    Expired,
}

impl ViewState {
    /// Time left for a viewable state, `None` otherwise.
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Self::FirstView { remaining } | Self::Continuing { remaining } => Some(*remaining),
            Self::NotFound | Self::Expired => None,
        }
    }

    /// Whether the asset may still be shown.
    pub fn is_viewable(&self) -> bool {
        self.remaining().is_some()
    }
}
