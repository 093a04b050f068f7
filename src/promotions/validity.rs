//! Validity Windows

use chrono::{DateTime, Utc};

/// Where an instant falls relative to a [`ValidityWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStatus {
    /// Before the window opens.
    NotYetValid,

    /// Inside the window.
    Open,

    /// After the window closed.
    Expired,
}

/// Inclusive date window in which a promotion may be redeemed.
///
/// A missing bound leaves that side of the window open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidityWindow {
    /// First instant the promotion is valid.
    pub from: Option<DateTime<Utc>>,

    /// Last instant the promotion is valid.
    pub to: Option<DateTime<Utc>>,
}

impl ValidityWindow {
    /// A window with no bounds.
    #[must_use]
    pub const fn always() -> Self {
        Self {
            from: None,
            to: None,
        }
    }

    /// A window bounded on both sides.
    #[must_use]
    pub const fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    /// Classify `now` against the window. Both bounds are inclusive.
    #[must_use]
    pub fn status(&self, now: DateTime<Utc>) -> WindowStatus {
        if self.from.is_some_and(|from| now < from) {
            WindowStatus::NotYetValid
        } else if self.to.is_some_and(|to| now > to) {
            WindowStatus::Expired
        } else {
            WindowStatus::Open
        }
    }
}
