//! Build phase state machine.

use std::fmt;

/// Completion state of one build generation.
///
/// Phases only move forward within a generation; each phase entry point
/// requires its predecessor to have completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum BuildPhase {
    /// Sites exist, no pages yet
    #[default]
    Created,
    /// Raw pages parsed and collected per site
    Collected,
    /// Content pages cross-linked as translations
    Linked,
    /// Home/section/taxonomy pages synthesized and linked
    Synthesized,
    /// Page content prepared (shortcodes, summary, TOC, word count)
    Prepared,
    /// Output formats rendered and published
    Rendered,
    /// Cross-site artifacts written
    Done,
}

impl BuildPhase {
    pub fn name(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Collected => "collected",
            Self::Linked => "linked",
            Self::Synthesized => "synthesized",
            Self::Prepared => "prepared",
            Self::Rendered => "rendered",
            Self::Done => "done",
        }
    }

    /// Phase that must be complete before this one may start.
    pub fn predecessor(self) -> Option<Self> {
        match self {
            Self::Created => None,
            Self::Collected => Some(Self::Created),
            Self::Linked => Some(Self::Collected),
            Self::Synthesized => Some(Self::Linked),
            Self::Prepared => Some(Self::Synthesized),
            Self::Rendered => Some(Self::Prepared),
            Self::Done => Some(Self::Rendered),
        }
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
