//! Version conflicts recorded while picking conflict-group winners.

use std::fmt;

use crate::node::ConflictId;

/// Every version conflict found by the conflict resolver, in the order the
/// losing nodes appear in a pre-order walk.
#[derive(Debug, Clone, Default)]
pub struct ConflictReport {
    pub conflicts: Vec<VersionConflict>,
}

/// A node that asked for a different version than its group's winner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConflict {
    pub conflict_id: ConflictId,
    /// `group:artifact` of the losing node.
    pub artifact: String,
    pub requested: String,
    pub resolved: String,
    pub requested_depth: usize,
    pub resolved_depth: usize,
    pub reason: String,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, conflict: VersionConflict) {
        self.conflicts.push(conflict);
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    /// Conflicts recorded for one conflict group.
    pub fn for_group<'a>(&'a self, id: &'a ConflictId) -> impl Iterator<Item = &'a VersionConflict> {
        self.conflicts.iter().filter(move |c| &c.conflict_id == id)
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return write!(f, "No version conflicts.");
        }
        writeln!(f, "Version conflicts ({}):", self.conflicts.len())?;
        for c in &self.conflicts {
            writeln!(
                f,
                "  {} requested {} but resolved {} ({})",
                c.artifact, c.requested, c.resolved, c.reason
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for VersionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {} ({})",
            self.artifact, self.requested, self.resolved, self.reason
        )
    }
}
