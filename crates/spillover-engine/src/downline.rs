use std::sync::Arc;

use spillover_core::{MemberId, TreeError};
use spillover_store::{Downline, MemberRepo};

/// Read-only view of a member's immediate tree children.
pub struct DownlineQuery {
    repo: Arc<MemberRepo>,
}

impl DownlineQuery {
    pub fn new(repo: Arc<MemberRepo>) -> Self {
        Self { repo }
    }

    pub fn children_of(&self, id: MemberId) -> Result<Downline, TreeError> {
        Ok(self.repo.children_of(id)?)
    }
}
