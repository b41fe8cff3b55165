use std::sync::Arc;

use tracing::{debug, instrument};

use spillover_core::{MemberCode, MemberId, Side, TreeError};
use spillover_store::{MemberRepo, StoreError};

/// Source of attach points for [`crate::TreeMutator`].
pub trait SlotSource: Send + Sync {
    /// Find the member whose `side` slot the next entrant under `sponsor_code` takes.
    fn find_slot(&self, sponsor_code: &MemberCode, side: Side) -> Result<MemberId, TreeError>;
}

/// Spillover search along the single-side spine below a sponsor.
///
/// A left search only follows left edges and a right search only follows
/// right edges; the first member with an empty slot on that side wins.
pub struct PlacementResolver {
    repo: Arc<MemberRepo>,
}

impl PlacementResolver {
    pub fn new(repo: Arc<MemberRepo>) -> Self {
        Self { repo }
    }
}

impl SlotSource for PlacementResolver {
    #[instrument(skip(self), fields(sponsor = %sponsor_code, side = %side))]
    fn find_slot(&self, sponsor_code: &MemberCode, side: Side) -> Result<MemberId, TreeError> {
        let mut current = match self.repo.get_by_code(sponsor_code) {
            Ok(row) => row,
            Err(StoreError::NotFound(_)) => {
                return Err(TreeError::SponsorNotFound(sponsor_code.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut depth = 0u64;
        while let Some(child) = current.child(side) {
            current = self.repo.get(child).map_err(|e| match e {
                StoreError::NotFound(_) => {
                    TreeError::Storage(format!("dangling {side} edge to member {child}"))
                }
                other => other.into(),
            })?;
            depth += 1;
        }

        debug!(attach_point = %current.id, depth, "slot found");
        Ok(current.id)
    }
}
