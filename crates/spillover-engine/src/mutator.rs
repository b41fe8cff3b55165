use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use spillover_core::{CodeGenerator, CountRule, MemberCode, MemberId, NewMember, Side, TreeError};
use spillover_store::{AttachOutcome, MemberRepo};

use crate::placement::{PlacementResolver, SlotSource};
use crate::propagate::CountPropagator;

/// Result of a successful registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub id: MemberId,
    pub code: MemberCode,
    /// Tree parent of the new member. Differs from the sponsor under spillover.
    pub attach_point: MemberId,
    /// Placement attempts used, starting at 1.
    pub attempts: u32,
}

/// Orchestrates one registration: find a slot, commit, propagate counts.
///
/// Slot discovery and attach are separate steps. The attach is a conditional
/// write, so a registration that loses its slot to a concurrent one re-runs
/// placement from the same sponsor, up to `max_attempts` times.
pub struct TreeMutator {
    repo: Arc<MemberRepo>,
    slots: Box<dyn SlotSource>,
    propagator: CountPropagator,
    codes: CodeGenerator,
    max_attempts: u32,
}

impl TreeMutator {
    pub fn new(repo: Arc<MemberRepo>, rule: CountRule, max_attempts: u32) -> Self {
        let slots = Box::new(PlacementResolver::new(repo.clone()));
        Self::with_slot_source(repo, slots, rule, max_attempts)
    }

    pub fn with_slot_source(
        repo: Arc<MemberRepo>,
        slots: Box<dyn SlotSource>,
        rule: CountRule,
        max_attempts: u32,
    ) -> Self {
        Self {
            propagator: CountPropagator::new(repo.clone(), rule),
            repo,
            slots,
            codes: CodeGenerator::new(),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Place a new member under `sponsor_code` on `side`.
    ///
    /// The new member's sponsor is always `sponsor_code`, even when it
    /// spills under a deeper attach point.
    #[instrument(skip(self, member), fields(sponsor = %sponsor_code, side = %side))]
    pub fn register(
        &self,
        sponsor_code: &MemberCode,
        side: Side,
        member: &NewMember,
    ) -> Result<Registration, TreeError> {
        for attempt in 1..=self.max_attempts {
            match self.try_place(sponsor_code, side, member, attempt) {
                Err(e) if e.is_retryable() => {
                    warn!(error = %e, attempt, "slot taken by a concurrent registration, retrying");
                }
                other => return other,
            }
        }

        Err(TreeError::PositionUnavailable {
            attempts: self.max_attempts,
        })
    }

    fn try_place(
        &self,
        sponsor_code: &MemberCode,
        side: Side,
        member: &NewMember,
        attempt: u32,
    ) -> Result<Registration, TreeError> {
        let attach_point = self.slots.find_slot(sponsor_code, side)?;
        let code = self.codes.next_code();

        let id = match self
            .repo
            .create_and_attach(attach_point, side, &code, sponsor_code, member)?
        {
            AttachOutcome::Attached(id) => id,
            AttachOutcome::SlotOccupied => {
                return Err(TreeError::SlotOccupied {
                    parent: attach_point,
                    side,
                })
            }
        };
        info!(%code, %attach_point, attempt, "member placed");

        // The member is committed; a failed walk leaves counts short but
        // does not undo the registration.
        if let Err(e) = self.propagator.propagate(attach_point, id) {
            error!(error = %e, %attach_point, "count propagation failed");
        }

        Ok(Registration {
            id,
            code,
            attach_point,
            attempts: attempt,
        })
    }

    /// Create the first member of an empty tree with the given code.
    #[instrument(skip(self, member), fields(code = %root_code))]
    pub fn seed_root(&self, root_code: &MemberCode, member: &NewMember) -> Result<MemberId, TreeError> {
        let id = self.repo.create_root(root_code, member)?;
        info!(%id, "root member created");
        Ok(id)
    }
}
