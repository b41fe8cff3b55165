use std::sync::Arc;

use tracing::{debug, instrument};

use spillover_core::{CountRule, MemberId, Side, TreeError};
use spillover_store::{MemberRepo, StoreError};

/// Why a propagation walk ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Reached a member with no sponsor (referral rule) or no tree parent (tree rule).
    Root,
    /// The sponsor code did not resolve.
    SponsorMissing,
    /// The current member is not a tree child of its sponsor.
    Diverged,
}

/// Outcome of one propagation walk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Propagation {
    /// Counters incremented, in walk order.
    pub incremented: Vec<(MemberId, Side)>,
    pub stop: StopReason,
}

/// Increments per-side descendant counters after an attach.
///
/// Every increment is a single atomic update, so concurrent walks through the
/// same ancestor never lose counts.
pub struct CountPropagator {
    repo: Arc<MemberRepo>,
    rule: CountRule,
}

impl CountPropagator {
    pub fn new(repo: Arc<MemberRepo>, rule: CountRule) -> Self {
        Self { repo, rule }
    }

    /// Run the configured rule for a member just attached under `attach_point`.
    pub fn propagate(
        &self,
        attach_point: MemberId,
        new_member: MemberId,
    ) -> Result<Propagation, TreeError> {
        match self.rule {
            CountRule::ReferralChain => self.along_referrals(attach_point),
            CountRule::TreeEdges => self.along_tree(new_member),
        }
    }

    /// Starting at `start`, credit each sponsor on the side `current` hangs
    /// from, as long as `current` is that sponsor's direct tree child.
    #[instrument(skip(self), fields(start = %start))]
    pub fn along_referrals(&self, start: MemberId) -> Result<Propagation, TreeError> {
        let mut incremented = Vec::new();
        let mut current = self.repo.get(start)?;

        let stop = loop {
            let Some(sponsor_code) = current.sponsor_code.as_ref() else {
                break StopReason::Root;
            };
            let sponsor = match self.repo.get_by_code(sponsor_code) {
                Ok(row) => row,
                Err(StoreError::NotFound(_)) => break StopReason::SponsorMissing,
                Err(e) => return Err(e.into()),
            };
            let Some(side) = sponsor.side_of(current.id) else {
                debug!(member = %current.id, sponsor = %sponsor.id, "sponsor is not tree parent, stopping");
                break StopReason::Diverged;
            };
            self.repo.increment_count(sponsor.id, side)?;
            incremented.push((sponsor.id, side));
            current = sponsor;
        };

        debug!(hops = incremented.len(), ?stop, "referral propagation done");
        Ok(Propagation { incremented, stop })
    }

    /// Credit every tree ancestor of `new_member` on the side its subtree hangs from.
    #[instrument(skip(self), fields(new_member = %new_member))]
    pub fn along_tree(&self, new_member: MemberId) -> Result<Propagation, TreeError> {
        let mut incremented = Vec::new();
        let mut current = new_member;
        while let Some((parent, side)) = self.repo.parent_of(current)? {
            self.repo.increment_count(parent, side)?;
            incremented.push((parent, side));
            current = parent;
        }
        debug!(hops = incremented.len(), "tree propagation done");
        Ok(Propagation {
            incremented,
            stop: StopReason::Root,
        })
    }
}
