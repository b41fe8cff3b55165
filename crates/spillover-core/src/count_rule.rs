use serde::{Deserialize, Serialize};

/// How a registration is reflected in ancestors' side counters.
///
/// The referral rule never credits the attach point itself and stops
/// wherever a sponsor is not the tree parent, so its counters trail true
/// subtree sizes once spillover occurs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountRule {
    /// Walk the sponsor chain from the attach point. A hop is counted only
    /// while the current member is a direct tree child of its sponsor; the
    /// walk stops at the first hop where it is not.
    #[default]
    #[serde(alias = "referral")]
    ReferralChain,
    /// Walk tree-parent edges from the new member to the root, counting
    /// every hop. Counters equal true subtree sizes.
    #[serde(alias = "tree")]
    TreeEdges,
}

impl std::str::FromStr for CountRule {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "referral" | "referral_chain" => Ok(Self::ReferralChain),
            "tree" | "tree_edges" => Ok(Self::TreeEdges),
            other => Err(format!("unknown count rule: {other}")),
        }
    }
}
