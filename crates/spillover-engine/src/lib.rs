//! Tree placement, count propagation and the account operations built on them.
//!
//! Registration flow: [`TreeMutator::register`] asks the
//! [`PlacementResolver`] for an attach point, commits the new member with a
//! conditional attach, then hands the attach point to the [`CountPropagator`].

pub mod accounts;
pub mod credentials;
pub mod downline;
pub mod mutator;
pub mod placement;
pub mod propagate;

pub use accounts::{AccountService, LoginResult, Profile, RegistrationRequest, UserSummary};
pub use credentials::{Claims, CredentialHasher, JwtIssuer, SaltedSha256Hasher, TokenIssuer};
pub use downline::DownlineQuery;
pub use mutator::{Registration, TreeMutator};
pub use placement::{PlacementResolver, SlotSource};
pub use propagate::{CountPropagator, Propagation, StopReason};
