pub mod count_rule;
pub mod errors;
pub mod ids;
pub mod member;
pub mod side;

pub use count_rule::CountRule;
pub use errors::TreeError;
pub use ids::{CodeGenerator, MemberCode, MemberId};
pub use member::NewMember;
pub use side::Side;
