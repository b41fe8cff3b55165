use serde::{Deserialize, Serialize};

/// Fields supplied for a new member. `password_hash` is already hashed
/// by the credential collaborator; the tree never sees plaintext.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMember {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password_hash: String,
}
