//! Account operations at the request boundary: register, login, profile.
//!
//! Input is validated here before any store access; the tree operations
//! themselves live in [`crate::TreeMutator`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use spillover_core::{MemberCode, MemberId, NewMember, Side, TreeError};
use spillover_store::{MemberRepo, StoreError};

use crate::credentials::{CredentialHasher, TokenIssuer};
use crate::mutator::{Registration, TreeMutator};

/// Registration payload as received from a client. Every field is optional
/// at the wire level so a missing field reports as invalid input.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RegistrationRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub sponsor_code: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
}

/// A registration request that passed validation.
#[derive(Debug)]
struct ValidRegistration {
    name: String,
    email: String,
    mobile: String,
    password: String,
    sponsor_code: MemberCode,
    side: Side,
}

impl RegistrationRequest {
    fn validate(&self) -> Result<ValidRegistration, TreeError> {
        fn required(field: &Option<String>) -> Result<String, TreeError> {
            match field.as_deref().map(str::trim) {
                Some(v) if !v.is_empty() => Ok(v.to_string()),
                _ => Err(TreeError::InvalidInput("All fields are required".into())),
            }
        }

        let name = required(&self.name)?;
        let email = required(&self.email)?;
        let mobile = required(&self.mobile)?;
        // Passwords are stored as given; only a blank one is rejected.
        required(&self.password)?;
        let password = self.password.clone().unwrap_or_default();
        let sponsor_code = MemberCode::from_raw(required(&self.sponsor_code)?);
        let side = required(&self.position)?
            .parse::<Side>()
            .map_err(|_| TreeError::InvalidInput("Position must be left or right".into()))?;

        Ok(ValidRegistration {
            name,
            email,
            mobile,
            password,
            sponsor_code,
            side,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: MemberId,
    pub member_code: MemberCode,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoginResult {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: MemberId,
    pub member_code: MemberCode,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub sponsor_code: Option<MemberCode>,
    pub left_count: u64,
    pub right_count: u64,
}

pub struct AccountService {
    repo: Arc<MemberRepo>,
    mutator: Arc<TreeMutator>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: Arc<dyn TokenIssuer>,
    root_code: MemberCode,
}

impl AccountService {
    pub fn new(
        repo: Arc<MemberRepo>,
        mutator: Arc<TreeMutator>,
        hasher: Arc<dyn CredentialHasher>,
        tokens: Arc<dyn TokenIssuer>,
        root_code: MemberCode,
    ) -> Self {
        Self {
            repo,
            mutator,
            hasher,
            tokens,
            root_code,
        }
    }

    pub fn tokens(&self) -> &Arc<dyn TokenIssuer> {
        &self.tokens
    }

    pub fn register(&self, request: &RegistrationRequest) -> Result<Registration, TreeError> {
        let valid = request.validate()?;
        let member = NewMember {
            name: valid.name,
            email: valid.email,
            mobile: valid.mobile,
            password_hash: self.hasher.hash(&valid.password),
        };
        self.mutator.register(&valid.sponsor_code, valid.side, &member)
    }

    #[instrument(skip(self, password), fields(member_code = %member_code))]
    pub fn login(&self, member_code: &str, password: &str) -> Result<LoginResult, TreeError> {
        if member_code.trim().is_empty() || password.is_empty() {
            return Err(TreeError::InvalidInput(
                "Member code and password required".into(),
            ));
        }
        let code = MemberCode::from_raw(member_code.trim());
        let row = match self.repo.get_by_code(&code) {
            Ok(row) => row,
            Err(StoreError::NotFound(_)) => {
                info!("login failed: unknown member code");
                return Err(TreeError::AuthFailure);
            }
            Err(e) => return Err(e.into()),
        };
        if !self.hasher.verify(password, &row.password_hash) {
            info!("login failed: wrong password");
            return Err(TreeError::AuthFailure);
        }

        let token = self.tokens.issue(row.id, &row.code)?;
        Ok(LoginResult {
            token,
            user: UserSummary {
                id: row.id,
                member_code: row.code,
                name: row.name,
            },
        })
    }

    pub fn profile(&self, id: MemberId) -> Result<Profile, TreeError> {
        let row = self.repo.get(id).map_err(|e| match e {
            StoreError::NotFound(_) => TreeError::NotFound("User not found".into()),
            other => other.into(),
        })?;
        Ok(Profile {
            id: row.id,
            member_code: row.code,
            name: row.name,
            email: row.email,
            mobile: row.mobile,
            sponsor_code: row.sponsor_code,
            left_count: row.left_count,
            right_count: row.right_count,
        })
    }

    /// Create the root member under the configured root code.
    pub fn seed_root(
        &self,
        name: &str,
        email: &str,
        mobile: &str,
        password: &str,
    ) -> Result<(MemberCode, MemberId), TreeError> {
        if [name, email, mobile, password].iter().any(|v| v.trim().is_empty()) {
            return Err(TreeError::InvalidInput("All fields are required".into()));
        }
        let member = NewMember {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            mobile: mobile.trim().to_string(),
            password_hash: self.hasher.hash(password),
        };
        let id = self.mutator.seed_root(&self.root_code, &member)?;
        Ok((self.root_code.clone(), id))
    }
}
