//! Settings type definitions.
//!
//! All types use camelCase on the wire and `#[serde(default)]`, so a partial
//! JSON file only needs the keys it changes.

use serde::{Deserialize, Serialize};
use spillover_core::CountRule;

/// Placeholder secret shipped in the defaults. Startup warns while it is in use.
pub const DEFAULT_JWT_SECRET: &str = "change-me";

/// Root settings type.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpilloverSettings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub tree: TreeSettings,
    pub logging: LoggingSettings,
}

/// HTTP listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port. `0` picks a free port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    /// SQLite file. Relative paths resolve against `~/.spillover`.
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "spillover.db".to_string(),
        }
    }
}

/// Token issuance settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// HMAC secret for session tokens.
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub token_ttl_secs: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl_secs: 86_400,
        }
    }
}

impl AuthSettings {
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

/// Placement and counting behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TreeSettings {
    /// How many times a registration re-runs placement after losing a slot.
    pub max_placement_attempts: u32,
    pub count_rule: CountRule,
    /// Code given to the first member by `seed-root`.
    pub root_code: String,
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            max_placement_attempts: 3,
            count_rule: CountRule::default(),
            root_code: "MEM1".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level. `RUST_LOG` takes precedence.
    pub level: String,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = SpilloverSettings::default();
        assert_eq!(s.server.port, 5000);
        assert_eq!(s.tree.max_placement_attempts, 3);
        assert_eq!(s.tree.root_code, "MEM1");
        assert_eq!(s.tree.count_rule, CountRule::ReferralChain);
        assert!(s.auth.uses_default_secret());
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(SpilloverSettings::default()).unwrap();
        assert_eq!(json["tree"]["maxPlacementAttempts"], 3);
        assert_eq!(json["tree"]["countRule"], "referral_chain");
        assert_eq!(json["auth"]["tokenTtlSecs"], 86_400);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: SpilloverSettings =
            serde_json::from_str(r#"{"tree": {"countRule": "tree"}}"#).unwrap();
        assert_eq!(s.tree.count_rule, CountRule::TreeEdges);
        assert_eq!(s.tree.max_placement_attempts, 3);
        assert_eq!(s.server.host, "0.0.0.0");
    }
}
