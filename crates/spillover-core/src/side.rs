use serde::{Deserialize, Serialize};

/// Which child slot of a tree node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Column holding the child reference for this side.
    pub fn child_column(self) -> &'static str {
        match self {
            Self::Left => "left_member_id",
            Self::Right => "right_member_id",
        }
    }

    /// Column holding the descendant counter for this side.
    pub fn count_column(self) -> &'static str {
        match self {
            Self::Left => "left_count",
            Self::Right => "right_count",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Side {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(format!("unknown position: {other}")),
        }
    }
}
