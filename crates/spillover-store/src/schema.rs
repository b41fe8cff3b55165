/// SQL DDL for the member tree.
/// WAL mode + foreign keys enabled at connection time.
pub const SCHEMA_VERSION: u32 = 1;

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS members (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    member_code TEXT UNIQUE NOT NULL,
    name TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    mobile TEXT NOT NULL,
    password TEXT NOT NULL,
    sponsor_code TEXT,
    left_member_id INTEGER REFERENCES members(id),
    right_member_id INTEGER REFERENCES members(id),
    left_count INTEGER NOT NULL DEFAULT 0 CHECK (left_count >= 0),
    right_count INTEGER NOT NULL DEFAULT 0 CHECK (right_count >= 0),
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_members_left_child
    ON members(left_member_id) WHERE left_member_id IS NOT NULL;
CREATE UNIQUE INDEX IF NOT EXISTS idx_members_right_child
    ON members(right_member_id) WHERE right_member_id IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_members_sponsor ON members(sponsor_code);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
"#;

pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = NORMAL;
"#;
