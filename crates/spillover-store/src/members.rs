use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use spillover_core::{MemberCode, MemberId, NewMember, Side};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

const MEMBER_COLUMNS: &str = "id, member_code, name, email, mobile, password, sponsor_code,
     left_member_id, right_member_id, left_count, right_count, created_at";

/// A stored member: one node of the placement tree.
#[derive(Clone, Debug)]
pub struct MemberRow {
    pub id: MemberId,
    pub code: MemberCode,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password_hash: String,
    /// Referral edge. Independent of tree position; absent only for the root.
    pub sponsor_code: Option<MemberCode>,
    pub left_child: Option<MemberId>,
    pub right_child: Option<MemberId>,
    pub left_count: u64,
    pub right_count: u64,
    pub created_at: String,
}

impl MemberRow {
    pub fn child(&self, side: Side) -> Option<MemberId> {
        match side {
            Side::Left => self.left_child,
            Side::Right => self.right_child,
        }
    }

    pub fn count(&self, side: Side) -> u64 {
        match side {
            Side::Left => self.left_count,
            Side::Right => self.right_count,
        }
    }

    /// Which side of this node `child` hangs from, by tree-edge equality.
    pub fn side_of(&self, child: MemberId) -> Option<Side> {
        if self.left_child == Some(child) {
            Some(Side::Left)
        } else if self.right_child == Some(child) {
            Some(Side::Right)
        } else {
            None
        }
    }
}

/// Summary of a member as shown in a downline listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSummary {
    pub id: MemberId,
    pub member_code: MemberCode,
    pub name: String,
}

/// Immediate tree children of one member, grouped by side.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Downline {
    pub left: Vec<MemberSummary>,
    pub right: Vec<MemberSummary>,
}

/// Result of a conditional attach: exactly one caller wins a slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttachOutcome {
    Attached(MemberId),
    SlotOccupied,
}

pub struct MemberRepo {
    db: Database,
}

impl MemberRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a detached member. Use [`MemberRepo::create_and_attach`] for
    /// registrations; this is for the root and for tests.
    #[instrument(skip(self, member), fields(code = %code))]
    pub fn create(
        &self,
        code: &MemberCode,
        sponsor_code: Option<&MemberCode>,
        member: &NewMember,
    ) -> Result<MemberId, StoreError> {
        self.db.with_conn(|conn| insert_member(conn, code, sponsor_code, member))
    }

    /// Create the first member of an empty tree.
    #[instrument(skip(self, member), fields(code = %code))]
    pub fn create_root(&self, code: &MemberCode, member: &NewMember) -> Result<MemberId, StoreError> {
        self.db.with_tx(|tx| {
            let existing: i64 = tx.query_row("SELECT COUNT(*) FROM members", [], |row| row.get(0))?;
            if existing > 0 {
                return Err(StoreError::Conflict("tree already has a root".into()));
            }
            insert_member(tx, code, None, member)
        })
    }

    /// Set `parent.side = child` only if that slot is currently empty.
    #[instrument(skip(self), fields(parent = %parent, side = %side, child = %child))]
    pub fn attach(
        &self,
        parent: MemberId,
        side: Side,
        child: MemberId,
    ) -> Result<AttachOutcome, StoreError> {
        self.db.with_conn(|conn| {
            if conditional_attach(conn, parent, side, child)? {
                Ok(AttachOutcome::Attached(child))
            } else {
                ensure_exists(conn, parent)?;
                Ok(AttachOutcome::SlotOccupied)
            }
        })
    }

    /// Insert a member and link it under `parent` on `side` as one unit.
    /// If the slot was taken in the meantime nothing is written.
    #[instrument(skip(self, member), fields(parent = %parent, side = %side, code = %code))]
    pub fn create_and_attach(
        &self,
        parent: MemberId,
        side: Side,
        code: &MemberCode,
        sponsor_code: &MemberCode,
        member: &NewMember,
    ) -> Result<AttachOutcome, StoreError> {
        self.db.with_conn(|conn| {
            let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
            ensure_exists(&tx, parent)?;
            let child = insert_member(&tx, code, Some(sponsor_code), member)?;
            if conditional_attach(&tx, parent, side, child)? {
                tx.commit()?;
                Ok(AttachOutcome::Attached(child))
            } else {
                tx.rollback()?;
                debug!("slot taken, insert rolled back");
                Ok(AttachOutcome::SlotOccupied)
            }
        })
    }

    #[instrument(skip(self), fields(member_id = %id))]
    pub fn get(&self, id: MemberId) -> Result<MemberRow, StoreError> {
        self.db.with_conn(|conn| {
            let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE id = ?1");
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query([id.get()])?;
            match rows.next()? {
                Some(row) => row_to_member(row),
                None => Err(StoreError::NotFound(format!("member {id}"))),
            }
        })
    }

    #[instrument(skip(self), fields(code = %code))]
    pub fn get_by_code(&self, code: &MemberCode) -> Result<MemberRow, StoreError> {
        self.db.with_conn(|conn| {
            let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE member_code = ?1");
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query([code.as_str()])?;
            match rows.next()? {
                Some(row) => row_to_member(row),
                None => Err(StoreError::NotFound(format!("member {code}"))),
            }
        })
    }

    /// Atomically add one to `id`'s counter on `side`.
    #[instrument(skip(self), fields(member_id = %id, side = %side))]
    pub fn increment_count(&self, id: MemberId, side: Side) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let column = side.count_column();
            let changed = conn.execute(
                &format!("UPDATE members SET {column} = {column} + 1 WHERE id = ?1"),
                [id.get()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("member {id}")));
            }
            Ok(())
        })
    }

    /// Tree parent of `id` and the side it hangs from, if attached.
    #[instrument(skip(self), fields(member_id = %id))]
    pub fn parent_of(&self, id: MemberId) -> Result<Option<(MemberId, Side)>, StoreError> {
        self.db.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT id, COALESCE(left_member_id = ?1, 0) FROM members
                     WHERE left_member_id = ?1 OR right_member_id = ?1",
                    [id.get()],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, bool>(1)?)),
                )
                .optional()?;
            Ok(found.map(|(parent, is_left)| {
                let side = if is_left { Side::Left } else { Side::Right };
                (MemberId::from_raw(parent), side)
            }))
        })
    }

    /// Immediate tree children of `id`.
    #[instrument(skip(self), fields(member_id = %id))]
    pub fn children_of(&self, id: MemberId) -> Result<Downline, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.member_code, m.name, COALESCE(p.left_member_id = m.id, 0)
                 FROM members m
                 JOIN members p ON p.left_member_id = m.id OR p.right_member_id = m.id
                 WHERE p.id = ?1
                 ORDER BY m.id",
            )?;
            let mut rows = stmt.query([id.get()])?;
            let mut downline = Downline::default();
            while let Some(row) = rows.next()? {
                let summary = MemberSummary {
                    id: MemberId::from_raw(row_helpers::get(row, 0, "members", "id")?),
                    member_code: MemberCode::from_raw(row_helpers::get::<String>(
                        row,
                        1,
                        "members",
                        "member_code",
                    )?),
                    name: row_helpers::get(row, 2, "members", "name")?,
                };
                if row_helpers::get::<bool>(row, 3, "members", "left_member_id")? {
                    downline.left.push(summary);
                } else {
                    downline.right.push(summary);
                }
            }
            Ok(downline)
        })
    }

    pub fn count(&self) -> Result<u64, StoreError> {
        self.db.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM members", [], |row| row.get(0))?;
            Ok(u64::try_from(n).unwrap_or_default())
        })
    }

    /// Members that have a sponsor but no tree parent.
    pub fn orphans(&self) -> Result<Vec<MemberId>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id FROM members m
                 WHERE m.sponsor_code IS NOT NULL
                   AND NOT EXISTS (
                       SELECT 1 FROM members p
                       WHERE p.left_member_id = m.id OR p.right_member_id = m.id
                   )
                 ORDER BY m.id",
            )?;
            let ids = stmt
                .query_map([], |row| row.get::<_, i64>(0))?
                .map(|r| r.map(MemberId::from_raw))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }
}

fn insert_member(
    conn: &Connection,
    code: &MemberCode,
    sponsor_code: Option<&MemberCode>,
    member: &NewMember,
) -> Result<MemberId, StoreError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO members (member_code, name, email, mobile, password, sponsor_code, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            code.as_str(),
            member.name,
            member.email,
            member.mobile,
            member.password_hash,
            sponsor_code.map(MemberCode::as_str),
            now,
        ],
    )?;
    Ok(MemberId::from_raw(conn.last_insert_rowid()))
}

/// Single conditional write: returns false when the slot is already set.
fn conditional_attach(
    conn: &Connection,
    parent: MemberId,
    side: Side,
    child: MemberId,
) -> Result<bool, StoreError> {
    let column = side.child_column();
    let changed = conn.execute(
        &format!("UPDATE members SET {column} = ?1 WHERE id = ?2 AND {column} IS NULL"),
        [child.get(), parent.get()],
    )?;
    Ok(changed == 1)
}

fn ensure_exists(conn: &Connection, id: MemberId) -> Result<(), StoreError> {
    let found = conn
        .query_row("SELECT 1 FROM members WHERE id = ?1", [id.get()], |_| Ok(()))
        .optional()?;
    found.ok_or_else(|| StoreError::NotFound(format!("member {id}")))
}

fn row_to_member(row: &rusqlite::Row<'_>) -> Result<MemberRow, StoreError> {
    const T: &str = "members";
    Ok(MemberRow {
        id: MemberId::from_raw(row_helpers::get(row, 0, T, "id")?),
        code: MemberCode::from_raw(row_helpers::get::<String>(row, 1, T, "member_code")?),
        name: row_helpers::get(row, 2, T, "name")?,
        email: row_helpers::get(row, 3, T, "email")?,
        mobile: row_helpers::get(row, 4, T, "mobile")?,
        password_hash: row_helpers::get(row, 5, T, "password")?,
        sponsor_code: row_helpers::get_opt::<String>(row, 6, T, "sponsor_code")?
            .map(MemberCode::from_raw),
        left_child: row_helpers::get_opt(row, 7, T, "left_member_id")?.map(MemberId::from_raw),
        right_child: row_helpers::get_opt(row, 8, T, "right_member_id")?.map(MemberId::from_raw),
        left_count: row_helpers::get_count(row, 9, T, "left_count")?,
        right_count: row_helpers::get_count(row, 10, T, "right_count")?,
        created_at: row_helpers::get(row, 11, T, "created_at")?,
    })
}
