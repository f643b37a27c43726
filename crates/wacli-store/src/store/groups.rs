//! Group upsert and atomic participant-set replacement (spec invariant 3,
//! section 9 "Atomic set replacement for group participants").

use super::Store;
use crate::types::{GroupParticipant, GroupRow};
use wacli_core::entities::GroupRole;
use wacli_core::error::WacliError;

impl Store {
    pub async fn upsert_group(
        &self,
        jid: &str,
        name: &str,
        owner_jid: &str,
        created_at: i64,
        updated_at: i64,
    ) -> Result<(), WacliError> {
        sqlx::query(
            "INSERT INTO groups (jid, name, owner_jid, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(jid) DO UPDATE SET
                name = CASE WHEN excluded.name != '' THEN excluded.name ELSE groups.name END,
                owner_jid = CASE WHEN excluded.owner_jid != '' THEN excluded.owner_jid ELSE groups.owner_jid END,
                updated_at = MAX(groups.updated_at, excluded.updated_at)",
        )
        .bind(jid)
        .bind(name)
        .bind(owner_jid)
        .bind(created_at)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_group(&self, jid: &str) -> Result<GroupRow, WacliError> {
        let row: Option<(String, String, String, i64, i64)> = sqlx::query_as(
            "SELECT jid, name, owner_jid, created_at, updated_at FROM groups WHERE jid = ?",
        )
        .bind(jid)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(jid, name, owner_jid, created_at, updated_at)| GroupRow {
            jid,
            name,
            owner_jid,
            created_at,
            updated_at,
        })
        .ok_or_else(|| WacliError::NotFound(format!("group {jid}")))
    }

    /// Case-insensitive substring match on name or jid, restricted to group
    /// chats (kind = 'group').
    pub async fn list_groups(
        &self,
        query: Option<&str>,
        limit: i64,
    ) -> Result<Vec<GroupRow>, WacliError> {
        let pattern = query.map(|q| format!("%{}%", q.to_lowercase()));

        let rows: Vec<(String, String, String, i64, i64)> = match pattern {
            Some(p) => {
                sqlx::query_as(
                    "SELECT jid, name, owner_jid, created_at, updated_at FROM groups
                     WHERE LOWER(name) LIKE ? OR LOWER(jid) LIKE ?
                     ORDER BY updated_at DESC LIMIT ?",
                )
                .bind(&p)
                .bind(&p)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT jid, name, owner_jid, created_at, updated_at FROM groups
                     ORDER BY updated_at DESC LIMIT ?",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows
            .into_iter()
            .map(|(jid, name, owner_jid, created_at, updated_at)| GroupRow {
                jid,
                name,
                owner_jid,
                created_at,
                updated_at,
            })
            .collect())
    }

    pub async fn get_group_participants(
        &self,
        group_jid: &str,
    ) -> Result<Vec<GroupParticipant>, WacliError> {
        let rows: Vec<(String, String, String, i64)> = sqlx::query_as(
            "SELECT group_jid, user_jid, role, updated_at FROM group_participants
             WHERE group_jid = ? ORDER BY user_jid",
        )
        .bind(group_jid)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(group_jid, user_jid, role, updated_at)| GroupParticipant {
                group_jid,
                user_jid,
                role: GroupRole::parse(&role),
                updated_at,
            })
            .collect())
    }

    /// Replace the entire participant set for `group_jid` in one
    /// transaction: delete then batch-insert. On any error the transaction
    /// rolls back and the prior snapshot is preserved untouched (spec
    /// invariant 3, testable property "a failure mid-replace leaves the
    /// pre-call snapshot intact").
    pub async fn replace_group_participants(
        &self,
        group_jid: &str,
        participants: &[GroupParticipant],
    ) -> Result<(), WacliError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM group_participants WHERE group_jid = ?")
            .bind(group_jid)
            .execute(&mut *tx)
            .await?;

        for p in participants {
            sqlx::query(
                "INSERT INTO group_participants (group_jid, user_jid, role, updated_at)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(group_jid)
            .bind(&p.user_jid)
            .bind(p.role.as_str())
            .bind(p.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
