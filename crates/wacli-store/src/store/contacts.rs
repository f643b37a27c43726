//! Contact upsert/search, aliases, and tags (spec section 4.1).

use super::Store;
use crate::types::ContactRow;
use wacli_core::error::WacliError;

impl Store {
    pub async fn upsert_contact(
        &self,
        jid: &str,
        phone: &str,
        push_name: &str,
        full_name: &str,
        first_name: &str,
        business_name: &str,
        updated_at: i64,
    ) -> Result<(), WacliError> {
        sqlx::query(
            "INSERT INTO contacts (jid, phone, push_name, full_name, first_name, business_name, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(jid) DO UPDATE SET
                phone = CASE WHEN excluded.phone != '' THEN excluded.phone ELSE contacts.phone END,
                push_name = CASE WHEN excluded.push_name != '' THEN excluded.push_name ELSE contacts.push_name END,
                full_name = CASE WHEN excluded.full_name != '' THEN excluded.full_name ELSE contacts.full_name END,
                first_name = CASE WHEN excluded.first_name != '' THEN excluded.first_name ELSE contacts.first_name END,
                business_name = CASE WHEN excluded.business_name != '' THEN excluded.business_name ELSE contacts.business_name END,
                updated_at = MAX(contacts.updated_at, excluded.updated_at)",
        )
        .bind(jid)
        .bind(phone)
        .bind(push_name)
        .bind(full_name)
        .bind(first_name)
        .bind(business_name)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_contact(&self, jid: &str) -> Result<ContactRow, WacliError> {
        let row = self.fetch_contact_row(jid).await?;
        row.ok_or_else(|| WacliError::NotFound(format!("contact {jid}")))
    }

    async fn fetch_contact_row(&self, jid: &str) -> Result<Option<ContactRow>, WacliError> {
        let row: Option<(String, String, String, String, String, String, i64)> = sqlx::query_as(
            "SELECT jid, phone, push_name, full_name, first_name, business_name, updated_at
             FROM contacts WHERE jid = ?",
        )
        .bind(jid)
        .fetch_optional(&self.pool)
        .await?;

        let Some((jid, phone, push_name, full_name, first_name, business_name, updated_at)) = row
        else {
            return Ok(None);
        };

        let alias: Option<(String,)> =
            sqlx::query_as("SELECT alias FROM contact_aliases WHERE jid = ?")
                .bind(&jid)
                .fetch_optional(&self.pool)
                .await?;

        let tags: Vec<(String,)> =
            sqlx::query_as("SELECT tag FROM contact_tags WHERE jid = ? ORDER BY tag")
                .bind(&jid)
                .fetch_all(&self.pool)
                .await?;

        Ok(Some(ContactRow {
            jid,
            phone,
            push_name,
            full_name,
            first_name,
            business_name,
            updated_at,
            alias: alias.map(|(a,)| a),
            tags: tags.into_iter().map(|(t,)| t).collect(),
        }))
    }

    /// Matches alias, full/push/business/first name, phone, or jid.
    pub async fn search_contacts(
        &self,
        query: &str,
        limit: i64,
    ) -> Result<Vec<ContactRow>, WacliError> {
        if query.is_empty() {
            return Err(WacliError::InvalidArgument("query must not be empty".into()));
        }
        let pattern = format!("%{}%", query.to_lowercase());

        let jids: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT c.jid FROM contacts c
             LEFT JOIN contact_aliases a ON a.jid = c.jid
             WHERE LOWER(c.jid) LIKE ?
                OR LOWER(c.phone) LIKE ?
                OR LOWER(c.push_name) LIKE ?
                OR LOWER(c.full_name) LIKE ?
                OR LOWER(c.first_name) LIKE ?
                OR LOWER(c.business_name) LIKE ?
                OR LOWER(COALESCE(a.alias, '')) LIKE ?
             ORDER BY c.updated_at DESC LIMIT ?",
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(jids.len());
        for (jid,) in jids {
            if let Some(row) = self.fetch_contact_row(&jid).await? {
                out.push(row);
            }
        }
        Ok(out)
    }

    pub async fn set_alias(&self, jid: &str, alias: &str) -> Result<(), WacliError> {
        sqlx::query(
            "INSERT INTO contact_aliases (jid, alias) VALUES (?, ?)
             ON CONFLICT(jid) DO UPDATE SET alias = excluded.alias",
        )
        .bind(jid)
        .bind(alias)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove_alias(&self, jid: &str) -> Result<(), WacliError> {
        sqlx::query("DELETE FROM contact_aliases WHERE jid = ?")
            .bind(jid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn add_tag(&self, jid: &str, tag: &str) -> Result<(), WacliError> {
        sqlx::query("INSERT OR IGNORE INTO contact_tags (jid, tag) VALUES (?, ?)")
            .bind(jid)
            .bind(tag)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn remove_tag(&self, jid: &str, tag: &str) -> Result<(), WacliError> {
        sqlx::query("DELETE FROM contact_tags WHERE jid = ? AND tag = ?")
            .bind(jid)
            .bind(tag)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
