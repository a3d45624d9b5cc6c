//! SurrealDB implementation of the organization [`Collection`].

use chrono::{DateTime, Utc};
use pezauth_core::models::pivot_org::{OrgSelector, PivotOrg};
use pezauth_core::repository::{ChangeInfo, Collection};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::DbError;

/// DB-side row struct; the record ID is the owner's email.
#[derive(Debug, SurrealValue)]
struct PivotOrgRow {
    email: String,
    org_name: String,
    org_guid: String,
    active: bool,
    details: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PivotOrgRow> for PivotOrg {
    fn from(row: PivotOrgRow) -> Self {
        PivotOrg {
            email: row.email,
            org_name: row.org_name,
            org_guid: row.org_guid,
            active: row.active,
            details: row.details,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, SurrealValue)]
struct RecordIdRow {
    #[allow(dead_code)]
    record_id: String,
}

/// SurrealDB-backed collection of organization records.
#[derive(Clone)]
pub struct SurrealCollection<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCollection<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> Collection for SurrealCollection<C> {
    type Error = DbError;

    async fn find_one(&self, selector: &OrgSelector) -> Result<Option<PivotOrg>, DbError> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('pivot_org', $id)")
            .bind(("id", selector.email.clone()))
            .await?;

        let rows: Vec<PivotOrgRow> = result.take(0)?;
        Ok(rows.into_iter().next().map(PivotOrg::from))
    }

    async fn upsert(
        &self,
        selector: &OrgSelector,
        update: &PivotOrg,
    ) -> Result<ChangeInfo, DbError> {
        // Statement 0 reports whether the record existed before the write.
        let result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id \
                 FROM type::record('pivot_org', $id); \
                 UPSERT type::record('pivot_org', $id) SET \
                 email = $email, org_name = $org_name, org_guid = $org_guid, \
                 active = $active, details = $details, \
                 created_at = $created_at, updated_at = $updated_at",
            )
            .bind(("id", selector.email.clone()))
            .bind(("email", update.email.clone()))
            .bind(("org_name", update.org_name.clone()))
            .bind(("org_guid", update.org_guid.clone()))
            .bind(("active", update.active))
            .bind(("details", update.details.clone()))
            .bind(("created_at", update.created_at))
            .bind(("updated_at", update.updated_at))
            .await?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;
        let before: Vec<RecordIdRow> = result.take(0)?;

        Ok(ChangeInfo {
            inserted: before.is_empty(),
        })
    }

    async fn remove(&self, selector: &OrgSelector) -> Result<(), DbError> {
        let mut result = self
            .db
            .query("DELETE type::record('pivot_org', $id) RETURN BEFORE")
            .bind(("id", selector.email.clone()))
            .await?;

        let removed: Vec<PivotOrgRow> = result.take(0)?;
        if removed.is_empty() {
            return Err(DbError::NotFound {
                entity: "pivot_org".into(),
                id: selector.email.clone(),
            });
        }

        Ok(())
    }
}
