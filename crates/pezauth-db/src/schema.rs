//! Schema definitions and migration runner for SurrealDB.
//!
//! Organization records live in the SCHEMAFULL `pivot_org` table. The
//! record ID is the owning user's email, which makes "one record per
//! user" a property of the key rather than of the caller.
//!
//! Reservation keys live in `reservation`, keyed by the store key, with
//! their hash fields in a flexible object and an optional expiry.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "pivot_org",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "reservation",
        sql: SCHEMA_V2,
    },
];

const SCHEMA_V1: &str = "\
DEFINE TABLE pivot_org SCHEMAFULL;
DEFINE FIELD email ON TABLE pivot_org TYPE string;
DEFINE FIELD org_name ON TABLE pivot_org TYPE string;
DEFINE FIELD org_guid ON TABLE pivot_org TYPE string;
DEFINE FIELD active ON TABLE pivot_org TYPE bool DEFAULT false;
DEFINE FIELD details ON TABLE pivot_org TYPE string DEFAULT '';
DEFINE FIELD created_at ON TABLE pivot_org TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE pivot_org TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_pivot_org_email ON TABLE pivot_org \
    COLUMNS email UNIQUE;
DEFINE INDEX idx_pivot_org_guid ON TABLE pivot_org \
    COLUMNS org_guid UNIQUE;
";

const SCHEMA_V2: &str = "\
DEFINE TABLE reservation SCHEMAFULL;
DEFINE FIELD store_key ON TABLE reservation TYPE string;
DEFINE FIELD fields ON TABLE reservation TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD expires_at ON TABLE reservation TYPE option<datetime>;
DEFINE INDEX idx_reservation_expires_at ON TABLE reservation \
    COLUMNS expires_at;
";

/// Apply every pending migration to `db`.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

        info!(version = migration.version, "Migration applied");
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
