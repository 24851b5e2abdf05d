//! SQL query constants
//!
//! Contains all SQL queries used by the PostgreSQL proposal store.

/// Proposal table. Amounts are derived server-side and stored for reporting;
/// reads always recompute them from `proposal`.
pub const CREATE_PROPOSALS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS proposals (
        token            TEXT PRIMARY KEY,
        id               UUID NOT NULL UNIQUE,
        edit_token       TEXT NOT NULL,
        proposal         JSONB NOT NULL,
        pack_id          TEXT NOT NULL,
        selected_options TEXT[] NOT NULL DEFAULT '{}',
        total_price      INTEGER NOT NULL,
        deposit_percent  SMALLINT NOT NULL,
        deposit_amount   INTEGER NOT NULL,
        status           TEXT NOT NULL DEFAULT 'draft',
        version          BIGINT NOT NULL DEFAULT 1,
        valid_until      DATE NOT NULL,
        sent_at          TIMESTAMPTZ,
        viewed_at        TIMESTAMPTZ,
        accepted_at      TIMESTAMPTZ,
        declined_at      TIMESTAMPTZ,
        accepted_meta    JSONB,
        declined_meta    JSONB,
        created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at       TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

pub const CREATE_PROPOSALS_INDEXES: &str = r#"
    CREATE INDEX IF NOT EXISTS idx_proposals_updated_at ON proposals (updated_at DESC);
    CREATE INDEX IF NOT EXISTS idx_proposals_status ON proposals (status);
"#;

const PROPOSAL_COLUMNS: &str = "token, id, edit_token, proposal, status, version, valid_until, \
     sent_at, viewed_at, accepted_at, declined_at, accepted_meta, declined_meta, \
     created_at, updated_at";

pub fn select_proposal() -> String {
    format!("SELECT {} FROM proposals WHERE token = $1", PROPOSAL_COLUMNS)
}

pub fn list_proposals_by_edit_tokens() -> String {
    format!(
        "SELECT {} FROM proposals WHERE edit_token = ANY($1) ORDER BY updated_at DESC",
        PROPOSAL_COLUMNS
    )
}

/// Optimistic write: only applies while the stored version is still `$18`
pub const UPDATE_PROPOSAL_IF_VERSION: &str = r#"
    UPDATE proposals SET
        proposal = $2,
        pack_id = $3,
        selected_options = $4,
        total_price = $5,
        deposit_percent = $6,
        deposit_amount = $7,
        status = $8,
        version = $9,
        valid_until = $10,
        sent_at = $11,
        viewed_at = $12,
        accepted_at = $13,
        declined_at = $14,
        accepted_meta = $15,
        declined_meta = $16,
        updated_at = $17
    WHERE token = $1 AND version = $18
"#;

pub const UPSERT_PROPOSAL: &str = r#"
    INSERT INTO proposals (
        token, id, edit_token, proposal, pack_id, selected_options,
        total_price, deposit_percent, deposit_amount, status, version, valid_until,
        sent_at, viewed_at, accepted_at, declined_at, accepted_meta, declined_meta,
        created_at, updated_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
    ON CONFLICT (token) DO UPDATE SET
        proposal = EXCLUDED.proposal,
        pack_id = EXCLUDED.pack_id,
        selected_options = EXCLUDED.selected_options,
        total_price = EXCLUDED.total_price,
        deposit_percent = EXCLUDED.deposit_percent,
        deposit_amount = EXCLUDED.deposit_amount,
        status = EXCLUDED.status,
        version = EXCLUDED.version,
        valid_until = EXCLUDED.valid_until,
        sent_at = EXCLUDED.sent_at,
        viewed_at = EXCLUDED.viewed_at,
        accepted_at = EXCLUDED.accepted_at,
        declined_at = EXCLUDED.declined_at,
        accepted_meta = EXCLUDED.accepted_meta,
        declined_meta = EXCLUDED.declined_meta,
        updated_at = EXCLUDED.updated_at
"#;

pub const DELETE_PROPOSAL: &str = "DELETE FROM proposals WHERE token = $1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_and_list_share_columns() {
        assert!(select_proposal().contains("declined_meta"));
        assert!(select_proposal().ends_with("WHERE token = $1"));
        assert!(list_proposals_by_edit_tokens().contains(PROPOSAL_COLUMNS));
        assert!(list_proposals_by_edit_tokens().ends_with("ORDER BY updated_at DESC"));
    }

    #[test]
    fn test_upsert_binds_every_column() {
        assert!(UPSERT_PROPOSAL.contains("$20"));
        assert!(!UPSERT_PROPOSAL.contains("$21"));
        assert!(!UPSERT_PROPOSAL.contains("edit_token = EXCLUDED"));
    }

    #[test]
    fn test_conditional_update_checks_version() {
        assert!(UPDATE_PROPOSAL_IF_VERSION.contains("WHERE token = $1 AND version = $18"));
        assert!(!UPDATE_PROPOSAL_IF_VERSION.contains("$19"));
        assert!(!UPDATE_PROPOSAL_IF_VERSION.contains("edit_token"));
        assert!(list_proposals_by_edit_tokens().contains("edit_token = ANY($1)"));
    }
}
