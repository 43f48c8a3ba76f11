use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                      TEXT PRIMARY KEY,
                email                   TEXT NOT NULL UNIQUE,
                password                TEXT NOT NULL,
                name                    TEXT NOT NULL,
                phone                   TEXT,
                category                TEXT NOT NULL DEFAULT 'individual',
                is_admin                INTEGER NOT NULL DEFAULT 0,
                is_active               INTEGER NOT NULL DEFAULT 1,
                email_verified          INTEGER NOT NULL DEFAULT 0,
                phone_verified          INTEGER NOT NULL DEFAULT 0,
                total_donations         INTEGER NOT NULL DEFAULT 0,
                total_donation_cents    INTEGER NOT NULL DEFAULT 0,
                help_count              INTEGER NOT NULL DEFAULT 0,
                created_at              TEXT NOT NULL
            );

            CREATE TABLE user_badges (
                user_id     TEXT NOT NULL REFERENCES users(id),
                tier        TEXT NOT NULL,
                name        TEXT NOT NULL,
                earned_at   TEXT NOT NULL,
                PRIMARY KEY (user_id, tier)
            );

            CREATE TABLE requests (
                id                      TEXT PRIMARY KEY,
                owner_id                TEXT REFERENCES users(id),
                name                    TEXT NOT NULL,
                phone                   TEXT NOT NULL,
                email                   TEXT,
                category                TEXT NOT NULL,
                description             TEXT NOT NULL,
                lat                     REAL NOT NULL,
                lng                     REAL NOT NULL,
                address                 TEXT,
                status                  TEXT NOT NULL DEFAULT 'pending',
                priority                TEXT NOT NULL DEFAULT 'medium',
                is_verified             INTEGER NOT NULL DEFAULT 0,
                verified_by             TEXT REFERENCES users(id),
                verified_at             TEXT,
                is_active               INTEGER NOT NULL DEFAULT 1,
                wallet_number           TEXT,
                bank_account            TEXT,
                funding_goal_cents      INTEGER,
                total_received_cents    INTEGER NOT NULL DEFAULT 0,
                created_at              TEXT NOT NULL,
                updated_at              TEXT NOT NULL
            );

            CREATE INDEX idx_requests_active
                ON requests(is_active, created_at);

            CREATE TABLE request_helpers (
                request_id  TEXT NOT NULL REFERENCES requests(id),
                user_id     TEXT NOT NULL REFERENCES users(id),
                helped_at   TEXT NOT NULL,
                notes       TEXT,
                PRIMARY KEY (request_id, user_id)
            );

            CREATE TABLE donations (
                id                      TEXT PRIMARY KEY,
                donor_id                TEXT NOT NULL REFERENCES users(id),
                request_id              TEXT REFERENCES requests(id),
                amount_cents            INTEGER NOT NULL,
                method                  TEXT NOT NULL,
                status                  TEXT NOT NULL,
                transaction_id          TEXT,
                method_reference        TEXT,
                processing_fee_cents    INTEGER NOT NULL,
                platform_fee_cents      INTEGER NOT NULL,
                net_cents               INTEGER NOT NULL,
                is_recurring            INTEGER NOT NULL DEFAULT 0,
                notes                   TEXT,
                refund_reason           TEXT,
                refunded_at             TEXT,
                refunded_by             TEXT REFERENCES users(id),
                created_at              TEXT NOT NULL,
                updated_at              TEXT NOT NULL,
                CHECK (net_cents = amount_cents - processing_fee_cents - platform_fee_cents)
            );

            CREATE INDEX idx_donations_donor
                ON donations(donor_id, created_at);
            CREATE INDEX idx_donations_request
                ON donations(request_id, status);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }
}
