use duckdb::Connection;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_currency_rates",
        sql: r#"
CREATE TABLE IF NOT EXISTS currency_rates (
    char_code VARCHAR NOT NULL,
    nominal BIGINT NOT NULL CHECK (nominal > 0),
    name VARCHAR NOT NULL,
    value VARCHAR NOT NULL,
    date DATE NOT NULL,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (char_code, date)
);
"#,
    },
    Migration {
        version: "0002_date_index",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_currency_rates_date ON currency_rates(date);
"#,
    },
];

/// Apply any pending schema migrations. Safe to call on every open.
pub fn apply_migrations(connection: &Connection) -> Result<(), duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            [migration.version],
            |row| row.get(0),
        )?;

        if applied == 0 {
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                [migration.version],
            )?;
        }
    }

    Ok(())
}
