use std::path::Path;

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, params};
use tracing::info;

use crate::records::{PlayerRecord, Position, TrainingRow, TransferFeatures};

/// Column order of the dataset table: twelve features, then the two label columns.
pub const COLUMNS: [&str; 14] = [
    "age",
    "market_value",
    "goals",
    "assists",
    "minutes_played",
    "position",
    "club_budget",
    "club_league_position",
    "club_continental_competition",
    "contract_years_left",
    "wants_move",
    "position_need",
    "transfer_happened",
    "transfer_probability",
];

pub fn column_names() -> &'static [&'static str] {
    &COLUMNS
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS transfer_rows (
            age INTEGER NOT NULL,
            market_value INTEGER NOT NULL,
            goals INTEGER NOT NULL,
            assists INTEGER NOT NULL,
            minutes_played INTEGER NOT NULL,
            position TEXT NOT NULL,
            club_budget INTEGER NOT NULL,
            club_league_position INTEGER NOT NULL,
            club_continental_competition INTEGER NOT NULL,
            contract_years_left INTEGER NOT NULL,
            wants_move INTEGER NOT NULL,
            position_need INTEGER NOT NULL,
            transfer_happened INTEGER NOT NULL,
            transfer_probability REAL NOT NULL
        );
        "#,
    )
    .context("init sqlite schema")?;
    Ok(())
}

/// Replaces the table contents with `rows`.
pub fn save_rows(conn: &mut Connection, rows: &[TrainingRow]) -> Result<usize> {
    let tx = conn.transaction().context("begin dataset transaction")?;
    tx.execute("DELETE FROM transfer_rows", [])
        .context("clear dataset table")?;
    {
        let mut stmt = tx
            .prepare(
                r#"
                INSERT INTO transfer_rows (
                    age, market_value, goals, assists, minutes_played, position,
                    club_budget, club_league_position, club_continental_competition,
                    contract_years_left, wants_move, position_need,
                    transfer_happened, transfer_probability
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                "#,
            )
            .context("prepare dataset insert")?;
        for row in rows {
            let f = &row.features;
            let p = &f.player;
            let market_value =
                i64::try_from(p.market_value).context("market_value exceeds sqlite integer range")?;
            let club_budget =
                i64::try_from(f.club_budget).context("club_budget exceeds sqlite integer range")?;
            stmt.execute(params![
                p.age,
                market_value,
                p.goals,
                p.assists,
                p.minutes_played,
                p.position.as_str(),
                club_budget,
                f.club_league_position,
                f.club_continental_competition,
                p.contract_years_left,
                p.wants_move,
                p.position_need,
                row.transfer_happened,
                row.transfer_probability,
            ])
            .context("insert dataset row")?;
        }
    }
    tx.commit().context("commit dataset transaction")?;
    Ok(rows.len())
}

pub fn load_rows(conn: &Connection) -> Result<Vec<TrainingRow>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                age, market_value, goals, assists, minutes_played, position,
                club_budget, club_league_position, club_continental_competition,
                contract_years_left, wants_move, position_need,
                transfer_happened, transfer_probability
            FROM transfer_rows
            ORDER BY rowid ASC
            "#,
        )
        .context("prepare load dataset query")?;

    let raw = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, u32>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, u32>(7)?,
                row.get::<_, bool>(8)?,
                row.get::<_, u32>(9)?,
                row.get::<_, bool>(10)?,
                row.get::<_, u8>(11)?,
                row.get::<_, bool>(12)?,
                row.get::<_, f64>(13)?,
            ))
        })
        .context("query dataset rows")?;

    let mut out = Vec::new();
    for item in raw {
        let (
            age,
            market_value,
            goals,
            assists,
            minutes_played,
            position,
            club_budget,
            club_league_position,
            club_continental_competition,
            contract_years_left,
            wants_move,
            position_need,
            transfer_happened,
            transfer_probability,
        ) = item.context("read dataset row")?;
        let position: Position = position.parse().map_err(|e: String| anyhow!(e))?;
        out.push(TrainingRow {
            features: TransferFeatures {
                player: PlayerRecord {
                    age,
                    market_value: u64::try_from(market_value)
                        .context("negative market_value in dataset")?,
                    goals,
                    assists,
                    minutes_played,
                    position,
                    contract_years_left,
                    wants_move,
                    position_need,
                },
                club_budget: u64::try_from(club_budget).context("negative club_budget in dataset")?,
                club_league_position,
                club_continental_competition,
            },
            transfer_happened,
            transfer_probability,
        });
    }
    Ok(out)
}

pub fn save_dataset(path: &Path, rows: &[TrainingRow]) -> Result<()> {
    let mut conn = open_db(path)?;
    let written = save_rows(&mut conn, rows)?;
    info!(path = %path.display(), rows = written, "dataset saved");
    Ok(())
}

pub fn load_dataset(path: &Path) -> Result<Vec<TrainingRow>> {
    if !path.is_file() {
        return Err(anyhow!("dataset not found at {}", path.display()));
    }
    let conn = open_db(path)?;
    let rows = load_rows(&conn)?;
    info!(path = %path.display(), rows = rows.len(), "dataset loaded");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic;

    #[test]
    fn rows_survive_in_memory_round_trip() {
        let rows = synthetic::generate(40, 7);
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(save_rows(&mut conn, &rows).unwrap(), 40);
        let loaded = load_rows(&conn).unwrap();
        assert_eq!(loaded, rows);
    }

    #[test]
    fn save_replaces_previous_contents() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        save_rows(&mut conn, &synthetic::generate(30, 1)).unwrap();
        save_rows(&mut conn, &synthetic::generate(5, 2)).unwrap();
        assert_eq!(load_rows(&conn).unwrap().len(), 5);
    }

    #[test]
    fn oversized_money_values_are_rejected() {
        let mut rows = synthetic::generate(3, 9);
        rows[1].features.player.market_value = u64::MAX;
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let err = save_rows(&mut conn, &rows).unwrap_err();
        assert!(err.to_string().contains("market_value"));

        let mut rows = synthetic::generate(3, 9);
        rows[0].features.club_budget = u64::MAX;
        let err = save_rows(&mut conn, &rows).unwrap_err();
        assert!(err.to_string().contains("club_budget"));
    }

    #[test]
    fn table_columns_are_ordered() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let stmt = conn.prepare("SELECT * FROM transfer_rows").unwrap();
        let names: Vec<&str> = stmt.column_names();
        assert_eq!(names, column_names());
    }
}
