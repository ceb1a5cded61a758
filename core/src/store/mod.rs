//! SQLite persistence layer.
//!
//! RULE: Only the store module talks to the database.
//! Loaders, joiners and rules call store methods — they never execute
//! SQL directly. Missing tables or columns surface as database errors
//! (fail fast) rather than silently mislabeling clients.

use crate::{
    error::LabelResult,
    model::{ClientRow, GdcKey},
    types::{ClientId, Period},
};
use rusqlite::{params, Connection};
use std::collections::HashMap;

mod auxiliary;
mod output;

pub use auxiliary::ProdInfoRecord;

pub struct TableStore {
    conn: Connection,
}

impl TableStore {
    /// Open (or create) the table database at `path`.
    pub fn open(path: &str) -> LabelResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance on real files.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> LabelResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> LabelResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_tables.sql"))?;
        Ok(())
    }

    // ── Master feature table ───────────────────────────────────

    pub fn insert_master_row(&self, row: &ClientRow) -> LabelResult<()> {
        self.conn.execute(
            "INSERT INTO master_features (
                client_id, chain_id, period, sector, uf, size_bucket,
                aging_months, take_rate,
                take_rate_lag1, take_rate_lag2, take_rate_lag3,
                revenue, relationship_status,
                complaints_m0, complaints_m1, complaints_m2,
                service_score_m0, service_score_m1, service_score_m2,
                resolution_code_m0, resolution_code_m1, resolution_code_m2,
                satisfaction_m0, satisfaction_m1, satisfaction_m2,
                visits_m0, visits_m1, visits_m2,
                gdc_churn_m0, gdc_churn_m1, gdc_churn_m2,
                gdc_size_l1, gdc_size_l2
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,
                      ?17,?18,?19,?20,?21,?22,?23,?24,?25,?26,?27,?28,?29,?30,
                      ?31,?32,?33)",
            params![
                row.client_id,
                row.chain_id,
                row.period as i64,
                row.sector,
                row.uf,
                row.size_bucket,
                row.aging_months,
                row.take_rate,
                row.take_rate_lag[0],
                row.take_rate_lag[1],
                row.take_rate_lag[2],
                row.revenue,
                row.relationship_status,
                row.complaints[0],
                row.complaints[1],
                row.complaints[2],
                row.service_score[0],
                row.service_score[1],
                row.service_score[2],
                row.resolution_code[0],
                row.resolution_code[1],
                row.resolution_code[2],
                row.satisfaction[0],
                row.satisfaction[1],
                row.satisfaction[2],
                row.visits[0],
                row.visits[1],
                row.visits[2],
                row.gdc_churn[0],
                row.gdc_churn[1],
                row.gdc_churn[2],
                row.gdc_size_l1,
                row.gdc_size_l2,
            ],
        )?;
        Ok(())
    }

    /// Full master feature history, ordered by client then period.
    pub fn master_history(&self) -> LabelResult<Vec<ClientRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT client_id, chain_id, period, sector, uf, size_bucket,
                    aging_months, take_rate,
                    take_rate_lag1, take_rate_lag2, take_rate_lag3,
                    revenue, relationship_status,
                    complaints_m0, complaints_m1, complaints_m2,
                    service_score_m0, service_score_m1, service_score_m2,
                    resolution_code_m0, resolution_code_m1, resolution_code_m2,
                    satisfaction_m0, satisfaction_m1, satisfaction_m2,
                    visits_m0, visits_m1, visits_m2,
                    gdc_churn_m0, gdc_churn_m1, gdc_churn_m2,
                    gdc_size_l1, gdc_size_l2
             FROM master_features
             ORDER BY client_id ASC, period ASC",
        )?;
        let rows = stmt.query_map([], master_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Peer-group attributes for every client on the master table in
    /// `period`, independent of the risk selection.
    pub fn gdc_attributes_for_period(
        &self,
        period: Period,
    ) -> LabelResult<HashMap<ClientId, GdcKey>> {
        let mut stmt = self.conn.prepare(
            "SELECT client_id, sector, uf, size_bucket
             FROM master_features WHERE period = ?1",
        )?;
        let rows = stmt.query_map(params![period as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                (row.get(1)?, row.get(2)?, row.get(3)?),
            ))
        })?;
        rows.collect::<Result<HashMap<_, _>, _>>().map_err(Into::into)
    }

    // ── Churn-risk predictions ─────────────────────────────────

    pub fn insert_prediction(
        &self,
        client_id: &str,
        period: Period,
        score: f64,
    ) -> LabelResult<()> {
        self.conn.execute(
            "INSERT INTO prediction_output (client_id, period, score)
             VALUES (?1, ?2, ?3)",
            params![client_id, period as i64, score],
        )?;
        Ok(())
    }

    pub fn predictions_for_period(
        &self,
        period: Period,
    ) -> LabelResult<Vec<(ClientId, f64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT client_id, score FROM prediction_output
             WHERE period = ?1
             ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![period as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

fn master_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<ClientRow> {
    Ok(ClientRow {
        client_id: row.get(0)?,
        chain_id: row.get(1)?,
        period: row.get::<_, i64>(2)? as Period,
        sector: row.get(3)?,
        uf: row.get(4)?,
        size_bucket: row.get(5)?,
        aging_months: row.get(6)?,
        take_rate: row.get(7)?,
        take_rate_lag: [
            row.get(8)?,
            row.get(9)?,
            row.get(10)?,
            None,
            None,
            None,
        ],
        revenue: row.get(11)?,
        relationship_status: row.get(12)?,
        complaints: [row.get(13)?, row.get(14)?, row.get(15)?],
        service_score: [row.get(16)?, row.get(17)?, row.get(18)?],
        resolution_code: [row.get(19)?, row.get(20)?, row.get(21)?],
        satisfaction: [row.get(22)?, row.get(23)?, row.get(24)?],
        visits: [row.get(25)?, row.get(26)?, row.get(27)?],
        gdc_churn: [row.get(28)?, row.get(29)?, row.get(30)?],
        gdc_size_l1: row.get(31)?,
        gdc_size_l2: row.get(32)?,
        take_rate_delta: [None; 5],
        risk_score: None,
        conc_mix: 0,
        simulations_6m: 0,
        complaints_l3m: None,
        archetype: None,
    })
}
