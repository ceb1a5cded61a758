use super::TableStore;
use crate::{
    error::LabelResult,
    types::{ClientId, Period},
};
use rusqlite::params;
use std::collections::HashMap;

/// Product and card-brand mix ratios for one (client, period).
#[derive(Debug, Clone)]
pub struct ProdInfoRecord {
    pub client_id:  ClientId,
    pub period:     Period,
    pub debit_mix:  f64,
    pub credit_mix: f64,
    pub master_mix: f64,
    pub visa_mix:   f64,
}

impl TableStore {
    // ── Product info ───────────────────────────────────────────

    pub fn insert_prod_info(&self, rec: &ProdInfoRecord) -> LabelResult<()> {
        self.conn.execute(
            "INSERT INTO prod_info (
                client_id, period, debit_mix, credit_mix, master_mix, visa_mix
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                rec.client_id,
                rec.period as i64,
                rec.debit_mix,
                rec.credit_mix,
                rec.master_mix,
                rec.visa_mix,
            ],
        )?;
        Ok(())
    }

    pub fn prod_info_for_period(
        &self,
        period: Period,
    ) -> LabelResult<Vec<ProdInfoRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT client_id, period, debit_mix, credit_mix, master_mix, visa_mix
             FROM prod_info WHERE period = ?1",
        )?;
        let rows = stmt.query_map(params![period as i64], |row| {
            Ok(ProdInfoRecord {
                client_id: row.get(0)?,
                period: row.get::<_, i64>(1)? as Period,
                debit_mix: row.get(2)?,
                credit_mix: row.get(3)?,
                master_mix: row.get(4)?,
                visa_mix: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Simulation history ─────────────────────────────────────

    pub fn insert_simulation(
        &self,
        client_id: &str,
        period: Period,
        qtd_simulacoes: i64,
    ) -> LabelResult<()> {
        self.conn.execute(
            "INSERT INTO historico_simulacoes (client_id, period, qtd_simulacoes)
             VALUES (?1, ?2, ?3)",
            params![client_id, period as i64, qtd_simulacoes],
        )?;
        Ok(())
    }

    /// Summed simulation counts per client over [from, to] inclusive.
    pub fn simulation_totals(
        &self,
        from: Period,
        to: Period,
    ) -> LabelResult<HashMap<ClientId, i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT client_id, SUM(qtd_simulacoes)
             FROM historico_simulacoes
             WHERE period >= ?1 AND period <= ?2
             GROUP BY client_id",
        )?;
        let rows = stmt.query_map(params![from as i64, to as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        rows.collect::<Result<HashMap<_, _>, _>>().map_err(Into::into)
    }
}
