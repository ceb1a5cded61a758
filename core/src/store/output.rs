use super::TableStore;
use crate::{
    error::LabelResult,
    model::{Archetype, ChainRollup, ClientRow, ScoringFrame},
    types::Period,
};
use rusqlite::params;

impl TableStore {
    // ── Labeled features ───────────────────────────────────────

    /// Persist the fully labeled frame for its period, replacing any
    /// previous run's output for the same period. The whole rewrite
    /// runs in one transaction; a failed save leaves the previous
    /// output untouched.
    pub fn save_labeled_features(&self, frame: &ScoringFrame) -> LabelResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM archetypes_features WHERE period = ?1",
            params![frame.period as i64],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO archetypes_features (
                    client_id, chain_id, period, sector, uf, size_bucket,
                    aging_months, take_rate, revenue, relationship_status,
                    complaints_m0, complaints_m1, complaints_m2,
                    service_score_m0, service_score_m1, service_score_m2,
                    resolution_code_m0, resolution_code_m1, resolution_code_m2,
                    satisfaction_m0, satisfaction_m1, satisfaction_m2,
                    visits_m0, visits_m1, visits_m2,
                    gdc_churn_m0, gdc_churn_m1, gdc_churn_m2,
                    gdc_size_l1, gdc_size_l2,
                    take_rate_lag1, take_rate_lag2, take_rate_lag3,
                    take_rate_lag4, take_rate_lag5, take_rate_lag6,
                    take_rate_delta_0, take_rate_delta_1, take_rate_delta_2,
                    take_rate_delta_3, take_rate_delta_4,
                    risk_score, arquetipo, conc_mix, simulations_6m,
                    complaints_l3m
                ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,
                          ?15,?16,?17,?18,?19,?20,?21,?22,?23,?24,?25,?26,
                          ?27,?28,?29,?30,?31,?32,?33,?34,?35,?36,?37,?38,
                          ?39,?40,?41,?42,?43,?44,?45,?46)",
            )?;
            for row in &frame.rows {
                // The fallback rule guarantees completeness; an
                // unlabeled row here means the cascade was not run to
                // the end.
                let arquetipo = row.archetype.map(|a| a.as_str()).ok_or_else(|| {
                    anyhow::anyhow!("unlabeled row for client {}", row.client_id)
                })?;
                stmt.execute(params![
                    row.client_id,
                    row.chain_id,
                    row.period as i64,
                    row.sector,
                    row.uf,
                    row.size_bucket,
                    row.aging_months,
                    row.take_rate,
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
                    row.take_rate_lag[0],
                    row.take_rate_lag[1],
                    row.take_rate_lag[2],
                    row.take_rate_lag[3],
                    row.take_rate_lag[4],
                    row.take_rate_lag[5],
                    row.take_rate_delta[0],
                    row.take_rate_delta[1],
                    row.take_rate_delta[2],
                    row.take_rate_delta[3],
                    row.take_rate_delta[4],
                    row.risk_score,
                    arquetipo,
                    row.conc_mix,
                    row.simulations_6m,
                    row.complaints_l3m,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Full read-back of the labeled output for a period, every
    /// persisted column included.
    pub fn labeled_features(&self, period: Period) -> LabelResult<Vec<ClientRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT client_id, chain_id, period, sector, uf, size_bucket,
                    aging_months, take_rate, revenue, relationship_status,
                    complaints_m0, complaints_m1, complaints_m2,
                    service_score_m0, service_score_m1, service_score_m2,
                    resolution_code_m0, resolution_code_m1, resolution_code_m2,
                    satisfaction_m0, satisfaction_m1, satisfaction_m2,
                    visits_m0, visits_m1, visits_m2,
                    gdc_churn_m0, gdc_churn_m1, gdc_churn_m2,
                    gdc_size_l1, gdc_size_l2,
                    take_rate_lag1, take_rate_lag2, take_rate_lag3,
                    take_rate_lag4, take_rate_lag5, take_rate_lag6,
                    take_rate_delta_0, take_rate_delta_1, take_rate_delta_2,
                    take_rate_delta_3, take_rate_delta_4,
                    risk_score, arquetipo, conc_mix, simulations_6m,
                    complaints_l3m
             FROM archetypes_features
             WHERE period = ?1
             ORDER BY client_id ASC",
        )?;
        let rows = stmt.query_map(params![period as i64], |row| {
            let name: String = row.get(42)?;
            let client = ClientRow {
                client_id: row.get(0)?,
                chain_id: row.get(1)?,
                period: row.get::<_, i64>(2)? as Period,
                sector: row.get(3)?,
                uf: row.get(4)?,
                size_bucket: row.get(5)?,
                aging_months: row.get(6)?,
                take_rate: row.get(7)?,
                revenue: row.get(8)?,
                relationship_status: row.get(9)?,
                complaints: [row.get(10)?, row.get(11)?, row.get(12)?],
                service_score: [row.get(13)?, row.get(14)?, row.get(15)?],
                resolution_code: [row.get(16)?, row.get(17)?, row.get(18)?],
                satisfaction: [row.get(19)?, row.get(20)?, row.get(21)?],
                visits: [row.get(22)?, row.get(23)?, row.get(24)?],
                gdc_churn: [row.get(25)?, row.get(26)?, row.get(27)?],
                gdc_size_l1: row.get(28)?,
                gdc_size_l2: row.get(29)?,
                take_rate_lag: [
                    row.get(30)?,
                    row.get(31)?,
                    row.get(32)?,
                    row.get(33)?,
                    row.get(34)?,
                    row.get(35)?,
                ],
                take_rate_delta: [
                    row.get(36)?,
                    row.get(37)?,
                    row.get(38)?,
                    row.get(39)?,
                    row.get(40)?,
                ],
                risk_score: row.get(41)?,
                conc_mix: row.get(43)?,
                simulations_6m: row.get(44)?,
                complaints_l3m: row.get(45)?,
                archetype: None,
            };
            Ok((client, name))
        })?;

        let mut out = Vec::new();
        for item in rows {
            let (mut client, name) = item?;
            client.archetype = Some(Archetype::from_name(&name).ok_or_else(|| {
                anyhow::anyhow!("Unknown archetype '{name}' in archetypes_features")
            })?);
            out.push(client);
        }
        Ok(out)
    }

    pub fn labeled_feature_count(&self, period: Period) -> LabelResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM archetypes_features WHERE period = ?1",
                params![period as i64],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    pub fn archetype_counts(&self, period: Period) -> LabelResult<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT arquetipo, COUNT(*) FROM archetypes_features
             WHERE period = ?1
             GROUP BY arquetipo
             ORDER BY COUNT(*) DESC, arquetipo ASC",
        )?;
        let rows = stmt.query_map(params![period as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Chain rollup ───────────────────────────────────────────

    pub fn save_chain_rollup(
        &self,
        rollup: &[ChainRollup],
        period: Period,
    ) -> LabelResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM archetypes WHERE period = ?1",
            params![period as i64],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO archetypes (chain_id, period, arquetipo, revenue)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for chain in rollup {
                stmt.execute(params![
                    chain.chain_id,
                    period as i64,
                    chain.archetype.as_str(),
                    chain.revenue,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn chain_rollup(&self, period: Period) -> LabelResult<Vec<ChainRollup>> {
        let mut stmt = self.conn.prepare(
            "SELECT chain_id, arquetipo, revenue FROM archetypes
             WHERE period = ?1
             ORDER BY chain_id ASC",
        )?;
        let rows = stmt.query_map(params![period as i64], |row| {
            let name: String = row.get(1)?;
            Ok((row.get::<_, String>(0)?, name, row.get::<_, f64>(2)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (chain_id, name, revenue) = row?;
            let archetype = Archetype::from_name(&name).ok_or_else(|| {
                anyhow::anyhow!("Unknown archetype '{name}' in archetypes table")
            })?;
            out.push(ChainRollup { chain_id, archetype, revenue });
        }
        Ok(out)
    }
}
