//! SQLite persistence for result tables.
//!
//! RULE: Only store.rs talks to the database.
//! Simulators never touch it; the caller persists a finished table.
//! A failed run writes nothing beyond its header.

use crate::{
    error::StressResult,
    record::{BucketSwapRecord, MgsShockRecord, ShockHistogram},
    types::RunId,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub struct RunHeader {
    pub run_id: RunId,
    pub simulator: String,
    pub trial_count: u64,
    pub params_json: String,
    pub started_at: DateTime<Utc>,
}

pub struct ResultStore {
    conn: Connection,
}

impl ResultStore {
    pub fn open(path: &str) -> StressResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL on files; an in-memory database reports "memory" and carries on.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> StressResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> StressResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_results.sql"))?;
        Ok(())
    }

    // ── Runs ───────────────────────────────────────────────────

    /// Register a new run and return its id.
    pub fn begin_run<P: Serialize>(
        &self,
        simulator: &str,
        trial_count: u64,
        params: &P,
    ) -> StressResult<RunId> {
        let header = RunHeader {
            run_id: format!("{simulator}-{}", uuid::Uuid::new_v4()),
            simulator: simulator.to_string(),
            trial_count,
            params_json: serde_json::to_string(params)?,
            started_at: Utc::now(),
        };
        self.insert_run(&header)?;
        Ok(header.run_id)
    }

    pub fn insert_run(&self, header: &RunHeader) -> StressResult<()> {
        self.conn.execute(
            "INSERT INTO stress_run (run_id, simulator, trial_count, params_json, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                header.run_id,
                header.simulator,
                header.trial_count as i64,
                header.params_json,
                header.started_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn run_header(&self, run_id: &str) -> StressResult<Option<RunHeader>> {
        let row = self
            .conn
            .query_row(
                "SELECT run_id, simulator, trial_count, params_json, started_at
                 FROM stress_run WHERE run_id = ?1",
                params![run_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((run_id, simulator, trial_count, params_json, started_at)) = row else {
            return Ok(None);
        };
        let started_at = DateTime::parse_from_rfc3339(&started_at)
            .map_err(|e| anyhow::anyhow!("bad started_at for run {run_id}: {e}"))?
            .with_timezone(&Utc);
        Ok(Some(RunHeader {
            run_id,
            simulator,
            trial_count: trial_count as u64,
            params_json,
            started_at,
        }))
    }

    // ── Bucket swap results ────────────────────────────────────

    pub fn append_bucket_swap_records(
        &self,
        run_id: &str,
        records: &[BucketSwapRecord],
    ) -> StressResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO bucket_swap_trial
                 (run_id, seed, swapped_obligors, mean_pd, mean_pd_new,
                  weighted_pd, weighted_pd_new, rwa, rwa_new)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for r in records {
                stmt.execute(params![
                    run_id,
                    r.seed as i64,
                    r.swapped_obligors as i64,
                    r.mean_pd,
                    r.mean_pd_new,
                    r.weighted_pd,
                    r.weighted_pd_new,
                    r.rwa,
                    r.rwa_new,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn bucket_swap_records(&self, run_id: &str) -> StressResult<Vec<BucketSwapRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT seed, swapped_obligors, mean_pd, mean_pd_new,
                    weighted_pd, weighted_pd_new, rwa, rwa_new
             FROM bucket_swap_trial WHERE run_id = ?1
             ORDER BY seed ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(BucketSwapRecord {
                    seed: row.get::<_, i64>(0)? as u64,
                    swapped_obligors: row.get::<_, i64>(1)? as usize,
                    mean_pd: row.get(2)?,
                    mean_pd_new: row.get(3)?,
                    weighted_pd: row.get(4)?,
                    weighted_pd_new: row.get(5)?,
                    rwa: row.get(6)?,
                    rwa_new: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── MGS shock results ──────────────────────────────────────

    pub fn append_mgs_shock_records(
        &self,
        run_id: &str,
        records: &[MgsShockRecord],
    ) -> StressResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO mgs_shock_trial
                 (run_id, seed, shock_median, shock_mean, mean_pd, mean_pd_new,
                  weighted_pd, weighted_pd_new, rwa, rwa_new,
                  shock_m3, shock_m2, shock_m1, shock_0, shock_p1, shock_p2, shock_p3)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                         ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            )?;
            for r in records {
                let c: Vec<i64> = r.histogram.counts().iter().map(|&n| n as i64).collect();
                stmt.execute(params![
                    run_id,
                    r.seed as i64,
                    r.shock_median,
                    r.shock_mean,
                    r.mean_pd,
                    r.mean_pd_new,
                    r.weighted_pd,
                    r.weighted_pd_new,
                    r.rwa,
                    r.rwa_new,
                    c[0], c[1], c[2], c[3], c[4], c[5], c[6],
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn mgs_shock_records(&self, run_id: &str) -> StressResult<Vec<MgsShockRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT seed, shock_median, shock_mean, mean_pd, mean_pd_new,
                    weighted_pd, weighted_pd_new, rwa, rwa_new,
                    shock_m3, shock_m2, shock_m1, shock_0, shock_p1, shock_p2, shock_p3
             FROM mgs_shock_trial WHERE run_id = ?1
             ORDER BY seed ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                let mut counts = [0u64; 7];
                for (i, slot) in counts.iter_mut().enumerate() {
                    *slot = row.get::<_, i64>(9 + i)? as u64;
                }
                Ok(MgsShockRecord {
                    seed: row.get::<_, i64>(0)? as u64,
                    shock_median: row.get(1)?,
                    shock_mean: row.get(2)?,
                    mean_pd: row.get(3)?,
                    mean_pd_new: row.get(4)?,
                    weighted_pd: row.get(5)?,
                    weighted_pd_new: row.get(6)?,
                    rwa: row.get(7)?,
                    rwa_new: row.get(8)?,
                    histogram: ShockHistogram::from_counts(counts),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn trial_count(&self, table: TrialTable, run_id: &str) -> StressResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE run_id = ?1", table.name());
        Ok(self.conn.query_row(&sql, params![run_id], |row| row.get(0))?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialTable {
    BucketSwap,
    MgsShock,
}

impl TrialTable {
    fn name(&self) -> &'static str {
        match self {
            Self::BucketSwap => "bucket_swap_trial",
            Self::MgsShock => "mgs_shock_trial",
        }
    }
}
