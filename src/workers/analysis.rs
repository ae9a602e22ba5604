use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use diesel::prelude::*;
use tokio::task;
use tracing::{error, info};
use uuid::Uuid;

use crate::{models::CallRecord, schema::calls, state::AppState};

/// How many analytics-less call records one sweep picks up.
pub const SWEEP_BATCH_SIZE: i64 = 10;

/// Analyzes a bounded batch of completed calls that have a transcript but
/// no analytics yet. Records with a sentiment already set are excluded, so
/// re-running the sweep never rewrites existing analytics.
pub async fn run_backlog_sweep(state: &Arc<AppState>) -> Result<usize> {
    let backlog = {
        let state = state.clone();
        task::spawn_blocking(move || load_backlog(&state))
            .await
            .map_err(|err| anyhow!("sweep task panicked: {err}"))??
    };

    let mut analyzed = 0;
    for record in backlog {
        let Some(transcript) = record.transcript.clone() else {
            continue;
        };
        let duration = record.duration_seconds.unwrap_or(0);
        let analysis = state
            .analyzer
            .analyze(&transcript, duration, record.conversion_flag)
            .await;

        let state = state.clone();
        let record_id = record.id;
        task::spawn_blocking(move || store_analysis(&state, record_id, &analysis))
            .await
            .map_err(|err| anyhow!("sweep task panicked: {err}"))??;
        analyzed += 1;
    }

    if analyzed > 0 {
        info!(analyzed, "analysis backlog sweep finished");
    }
    Ok(analyzed)
}

/// Periodic wrapper around the sweep, spawned at process startup.
pub async fn run_periodic(state: Arc<AppState>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if let Err(err) = run_backlog_sweep(&state).await {
            error!(error = %err, "analysis backlog sweep failed");
        }
    }
}

fn load_backlog(state: &AppState) -> Result<Vec<CallRecord>> {
    let mut conn = state.db().map_err(|err| anyhow!("{err:?}"))?;
    let backlog = calls::table
        .filter(calls::transcript.is_not_null())
        .filter(calls::transcript.ne(""))
        .filter(calls::sentiment.is_null())
        .order(calls::created_at.asc())
        .limit(SWEEP_BATCH_SIZE)
        .load::<CallRecord>(&mut conn)?;
    Ok(backlog)
}

fn store_analysis(
    state: &AppState,
    record_id: Uuid,
    analysis: &crate::analysis::CallAnalysis,
) -> Result<()> {
    let mut conn = state.db().map_err(|err| anyhow!("{err:?}"))?;
    // Guard on sentiment still being null: analytics are written at most once.
    diesel::update(
        calls::table
            .find(record_id)
            .filter(calls::sentiment.is_null()),
    )
    .set((
        calls::sentiment.eq(&analysis.sentiment),
        calls::objection.eq(&analysis.objection),
        calls::interest_level.eq(&analysis.interest_level),
        calls::summary.eq(&analysis.summary),
    ))
    .execute(&mut conn)?;
    Ok(())
}
