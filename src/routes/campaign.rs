use axum::extract::State;
use axum::Json;
use diesel::dsl::count_star;
use diesel::prelude::*;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::AppResult,
    models::{LEAD_STATUS_DIALING, LEAD_STATUS_PENDING},
    schema::{calls, leads},
    state::AppState,
};

#[derive(Serialize)]
pub struct StartCampaignResponse {
    pub message: String,
    pub queued: usize,
}

/// Enqueues every pending lead. Leads stay `pending` until a worker picks
/// them up; re-running this enqueues anything still pending a second time.
pub async fn start_campaign(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> AppResult<Json<StartCampaignResponse>> {
    let lead_ids: Vec<Uuid> = {
        let mut conn = state.db()?;
        leads::table
            .filter(leads::status.eq(LEAD_STATUS_PENDING))
            .order(leads::created_at.asc())
            .select(leads::id)
            .load(&mut conn)?
    };

    for lead_id in &lead_ids {
        state.queue.enqueue(*lead_id);
    }

    info!(queued = lead_ids.len(), "campaign started");
    Ok(Json(StartCampaignResponse {
        message: "Campaign started".to_string(),
        queued: lead_ids.len(),
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignStatusResponse {
    pub is_active: bool,
    pub progress: f64,
    pub pending_count: i64,
    pub dialing_count: i64,
    pub total_count: i64,
    pub queue_depth: usize,
}

pub async fn campaign_status(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> AppResult<Json<CampaignStatusResponse>> {
    let mut conn = state.db()?;

    let total_count: i64 = leads::table.select(count_star()).first(&mut conn)?;
    let pending_count: i64 = leads::table
        .filter(leads::status.eq(LEAD_STATUS_PENDING))
        .select(count_star())
        .first(&mut conn)?;
    let dialing_count: i64 = leads::table
        .filter(leads::status.eq(LEAD_STATUS_DIALING))
        .select(count_star())
        .first(&mut conn)?;

    let queue_depth = state.queue.depth();
    let progress = if total_count == 0 {
        0.0
    } else {
        ((total_count - pending_count) as f64 / total_count as f64 * 1000.0).round() / 10.0
    };

    Ok(Json(CampaignStatusResponse {
        is_active: dialing_count > 0 || queue_depth > 0,
        progress,
        pending_count,
        dialing_count,
        total_count,
        queue_depth,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_leads: i64,
    pub calls_made: i64,
    pub success_rate: f64,
    pub active_calls: i64,
}

pub async fn stats(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> AppResult<Json<StatsResponse>> {
    let mut conn = state.db()?;

    let total_leads: i64 = leads::table.select(count_star()).first(&mut conn)?;
    let calls_made: i64 = calls::table.select(count_star()).first(&mut conn)?;
    let active_calls: i64 = leads::table
        .filter(leads::status.eq(LEAD_STATUS_DIALING))
        .select(count_star())
        .first(&mut conn)?;

    let success_rate = if calls_made > 0 {
        let interested: i64 = calls::table
            .filter(calls::outcome.eq("interested"))
            .select(count_star())
            .first(&mut conn)?;
        (interested as f64 / calls_made as f64 * 1000.0).round() / 10.0
    } else {
        0.0
    };

    Ok(Json(StatsResponse {
        total_leads,
        calls_made,
        success_rate,
        active_calls,
    }))
}
