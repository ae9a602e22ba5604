use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{
    analysis::INTEREST_HOT,
    error::AppResult,
    models::{CallRecord, Lead, CALL_STATUS_COMPLETED, CALL_STATUS_FAILED,
        LEAD_STATUS_COMPLETED, LEAD_STATUS_FAILED},
    schema::{calls, leads},
    signals::{extract_signals, MEETING_TIME_PENDING},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub call_id: Option<String>,
    /// Outcome label; the provider has used both field names over time.
    #[serde(default, alias = "outcome")]
    pub status: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    /// Duration in seconds; older payloads call this `call_length`.
    #[serde(default, alias = "call_length")]
    pub duration: Option<i32>,
}

fn ack() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Call-completion callback from the voice provider.
///
/// Unknown correlation ids are acknowledged without touching any record:
/// the provider may re-deliver, and a lead may have been deleted since
/// dispatch. Only a payload that fails to parse gets an error back.
pub async fn webhook(
    State(state): State<AppState>,
    payload: Result<Json<WebhookPayload>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "malformed webhook payload");
            return Ok(Json(json!({
                "status": "error",
                "error": rejection.body_text(),
            })));
        }
    };

    let Some(call_id) = payload.call_id.filter(|id| !id.is_empty()) else {
        return Ok(ack());
    };

    let mut conn = state.db()?;

    let lead: Option<Lead> = leads::table
        .filter(leads::bland_call_id.eq(&call_id))
        .first(&mut conn)
        .optional()?;

    let Some(lead) = lead else {
        // Not an error: repeat deliveries and deleted leads both land here.
        info!(call_id, "webhook for unknown correlation id ignored");
        return Ok(ack());
    };

    // Stored as NULL when the provider sent nothing, so the analysis
    // backlog never picks up calls that had no conversation.
    let transcript = payload.transcript.filter(|text| !text.trim().is_empty());
    let signals = extract_signals(transcript.as_deref().unwrap_or(""));
    let meeting_time = signals.conversion.then(|| MEETING_TIME_PENDING.to_string());
    let duration = payload.duration.unwrap_or(0);

    let call_status = if payload.status.is_some() {
        CALL_STATUS_COMPLETED
    } else {
        CALL_STATUS_FAILED
    };
    let lead_status = if payload.status.is_some() {
        LEAD_STATUS_COMPLETED
    } else {
        LEAD_STATUS_FAILED
    };

    conn.transaction(|conn| {
        if let Some(email) = &signals.email {
            if lead.email.is_none() {
                diesel::update(leads::table.find(lead.id))
                    .set(leads::email.eq(email))
                    .execute(conn)?;
            }
        }

        diesel::update(calls::table.filter(calls::bland_call_id.eq(&call_id)))
            .set((
                calls::status.eq(call_status),
                calls::outcome.eq(&payload.status),
                calls::transcript.eq(&transcript),
                calls::duration_seconds.eq(duration),
                calls::conversion_flag.eq(signals.conversion),
                calls::meeting_time.eq(&meeting_time),
            ))
            .execute(conn)?;

        diesel::update(leads::table.find(lead.id))
            .set(leads::status.eq(lead_status))
            .execute(conn)?;

        Ok::<(), diesel::result::Error>(())
    })?;

    if signals.conversion {
        state
            .notifier
            .booking_confirmed(lead.id, MEETING_TIME_PENDING)
            .await;
    }

    // Inline analysis closes the loop for hot-lead follow-up; the batch
    // sweep covers anything this misses.
    if let Some(transcript) = &transcript {
        let record: Option<CallRecord> = calls::table
            .filter(calls::bland_call_id.eq(&call_id))
            .first(&mut conn)
            .optional()?;

        if let Some(record) = record.filter(|record| record.sentiment.is_none()) {
            let analysis = state
                .analyzer
                .analyze(transcript, duration, signals.conversion)
                .await;

            diesel::update(
                calls::table
                    .find(record.id)
                    .filter(calls::sentiment.is_null()),
            )
            .set((
                calls::sentiment.eq(&analysis.sentiment),
                calls::objection.eq(&analysis.objection),
                calls::interest_level.eq(&analysis.interest_level),
                calls::summary.eq(&analysis.summary),
            ))
            .execute(&mut conn)?;

            let email_on_file = signals.email.clone().or(lead.email.clone());
            if analysis.interest_level == INTEREST_HOT {
                if let Some(email) = email_on_file {
                    state.notifier.follow_up_email(lead.id, &email).await;
                }
            }
        }
    }

    Ok(ack())
}
