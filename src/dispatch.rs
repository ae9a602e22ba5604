use std::sync::Arc;

use anyhow::{anyhow, Result};
use diesel::prelude::*;
use tokio::task;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dialer::CallRequest,
    models::{
        Lead, NewCallRecord, CALL_STATUS_CALLING, LEAD_STATUS_DIALING, LEAD_STATUS_FAILED,
    },
    prompts::{render_prompt, PromptContext},
    schema::{calls, leads},
    state::AppState,
};

/// Result of one dispatch attempt. Failures here are terminal for the
/// attempt: nothing is retried or re-queued automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Provider accepted the call and issued a correlation id.
    Dispatched { call_id: String },
    /// The lead was deleted between enqueue and dequeue.
    LeadMissing,
    /// The lead already has an outstanding correlation id.
    AlreadyInFlight,
    /// The dispatch request itself failed; the lead is marked failed.
    Failed,
}

/// Dispatches one lead: load, render prompt, place the call, record the
/// result. Lead update and call-record insert happen in one transaction so
/// a lead is never left in-flight without a matching call record.
pub async fn dispatch_lead(state: &Arc<AppState>, lead_id: Uuid) -> Result<DispatchOutcome> {
    let lead = {
        let state = state.clone();
        task::spawn_blocking(move || load_lead(&state, lead_id))
            .await
            .map_err(|err| anyhow!("dispatch task panicked: {err}"))??
    };

    let Some(lead) = lead else {
        debug!(%lead_id, "lead vanished before dispatch, skipping");
        return Ok(DispatchOutcome::LeadMissing);
    };

    if lead.bland_call_id.is_some() && lead.status == LEAD_STATUS_DIALING {
        warn!(%lead_id, "lead already has a call in flight, skipping dispatch");
        return Ok(DispatchOutcome::AlreadyInFlight);
    }

    if lead.phone.trim().is_empty() {
        warn!(%lead_id, "lead has no phone number, marking failed");
        mark_lead_failed(state, lead_id).await?;
        return Ok(DispatchOutcome::Failed);
    }

    let prompt = render_prompt(
        state.prompts.as_ref(),
        &lead.prompt_name,
        &PromptContext {
            company: lead.company.clone(),
            contact: lead.contact.clone(),
            phone: Some(lead.phone.clone()),
        },
    );

    let request = CallRequest {
        phone_number: lead.phone.clone(),
        task: prompt,
        model: "base".to_string(),
        voice_id: state.config.voice_id.clone(),
        callback_url: state.config.callback_url.clone(),
    };

    match state.dialer.place_call(&request).await {
        Ok(call_id) => {
            let state = state.clone();
            let recorded_id = call_id.clone();
            task::spawn_blocking(move || record_dispatch(&state, lead_id, &recorded_id))
                .await
                .map_err(|err| anyhow!("dispatch task panicked: {err}"))??;
            info!(%lead_id, call_id, "call dispatched");
            Ok(DispatchOutcome::Dispatched { call_id })
        }
        Err(err) => {
            warn!(%lead_id, error = %err, "dispatch request failed");
            mark_lead_failed(state, lead_id).await?;
            Ok(DispatchOutcome::Failed)
        }
    }
}

fn load_lead(state: &AppState, lead_id: Uuid) -> Result<Option<Lead>> {
    let mut conn = state.db().map_err(|err| anyhow!("{err:?}"))?;
    let lead = leads::table
        .find(lead_id)
        .first::<Lead>(&mut conn)
        .optional()?;
    Ok(lead)
}

fn record_dispatch(state: &AppState, lead_id: Uuid, call_id: &str) -> Result<()> {
    let mut conn = state.db().map_err(|err| anyhow!("{err:?}"))?;
    conn.transaction(|conn| {
        diesel::update(leads::table.find(lead_id))
            .set((
                leads::bland_call_id.eq(call_id),
                leads::status.eq(LEAD_STATUS_DIALING),
            ))
            .execute(conn)?;

        let record = NewCallRecord {
            id: Uuid::new_v4(),
            lead_id: Some(lead_id),
            bland_call_id: Some(call_id.to_string()),
            status: CALL_STATUS_CALLING.to_string(),
        };
        diesel::insert_into(calls::table).values(&record).execute(conn)?;
        Ok::<(), diesel::result::Error>(())
    })?;
    Ok(())
}

async fn mark_lead_failed(state: &Arc<AppState>, lead_id: Uuid) -> Result<()> {
    let state = state.clone();
    task::spawn_blocking(move || -> Result<()> {
        let mut conn = state.db().map_err(|err| anyhow!("{err:?}"))?;
        diesel::update(leads::table.find(lead_id))
            .set(leads::status.eq(LEAD_STATUS_FAILED))
            .execute(&mut conn)?;
        Ok(())
    })
    .await
    .map_err(|err| anyhow!("dispatch task panicked: {err}"))?
}
