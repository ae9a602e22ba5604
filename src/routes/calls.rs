use axum::extract::{Query, State};
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    dialer::CallRequest,
    error::{AppError, AppResult},
    models::{CallRecord, NewCallRecord, CALL_STATUS_CALLING},
    prompts::{render_prompt, PromptContext},
    schema::calls,
    state::AppState,
};

const CALL_LIST_LIMIT: i64 = 50;

#[derive(Deserialize)]
pub struct CallListQuery {
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct CallResponse {
    pub id: Uuid,
    pub lead_id: Option<Uuid>,
    pub bland_call_id: Option<String>,
    pub status: String,
    pub outcome: Option<String>,
    pub transcript: Option<String>,
    pub duration_seconds: Option<i32>,
    pub sentiment: Option<String>,
    pub objection: Option<String>,
    pub interest_level: Option<String>,
    pub summary: Option<String>,
    pub conversion_flag: bool,
    pub meeting_time: Option<String>,
    pub created_at: String,
}

impl From<CallRecord> for CallResponse {
    fn from(record: CallRecord) -> Self {
        Self {
            id: record.id,
            lead_id: record.lead_id,
            bland_call_id: record.bland_call_id,
            status: record.status,
            outcome: record.outcome,
            transcript: record.transcript,
            duration_seconds: record.duration_seconds,
            sentiment: record.sentiment,
            objection: record.objection,
            interest_level: record.interest_level,
            summary: record.summary,
            conversion_flag: record.conversion_flag,
            meeting_time: record.meeting_time,
            created_at: record.created_at.and_utc().to_rfc3339(),
        }
    }
}

pub async fn list_calls(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<CallListQuery>,
) -> AppResult<Json<Vec<CallResponse>>> {
    let mut conn = state.db()?;

    let mut db_query = calls::table
        .order(calls::created_at.desc())
        .limit(CALL_LIST_LIMIT)
        .into_boxed();
    if let Some(status) = query.status.filter(|s| s != "all") {
        db_query = db_query.filter(calls::status.eq(status));
    }

    let rows: Vec<CallRecord> = db_query.load(&mut conn)?;
    Ok(Json(rows.into_iter().map(CallResponse::from).collect()))
}

#[derive(Deserialize)]
pub struct TestCallRequest {
    pub phone: String,
    #[serde(default)]
    pub prompt_name: Option<String>,
}

#[derive(Serialize)]
pub struct TestCallResponse {
    pub call_id: String,
    pub record_id: Uuid,
}

/// Places an ad-hoc call outside any campaign. The call record has no lead
/// reference, and because the webhook resolves a lead before doing anything
/// else, results for these calls are acknowledged but not ingested; the
/// record stays in `calling`.
pub async fn test_call(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<TestCallRequest>,
) -> AppResult<Json<TestCallResponse>> {
    let phone = payload.phone.trim().to_string();
    if phone.is_empty() {
        return Err(AppError::bad_request("phone must not be empty"));
    }

    let prompt_name = payload.prompt_name.as_deref().unwrap_or("default");
    let prompt = render_prompt(
        state.prompts.as_ref(),
        prompt_name,
        &PromptContext {
            phone: Some(phone.clone()),
            ..PromptContext::default()
        },
    );

    let request = CallRequest {
        phone_number: phone,
        task: prompt,
        model: "base".to_string(),
        voice_id: state.config.voice_id.clone(),
        callback_url: state.config.callback_url.clone(),
    };

    let call_id = state
        .dialer
        .place_call(&request)
        .await
        .map_err(AppError::bad_gateway)?;

    let record = NewCallRecord {
        id: Uuid::new_v4(),
        lead_id: None,
        bland_call_id: Some(call_id.clone()),
        status: CALL_STATUS_CALLING.to_string(),
    };
    let mut conn = state.db()?;
    diesel::insert_into(calls::table)
        .values(&record)
        .execute(&mut conn)?;

    Ok(Json(TestCallResponse {
        call_id,
        record_id: record.id,
    }))
}
