use axum::extract::{Multipart, State};
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    models::{Lead, NewLead, LEAD_STATUS_PENDING},
    schema::leads,
    state::AppState,
};

const LEAD_LIST_LIMIT: i64 = 100;

#[derive(Serialize)]
pub struct LeadResponse {
    pub id: Uuid,
    pub phone: String,
    pub company: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub status: String,
    pub prompt_name: String,
    pub created_at: String,
}

impl From<Lead> for LeadResponse {
    fn from(lead: Lead) -> Self {
        Self {
            id: lead.id,
            phone: lead.phone,
            company: lead.company,
            contact: lead.contact,
            email: lead.email,
            status: lead.status,
            prompt_name: lead.prompt_name,
            created_at: lead.created_at.and_utc().to_rfc3339(),
        }
    }
}

pub async fn list_leads(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> AppResult<Json<Vec<LeadResponse>>> {
    let mut conn = state.db()?;
    let rows: Vec<Lead> = leads::table
        .order(leads::created_at.desc())
        .limit(LEAD_LIST_LIMIT)
        .load(&mut conn)?;
    Ok(Json(rows.into_iter().map(LeadResponse::from).collect()))
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub count: usize,
    pub skipped: usize,
}

#[derive(Debug, Deserialize)]
struct CsvLeadRow {
    phone: String,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    contact: Option<String>,
}

/// Accepts a multipart form with a `file` part (CSV with `phone`, optional
/// `company`/`contact` columns) and an optional `prompt_name` field. Rows
/// without a phone number are skipped, not rejected.
pub async fn upload_leads(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let mut csv_bytes: Option<Vec<u8>> = None;
    let mut prompt_name = "default".to_string();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("invalid multipart body: {err}")))?
    {
        match field.name() {
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::bad_request(format!("failed to read file: {err}")))?;
                csv_bytes = Some(bytes.to_vec());
            }
            Some("prompt_name") => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| AppError::bad_request(format!("invalid prompt_name: {err}")))?;
                if !value.trim().is_empty() {
                    prompt_name = value.trim().to_string();
                }
            }
            _ => {}
        }
    }

    let csv_bytes = csv_bytes.ok_or_else(|| AppError::bad_request("missing file field"))?;

    let mut reader = csv::Reader::from_reader(csv_bytes.as_slice());
    let mut new_leads = Vec::new();
    let mut skipped = 0usize;
    for row in reader.deserialize::<CsvLeadRow>() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                warn!(error = %err, "skipping malformed CSV row");
                skipped += 1;
                continue;
            }
        };
        let phone = row.phone.trim().to_string();
        if phone.is_empty() {
            skipped += 1;
            continue;
        }
        new_leads.push(NewLead {
            id: Uuid::new_v4(),
            phone,
            company: row.company.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()),
            contact: row.contact.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()),
            status: LEAD_STATUS_PENDING.to_string(),
            prompt_name: prompt_name.clone(),
            owner_id: Some(user.user_id),
            is_sample: false,
        });
    }

    let count = new_leads.len();
    if count > 0 {
        let mut conn = state.db()?;
        diesel::insert_into(leads::table)
            .values(&new_leads)
            .execute(&mut conn)?;
    }

    Ok(Json(UploadResponse {
        message: format!("Uploaded {count} leads"),
        count,
        skipped,
    }))
}
