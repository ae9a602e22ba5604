use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

pub const LEAD_STATUS_PENDING: &str = "pending";
pub const LEAD_STATUS_DIALING: &str = "dialing";
pub const LEAD_STATUS_COMPLETED: &str = "completed";
pub const LEAD_STATUS_FAILED: &str = "failed";

pub const CALL_STATUS_CALLING: &str = "calling";
pub const CALL_STATUS_COMPLETED: &str = "completed";
pub const CALL_STATUS_FAILED: &str = "failed";

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = leads)]
#[diesel(belongs_to(User, foreign_key = owner_id))]
pub struct Lead {
    pub id: Uuid,
    pub phone: String,
    pub company: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub status: String,
    pub prompt_name: String,
    pub bland_call_id: Option<String>,
    pub owner_id: Option<Uuid>,
    pub is_sample: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = leads)]
pub struct NewLead {
    pub id: Uuid,
    pub phone: String,
    pub company: Option<String>,
    pub contact: Option<String>,
    pub status: String,
    pub prompt_name: String,
    pub owner_id: Option<Uuid>,
    pub is_sample: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = calls)]
#[diesel(belongs_to(Lead))]
pub struct CallRecord {
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
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = calls)]
pub struct NewCallRecord {
    pub id: Uuid,
    pub lead_id: Option<Uuid>,
    pub bland_call_id: Option<String>,
    pub status: String,
}
