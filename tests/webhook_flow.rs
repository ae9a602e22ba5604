mod common;

use anyhow::{anyhow, Context, Result};
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_vec, TestApp};
use diesel::prelude::*;
use outdial::models::{CallRecord, Lead, NewCallRecord};
use outdial::schema::{calls, leads};
use outdial::workers::analysis::run_backlog_sweep;
use std::sync::Arc;
use uuid::Uuid;

const CONVERSION_TRANSCRIPT: &str =
    "Sure, my email is dana@acme.example, let's meet tomorrow at 3:00 to go over it.";

/// Seeds a lead mid-call: status `dialing`, correlation id set, and a
/// matching call record in status `calling`.
async fn seed_dialed_lead(app: &TestApp, call_id: &str) -> Result<Uuid> {
    let lead_id = app.insert_lead("+15551234567", "dialing").await?;
    let call_id = call_id.to_string();
    app.with_conn(move |conn| {
        diesel::update(leads::table.find(lead_id))
            .set(leads::bland_call_id.eq(&call_id))
            .execute(conn)
            .context("failed to set correlation id")?;
        let record = NewCallRecord {
            id: Uuid::new_v4(),
            lead_id: Some(lead_id),
            bland_call_id: Some(call_id),
            status: "calling".to_string(),
        };
        diesel::insert_into(calls::table)
            .values(&record)
            .execute(conn)
            .context("failed to insert call record")?;
        Ok(lead_id)
    })
    .await
}

async fn load_lead(app: &TestApp, lead_id: Uuid) -> Result<Lead> {
    app.with_conn(move |conn| {
        leads::table
            .find(lead_id)
            .first::<Lead>(conn)
            .map_err(|err| anyhow!("lead not found: {err}"))
    })
    .await
}

async fn load_call(app: &TestApp, call_id: &str) -> Result<CallRecord> {
    let call_id = call_id.to_string();
    app.with_conn(move |conn| {
        calls::table
            .filter(calls::bland_call_id.eq(&call_id))
            .first::<CallRecord>(conn)
            .map_err(|err| anyhow!("call record not found: {err}"))
    })
    .await
}

#[tokio::test]
async fn unknown_correlation_id_is_acknowledged_without_mutation() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return Ok(());
    };

    let lead_id = app.insert_lead("+15550009999", "pending").await?;

    let response = app
        .post_json(
            "/api/webhook",
            &serde_json::json!({
                "call_id": "call-never-issued",
                "status": "interested",
                "transcript": "hello",
                "duration": 42,
            }),
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value =
        serde_json::from_slice(&body_to_vec(response.into_body()).await?)?;
    assert_eq!(body["status"], "ok");

    let lead = load_lead(&app, lead_id).await?;
    assert_eq!(lead.status, "pending");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn completed_call_extracts_conversion_and_notifies() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return Ok(());
    };

    let lead_id = seed_dialed_lead(&app, "call-77").await?;

    let response = app
        .post_json(
            "/api/webhook",
            &serde_json::json!({
                "call_id": "call-77",
                "status": "interested",
                "transcript": CONVERSION_TRANSCRIPT,
                "duration": 180,
            }),
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let lead = load_lead(&app, lead_id).await?;
    assert_eq!(lead.status, "completed");
    assert_eq!(lead.email.as_deref(), Some("dana@acme.example"));

    let record = load_call(&app, "call-77").await?;
    assert_eq!(record.status, "completed");
    assert_eq!(record.outcome.as_deref(), Some("interested"));
    assert!(record.conversion_flag);
    assert!(record.meeting_time.is_some());
    assert_eq!(record.duration_seconds, Some(180));
    // Inline analysis ran: conversion forces a hot interest level.
    assert_eq!(record.interest_level.as_deref(), Some("hot"));
    assert!(record.sentiment.is_some());

    assert_eq!(app.notifier.bookings.lock().await.as_slice(), &[lead_id]);
    let follow_ups = app.notifier.follow_ups.lock().await.clone();
    assert_eq!(
        follow_ups,
        vec![(lead_id, "dana@acme.example".to_string())]
    );

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn transcript_without_cues_is_not_a_conversion() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return Ok(());
    };

    let lead_id = seed_dialed_lead(&app, "call-78").await?;

    app.post_json(
        "/api/webhook",
        &serde_json::json!({
            "call_id": "call-78",
            "status": "not_interested",
            "transcript": "Not interested, please stop calling.",
            "duration": 12,
        }),
        None,
    )
    .await?;

    let lead = load_lead(&app, lead_id).await?;
    assert_eq!(lead.status, "completed");
    assert!(lead.email.is_none());

    let record = load_call(&app, "call-78").await?;
    assert!(!record.conversion_flag);
    assert!(record.meeting_time.is_none());
    assert_eq!(record.sentiment.as_deref(), Some("negative"));
    assert_eq!(record.interest_level.as_deref(), Some("cold"));

    assert!(app.notifier.bookings.lock().await.is_empty());
    assert!(app.notifier.follow_ups.lock().await.is_empty());

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn missing_outcome_marks_the_call_failed() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return Ok(());
    };

    let lead_id = seed_dialed_lead(&app, "call-79").await?;

    app.post_json(
        "/api/webhook",
        &serde_json::json!({ "call_id": "call-79" }),
        None,
    )
    .await?;

    let lead = load_lead(&app, lead_id).await?;
    assert_eq!(lead.status, "failed");

    let record = load_call(&app, "call-79").await?;
    assert_eq!(record.status, "failed");
    assert!(record.outcome.is_none());

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn call_without_transcript_gains_no_analytics() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return Ok(());
    };

    seed_dialed_lead(&app, "call-83").await?;

    app.post_json(
        "/api/webhook",
        &serde_json::json!({ "call_id": "call-83", "status": "no_answer" }),
        None,
    )
    .await?;

    let record = load_call(&app, "call-83").await?;
    assert!(record.transcript.is_none(), "absent transcript must stay NULL");
    assert!(record.sentiment.is_none());

    // The sweep must not treat a call with no conversation as backlog.
    let state = Arc::new(app.state.clone());
    assert_eq!(run_backlog_sweep(&state).await?, 0);

    let record = load_call(&app, "call-83").await?;
    assert!(record.sentiment.is_none());
    assert!(record.interest_level.is_none());

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn malformed_payload_gets_a_diagnostic_response() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return Ok(());
    };

    let response = app
        .post_raw(
            "/api/webhook",
            b"{not json".to_vec(),
            "application/json",
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value =
        serde_json::from_slice(&body_to_vec(response.into_body()).await?)?;
    assert_eq!(body["status"], "error");
    assert!(body["error"].is_string());

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn existing_lead_email_is_not_overwritten() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return Ok(());
    };

    let lead_id = seed_dialed_lead(&app, "call-80").await?;
    app.with_conn(move |conn| {
        diesel::update(leads::table.find(lead_id))
            .set(leads::email.eq("original@acme.example"))
            .execute(conn)
            .context("failed to set email")?;
        Ok(())
    })
    .await?;

    app.post_json(
        "/api/webhook",
        &serde_json::json!({
            "call_id": "call-80",
            "status": "interested",
            "transcript": CONVERSION_TRANSCRIPT,
            "duration": 90,
        }),
        None,
    )
    .await?;

    let lead = load_lead(&app, lead_id).await?;
    assert_eq!(lead.email.as_deref(), Some("original@acme.example"));

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn backlog_sweep_fills_missing_analytics_once() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return Ok(());
    };

    // One completed call with a transcript but no analytics, one already
    // analyzed with a sentinel value the sweep must not touch.
    seed_dialed_lead(&app, "call-81").await?;
    seed_dialed_lead(&app, "call-82").await?;
    app.with_conn(|conn| {
        diesel::update(calls::table.filter(calls::bland_call_id.eq("call-81")))
            .set((
                calls::status.eq("completed"),
                calls::transcript.eq("Great, this sounds perfect, very interested."),
                calls::duration_seconds.eq(150),
            ))
            .execute(conn)
            .context("failed to seed unanalyzed call")?;
        diesel::update(calls::table.filter(calls::bland_call_id.eq("call-82")))
            .set((
                calls::status.eq("completed"),
                calls::transcript.eq("Not interested."),
                calls::sentiment.eq("sentinel"),
            ))
            .execute(conn)
            .context("failed to seed analyzed call")?;
        Ok(())
    })
    .await?;

    let state = Arc::new(app.state.clone());
    let analyzed = run_backlog_sweep(&state).await?;
    assert_eq!(analyzed, 1);

    let fresh = load_call(&app, "call-81").await?;
    assert_eq!(fresh.sentiment.as_deref(), Some("positive"));
    assert!(fresh.interest_level.is_some());
    assert!(fresh.summary.is_some());

    let untouched = load_call(&app, "call-82").await?;
    assert_eq!(untouched.sentiment.as_deref(), Some("sentinel"));

    // A second sweep finds nothing left to analyze.
    assert_eq!(run_backlog_sweep(&state).await?, 0);

    app.cleanup().await?;
    Ok(())
}
