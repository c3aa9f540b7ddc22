use crate::error::AppError;
use crate::models::{FeedbackRecord, InteractionRecord, InteractionStats, NewInteraction};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;
use validator::Validate;

pub async fn init_db(db_url: &str) -> Result<SqlitePool, AppError> {
    info!("Initializing database at: {}", db_url);

    let options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            turn_id TEXT NOT NULL UNIQUE,
            session_id TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            raw_text TEXT NOT NULL,
            detected_language TEXT NOT NULL,
            normalized_text TEXT NOT NULL,
            matched_label TEXT,
            response_text TEXT NOT NULL,
            confidence REAL NOT NULL,
            source TEXT NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_interactions_session ON interactions(session_id, id)")
        .execute(&pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS feedback (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            turn_id TEXT NOT NULL,
            session_id TEXT NOT NULL,
            helpful BOOLEAN NOT NULL,
            comment TEXT,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    info!("Database initialized and migrations applied.");

    Ok(pool)
}

// --- Interactions (append-only) ---

pub async fn insert_interaction(
    pool: &SqlitePool,
    interaction: &NewInteraction,
) -> Result<InteractionRecord, AppError> {
    interaction.validate()?;

    let record = sqlx::query_as::<_, InteractionRecord>(
        r#"
        INSERT INTO interactions (turn_id, session_id, timestamp, raw_text, detected_language,
                                  normalized_text, matched_label, response_text, confidence, source)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id, turn_id, session_id, timestamp, raw_text, detected_language,
                  normalized_text, matched_label, response_text, confidence, source
        "#,
    )
    .bind(&interaction.turn_id)
    .bind(&interaction.session_id)
    .bind(interaction.timestamp)
    .bind(&interaction.raw_text)
    .bind(&interaction.detected_language)
    .bind(&interaction.normalized_text)
    .bind(&interaction.matched_label)
    .bind(&interaction.response_text)
    .bind(interaction.confidence)
    .bind(&interaction.source)
    .fetch_one(pool)
    .await?;

    Ok(record)
}

pub async fn get_session_interactions(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<Vec<InteractionRecord>, AppError> {
    let records = sqlx::query_as::<_, InteractionRecord>(
        r#"
        SELECT id, turn_id, session_id, timestamp, raw_text, detected_language,
               normalized_text, matched_label, response_text, confidence, source
        FROM interactions
        WHERE session_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

pub async fn get_interaction(pool: &SqlitePool, turn_id: &str) -> Result<Option<InteractionRecord>, AppError> {
    let record = sqlx::query_as::<_, InteractionRecord>(
        r#"
        SELECT id, turn_id, session_id, timestamp, raw_text, detected_language,
               normalized_text, matched_label, response_text, confidence, source
        FROM interactions
        WHERE turn_id = ?
        "#,
    )
    .bind(turn_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

// --- Feedback ---

pub async fn insert_feedback(
    pool: &SqlitePool,
    turn_id: &str,
    session_id: &str,
    helpful: bool,
    comment: Option<&str>,
) -> Result<FeedbackRecord, AppError> {
    match get_interaction(pool, turn_id).await? {
        None => return Err(AppError::Validation(format!("Unknown turn: {}", turn_id))),
        Some(turn) if turn.session_id != session_id => {
            return Err(AppError::Validation(format!(
                "Turn {} does not belong to session {}",
                turn_id, session_id
            )));
        }
        Some(_) => {}
    }

    let created_at = Utc::now().timestamp();
    let comment = comment.map(str::trim).filter(|c| !c.is_empty());

    let record = sqlx::query_as::<_, FeedbackRecord>(
        r#"
        INSERT INTO feedback (turn_id, session_id, helpful, comment, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, turn_id, session_id, helpful, comment, created_at
        "#,
    )
    .bind(turn_id)
    .bind(session_id)
    .bind(helpful)
    .bind(comment)
    .bind(created_at)
    .fetch_one(pool)
    .await?;

    Ok(record)
}

pub async fn get_feedback_for_turn(pool: &SqlitePool, turn_id: &str) -> Result<Vec<FeedbackRecord>, AppError> {
    let records = sqlx::query_as::<_, FeedbackRecord>(
        r#"
        SELECT id, turn_id, session_id, helpful, comment, created_at
        FROM feedback
        WHERE turn_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(turn_id)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

// --- Stats ---

pub async fn interaction_stats(pool: &SqlitePool) -> Result<InteractionStats, AppError> {
    let (total_turns, fallback_turns, mean_confidence): (i64, i64, Option<f64>) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COALESCE(SUM(CASE WHEN source = 'fallback' THEN 1 ELSE 0 END), 0),
               AVG(confidence)
        FROM interactions
        "#,
    )
    .fetch_one(pool)
    .await?;

    let (helpful, unhelpful): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(CASE WHEN helpful THEN 1 ELSE 0 END), 0),
               COALESCE(SUM(CASE WHEN helpful THEN 0 ELSE 1 END), 0)
        FROM feedback
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(InteractionStats {
        total_turns,
        fallback_turns,
        mean_confidence,
        helpful,
        unhelpful,
    })
}
