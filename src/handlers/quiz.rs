//! "Who's that Pokémon?" quiz handlers

use axum::{extract::State, Json};
use rand::seq::SliceRandom;
use validator::Validate;

use crate::{AppState, AppResult, AppError};
use crate::models::{Pokemon, QuizOption, QuizQuestion, QuizScore, ScoreInfo, SubmitScore};

const WRONG_OPTIONS: i64 = 3;
const LEADERBOARD_SIZE: i64 = 20;

/// Random question with shuffled options
pub async fn question(State(state): State<AppState>) -> AppResult<Json<QuizQuestion>> {
    let correct = Pokemon::random(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("No Pokemon available".to_string()))?;

    let wrong = Pokemon::random_excluding(&state.pool, correct.id, WRONG_OPTIONS).await?;

    let mut options: Vec<QuizOption> = std::iter::once(&correct)
        .chain(wrong.iter())
        .map(|p| QuizOption { id: p.id, name: p.name.clone() })
        .collect();
    options.shuffle(&mut rand::thread_rng());

    Ok(Json(QuizQuestion {
        pokemon_id: correct.id,
        pokemon_number: correct.number,
        options,
    }))
}

/// Record a finished quiz
pub async fn submit(
    State(state): State<AppState>,
    Json(req): Json<SubmitScore>,
) -> AppResult<Json<serde_json::Value>> {
    req.validate()?;

    let score = QuizScore::create(&state.pool, req).await?;
    tracing::info!("Quiz score recorded: {}/{}", score.score, score.total_questions);

    Ok(Json(serde_json::json!({
        "success": true,
        "score": score.to_info()
    })))
}

pub async fn leaderboard(State(state): State<AppState>) -> AppResult<Json<Vec<ScoreInfo>>> {
    let scores = QuizScore::leaderboard(&state.pool, LEADERBOARD_SIZE).await?;
    Ok(Json(scores.iter().map(QuizScore::to_info).collect()))
}
