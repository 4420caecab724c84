//! Quiz score model

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizScore {
    pub id: Uuid,
    pub nickname: Option<String>,
    pub score: i32,
    pub total_questions: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "score_within_total"))]
pub struct SubmitScore {
    #[validate(range(min = 0))]
    pub score: i32,
    #[serde(default = "default_total")]
    #[validate(range(min = 1, max = 100))]
    pub total: i32,
    #[validate(length(min = 1, max = 50))]
    pub nickname: Option<String>,
}

fn default_total() -> i32 {
    10
}

fn score_within_total(submission: &SubmitScore) -> Result<(), ValidationError> {
    if submission.score > submission.total {
        return Err(ValidationError::new("score_exceeds_total"));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct QuizOption {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct QuizQuestion {
    pub pokemon_id: i32,
    pub pokemon_number: i32,
    pub options: Vec<QuizOption>,
}

#[derive(Debug, Serialize)]
pub struct ScoreInfo {
    pub id: Uuid,
    pub nickname: Option<String>,
    pub score: i32,
    pub total_questions: i32,
    pub percentage: f64,
    pub created_at: DateTime<Utc>,
}

impl QuizScore {
    pub async fn create(pool: &PgPool, data: SubmitScore) -> Result<Self, sqlx::Error> {
        let nickname = data.nickname
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        sqlx::query_as::<_, QuizScore>(
            r#"
            INSERT INTO quiz_scores (id, nickname, score, total_questions)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#
        )
        .bind(Uuid::new_v4())
        .bind(&nickname)
        .bind(data.score)
        .bind(data.total)
        .fetch_one(pool)
        .await
    }

    /// Best named scores by percentage, newest first on ties
    pub async fn leaderboard(pool: &PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, QuizScore>(
            r#"
            SELECT * FROM quiz_scores
            WHERE nickname IS NOT NULL
            ORDER BY (score::float8 / total_questions) DESC, created_at DESC
            LIMIT $1
            "#
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub fn percentage(&self) -> f64 {
        if self.total_questions <= 0 {
            return 0.0;
        }
        (self.score as f64 * 1000.0 / self.total_questions as f64).round() / 10.0
    }

    pub fn to_info(&self) -> ScoreInfo {
        ScoreInfo {
            id: self.id,
            nickname: self.nickname.clone(),
            score: self.score,
            total_questions: self.total_questions,
            percentage: self.percentage(),
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(json: &str) -> SubmitScore {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_total_defaults_to_ten() {
        let s = submission(r#"{"score": 7}"#);
        assert_eq!(s.total, 10);
        tokio_test::assert_ok!(s.validate());
    }

    #[test]
    fn test_score_above_total_rejected() {
        assert!(submission(r#"{"score": 11, "total": 10}"#).validate().is_err());
        assert!(submission(r#"{"score": -1}"#).validate().is_err());
        assert!(submission(r#"{"score": 0, "total": 0}"#).validate().is_err());
        assert!(submission(r#"{"score": 3, "nickname": ""}"#).validate().is_err());
    }

    #[test]
    fn test_percentage() {
        let score = QuizScore {
            id: Uuid::new_v4(),
            nickname: Some("ash".to_string()),
            score: 2,
            total_questions: 3,
            created_at: Utc::now(),
        };
        assert_eq!(score.percentage(), 66.7);
    }
}
