use std::collections::HashSet;

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{
    db::{
        queries::{categories, questions},
        Question,
    },
    quiz::pick_unseen,
    server::{app::AppState, deserializers::Stri64, error::ApiResponse, extract::JsonBody},
    telemetry::QUIZ_QUESTIONS_SERVED,
};

// the "All" entry of the quiz page
const ALL_CATEGORIES: i64 = 0;

#[derive(Deserialize)]
struct QuizRequest {
    #[serde(default)]
    previous_questions: Vec<Stri64>,
    quiz_category: Option<QuizCategory>,
}

#[derive(Deserialize)]
struct QuizCategory {
    id: Stri64,
}

#[derive(Serialize)]
struct QuizQuestion {
    success: bool,
    question: Option<Question>,
}

/// Replies with `question: null` once the category has nothing left to show.
async fn next_question(
    State(pool): State<SqlitePool>,
    JsonBody(request): JsonBody<QuizRequest>,
) -> ApiResponse<Json<QuizQuestion>> {
    let category = match request.quiz_category.map(|c| c.id.0) {
        None | Some(ALL_CATEGORIES) => None,
        Some(id) => Some(categories::get_category(&pool, id).await?.id),
    };
    let candidates = questions::get_questions_in(&pool, category).await?;
    let previous: HashSet<i64> = request.previous_questions.into_iter().map(i64::from).collect();

    let question = pick_unseen(&candidates, &previous, &mut rand::thread_rng()).cloned();

    let label = category.map_or_else(|| "all".to_owned(), |id| id.to_string());
    match &question {
        Some(q) => {
            QUIZ_QUESTIONS_SERVED.with_label_values(&[label.as_str()]).inc();
            tracing::debug!(id = q.id, category = %label, "Picked quiz question");
        }
        None => tracing::debug!(category = %label, seen = previous.len(), "Quiz exhausted"),
    }

    Ok(Json(QuizQuestion {
        success: true,
        question,
    }))
}

pub fn quizzes_router() -> Router<AppState> {
    Router::new().route("/quizzes", post(next_question))
}
