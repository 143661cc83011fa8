use std::collections::BTreeMap;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{
    db::{
        queries::{categories, questions},
        NewQuestion, Question,
    },
    pagination::paginate,
    server::{
        app::AppState,
        deserializers::Stri64,
        error::{ApiError, ApiResponse},
        extract::{JsonBody, PathId, QueryParams},
    },
};

use super::{categories_by_id, PageQuery};

const DIFFICULTIES: std::ops::RangeInclusive<i64> = 1..=5;

// POST /questions either creates a question or, when searchTerm is set, searches
#[derive(Deserialize)]
struct QuestionsBody {
    question: Option<String>,
    answer: Option<String>,
    difficulty: Option<Stri64>,
    category: Option<Stri64>,
    #[serde(rename = "searchTerm")]
    search_term: Option<String>,
}

#[derive(Deserialize)]
struct SearchBody {
    #[serde(rename = "searchTerm")]
    search_term: Option<String>,
}

#[derive(Serialize)]
struct QuestionsPage {
    success: bool,
    questions: Vec<Question>,
    total_questions: usize,
    current_category: Option<i64>,
    categories: BTreeMap<i64, String>,
}

#[derive(Serialize)]
struct SearchResults {
    success: bool,
    questions: Vec<Question>,
    total_questions: usize,
    current_category: Option<i64>,
}

#[derive(Serialize)]
struct QuestionCreated {
    success: bool,
    question_id: i64,
    questions: Vec<Question>,
    total_questions: usize,
}

#[derive(Serialize)]
struct QuestionDeleted {
    success: bool,
    deleted_id: i64,
    questions: Vec<Question>,
    total_questions: usize,
}

async fn get_questions(
    State(pool): State<SqlitePool>,
    QueryParams(query): QueryParams<PageQuery>,
) -> ApiResponse<Json<QuestionsPage>> {
    let all = questions::get_all_questions(&pool).await?;
    let page = paginate(&all, query.page());
    if page.is_empty() {
        return Err(ApiError::NotFound);
    }
    Ok(Json(QuestionsPage {
        success: true,
        questions: page.to_vec(),
        total_questions: all.len(),
        current_category: None,
        categories: categories_by_id(categories::get_all_categories(&pool).await?),
    }))
}

async fn delete_question(
    State(pool): State<SqlitePool>,
    PathId(id): PathId<i64>,
    QueryParams(query): QueryParams<PageQuery>,
) -> ApiResponse<Json<QuestionDeleted>> {
    questions::delete_question(&pool, id).await?;
    tracing::info!(id, "Deleted question");

    let all = questions::get_all_questions(&pool).await?;
    Ok(Json(QuestionDeleted {
        success: true,
        deleted_id: id,
        questions: paginate(&all, query.page()).to_vec(),
        total_questions: all.len(),
    }))
}

async fn create_or_search(
    State(pool): State<SqlitePool>,
    QueryParams(query): QueryParams<PageQuery>,
    JsonBody(body): JsonBody<QuestionsBody>,
) -> ApiResponse<Response> {
    if let Some(term) = body.search_term.as_deref().filter(|t| !t.is_empty()) {
        return Ok(search(&pool, term, query.page()).await?.into_response());
    }
    let new_question = validate(body)?;
    let created = create(&pool, new_question, query.page()).await?;
    Ok((StatusCode::CREATED, created).into_response())
}

async fn find_questions(
    State(pool): State<SqlitePool>,
    QueryParams(query): QueryParams<PageQuery>,
    JsonBody(body): JsonBody<SearchBody>,
) -> ApiResponse<Json<SearchResults>> {
    let term = body
        .search_term
        .ok_or_else(|| ApiError::BadRequest("searchTerm is required".to_owned()))?;
    search(&pool, &term, query.page()).await
}

fn validate(body: QuestionsBody) -> ApiResponse<NewQuestion> {
    fn required<T>(value: Option<T>, field: &str) -> ApiResponse<T> {
        value.ok_or_else(|| ApiError::BadRequest(format!("{field} is required")))
    }
    fn non_empty(value: Option<String>, field: &str) -> ApiResponse<String> {
        let value = required(value, field)?;
        if value.trim().is_empty() {
            return Err(ApiError::BadRequest(format!("{field} must not be empty")));
        }
        Ok(value)
    }

    let new_question = NewQuestion {
        question: non_empty(body.question, "question")?,
        answer: non_empty(body.answer, "answer")?,
        difficulty: required(body.difficulty, "difficulty")?.into(),
        category: required(body.category, "category")?.into(),
    };
    if !DIFFICULTIES.contains(&new_question.difficulty) {
        return Err(ApiError::Unprocessable(format!(
            "difficulty {} is out of range",
            new_question.difficulty
        )));
    }
    Ok(new_question)
}

async fn create(
    pool: &SqlitePool,
    new_question: NewQuestion,
    page: i64,
) -> ApiResponse<Json<QuestionCreated>> {
    if let Err(e) = categories::get_category(pool, new_question.category).await {
        return Err(match e {
            sqlx::Error::RowNotFound => ApiError::Unprocessable(format!(
                "category {} does not exist",
                new_question.category
            )),
            e => e.into(),
        });
    }
    let id = questions::create_question(pool, &new_question).await?;
    tracing::info!(id, category = new_question.category, "Created question");

    let all = questions::get_all_questions(pool).await?;
    Ok(Json(QuestionCreated {
        success: true,
        question_id: id,
        questions: paginate(&all, page).to_vec(),
        total_questions: all.len(),
    }))
}

async fn search(pool: &SqlitePool, term: &str, page: i64) -> ApiResponse<Json<SearchResults>> {
    let found = questions::search_questions(pool, term).await?;
    tracing::debug!(term, found = found.len(), "Searched questions");
    Ok(Json(SearchResults {
        success: true,
        questions: paginate(&found, page).to_vec(),
        total_questions: found.len(),
        current_category: None,
    }))
}

pub fn questions_router() -> Router<AppState> {
    Router::new()
        .route("/questions", get(get_questions).post(create_or_search))
        .route("/questions/find", post(find_questions))
        .route("/questions/{id}", delete(delete_question))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(json: serde_json::Value) -> QuestionsBody {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn validate_accepts_complete_body() {
        let new_question = validate(body(serde_json::json!({
            "question": "Who discovered electricity?",
            "answer": "Benjamin Franklin",
            "difficulty": "3",
            "category": 1
        })))
        .unwrap();
        assert_eq!(new_question.difficulty, 3);
        assert_eq!(new_question.category, 1);
    }

    #[test]
    fn validate_requires_every_field() {
        let complete = serde_json::json!({
            "question": "q", "answer": "a", "difficulty": 1, "category": 1
        });
        for field in ["question", "answer", "difficulty", "category"] {
            let mut partial = complete.clone();
            partial.as_object_mut().unwrap().remove(field);
            let err = validate(body(partial)).unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST, "missing {field}");
        }
    }

    #[test]
    fn validate_rejects_blank_text() {
        let err = validate(body(serde_json::json!({
            "question": "  ", "answer": "a", "difficulty": 1, "category": 1
        })))
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn validate_rejects_difficulty_out_of_range() {
        let err = validate(body(serde_json::json!({
            "question": "q", "answer": "a", "difficulty": 9, "category": 1
        })))
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
