use std::collections::BTreeMap;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    db::{
        queries::{categories, questions},
        Question,
    },
    pagination::paginate,
    server::{
        app::AppState,
        error::ApiResponse,
        extract::{PathId, QueryParams},
    },
};

use super::{categories_by_id, PageQuery};

#[derive(Serialize)]
struct CategoriesList {
    success: bool,
    categories: BTreeMap<i64, String>,
    total_categories: usize,
}

#[derive(Serialize)]
struct CategoryQuestions {
    success: bool,
    questions: Vec<Question>,
    total_questions: usize,
    current_category: i64,
}

async fn get_categories(State(pool): State<SqlitePool>) -> ApiResponse<Json<CategoriesList>> {
    let categories = categories::get_all_categories(&pool).await?;
    Ok(Json(CategoriesList {
        success: true,
        total_categories: categories.len(),
        categories: categories_by_id(categories),
    }))
}

async fn category_questions(
    State(pool): State<SqlitePool>,
    PathId(id): PathId<i64>,
    QueryParams(query): QueryParams<PageQuery>,
) -> ApiResponse<Json<CategoryQuestions>> {
    let category = categories::get_category(&pool, id).await?;
    let questions = questions::get_questions_for_category(&pool, category.id).await?;
    Ok(Json(CategoryQuestions {
        success: true,
        questions: paginate(&questions, query.page()).to_vec(),
        total_questions: questions.len(),
        current_category: category.id,
    }))
}

pub fn category_router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(get_categories))
        .route("/categories/{id}/questions", get(category_questions))
}
