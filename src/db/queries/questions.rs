use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use std::collections::HashSet;

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq)]
pub struct Question {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub difficulty: i64,
    pub category: i64,
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub question: String,
    pub answer: String,
    pub difficulty: i64,
    pub category: i64,
}

pub async fn get_all_questions(pool: &SqlitePool) -> sqlx::Result<Vec<Question>> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, question, answer, difficulty, category FROM questions ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn count_questions(pool: &SqlitePool) -> sqlx::Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM questions")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn get_questions_for_category(
    pool: &SqlitePool,
    category: i64,
) -> sqlx::Result<Vec<Question>> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, question, answer, difficulty, category FROM questions
        WHERE questions.category = ?1
        ORDER BY id
        "#,
    )
    .bind(category)
    .fetch_all(pool)
    .await
}

/// All questions when `category` is `None`.
pub async fn get_questions_in(
    pool: &SqlitePool,
    category: Option<i64>,
) -> sqlx::Result<Vec<Question>> {
    match category {
        Some(id) => get_questions_for_category(pool, id).await,
        None => get_all_questions(pool).await,
    }
}

// LIKE is case-insensitive for ASCII in sqlite; wildcards typed by the user are matched literally
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

pub async fn search_questions(pool: &SqlitePool, term: &str) -> sqlx::Result<Vec<Question>> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, question, answer, difficulty, category FROM questions
        WHERE questions.question LIKE ?1 ESCAPE '\'
        ORDER BY id
        "#,
    )
    .bind(like_pattern(term))
    .fetch_all(pool)
    .await
}

pub async fn get_question_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Question> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, question, answer, difficulty, category FROM questions WHERE questions.id = ?1
        "#,
    )
    .bind(id)
    .fetch_one(pool)
    .await
}

pub async fn create_question(pool: &SqlitePool, question: &NewQuestion) -> sqlx::Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO questions (question, answer, difficulty, category) VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(&question.question)
    .bind(&question.answer)
    .bind(question.difficulty)
    .bind(question.category)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

/// `RowNotFound` when there is no question with this id.
pub async fn delete_question(pool: &SqlitePool, id: i64) -> sqlx::Result<()> {
    let deleted = sqlx::query(
        r#"
        DELETE FROM questions WHERE questions.id = ?1
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();

    if deleted == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

pub async fn import_questions(pool: &SqlitePool, questions: Vec<Question>) -> sqlx::Result<()> {
    let existing_ids: HashSet<i64> = get_all_questions(pool)
        .await?
        .into_iter()
        .map(|q| q.id)
        .collect();
    let new_ids: HashSet<i64> = questions.iter().map(|q| q.id).collect();

    let mut tx = pool.begin().await?;
    for id in existing_ids.difference(&new_ids) {
        sqlx::query("DELETE FROM questions WHERE questions.id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    for question in questions {
        sqlx::query(
            r#"
            INSERT INTO questions (id, question, answer, difficulty, category)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                question = excluded.question,
                answer = excluded.answer,
                difficulty = excluded.difficulty,
                category = excluded.category
            "#,
        )
        .bind(question.id)
        .bind(question.question)
        .bind(question.answer)
        .bind(question.difficulty)
        .bind(question.category)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    tracing::info!(count = new_ids.len(), "Imported questions");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn new_question(text: &str, category: i64) -> NewQuestion {
        NewQuestion {
            question: text.to_owned(),
            answer: "answer".to_owned(),
            difficulty: 2,
            category,
        }
    }

    #[tokio::test]
    async fn created_question_can_be_fetched() {
        let pool = test_pool().await;
        let id = create_question(&pool, &new_question("Who discovered penicillin?", 1))
            .await
            .unwrap();
        let question = get_question_by_id(&pool, id).await.unwrap();
        assert_eq!(question.question, "Who discovered penicillin?");
        assert_eq!(question.category, 1);
        assert_eq!(count_questions(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_category_violates_foreign_key() {
        let pool = test_pool().await;
        let err = create_question(&pool, &new_question("Orphan?", 99))
            .await
            .unwrap_err();
        let db_err = err.as_database_error().expect("database error");
        assert!(db_err.is_foreign_key_violation());
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let pool = test_pool().await;
        let id = create_question(&pool, &new_question("Gone soon?", 2))
            .await
            .unwrap();
        delete_question(&pool, id).await.unwrap();
        assert!(matches!(
            get_question_by_id(&pool, id).await,
            Err(sqlx::Error::RowNotFound)
        ));
        assert!(matches!(
            delete_question(&pool, id).await,
            Err(sqlx::Error::RowNotFound)
        ));
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring() {
        let pool = test_pool().await;
        create_question(&pool, &new_question("Which river flows through Egypt?", 3))
            .await
            .unwrap();
        create_question(&pool, &new_question("What is the capital of Peru?", 3))
            .await
            .unwrap();

        let found = search_questions(&pool, "egypt").await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].question.contains("Egypt"));
    }

    #[tokio::test]
    async fn search_matches_wildcards_literally() {
        let pool = test_pool().await;
        create_question(&pool, &new_question("What is 50% of 10?", 1))
            .await
            .unwrap();
        create_question(&pool, &new_question("Name a snake_case language", 1))
            .await
            .unwrap();

        assert_eq!(search_questions(&pool, "%").await.unwrap().len(), 1);
        assert_eq!(search_questions(&pool, "_").await.unwrap().len(), 1);
        assert_eq!(search_questions(&pool, "").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn questions_filtered_by_category() {
        let pool = test_pool().await;
        create_question(&pool, &new_question("Science one", 1))
            .await
            .unwrap();
        create_question(&pool, &new_question("Art one", 2))
            .await
            .unwrap();
        create_question(&pool, &new_question("Science two", 1))
            .await
            .unwrap();

        let science = get_questions_in(&pool, Some(1)).await.unwrap();
        assert_eq!(science.len(), 2);
        assert!(science.iter().all(|q| q.category == 1));
        assert_eq!(get_questions_in(&pool, None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn import_keeps_given_ids() {
        let pool = test_pool().await;
        create_question(&pool, &new_question("Stale", 1))
            .await
            .unwrap();
        let imported = vec![Question {
            id: 17,
            question: "Imported".to_owned(),
            answer: "yes".to_owned(),
            difficulty: 4,
            category: 5,
        }];
        import_questions(&pool, imported.clone()).await.unwrap();
        assert_eq!(get_all_questions(&pool).await.unwrap(), imported);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(r"50%_\"), r"%50\%\_\\%");
    }
}
