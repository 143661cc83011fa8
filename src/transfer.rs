//! CSV dumps of the question bank, used by the `cli` binary to seed and back up databases.

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};

use crate::db::queries::categories::{get_all_categories, import_categories};
use crate::db::queries::questions::{get_all_questions, import_questions};
use crate::db::{run_migrations, Category, Question};

pub const CATEGORIES_FILE: &str = "categories.csv";
pub const QUESTIONS_FILE: &str = "questions.csv";

fn write_to(path: PathBuf, data: Vec<impl Serialize>) -> anyhow::Result<()> {
    let file = std::fs::File::create(&path)
        .with_context(|| format!("Cannot create {}", path.display()))?;
    let mut wtr = csv::Writer::from_writer(file);
    for line in data {
        wtr.serialize(line)?;
    }
    wtr.flush()?;
    tracing::info!("Wrote {}", path.display());
    Ok(())
}

fn read_from<T: DeserializeOwned>(path: PathBuf) -> anyhow::Result<Vec<T>> {
    let file =
        std::fs::File::open(&path).with_context(|| format!("Cannot open {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);
    let mut out = Vec::new();
    for record in rdr.deserialize() {
        let record: T = record?;
        out.push(record);
    }
    Ok(out)
}

pub async fn export_data(pool: &SqlitePool, path: &Path) -> anyhow::Result<()> {
    let categories = get_all_categories(pool).await?;
    let questions = get_all_questions(pool).await?;
    if !path.exists() {
        std::fs::create_dir_all(path)?
    }
    write_to(path.join(CATEGORIES_FILE), categories)?;
    write_to(path.join(QUESTIONS_FILE), questions)?;
    Ok(())
}

/// Categories go first so questions can reference them.
pub async fn import_data(pool: &SqlitePool, path: &Path) -> anyhow::Result<()> {
    run_migrations(pool).await?;
    let categories: Vec<Category> = read_from(path.join(CATEGORIES_FILE))?;
    let questions: Vec<Question> = read_from(path.join(QUESTIONS_FILE))?;
    import_categories(pool, categories).await?;
    import_questions(pool, questions).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::queries::questions::{create_question, get_question_by_id};
    use crate::db::{test_pool, NewQuestion};

    #[tokio::test]
    async fn exported_bank_imports_into_fresh_database() {
        let source = test_pool().await;
        let id = create_question(
            &source,
            &NewQuestion {
                question: "La Giaconda is better known as what?".to_owned(),
                answer: "Mona Lisa".to_owned(),
                difficulty: 3,
                category: 2,
            },
        )
        .await
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        export_data(&source, dir.path()).await.unwrap();
        assert!(dir.path().join(CATEGORIES_FILE).exists());

        let target = test_pool().await;
        import_data(&target, dir.path()).await.unwrap();
        assert_eq!(
            get_question_by_id(&target, id).await.unwrap(),
            get_question_by_id(&source, id).await.unwrap()
        );
        assert_eq!(
            get_all_categories(&target).await.unwrap(),
            get_all_categories(&source).await.unwrap()
        );
    }

    #[tokio::test]
    async fn import_fails_without_files() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        assert!(import_data(&pool, dir.path()).await.is_err());
    }
}
