//! Integration tests against a migrated PostgreSQL database with pgvector.
//!
//! **IMPORTANT**: These tests require a running database. Run them with
//! `cargo test -p scout-db --features migrations -- --ignored`.

use chrono::NaiveDate;
use scout_db::{
    CandidateDirectory, Database, ExperienceSource, LexicalBackend, StructuredQuery,
    TitleMatchClass, DEFAULT_TEST_DATABASE_URL,
};

async fn setup_test_db() -> Database {
    let _ = dotenvy::dotenv();
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_TEST_DATABASE_URL.to_string());
    let db = Database::connect(&database_url)
        .await
        .expect("Failed to connect to test database");
    #[cfg(feature = "migrations")]
    db.migrate().await.expect("Failed to run migrations");
    db
}

async fn insert_candidate(db: &Database, first_name: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO candidates (first_name) VALUES ($1) RETURNING id")
        .bind(first_name)
        .fetch_one(db.pool())
        .await
        .unwrap()
}

async fn insert_experience(db: &Database, candidate_id: i64, title_en: &str, content: &str) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO candidate_experience
            (candidate_id, position_title, position_title_en, structured_content_en, start_date)
        VALUES ($1, $2, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(candidate_id)
    .bind(title_en)
    .bind(content)
    .bind(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
    .fetch_one(db.pool())
    .await
    .unwrap()
}

async fn cleanup(db: &Database, candidate_id: i64) {
    sqlx::query("DELETE FROM candidates WHERE id = $1")
        .bind(candidate_id)
        .execute(db.pool())
        .await
        .unwrap();
}

fn query(position: &str) -> StructuredQuery {
    StructuredQuery {
        position: position.to_string(),
        description: String::new(),
        skills: vec![],
        experience: None,
        industry: None,
        education: None,
        key_terms: vec![],
        search_text: position.to_lowercase(),
    }
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_fts_ranks_exact_title_first() {
    let db = setup_test_db().await;
    let cid = insert_candidate(&db, "Fts").await;
    let exact = insert_experience(&db, cid, "Zyxwv Accountant", "ledger work").await;
    let partial = insert_experience(&db, cid, "Zyxwv Clerk", "zyxwv accountant support").await;

    let matches = db.lexical.search(&query("Zyxwv Accountant"), 100).await.unwrap();
    let exact_hit = matches.iter().find(|m| m.experience_id == exact).unwrap();
    let partial_hit = matches.iter().find(|m| m.experience_id == partial).unwrap();

    assert_eq!(exact_hit.title_class, TitleMatchClass::Exact);
    assert!(exact_hit.lexical_score > partial_hit.lexical_score);
    assert!(matches.iter().all(|m| (0.0..=1.0).contains(&m.lexical_score)));

    cleanup(&db, cid).await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_suggest_escapes_wildcards() {
    let db = setup_test_db().await;
    let cid = insert_candidate(&db, "Suggest").await;
    insert_experience(&db, cid, "Qwerty_Analyst", "x").await;

    let hits = db.lexical.suggest("qwerty_", 10).await.unwrap();
    assert!(hits.iter().any(|t| t == "Qwerty_Analyst"));
    let none = db.lexical.suggest("qwerty%", 10).await.unwrap();
    assert!(none.is_empty());

    cleanup(&db, cid).await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_profiles_and_paging() {
    let db = setup_test_db().await;
    let cid = insert_candidate(&db, "Paged").await;
    let first = insert_experience(&db, cid, "Engineer", "rust").await;
    let second = insert_experience(&db, cid, "Engineer", "go").await;

    let profiles = db.candidates.profiles(&[cid]).await.unwrap();
    assert_eq!(profiles[&cid].first_name.as_deref(), Some("Paged"));

    let page = db.experiences.experiences_after(first - 1, 2).await.unwrap();
    assert_eq!(page[0].id, first);
    assert_eq!(page[1].id, second);
    assert!(page[0].years_experience.unwrap() > 0.0);

    cleanup(&db, cid).await;
}
