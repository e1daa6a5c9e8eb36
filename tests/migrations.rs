use clinic_api::db::MIGRATOR;
use clinic_api::test_support::{TestDatabase, TestDatabaseError};

#[tokio::test]
async fn migrations_create_the_clinic_schema() {
    let test_db = match TestDatabase::new().await {
        Ok(db) => db,
        Err(TestDatabaseError::Container(err)) => {
            eprintln!("skipping migration test: no container runtime available ({err})");
            return;
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    };

    let pool = test_db.pool_clone();

    for table in [
        "staff",
        "doctors",
        "patients",
        "appointments",
        "medical_records",
        "treatment_plans",
        "procedures",
        "expenses",
        "other_incomes",
        "clinical_documents",
        "patient_images",
    ] {
        let present: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = 'public' AND table_name = $1",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .expect("lookup succeeded");

        assert_eq!(present, 1, "table '{table}' should exist after migration");
    }

    // Re-running is a no-op.
    MIGRATOR.run(&pool).await.expect("migrations are idempotent");

    // Email uniqueness is case-insensitive at the schema level.
    sqlx::query(
        "INSERT INTO staff (full_name, email, password_hash, role) \
         VALUES ('A', 'dup@clinic.test', 'x', 'staff')",
    )
    .execute(&pool)
    .await
    .expect("first insert succeeds");

    let duplicate = sqlx::query(
        "INSERT INTO staff (full_name, email, password_hash, role) \
         VALUES ('B', 'DUP@clinic.test', 'x', 'staff')",
    )
    .execute(&pool)
    .await;
    assert!(duplicate.is_err(), "case-variant duplicate email must be rejected");

    test_db.close().await.expect("failed to drop test database");
}
