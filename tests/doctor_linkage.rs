use clinic_api::auth::PasswordService;
use clinic_api::models::StaffRole;
use clinic_api::routes::doctors::{create_doctor, get_doctor, list_doctors};
use clinic_api::test_support::{
    TestDatabase, TestDatabaseError, TestFixtures, TestRocketBuilder, test_auth_state,
};
use rocket::http::{Header, Status};
use rocket::routes;
use serde_json::{Value, json};
use sqlx::PgPool;

async fn provision() -> Option<TestDatabase> {
    match TestDatabase::new().await {
        Ok(db) => Some(db),
        Err(TestDatabaseError::Container(err)) => {
            eprintln!("skipping linkage integration test: no container runtime available ({err})");
            None
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    }
}

/// Seed an owner account and mint a bearer header for it.
async fn owner_bearer(pool: &PgPool) -> Header<'static> {
    let hash = PasswordService::new()
        .hash_password("ownerpass")
        .expect("hash");
    let owner_id = TestFixtures::new(pool)
        .insert_staff("Clinic Owner", "owner@clinic.test", "owner", &hash)
        .await
        .expect("seed owner");

    let token = test_auth_state(pool.clone())
        .jwt_service
        .issue(owner_id, "owner@clinic.test", StaffRole::Owner)
        .expect("mint token");

    Header::new("Authorization", format!("Bearer {}", token.token))
}

#[tokio::test]
async fn doctor_creation_links_a_staff_account_both_ways() {
    let Some(test_db) = provision().await else { return };
    let pool = test_db.pool_clone();
    let owner = owner_bearer(&pool).await;

    let client = TestRocketBuilder::new()
        .manage_pg_pool(pool.clone())
        .mount_api_routes(routes![create_doctor, get_doctor, list_doctors])
        .async_client()
        .await;

    let response = client
        .post("/api/v1/doctors")
        .header(owner.clone())
        .json(&json!({
            "full_name": "Dr. Lena Petrova",
            "gender": "Female",
            "phone": "555-0199",
            "email": "lena.petrova@clinic.test",
            "hire_date": "2025-02-01"
        }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let doctor: Value = response.into_json().await.expect("doctor payload");
    let doctor_id = doctor["doctor_id"].as_i64().unwrap() as i32;
    let staff_id = doctor["staff_id"].as_i64().unwrap() as i32;

    // Staff side of the link.
    let (role, linked_doctor_id, password_hash): (String, Option<i32>, String) =
        sqlx::query_as("SELECT role, doctor_id, password_hash FROM staff WHERE staff_id = $1")
            .bind(staff_id)
            .fetch_one(&pool)
            .await
            .expect("linked staff row");
    assert_eq!(role, "doctor");
    assert_eq!(linked_doctor_id, Some(doctor_id));

    // The account starts with the fixed default credential, hashed.
    assert!(
        PasswordService::new()
            .verify_password("changeme-clinic", &password_hash)
            .expect("verify runs")
    );

    drop(client);
    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn failed_profile_creation_rolls_back_the_staff_account() {
    let Some(test_db) = provision().await else { return };
    let pool = test_db.pool_clone();
    let owner = owner_bearer(&pool).await;

    // A doctor row already using the email forces the profile insert (step
    // after the staff insert) to fail inside the transaction.
    TestFixtures::new(&pool)
        .insert_unlinked_doctor("Dr. Existing", "taken@clinic.test")
        .await
        .expect("seed conflicting doctor");

    let client = TestRocketBuilder::new()
        .manage_pg_pool(pool.clone())
        .mount_api_routes(routes![create_doctor])
        .async_client()
        .await;

    let response = client
        .post("/api/v1/doctors")
        .header(owner.clone())
        .json(&json!({
            "full_name": "Dr. Duplicate",
            "gender": "Male",
            "phone": "555-0111",
            "email": "taken@clinic.test",
            "hire_date": "2025-02-01"
        }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Conflict);

    // No residual staff row survived the rollback.
    let staff_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM staff WHERE email = 'taken@clinic.test'")
            .fetch_one(&pool)
            .await
            .expect("count staff");
    assert_eq!(staff_count, 0);

    // Only the pre-existing doctor row remains.
    let doctor_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM doctors WHERE email = 'taken@clinic.test'")
            .fetch_one(&pool)
            .await
            .expect("count doctors");
    assert_eq!(doctor_count, 1);

    drop(response);
    drop(client);
    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn conflicting_staff_email_leaves_no_doctor_row() {
    let Some(test_db) = provision().await else { return };
    let pool = test_db.pool_clone();
    let owner = owner_bearer(&pool).await;

    let hash = PasswordService::new().hash_password("x").expect("hash");
    TestFixtures::new(&pool)
        .insert_staff("Front Desk", "frontdesk@clinic.test", "staff", &hash)
        .await
        .expect("seed staff");

    let client = TestRocketBuilder::new()
        .manage_pg_pool(pool.clone())
        .mount_api_routes(routes![create_doctor])
        .async_client()
        .await;

    let response = client
        .post("/api/v1/doctors")
        .header(owner.clone())
        .json(&json!({
            "full_name": "Dr. Collision",
            "gender": "Female",
            "phone": "555-0122",
            "email": "frontdesk@clinic.test",
            "hire_date": "2025-02-01"
        }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Conflict);

    let doctor_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM doctors WHERE email = 'frontdesk@clinic.test'")
            .fetch_one(&pool)
            .await
            .expect("count doctors");
    assert_eq!(doctor_count, 0);

    drop(response);
    drop(client);
    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn missing_required_doctor_fields_fail_before_any_write() {
    let Some(test_db) = provision().await else { return };
    let pool = test_db.pool_clone();
    let owner = owner_bearer(&pool).await;

    let client = TestRocketBuilder::new()
        .manage_pg_pool(pool.clone())
        .mount_api_routes(routes![create_doctor])
        .async_client()
        .await;

    let response = client
        .post("/api/v1/doctors")
        .header(owner.clone())
        .json(&json!({
            "full_name": "Dr. Incomplete",
            "gender": "  ",
            "phone": "555-0133",
            "email": "incomplete@clinic.test",
            "hire_date": "2025-02-01"
        }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    let staff_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM staff WHERE email = 'incomplete@clinic.test'")
            .fetch_one(&pool)
            .await
            .expect("count staff");
    assert_eq!(staff_count, 0);

    drop(response);
    drop(client);
    test_db.close().await.expect("failed to drop test database");
}
