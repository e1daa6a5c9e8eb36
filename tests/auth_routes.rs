use clinic_api::auth::PasswordService;
use clinic_api::auth::routes::{admin_reset_password, change_password, login, register};
use clinic_api::routes::staff::list_staff;
use clinic_api::test_support::{TestDatabase, TestDatabaseError, TestFixtures, TestRocketBuilder};
use rocket::http::{Header, Status};
use rocket::local::asynchronous::Client;
use rocket::routes;
use serde_json::{Value, json};

async fn provision() -> Option<TestDatabase> {
    match TestDatabase::new().await {
        Ok(db) => Some(db),
        Err(TestDatabaseError::Container(err)) => {
            eprintln!("skipping auth integration test: no container runtime available ({err})");
            None
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    }
}

async fn auth_client(db: &TestDatabase) -> Client {
    TestRocketBuilder::new()
        .manage_pg_pool(db.pool_clone())
        .mount_api_routes(routes![
            register,
            login,
            change_password,
            admin_reset_password,
            list_staff
        ])
        .async_client()
        .await
}

fn bearer(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {token}"))
}

async fn register_account(client: &Client, email: &str, password: &str) -> Value {
    let response = client
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": email,
            "password": password,
            "full_name": "Test Account",
            "phone": "555-0100"
        }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);
    response.into_json().await.expect("register payload")
}

#[tokio::test]
async fn register_returns_token_and_never_leaks_passwords() {
    let Some(test_db) = provision().await else { return };
    let client = auth_client(&test_db).await;

    let body = register_account(&client, "a@x.com", "secret1").await;

    assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["email"], "a@x.com");
    assert_eq!(body["user"]["role"], "staff");
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("password_hash").is_none());

    // Nothing in the stored row keeps the plaintext either.
    let stored_hash: String =
        sqlx::query_scalar("SELECT password_hash FROM staff WHERE email = 'a@x.com'")
            .fetch_one(test_db.pool())
            .await
            .expect("stored row");
    assert_ne!(stored_hash, "secret1");

    drop(client);
    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn duplicate_registration_conflicts_after_normalization() {
    let Some(test_db) = provision().await else { return };
    let client = auth_client(&test_db).await;

    register_account(&client, "nurse@clinic.test", "secret1").await;

    // Same address modulo case and whitespace.
    let response = client
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": "  Nurse@Clinic.TEST ",
            "password": "other-secret",
            "full_name": "Someone Else"
        }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Conflict);

    drop(response);
    drop(client);
    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn login_succeeds_only_with_the_right_password() {
    let Some(test_db) = provision().await else { return };
    let client = auth_client(&test_db).await;

    register_account(&client, "reception@clinic.test", "secret1").await;

    let ok = client
        .post("/api/v1/auth/login")
        .json(&json!({"email": "Reception@Clinic.Test", "password": "secret1"}))
        .dispatch()
        .await;
    assert_eq!(ok.status(), Status::Ok);
    let body: Value = ok.into_json().await.expect("login payload");
    assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["user"].get("password").is_none());

    let wrong_password = client
        .post("/api/v1/auth/login")
        .json(&json!({"email": "reception@clinic.test", "password": "not-it"}))
        .dispatch()
        .await;
    assert_eq!(wrong_password.status(), Status::Unauthorized);

    let unknown_email = client
        .post("/api/v1/auth/login")
        .json(&json!({"email": "ghost@clinic.test", "password": "secret1"}))
        .dispatch()
        .await;
    assert_eq!(unknown_email.status(), Status::Unauthorized);

    drop(wrong_password);
    drop(unknown_email);
    drop(client);
    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn change_password_round_trip() {
    let Some(test_db) = provision().await else { return };
    let client = auth_client(&test_db).await;

    let body = register_account(&client, "medic@clinic.test", "old-secret").await;
    let token = body["access_token"].as_str().unwrap().to_string();

    // Wrong current password is a 400, not a 401.
    let wrong_current = client
        .patch("/api/v1/auth/change-password")
        .header(bearer(&token))
        .json(&json!({"currentPassword": "not-it", "newPassword": "new-secret"}))
        .dispatch()
        .await;
    assert_eq!(wrong_current.status(), Status::BadRequest);

    let changed = client
        .patch("/api/v1/auth/change-password")
        .header(bearer(&token))
        .json(&json!({"currentPassword": "old-secret", "newPassword": "new-secret"}))
        .dispatch()
        .await;
    assert_eq!(changed.status(), Status::Ok);

    let old_login = client
        .post("/api/v1/auth/login")
        .json(&json!({"email": "medic@clinic.test", "password": "old-secret"}))
        .dispatch()
        .await;
    assert_eq!(old_login.status(), Status::Unauthorized);

    let new_login = client
        .post("/api/v1/auth/login")
        .json(&json!({"email": "medic@clinic.test", "password": "new-secret"}))
        .dispatch()
        .await;
    assert_eq!(new_login.status(), Status::Ok);

    drop(wrong_current);
    drop(changed);
    drop(old_login);
    drop(new_login);
    drop(client);
    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn admin_reset_bypasses_the_current_password() {
    let Some(test_db) = provision().await else { return };
    let pool = test_db.pool_clone();
    let client = auth_client(&test_db).await;

    let fixtures = TestFixtures::new(&pool);
    let owner_hash = PasswordService::new()
        .hash_password("ownerpass")
        .expect("hash");
    fixtures
        .insert_staff("Clinic Owner", "owner@clinic.test", "owner", &owner_hash)
        .await
        .expect("seed owner");

    register_account(&client, "locked-out@clinic.test", "forgotten").await;

    let owner_login = client
        .post("/api/v1/auth/login")
        .json(&json!({"email": "owner@clinic.test", "password": "ownerpass"}))
        .dispatch()
        .await;
    assert_eq!(owner_login.status(), Status::Ok);
    let owner_body: Value = owner_login.into_json().await.expect("owner login payload");
    let owner_token = owner_body["access_token"].as_str().unwrap().to_string();

    let reset = client
        .post("/api/v1/auth/admin/reset-password")
        .header(bearer(&owner_token))
        .json(&json!({"email": "locked-out@clinic.test", "newPassword": "recovered"}))
        .dispatch()
        .await;
    assert_eq!(reset.status(), Status::Ok);

    let recovered_login = client
        .post("/api/v1/auth/login")
        .json(&json!({"email": "locked-out@clinic.test", "password": "recovered"}))
        .dispatch()
        .await;
    assert_eq!(recovered_login.status(), Status::Ok);

    let unknown = client
        .post("/api/v1/auth/admin/reset-password")
        .header(bearer(&owner_token))
        .json(&json!({"email": "nobody@clinic.test", "newPassword": "whatever"}))
        .dispatch()
        .await;
    assert_eq!(unknown.status(), Status::NotFound);

    drop(reset);
    drop(recovered_login);
    drop(unknown);
    drop(client);
    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn role_guard_rejects_insufficient_roles() {
    let Some(test_db) = provision().await else { return };
    let pool = test_db.pool_clone();
    let client = auth_client(&test_db).await;

    // A default registration gets the `staff` role.
    let body = register_account(&client, "junior@clinic.test", "secret1").await;
    let staff_token = body["access_token"].as_str().unwrap().to_string();

    // No token at all.
    let anonymous = client.get("/api/v1/staff").dispatch().await;
    assert_eq!(anonymous.status(), Status::Unauthorized);

    // Garbage token.
    let garbage = client
        .get("/api/v1/staff")
        .header(bearer("not-a-jwt"))
        .dispatch()
        .await;
    assert_eq!(garbage.status(), Status::Unauthorized);

    // Valid token, wrong role.
    let forbidden = client
        .get("/api/v1/staff")
        .header(bearer(&staff_token))
        .dispatch()
        .await;
    assert_eq!(forbidden.status(), Status::Forbidden);

    // Owner passes.
    let fixtures = TestFixtures::new(&pool);
    let owner_hash = PasswordService::new()
        .hash_password("ownerpass")
        .expect("hash");
    fixtures
        .insert_staff("Clinic Owner", "owner@clinic.test", "owner", &owner_hash)
        .await
        .expect("seed owner");

    let owner_login = client
        .post("/api/v1/auth/login")
        .json(&json!({"email": "owner@clinic.test", "password": "ownerpass"}))
        .dispatch()
        .await;
    let owner_body: Value = owner_login.into_json().await.expect("owner login payload");
    let owner_token = owner_body["access_token"].as_str().unwrap().to_string();

    let allowed = client
        .get("/api/v1/staff")
        .header(bearer(&owner_token))
        .dispatch()
        .await;
    assert_eq!(allowed.status(), Status::Ok);

    drop(anonymous);
    drop(garbage);
    drop(forbidden);
    drop(allowed);
    drop(client);
    test_db.close().await.expect("failed to drop test database");
}
