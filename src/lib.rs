pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod request_logger;
pub mod routes;

use crate::auth::{AuthConfig, AuthState, CredentialStore, JwtService, PasswordService};
use crate::db::ClinicDb;
use crate::request_logger::RequestLogger;
use crate::routes::uploads::UploadConfig;
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket, routes};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_db_pools::Database;
use rocket_okapi::{
    openapi_get_routes,
    rapidoc::{GeneralConfig, HideShowConfig, RapiDocConfig, make_rapidoc},
    settings::UrlObject,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};
use std::sync::Once;

static LOGGER: Once = Once::new();

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    log::info!("Starting Clinic API Server");

    let upload_config = UploadConfig::from_env();
    upload_config
        .ensure_dirs()
        .expect("Failed to create upload directories");

    // Configure CORS
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![
                Method::Get,
                Method::Post,
                Method::Put,
                Method::Delete,
                Method::Patch,
            ]
            .into_iter()
            .map(From::from)
            .collect(),
        )
        .allow_credentials(true)
        .to_cors()
        .expect("Error creating CORS");

    rocket::build()
        .attach(RequestLogger)
        .attach(ClinicDb::init())
        .attach(cors)
        .manage(upload_config)
        // Run database migrations on startup
        .attach(AdHoc::try_on_ignite("Run Migrations", |rocket| async move {
            match ClinicDb::fetch(&rocket) {
                Some(db) => {
                    let pool = (**db).clone();
                    match db::run_migrations(&pool).await {
                        Ok(_) => {
                            log::info!("database migrations successful");
                            Ok(rocket)
                        }
                        Err(e) => {
                            log::error!("database migrations failed: {}", e);
                            Err(rocket)
                        }
                    }
                }
                None => {
                    log::error!("database pool not available for migrations");
                    Err(rocket)
                }
            }
        }))
        // Clone the pool into managed state for transactional handlers and
        // wire up the auth subsystem around it.
        .attach(AdHoc::try_on_ignite(
            "Manage DB Pool and Auth State",
            |rocket| async move {
                match ClinicDb::fetch(&rocket) {
                    Some(db) => {
                        let pool = (**db).clone();

                        let auth_config = AuthConfig::from_env();
                        let jwt_service = JwtService::from_config(&auth_config);
                        let auth_state = AuthState::new(
                            auth_config,
                            PasswordService::new(),
                            jwt_service,
                            CredentialStore::new(pool.clone()),
                        );

                        Ok(rocket.manage(pool).manage(auth_state))
                    }
                    None => Err(rocket),
                }
            },
        ))
        .mount(
            "/api/v1",
            openapi_get_routes![
                // Health routes
                routes::health::health_check,
                // Auth routes
                auth::routes::register,
                auth::routes::login,
                auth::routes::change_password,
                auth::routes::admin_reset_password,
                // Patient routes
                routes::patients::list_patients,
                routes::patients::get_patient,
                routes::patients::create_patient,
                routes::patients::update_patient,
                routes::patients::delete_patient,
                // Doctor routes
                routes::doctors::list_doctors,
                routes::doctors::get_doctor,
                routes::doctors::create_doctor,
                routes::doctors::update_doctor,
                routes::doctors::delete_doctor,
                // Staff routes
                routes::staff::list_staff,
                routes::staff::get_staff,
                routes::staff::create_staff,
                routes::staff::update_staff,
                routes::staff::delete_staff,
                // Appointment routes
                routes::appointments::list_appointments,
                routes::appointments::get_appointment,
                routes::appointments::create_appointment,
                routes::appointments::update_appointment,
                routes::appointments::delete_appointment,
                // Medical record routes
                routes::medical_records::list_medical_records,
                routes::medical_records::get_medical_record,
                routes::medical_records::create_medical_record,
                routes::medical_records::update_medical_record,
                routes::medical_records::delete_medical_record,
                // Treatment plan routes
                routes::treatment_plans::list_treatment_plans,
                routes::treatment_plans::get_treatment_plan,
                routes::treatment_plans::create_treatment_plan,
                routes::treatment_plans::update_treatment_plan,
                routes::treatment_plans::delete_treatment_plan,
                // Procedure routes
                routes::procedures::list_procedures,
                routes::procedures::get_procedure,
                routes::procedures::create_procedure,
                routes::procedures::update_procedure,
                routes::procedures::delete_procedure,
                // Expense routes
                routes::expenses::list_expenses,
                routes::expenses::get_expense,
                routes::expenses::create_expense,
                routes::expenses::update_expense,
                routes::expenses::delete_expense,
                // Other income routes
                routes::other_incomes::list_other_incomes,
                routes::other_incomes::get_other_income,
                routes::other_incomes::create_other_income,
                routes::other_incomes::update_other_income,
                routes::other_incomes::delete_other_income,
                // Clinical document routes
                routes::clinical_documents::list_clinical_documents,
                routes::clinical_documents::get_clinical_document,
                routes::clinical_documents::create_clinical_document,
                routes::clinical_documents::update_clinical_document,
                routes::clinical_documents::delete_clinical_document,
                // Patient image routes
                routes::patient_images::list_patient_images,
                routes::patient_images::get_patient_image,
                routes::patient_images::create_patient_image,
                routes::patient_images::update_patient_image,
                routes::patient_images::delete_patient_image,
            ],
        )
        // Multipart uploads and raw file retrieval sit outside the OpenAPI
        // document.
        .mount(
            "/api/v1",
            routes![
                routes::uploads::upload_clinical_document,
                routes::uploads::upload_patient_image,
                routes::uploads::get_file,
            ],
        )
        .mount(
            "/api/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../v1/openapi.json".to_owned(),
                ..Default::default()
            }),
        )
        .mount(
            "/api/docs/rapidoc/",
            make_rapidoc(&RapiDocConfig {
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("Clinic API", "../../v1/openapi.json")],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket, Route};
    use rocket_db_pools::sqlx::{self, PgPool};

    use crate::auth::{AuthConfig, AuthState, CredentialStore, JwtService, PasswordService};

    pub use database::{TestDatabase, TestDatabaseError};

    /// Auth state wired for tests: fixed signing key, short TTL.
    pub fn test_auth_state(pool: PgPool) -> AuthState {
        let config = AuthConfig {
            issuer: "clinic-api-test".into(),
            token_ttl_secs: 3600,
            jwt_secret: "super-secret-test-key".into(),
            default_doctor_password: "changeme-clinic".into(),
        };
        let jwt_service = JwtService::from_config(&config);
        AuthState::new(
            config,
            PasswordService::new(),
            jwt_service,
            CredentialStore::new(pool),
        )
    }

    /// Convenience helpers for seeding clinic tables in tests.
    pub struct TestFixtures<'a> {
        pool: &'a PgPool,
    }

    impl<'a> TestFixtures<'a> {
        /// Create a fixture helper bound to the provided pool.
        pub fn new(pool: &'a PgPool) -> Self {
            Self { pool }
        }

        /// Insert a staff row with a pre-hashed password, returning its id.
        pub async fn insert_staff(
            &self,
            full_name: &str,
            email: &str,
            role: &str,
            password_hash: &str,
        ) -> Result<i32, sqlx::Error> {
            sqlx::query_scalar(
                "INSERT INTO staff (full_name, email, password_hash, role) \
                 VALUES ($1, $2, $3, $4) RETURNING staff_id",
            )
            .bind(full_name)
            .bind(email)
            .bind(password_hash)
            .bind(role)
            .fetch_one(self.pool)
            .await
        }

        /// Insert a patient row, returning its id.
        pub async fn insert_patient(
            &self,
            full_name: &str,
            email: &str,
        ) -> Result<i32, sqlx::Error> {
            sqlx::query_scalar(
                "INSERT INTO patients \
                    (full_name, gender, date_of_birth, phone, email) \
                 VALUES ($1, 'Female', '1990-01-15', '555-0100', $2) RETURNING patient_id",
            )
            .bind(full_name)
            .bind(email)
            .fetch_one(self.pool)
            .await
        }

        /// Insert a doctor row without a staff link, returning its id.
        pub async fn insert_unlinked_doctor(
            &self,
            full_name: &str,
            email: &str,
        ) -> Result<i32, sqlx::Error> {
            sqlx::query_scalar(
                "INSERT INTO doctors (full_name, gender, phone, email, hire_date) \
                 VALUES ($1, 'Male', '555-0101', $2, '2024-03-01') RETURNING doctor_id",
            )
            .bind(full_name)
            .bind(email)
            .fetch_one(self.pool)
            .await
        }
    }

    pub mod database {
        use rocket_db_pools::sqlx::postgres::PgPoolOptions;
        use rocket_db_pools::sqlx::{self, PgPool};
        use testcontainers_modules::postgres::Postgres;
        use testcontainers_modules::testcontainers::{
            ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
        };
        use thiserror::Error;

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("migration error: {0}")]
            Migration(#[from] sqlx::migrate::MigrateError),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        /// Ephemeral database factory for integration tests. Each instance
        /// launches its own disposable Postgres container and applies the
        /// crate migrations.
        pub struct TestDatabase {
            pool: Option<PgPool>,
            container: Option<ContainerAsync<Postgres>>,
        }

        impl TestDatabase {
            pub async fn new() -> Result<Self, TestDatabaseError> {
                let container = Postgres::default().start().await?;

                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(5432).await?;
                let url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect(&url)
                    .await?;

                crate::db::MIGRATOR.run(&pool).await?;

                Ok(Self {
                    pool: Some(pool),
                    container: Some(container),
                })
            }

            /// Cloneable connection pool for use in tests and Rocket state.
            pub fn pool(&self) -> &PgPool {
                self.pool.as_ref().expect("test database pool is available")
            }

            /// Convenience method returning a clone of the pooled handle.
            pub fn pool_clone(&self) -> PgPool {
                self.pool().clone()
            }

            /// Close pool connections and tear the container down.
            pub async fn close(mut self) -> Result<(), TestDatabaseError> {
                if let Some(pool) = self.pool.take() {
                    pool.close().await;
                }
                if let Some(container) = self.container.take() {
                    drop(container);
                }
                Ok(())
            }
        }
    }

    /// Builder for constructing Rocket instances tailored for integration tests.
    #[derive(Default)]
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        pg_pool: Option<PgPool>,
        auth_state: Option<AuthState>,
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging disabled.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                mounts: Vec::new(),
                pg_pool: None,
                auth_state: None,
            }
        }

        /// Mount routes under `/api/v1`.
        pub fn mount_api_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/api/v1".to_string(), routes));
            self
        }

        /// Manage a `PgPool` instance for tests that exercise database-backed
        /// routes, along with an [`AuthState`] built around it.
        pub fn manage_pg_pool(mut self, pool: PgPool) -> Self {
            self.auth_state = Some(test_auth_state(pool.clone()));
            self.pg_pool = Some(pool);
            self
        }

        /// Override the managed [`AuthState`].
        pub fn manage_auth_state(mut self, state: AuthState) -> Self {
            self.auth_state = Some(state);
            self
        }

        /// Finish building the Rocket instance.
        pub fn build(self) -> Rocket<Build> {
            let mut rocket = rocket::custom(self.figment);

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(pool) = self.pg_pool {
                rocket = rocket.manage(pool);
            }

            if let Some(state) = self.auth_state {
                rocket = rocket.manage(state);
            }

            rocket
        }

        /// Convenience helper to produce a blocking local client.
        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }

        /// Convenience helper to produce an asynchronous local client.
        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }
}
