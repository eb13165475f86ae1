use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use domain::services::notifier::Notifier;
use shared::jwt::{JwtConfig, JwtError};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{Config, ConfigValidationError, ServiceKind, ServiceSet};
use crate::middleware::{
    metrics_handler, metrics_middleware, optional_user_auth, rate_limit_middleware,
    require_staff, require_user_auth, security_headers_middleware, trace_id, RateLimiterState,
};
use crate::routes::{
    appointments, auth, exam_results, health, medical_records, medications, notifications, pets,
    prescriptions, schedules, users,
};
use crate::services::{
    EmailService, HttpNotifier, InventoryAlerts, InventoryClient, NotificationClient,
    NotificationDispatcher, SchedulingClient, ServiceClient, SmsService,
};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid JWT configuration: {0}")]
    Jwt(#[from] JwtError),

    #[error("Could not build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Config(#[from] ConfigValidationError),
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    pub services: ServiceSet,
    pub notifier: Arc<dyn Notifier>,
    pub inventory: InventoryClient,
    pub scheduling: SchedulingClient,
    pub dispatcher: NotificationDispatcher,
    pub alerts: InventoryAlerts,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
}

impl AppState {
    pub fn new(config: Config, pool: PgPool) -> Result<Self, StartupError> {
        let config = Arc::new(config);
        let services = config.service_set()?;
        if services.is_empty() {
            return Err(ConfigValidationError::InvalidValue(
                "server.services must name at least one service".to_string(),
            )
            .into());
        }

        let jwt = Arc::new(JwtConfig::from_secret(
            &config.jwt.secret,
            config.jwt.token_expiry_secs,
            config.jwt.leeway_secs,
        )?);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.services.request_timeout_secs))
            .build()?;

        let urls = &config.services;
        let notification_client = NotificationClient::new(ServiceClient::new(
            http.clone(),
            jwt.clone(),
            &urls.notification_url,
            "notification",
        ));
        let inventory = InventoryClient::new(ServiceClient::new(
            http.clone(),
            jwt.clone(),
            &urls.inventory_url,
            "inventory",
        ));
        let scheduling = SchedulingClient::new(ServiceClient::new(
            http.clone(),
            jwt.clone(),
            &urls.scheduling_url,
            "scheduling",
        ));

        let dispatcher = NotificationDispatcher::new(
            EmailService::new(config.email.clone(), http.clone()),
            SmsService::new(config.sms.clone(), http),
            pool.clone(),
        );

        let notifier: Arc<dyn Notifier> = Arc::new(HttpNotifier::new(notification_client));
        let alerts = InventoryAlerts::new(
            pool.clone(),
            notifier.clone(),
            config.stock_alert_recipients(),
        );

        Ok(Self {
            pool,
            rate_limiter: RateLimiterState::new(config.security.rate_limit_per_minute).map(Arc::new),
            config,
            jwt,
            services,
            notifier,
            inventory,
            scheduling,
            dispatcher,
            alerts,
        })
    }

    /// Swaps the outbound alert channel, e.g. for a `MockNotifier` in tests.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.alerts = InventoryAlerts::new(
            self.pool.clone(),
            notifier.clone(),
            self.config.stock_alert_recipients(),
        );
        self.notifier = notifier;
        self
    }
}

pub fn create_app(config: Config, pool: PgPool) -> Result<Router, StartupError> {
    Ok(router(AppState::new(config, pool)?))
}

/// Builds the router for the services enabled in `state.services`.
pub fn router(state: AppState) -> Router {
    let config = state.config.clone();

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    let mut app = Router::new().merge(public_routes);
    if state.services.contains(ServiceKind::Identity) {
        app = app.merge(identity_public_routes(&state));
    }

    let mut protected_routes = Router::new();
    if state.services.contains(ServiceKind::Identity) {
        protected_routes = protected_routes.merge(identity_routes());
    }
    if state.services.contains(ServiceKind::Scheduling) {
        protected_routes = protected_routes.merge(scheduling_routes());
    }
    if state.services.contains(ServiceKind::Medical) {
        protected_routes = protected_routes.merge(medical_routes());
    }
    if state.services.contains(ServiceKind::Inventory) {
        protected_routes = protected_routes.merge(inventory_routes());
    }
    if state.services.contains(ServiceKind::Notification) {
        protected_routes = protected_routes.merge(notification_routes());
    }

    // Rate limiting runs after auth (it keys on the account id)
    let protected_routes = protected_routes
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_user_auth,
        ));

    app.merge(protected_routes)
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}


/// Registration and login. A token, when sent, lets an admin create staff.
fn identity_public_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/verify", post(auth::verify))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            optional_user_auth,
        ))
}

fn identity_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/change-password", put(auth::change_password))
        .route(
            "/auth/profile",
            get(auth::get_profile).put(auth::update_profile),
        )
        .route("/auth/users", get(users::list_users))
        .route("/auth/users/search", get(users::search_users))
        .route("/auth/users/stats", get(users::user_stats))
        .route("/auth/users/veterinarians", get(users::list_veterinarians))
        .route("/auth/users/by-role/:role", get(users::list_by_role))
        .route(
            "/auth/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/auth/users/:id/toggle-status", put(users::toggle_status))
}

fn scheduling_routes() -> Router<AppState> {
    Router::new()
        // Weekly availability
        .route(
            "/appointments/schedules",
            post(schedules::create_schedule).get(schedules::list_schedules),
        )
        .route(
            "/appointments/schedules/veterinarian/:vet_id",
            get(schedules::list_for_veterinarian),
        )
        .route(
            "/appointments/schedules/:id",
            put(schedules::update_schedule).delete(schedules::delete_schedule),
        )
        // Appointments
        .route("/appointments/create", post(appointments::create_appointment))
        .route(
            "/appointments/available-slots",
            get(appointments::available_slots),
        )
        .route("/appointments/today", get(appointments::today))
        .route(
            "/appointments/by-veterinarian/:vet_id",
            get(appointments::by_veterinarian),
        )
        .route(
            "/appointments/by-client/:client_id",
            get(appointments::by_client),
        )
        .route(
            "/appointments/:id",
            get(appointments::get_appointment).put(appointments::update_appointment),
        )
        .route(
            "/appointments/:id/confirm",
            put(appointments::confirm_appointment),
        )
        .route(
            "/appointments/:id/cancel",
            put(appointments::cancel_appointment),
        )
        .route(
            "/appointments/:id/complete",
            put(appointments::complete_appointment),
        )
}

fn medical_routes() -> Router<AppState> {
    Router::new()
        // Pets
        .route("/medical/pets", post(pets::create_pet).get(pets::list_pets))
        .route("/medical/pets/stats", get(pets::pet_stats))
        .route("/medical/pets/owner/:owner_id", get(pets::list_by_owner))
        .route(
            "/medical/pets/:id",
            get(pets::get_pet)
                .put(pets::update_pet)
                .delete(pets::delete_pet),
        )
        // Records
        .route(
            "/medical/records",
            post(medical_records::create_record).get(medical_records::list_records),
        )
        .route(
            "/medical/records/statistics",
            get(medical_records::record_statistics),
        )
        .route(
            "/medical/records/:id",
            get(medical_records::get_record)
                .put(medical_records::update_record)
                .delete(medical_records::delete_record),
        )
        .route(
            "/medical/records/:id/complete",
            put(medical_records::complete_record),
        )
        .route(
            "/medical/records/:id/review",
            put(medical_records::review_record),
        )
        .route(
            "/medical/records/pet/:pet_id",
            get(medical_records::list_by_pet),
        )
        .route(
            "/medical/records/by-veterinarian/:vet_id",
            get(medical_records::list_by_veterinarian),
        )
        .route(
            "/medical/summary/pet/:pet_id",
            get(medical_records::pet_summary),
        )
        // Prescriptions and exams
        .route(
            "/medical/prescriptions",
            post(prescriptions::add_prescription),
        )
        .route(
            "/medical/prescriptions/by-record/:record_id",
            get(prescriptions::list_by_record),
        )
        .route(
            "/medical/prescriptions/:id",
            put(prescriptions::update_prescription).delete(prescriptions::delete_prescription),
        )
        .route(
            "/medical/exam-results",
            post(exam_results::add_exam_result),
        )
        .route(
            "/medical/exam-results/by-record/:record_id",
            get(exam_results::list_by_record),
        )
        .route(
            "/medical/exam-results/:id",
            put(exam_results::update_exam_result).delete(exam_results::delete_exam_result),
        )
}

/// Staff only. `require_staff` reads the caller stored by `require_user_auth`.
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/inventory/medications",
            post(medications::create_medication).get(medications::list_medications),
        )
        .route(
            "/inventory/medications/:id",
            get(medications::get_medication)
                .put(medications::update_medication)
                .delete(medications::deactivate_medication),
        )
        .route(
            "/inventory/medications/:id/movements",
            get(medications::list_movements),
        )
        .route("/inventory/add-stock", post(medications::add_stock))
        .route("/inventory/reduce-stock", post(medications::reduce_stock))
        .route("/inventory/update-stock", put(medications::update_stock))
        .route(
            "/inventory/alerts/low-stock",
            get(medications::low_stock_alerts),
        )
        .route(
            "/inventory/alerts/expiring",
            get(medications::expiring_alerts),
        )
        .route(
            "/inventory/alerts/check-expiration",
            post(medications::check_expiration),
        )
        .route_layer(middleware::from_fn(require_staff))
}

fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications/send", post(notifications::send))
        .route(
            "/notifications/appointment-alert",
            post(notifications::appointment_alert),
        )
        .route(
            "/notifications/stock-alert",
            post(notifications::stock_alert),
        )
        .route(
            "/notifications/user/:user_id",
            get(notifications::list_for_user),
        )
        .route(
            "/notifications/user/:user_id/read-all",
            put(notifications::mark_all_read),
        )
        .route("/notifications/:id/read", put(notifications::mark_read))
}
