use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::database::models::agency::Agency;
use crate::database::models::bank_account::BankAccount;
use crate::database::models::executive::Executive;
use crate::database::models::expenditure::Expenditure;
use crate::database::models::income::Income;
use crate::database::models::salary::Salary;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, validate_user_middleware};
use crate::state::AppState;

/// The full application router
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security.cors_origins);

    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(auth_public_routes())
        // Protected
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    // Credentials (the session cookie) need explicit origins
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

fn auth_public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/auth/signup", post(auth::signup_post))
        .route("/auth/login", post(auth::login_post))
        .route("/auth/logout", post(auth::logout_post))
        .route("/auth/verify-email", post(auth::verify_email_post))
        .route("/auth/resend-verification", post(auth::resend_verification_post))
        .route("/auth/forgot-password", post(auth::forgot_password_post))
        .route("/auth/reset-password", post(auth::reset_password_post))
        // Onboarding
        .route("/auth/invitations/verify", post(auth::invitation_verify))
        .route("/auth/invitations/accept", post(auth::invitation_accept))
        .route("/auth/magic-link", get(auth::magic_link))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(account_routes())
        .merge(organization_routes())
        .merge(record_routes())
        .merge(admin_routes())
        // Layers run bottom-up: the token is checked before the user is loaded
        .route_layer(middleware::from_fn_with_state(state.clone(), validate_user_middleware))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn account_routes() -> Router<AppState> {
    use axum::routing::put;
    use protected::auth;

    Router::new()
        .route("/api/auth/me", get(auth::me_get))
        .route("/api/auth/profile", put(auth::profile_put))
        .route("/api/auth/password", put(auth::password_put))
        .route("/api/auth/refresh", post(auth::refresh_post))
}

fn organization_routes() -> Router<AppState> {
    use protected::organizations as orgs;

    Router::new()
        .route(
            "/api/organizations",
            get(orgs::organizations_list).post(orgs::organization_create),
        )
        .route(
            "/api/organizations/:id",
            get(orgs::organization_get)
                .put(orgs::organization_update)
                .delete(orgs::organization_delete),
        )
        .route("/api/organizations/:id/children", get(orgs::organization_children))
}

fn record_routes() -> Router<AppState> {
    use protected::resource;

    Router::new()
        .route("/api/agencies", get(resource::list::<Agency>).post(resource::create::<Agency>))
        .route(
            "/api/agencies/:id",
            get(resource::get::<Agency>)
                .put(resource::update::<Agency>)
                .delete(resource::delete::<Agency>),
        )
        .route(
            "/api/executives",
            get(resource::list::<Executive>).post(resource::create::<Executive>),
        )
        .route(
            "/api/executives/:id",
            get(resource::get::<Executive>)
                .put(resource::update::<Executive>)
                .delete(resource::delete::<Executive>),
        )
        .route("/api/income", get(resource::list::<Income>).post(resource::create::<Income>))
        .route(
            "/api/income/:id",
            get(resource::get::<Income>)
                .put(resource::update::<Income>)
                .delete(resource::delete::<Income>),
        )
        .route("/api/income/:id/approve", post(resource::approve::<Income>))
        .route("/api/income/:id/reject", post(resource::reject::<Income>))
        .route(
            "/api/expenditures",
            get(resource::list::<Expenditure>).post(resource::create::<Expenditure>),
        )
        .route(
            "/api/expenditures/:id",
            get(resource::get::<Expenditure>)
                .put(resource::update::<Expenditure>)
                .delete(resource::delete::<Expenditure>),
        )
        .route("/api/expenditures/:id/approve", post(resource::approve::<Expenditure>))
        .route("/api/expenditures/:id/reject", post(resource::reject::<Expenditure>))
        .route(
            "/api/bank-accounts",
            get(resource::list::<BankAccount>).post(resource::create::<BankAccount>),
        )
        .route(
            "/api/bank-accounts/:id",
            get(resource::get::<BankAccount>)
                .put(resource::update::<BankAccount>)
                .delete(resource::delete::<BankAccount>),
        )
        .route("/api/salaries", get(resource::list::<Salary>).post(resource::create::<Salary>))
        .route(
            "/api/salaries/:id",
            get(resource::get::<Salary>)
                .put(resource::update::<Salary>)
                .delete(resource::delete::<Salary>),
        )
        .route("/api/salaries/:id/pay", post(resource::pay))
        .route("/api/finance/summary", get(protected::finance::summary_get))
}

fn admin_routes() -> Router<AppState> {
    use protected::{invitations, users};

    Router::new()
        .route("/api/users", get(users::users_list))
        .route(
            "/api/users/:id",
            get(users::user_get).put(users::user_update).delete(users::user_delete),
        )
        .route(
            "/api/invitations",
            get(invitations::invitations_list).post(invitations::invitation_create),
        )
        .route(
            "/api/invitations/:id",
            get(invitations::invitation_get).delete(invitations::invitation_delete),
        )
        .route("/api/invitations/:id/resend", post(invitations::invitation_resend))
}
