// handlers/mod.rs - HTTP handlers
//
// public:    no authentication (health, sign-up, login, onboarding)
// protected: session required, mounted under /api behind
//            jwt_auth_middleware + validate_user_middleware

pub mod protected;
pub mod public;
