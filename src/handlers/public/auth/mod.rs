// handlers/public/auth/mod.rs - Public authentication handlers
//
// Token acquisition and account recovery. Nothing here trusts a session;
// every input is validated from scratch.

pub mod invitations; // POST /auth/invitations/{verify,accept}, GET /auth/magic-link
pub mod login;       // POST /auth/login, POST /auth/logout
pub mod password;    // POST /auth/forgot-password, POST /auth/reset-password
pub mod signup;      // POST /auth/signup
pub mod verify;      // POST /auth/verify-email, POST /auth/resend-verification

pub use invitations::{invitation_accept, invitation_verify, magic_link};
pub use login::{login_post, logout_post};
pub use password::{forgot_password_post, reset_password_post};
pub use signup::signup_post;
pub use verify::{resend_verification_post, verify_email_post};
