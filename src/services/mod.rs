pub mod account_service;
pub mod finance_service;
pub mod invite_service;
pub mod mailer;
pub mod one_time;
pub mod organization_service;
pub mod user_service;

pub use account_service::AccountService;
pub use invite_service::InviteService;
pub use organization_service::{OrganizationService, Scope};
pub use user_service::UserService;
