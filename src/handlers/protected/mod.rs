// handlers/protected/mod.rs - Session-protected API handlers
//
// Every handler here receives `Extension<AuthUser>` populated by
// validate_user_middleware. Role checks and organization scoping happen in
// the handlers and services themselves.

pub mod auth;          // /api/auth/{me,profile,password,refresh}
pub mod finance;       // /api/finance/summary
pub mod invitations;   // /api/invitations[/:id[/resend]]
pub mod organizations; // /api/organizations[/:id[/children]]
pub mod resource;      // generic CRUD for organization-owned records
pub mod users;         // /api/users[/:id]
