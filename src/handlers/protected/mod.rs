// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Every route here runs behind `jwt_auth_middleware`, which places the
// requester's `AuthUser` in the request extensions. Board membership is
// checked by the services, not here.

pub mod dashboard;
pub mod users;
