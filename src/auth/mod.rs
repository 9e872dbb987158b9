// Bearer token authentication

pub mod jwks;
pub mod jwt_middleware;
