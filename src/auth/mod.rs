//! Authentication module: password hashing, JWT access tokens, refresh tokens

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod token;

pub use jwt::{Claims, JwtService};
pub use middleware::{extract_token, AuthContext};
pub use password::PasswordHasher;
pub use token::{generate_refresh_token, hash_token};
