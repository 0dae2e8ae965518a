pub mod auth;
pub mod database;
pub mod error;
pub mod jwt;
pub mod metrics;
pub mod photos;
pub mod storage;
pub mod store;

pub use auth::{AuthService, SessionTokens};
pub use database::{Database, UserChanges};
pub use error::ServiceError;
pub use jwt::{AccessTokenClaims, JwtService, RefreshTokenClaims};
pub use photos::{JobPhotoService, PhotoUpload};
pub use storage::{photo_key, InMemoryPhotoStore, LocalPhotoStore, PhotoStore};
pub use store::{AuthStore, InMemoryAuthStore};
