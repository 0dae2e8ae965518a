//! Persistent entities.

mod category;
mod job;
mod job_photo;
mod location;
mod payment;
mod refresh_token;
mod user;

pub use category::Category;
pub use job::{Job, JobDetails};
pub use job_photo::JobPhoto;
pub use location::Location;
pub use payment::Payment;
pub use refresh_token::{RefreshToken, RefreshTokenState};
pub use user::{CurrentUser, NewUser, User, UserResponse};
