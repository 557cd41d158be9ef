//! Value objects for the authentication domain

pub mod account_status;
pub mod email;
pub mod role;
pub mod totp_secret;
pub mod user_id;

pub use account_status::AccountStatus;
pub use email::Email;
pub use role::Role;
pub use totp_secret::{TotpParams, TotpSecret};
pub use user_id::UserId;
