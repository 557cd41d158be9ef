//! Application layer: use cases and the services they compose

pub mod config;
pub mod lockout;
pub mod login;
pub mod logout;
pub mod refresh;
pub mod token;
pub mod two_factor;
pub mod verification;

pub use config::AuthConfig;
pub use lockout::{FailureRecord, LockoutGuard};
pub use login::{LoginInput, LoginOutput, LoginUseCase};
pub use logout::LogoutUseCase;
pub use refresh::RefreshUseCase;
pub use token::{AccessClaims, TokenPair, TokenService};
pub use two_factor::{EnrollmentStart, TwoFactorManager};
pub use verification::VerificationUseCase;
