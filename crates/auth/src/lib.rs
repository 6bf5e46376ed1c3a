//! `stockroom-auth`: identity, credentials and access policy.
//!
//! Decoupled from HTTP and storage: the API crate feeds it bearer tokens and
//! user records, and gets back principals and yes/no decisions.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod otp;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod user;

pub use authorize::{AuthzError, CommandAuthorization, Principal, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtIssuer, Hs256JwtValidator, JwtValidator, TokenError};
pub use otp::{OtpError, OtpPolicy, OtpRecord, check_rate_limit, generate_code};
pub use password::{MIN_PASSWORD_LEN, PasswordError, hash_password, verify_password};
pub use permissions::Permission;
pub use roles::{Role, role_permissions};
pub use user::{
    ChangePassword, ChangeUserStatus, DeleteUser, PasswordChanged, RegisterUser, USER_AGGREGATE_TYPE, User, UserCommand,
    UserDeleted, UserEvent, UserRegistered, UserStatus, UserStatusChanged, normalize_email,
};
