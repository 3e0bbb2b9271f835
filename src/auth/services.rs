use lazy_static::lazy_static;
use regex::Regex;

use super::{
    dto::{AuthResponse, PublicUser},
    jwt::JwtKeys,
    repo_types::User,
};

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

/// Signs a fresh access/refresh pair for `user`.
pub(crate) fn issue_tokens(keys: &JwtKeys, user: &User) -> anyhow::Result<AuthResponse> {
    Ok(AuthResponse {
        access_token: keys.sign_access(user.id, &user.username)?,
        refresh_token: keys.sign_refresh(user.id, &user.username)?,
        user: PublicUser {
            id: user.id,
            username: user.username.clone(),
        },
    })
}
