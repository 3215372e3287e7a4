use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_against_dummy, verify_password},
        repo::{StoreError, UserStore},
    },
    error::{ApiError, REGISTRATION_REJECTED},
};

const BAD_CREDENTIALS: &str = "invalid email or password";
const MAX_NAME_CHARS: usize = 64;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Creates an account and returns a fresh token for it.
pub async fn register(
    users: &dyn UserStore,
    keys: &JwtKeys,
    payload: RegisterRequest,
) -> Result<AuthResponse, ApiError> {
    let RegisterRequest {
        name,
        email,
        password,
    } = payload;
    let name = name.trim().to_string();
    let email = normalize_email(&email);

    if name.is_empty() || name.chars().count() > MAX_NAME_CHARS {
        return Err(ApiError::BadRequest("name must be 1 to 64 characters"));
    }
    if !is_valid_email(&email) {
        warn!("register with invalid email");
        return Err(ApiError::BadRequest("invalid email"));
    }
    if password.is_empty() {
        return Err(ApiError::BadRequest("password must not be empty"));
    }

    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .context("password hashing task")??;

    let created_at = OffsetDateTime::now_utc();
    let id = match users.create_user(&name, &email, &hash, created_at).await {
        Ok(id) => id,
        Err(StoreError::DuplicateEmail) => {
            warn!("register with taken email");
            return Err(ApiError::BadRequest(REGISTRATION_REJECTED));
        }
        Err(e) => return Err(e.into()),
    };

    let token = keys.sign(id)?;

    info!(user_id = id, "user registered");
    Ok(AuthResponse {
        token,
        user: PublicUser {
            id,
            name,
            email,
            created_at,
        },
    })
}

/// Checks credentials and returns a fresh token. Unknown emails and wrong
/// passwords produce the same error.
pub async fn login(
    users: &dyn UserStore,
    keys: &JwtKeys,
    payload: LoginRequest,
) -> Result<AuthResponse, ApiError> {
    let LoginRequest { email, password } = payload;
    let email = normalize_email(&email);

    let user = match users.find_by_email(&email).await {
        Ok(user) => Some(user),
        Err(StoreError::NotFound) => None,
        Err(e) => return Err(e.into()),
    };

    let (user, ok) = match user {
        Some(user) => {
            let hash = user.password_hash.clone();
            let ok = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
                .await
                .context("password verify task")??;
            (Some(user), ok)
        }
        None => {
            tokio::task::spawn_blocking(move || verify_against_dummy(&password))
                .await
                .context("password verify task")?;
            (None, false)
        }
    };

    let user = match (user, ok) {
        (Some(user), true) => user,
        (Some(user), false) => {
            warn!(user_id = user.id, "login with wrong password");
            return Err(ApiError::BadRequest(BAD_CREDENTIALS));
        }
        (None, _) => {
            warn!("login with unknown email");
            return Err(ApiError::BadRequest(BAD_CREDENTIALS));
        }
    };

    let token = keys.sign(user.id)?;

    info!(user_id = user.id, "user logged in");
    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::repo::SqliteUserStore,
        state::test_pool,
    };

    async fn setup() -> (SqliteUserStore, JwtKeys) {
        (
            SqliteUserStore::new(test_pool().await),
            JwtKeys::new(b"service-secret"),
        )
    }

    fn register_req(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("two@@x.com"));
        assert!(!is_valid_email("space in@x.com"));
    }

    #[tokio::test]
    async fn register_stores_hash_and_issues_token() {
        let (users, keys) = setup().await;
        let resp = register(&users, &keys, register_req("A", " A@X.com ", "secret"))
            .await
            .expect("register");

        assert_eq!(resp.user.email, "a@x.com");
        assert_eq!(keys.verify(&resp.token).unwrap(), resp.user.id);

        let stored = users.find_by_id(resp.user.id).await.unwrap();
        assert_ne!(stored.password_hash, "secret");
        assert!(verify_password("secret", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn register_twice_with_same_email_fails() {
        let (users, keys) = setup().await;
        register(&users, &keys, register_req("A", "a@x.com", "secret"))
            .await
            .expect("first register");

        let err = register(&users, &keys, register_req("B", "A@x.com", "other"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(REGISTRATION_REJECTED)));

        let kept = users.find_by_email("a@x.com").await.unwrap();
        assert_eq!(kept.name, "A");
    }

    #[tokio::test]
    async fn register_validates_input() {
        let (users, keys) = setup().await;
        for req in [
            register_req("", "a@x.com", "secret"),
            register_req("   ", "a@x.com", "secret"),
            register_req(&"n".repeat(65), "a@x.com", "secret"),
            register_req("A", "not-an-email", "secret"),
            register_req("A", "a@x.com", ""),
        ] {
            let err = register(&users, &keys, req).await.unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)));
        }
        assert!(matches!(
            users.find_by_email("a@x.com").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn login_with_correct_password() {
        let (users, keys) = setup().await;
        let registered = register(&users, &keys, register_req("A", "a@x.com", "secret"))
            .await
            .unwrap();

        let resp = login(&users, &keys, login_req("a@x.com", "secret"))
            .await
            .expect("login");
        assert_eq!(resp.user.id, registered.user.id);
        assert_eq!(resp.user.name, "A");
        assert_eq!(keys.verify(&resp.token).unwrap(), registered.user.id);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (users, keys) = setup().await;
        register(&users, &keys, register_req("A", "a@x.com", "secret"))
            .await
            .unwrap();

        let wrong_password = login(&users, &keys, login_req("a@x.com", "nope"))
            .await
            .unwrap_err();
        let unknown_email = login(&users, &keys, login_req("b@x.com", "secret"))
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, ApiError::BadRequest(BAD_CREDENTIALS)));
        assert!(matches!(unknown_email, ApiError::BadRequest(BAD_CREDENTIALS)));
    }
}
