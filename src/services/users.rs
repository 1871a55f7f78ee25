use crate::{
    auth::{generate_verification_token, AuthService},
    entities::{user, User, UserModel, UserRole},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        carts::{CartLineDetail, CartService, GuestCartLine},
        mailer::Mailer,
    },
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Password shape check: leading uppercase and at least one special character.
fn validate_password(password: &str) -> Result<(), ValidationError> {
    let starts_upper = password.chars().next().is_some_and(|c| c.is_ascii_uppercase());
    let has_special = password
        .chars()
        .any(|c| !c.is_ascii_alphanumeric() && !c.is_whitespace());

    if starts_upper && has_special {
        Ok(())
    } else {
        let mut err = ValidationError::new("password_shape");
        err.message =
            Some("Password must start with an uppercase letter and include a special character".into());
        Err(err)
    }
}

/// Registration, login (with guest-cart merge) and email verification.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    auth: Arc<AuthService>,
    carts: Arc<CartService>,
    mailer: Option<Arc<Mailer>>,
    frontend_url: String,
}

impl UserService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        auth: Arc<AuthService>,
        carts: Arc<CartService>,
        mailer: Option<Arc<Mailer>>,
        frontend_url: String,
    ) -> Self {
        Self {
            db,
            event_sender,
            auth,
            carts,
            mailer,
            frontend_url,
        }
    }

    /// Register a new user.
    ///
    /// The verification mail is dispatched fire-and-forget once the row has
    /// committed; a mail failure is logged by the spawned task and never
    /// fails the registration itself.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<UserModel, ServiceError> {
        input.validate()?;

        if input.password != input.confirm_password {
            return Err(ServiceError::ValidationError(
                "Passwords do not match!".to_string(),
            ));
        }

        let existing = User::find()
            .filter(user::Column::Email.eq(input.email.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict("User already exists!".to_string()));
        }

        let password_hash = self.auth.hash_password(&input.password)?;
        let verification_token = generate_verification_token();
        let now = Utc::now();

        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            email: Set(input.email),
            phone: Set(input.phone),
            address: Set(input.address),
            password_hash: Set(password_hash),
            image: Set(input.image),
            role: Set(UserRole::Customer),
            is_verified: Set(false),
            verification_token: Set(Some(verification_token.clone())),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::UserRegistered(created.id))
            .await;

        if let Some(mailer) = self.mailer.clone() {
            let to = created.email.clone();
            let link = format!(
                "{}/verify-email?token={}",
                self.frontend_url, verification_token
            );
            tokio::spawn(async move {
                if let Err(e) = mailer.send_verification(&to, &link).await {
                    error!("Failed to send verification email to {}: {}", to, e);
                }
            });
        }

        info!("Registered user: {}", created.id);
        Ok(created)
    }

    /// Authenticate and open a session.
    ///
    /// Any guest cart the client held is merged into the persisted cart
    /// before the response is assembled; the merge is best-effort and can
    /// never fail the login. The returned cart is the authoritative merged
    /// state for the client to adopt.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<LoginOutcome, ServiceError> {
        input.validate()?;

        let user = User::find()
            .filter(user::Column::Email.eq(input.email.clone()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found!".to_string()))?;

        if !self.auth.verify_password(&input.password, &user.password_hash)? {
            return Err(ServiceError::AuthError("Incorrect password!".to_string()));
        }

        let guest_lines = input.guest_cart.unwrap_or_default();
        let cart = match self.carts.merge_guest_cart(user.id, &guest_lines).await {
            Ok(cart) => cart,
            Err(e) => {
                warn!("Could not load cart after merge for {}: {}", user.id, e);
                Vec::new()
            }
        };

        let token = self.auth.generate_token(&user)?;

        info!("Login successful for user: {}", user.id);
        Ok(LoginOutcome { token, user, cart })
    }

    /// Confirm an email address from the token in the verification link.
    #[instrument(skip(self, token))]
    pub async fn verify_email(&self, token: &str) -> Result<(), ServiceError> {
        if token.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Token is required".to_string(),
            ));
        }

        let user = User::find()
            .filter(user::Column::VerificationToken.eq(token))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(
                    "Invalid or expired verification token".to_string(),
                )
            })?;

        let user_id = user.id;
        let mut active: user::ActiveModel = user.into();
        active.is_verified = Set(true);
        active.verification_token = Set(None);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::UserVerified(user_id))
            .await;

        info!("Verified email for user: {}", user_id);
        Ok(())
    }
}

/// Input for registration; every field is required
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 1, message = "First name is required!"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required!"))]
    pub last_name: String,
    #[validate(email(message = "Invalid email format!"))]
    pub email: String,
    #[validate(length(min = 1, message = "Phone number is required!"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Address is required!"))]
    pub address: String,
    #[validate(custom = "validate_password")]
    pub password: String,
    pub confirm_password: String,
    pub image: Option<String>,
}

/// Input for login; the guest cart rides along only here
#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email(message = "Invalid email format!"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required!"))]
    pub password: String,
    pub guest_cart: Option<Vec<GuestCartLine>>,
}

/// Successful login payload
#[derive(Debug, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub user: UserModel,
    pub cart: Vec<CartLineDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_shape_accepts_conforming() {
        assert!(validate_password("Str0ng!pass").is_ok());
        assert!(validate_password("P@ss").is_ok());
    }

    #[test]
    fn password_shape_rejects_lowercase_start() {
        assert!(validate_password("weak!pass").is_err());
    }

    #[test]
    fn password_shape_rejects_missing_special() {
        assert!(validate_password("Plainpassword1").is_err());
    }

    #[test]
    fn register_input_validates_email() {
        let input = RegisterInput {
            first_name: "Ada".into(),
            last_name: "Obi".into(),
            email: "not-an-email".into(),
            phone: "+2348000000000".into(),
            address: "12 Marina Rd".into(),
            password: "Str0ng!pass".into(),
            confirm_password: "Str0ng!pass".into(),
            image: None,
        };
        assert!(input.validate().is_err());
    }
}
