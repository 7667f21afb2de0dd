//! User management commands.

use std::io::BufRead;

use atelier_core::{Email, UserRole};
use atelier_storefront::db::UserRepository;
use atelier_storefront::services::auth::AuthService;

use super::{CommandError, connect};

fn read_password() -> Result<String, CommandError> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_owned();
    if password.is_empty() {
        return Err(CommandError::Invalid(
            "password must be supplied on stdin".to_owned(),
        ));
    }
    Ok(password)
}

/// Create a user with a password read from stdin.
///
/// # Errors
///
/// Returns an error for invalid input, a duplicate email or database failures.
pub async fn create(email: &str, name: &str, admin: bool) -> Result<(), CommandError> {
    let password = read_password()?;
    let role = if admin {
        UserRole::Admin
    } else {
        UserRole::Customer
    };

    let pool = connect().await?;
    let user = AuthService::new(&pool)
        .register(email, name, &password, role)
        .await?;

    tracing::info!(user_id = %user.id, email = %user.email.as_str(), %role, "User created");
    Ok(())
}

/// Change a user's role.
///
/// The new role applies from the user's next login.
///
/// # Errors
///
/// Returns an error for an unknown role or email, or database failures.
pub async fn promote(email: &str, role: &str) -> Result<(), CommandError> {
    let role: UserRole = role.parse().map_err(CommandError::Invalid)?;
    let email = Email::parse(email).map_err(|e| CommandError::Invalid(e.to_string()))?;

    let pool = connect().await?;
    let user = UserRepository::new(&pool).set_role(&email, role).await?;

    tracing::info!(user_id = %user.id, %role, "Role updated");
    Ok(())
}
