//! Account and session commands.

use secrecy::SecretString;

use tableside_client::auth::{self, LoginForm, SignupForm, blame_field};
use tableside_client::error::ClientError;
use tableside_client::session;
use tableside_client::state::AppState;

/// Log in, then bootstrap the session so the cart is reconciled.
pub async fn login(
    state: &AppState,
    email: &str,
    password: SecretString,
) -> Result<(), ClientError> {
    let form = LoginForm {
        email: email.to_string(),
        password,
    };

    if let Err(e) = auth::login(state.api(), &**state.storage(), &form).await {
        report_field(&e);
        return Err(e);
    }

    bootstrap(state).await?;
    println!("Signed in as {email}");
    Ok(())
}

/// Create an account (the confirmation field mirrors the password, since a
/// terminal argument is typed once).
pub async fn signup(
    state: &AppState,
    email: &str,
    name: &str,
    password: SecretString,
) -> Result<(), ClientError> {
    let form = SignupForm {
        email: email.to_string(),
        name: name.to_string(),
        password: password.clone(),
        confirm_password: password,
    };

    if let Err(e) = auth::signup(state.api(), &**state.storage(), &form).await {
        report_field(&e);
        return Err(e);
    }

    bootstrap(state).await?;
    println!("Account created for {email}");
    Ok(())
}

/// Sign out.
pub async fn logout(state: &AppState) -> Result<(), ClientError> {
    let storage = state.storage().clone();
    let mut cart = state.cart().clone();
    cart.restore()?;
    let session = session::logout(state.api(), &*storage, &mut cart).await?;
    *state.cart() = cart;
    state.set_session(session);
    println!("Signed out");
    Ok(())
}

/// Print the restored session.
pub async fn whoami(state: &AppState) -> Result<(), ClientError> {
    let session = bootstrap(state).await?;
    match session.user() {
        Some(user) => println!("{} <{}>", user.name, user.email),
        None => println!("Not signed in"),
    }
    Ok(())
}

/// Delete the account and wipe local state.
pub async fn delete(state: &AppState) -> Result<(), ClientError> {
    let storage = state.storage().clone();
    let mut cart = state.cart().clone();
    cart.restore()?;
    auth::delete_account(state.api(), &*storage, &mut cart).await?;
    *state.cart() = cart;
    state.set_session(session::SessionState::unauthenticated());
    println!("Account deleted");
    Ok(())
}

/// Restore the session from the persisted token and hydrate the cart.
pub async fn bootstrap(state: &AppState) -> Result<session::SessionState, ClientError> {
    let storage = state.storage().clone();
    let mut cart = state.cart().clone();
    cart.restore()?;
    let session = session::bootstrap(state.api(), &*storage, &mut cart).await?;
    *state.cart() = cart;
    state.set_session(session.clone());
    Ok(session)
}

/// Point the user at the form field the server blamed, when there is one.
fn report_field(error: &ClientError) {
    if let ClientError::Api(api_error) = error
        && let Some(field) = blame_field(api_error)
    {
        println!("Check the {field} field: {api_error}");
    }
}
