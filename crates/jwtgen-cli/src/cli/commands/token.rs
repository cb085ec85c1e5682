//! Non-interactive token command.
//!
//! Drives the same controller as the UI: the optional `--api-key` is applied
//! as a form edit (and therefore cached), then one sign-in or sign-up runs.

use anyhow::Result;
use jwtgen_core::config::Config;
use jwtgen_core::controller::{AuthOp, CredentialController, Field, USER_CREATED_TITLE};
use jwtgen_core::provider::IdentityToolkit;
use jwtgen_core::store::FileStore;
use serde_json::json;

pub struct TokenOptions<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub api_key: Option<&'a str>,
    pub sign_up: bool,
    pub json: bool,
}

pub async fn run(config: &Config, opts: TokenOptions<'_>) -> Result<()> {
    let provider = IdentityToolkit::from_config(&config.provider);
    let mut controller = CredentialController::new(provider, FileStore::open_default());

    if let Some(key) = opts.api_key {
        controller.set_field(Field::ApiKey, key);
    }
    controller.set_field(Field::Email, opts.email);
    controller.set_field(Field::Password, opts.password);

    let op = if opts.sign_up {
        AuthOp::SignUp
    } else {
        AuthOp::SignIn
    };
    tracing::debug!(op = op.label(), json = opts.json, "token command");
    controller.submit(op).await;

    let Some(auth) = controller.auth() else {
        match controller.notice() {
            Some(notice) => anyhow::bail!("{}: {}", notice.title, notice.message),
            None => anyhow::bail!("Authentication did not complete"),
        }
    };

    if let Some(notice) = controller
        .notice()
        .filter(|notice| notice.title == USER_CREATED_TITLE)
    {
        eprintln!("{}: {}", notice.title, notice.message);
    }

    if opts.json {
        let output = json!({
            "token": auth.token,
            "user_id": auth.session.user_id(),
            "email": auth.session.email().unwrap_or(opts.email),
            "expires_in": auth.session.expires_in(),
        });
        println!("{output}");
    } else {
        println!("{}", auth.token);
    }

    Ok(())
}
