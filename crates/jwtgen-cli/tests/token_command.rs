use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::{TempDir, tempdir};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn account_body(uid: &str, email: &str, token: &str) -> Value {
    json!({
        "localId": uid,
        "email": email,
        "idToken": token,
        "refreshToken": "refresh",
        "expiresIn": "3600"
    })
}

fn error_body(message: &str) -> Value {
    json!({ "error": { "code": 400, "message": message } })
}

fn cached_key(home: &TempDir) -> Option<String> {
    let contents = fs::read_to_string(home.path().join("state.json")).ok()?;
    let state: Value = serde_json::from_str(&contents).ok()?;
    state["jwt-generator-apiKey"].as_str().map(str::to_string)
}

#[tokio::test]
async fn test_sign_up_prints_token_and_notice() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = tempdir().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signUp"))
        .and(query_param("key", "AIzaFAKE123"))
        .and(body_json(json!({
            "email": "a@b.com",
            "password": "secret",
            "returnSecureToken": true
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(account_body("uid-42", "a@b.com", "eyJ.test.jwt")),
        )
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("jwtgen")
        .env("JWTGEN_HOME", home.path())
        .env("JWTGEN_AUTH_BASE_URL", server.uri())
        .env_remove("JWTGEN_API_KEY")
        .args([
            "token",
            "--api-key",
            "AIzaFAKE123",
            "--email",
            "a@b.com",
            "--password",
            "secret",
            "--sign-up",
        ])
        .assert()
        .success()
        .stdout(predicate::str::diff("eyJ.test.jwt\n"))
        .stderr(predicate::str::contains("User created"))
        .stderr(predicate::str::contains("a@b.com"));

    assert_eq!(cached_key(&home).as_deref(), Some("AIzaFAKE123"));
}

#[tokio::test]
async fn test_sign_in_uses_cached_key_and_prints_json() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = tempdir().unwrap();
    fs::write(
        home.path().join("state.json"),
        r#"{"jwt-generator-apiKey": "cached-key"}"#,
    )
    .unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .and(query_param("key", "cached-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(account_body("uid-7", "a@b.com", "jwt-value")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let output = cargo_bin_cmd!("jwtgen")
        .env("JWTGEN_HOME", home.path())
        .env("JWTGEN_AUTH_BASE_URL", server.uri())
        .env_remove("JWTGEN_API_KEY")
        .args(["token", "--email", "a@b.com", "--password", "secret", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let parsed: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(parsed["token"], "jwt-value");
    assert_eq!(parsed["user_id"], "uid-7");
    assert_eq!(parsed["email"], "a@b.com");
    assert_eq!(parsed["expires_in"], 3600);
}

#[tokio::test]
async fn test_provider_rejection_exits_nonzero() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = tempdir().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body("INVALID_LOGIN_CREDENTIALS")))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("jwtgen")
        .env("JWTGEN_HOME", home.path())
        .env("JWTGEN_AUTH_BASE_URL", server.uri())
        .env("JWTGEN_API_KEY", "key")
        .args(["token", "--email", "a@b.com", "--password", "wrong"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Login failed: INVALID_LOGIN_CREDENTIALS"));
}

#[tokio::test]
async fn test_empty_password_makes_no_request() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = tempdir().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(account_body("u", "a@b.com", "t")))
        .expect(0)
        .mount(&server)
        .await;

    cargo_bin_cmd!("jwtgen")
        .env("JWTGEN_HOME", home.path())
        .env("JWTGEN_AUTH_BASE_URL", server.uri())
        .args([
            "token",
            "--api-key",
            "AIzaFAKE123",
            "--email",
            "a@b.com",
            "--password",
            "",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Required fields missing"));
}

#[test]
fn test_missing_api_key_is_reported() {
    let home = tempdir().unwrap();

    cargo_bin_cmd!("jwtgen")
        .env("JWTGEN_HOME", home.path())
        .env_remove("JWTGEN_API_KEY")
        .args(["token", "--email", "a@b.com", "--password", "secret"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Web API Key, e-mail and password are required",
        ));
}
