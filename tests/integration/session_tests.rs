//! Site login against a mock account endpoint

use kbbi_harvest::crawler::Session;
use kbbi_harvest::HarvestError;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LOGIN_FORM: &str = r#"<html><body>
    <form action="/Account/Login" method="post">
        <input name="__RequestVerificationToken" type="hidden" value="csrf-token-42" />
        <input name="Posel" type="email" />
        <input name="KataSandi" type="password" />
    </form></body></html>"#;

async fn mount_form(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/Account/Login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_FORM))
        .expect(1)
        .mount(server)
        .await;
}

fn session(server: &MockServer) -> Session {
    Session::new(Url::parse(&server.uri()).unwrap(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let server = MockServer::start().await;
    mount_form(&server).await;
    Mock::given(method("POST"))
        .and(path("/Account/Login"))
        .and(body_string_contains("__RequestVerificationToken=csrf-token-42"))
        .and(body_string_contains("Posel=pengguna%40contoh.id"))
        .and(body_string_contains("IngatSaya=false"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", ".AspNet.ApplicationCookie=session-value; path=/")
                .set_body_string("<html><body>Beranda</body></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = session(&server);
    session
        .login("pengguna@contoh.id", "rahasia")
        .await
        .expect("login should succeed");
    assert!(session.is_logged_in());
}

#[tokio::test]
async fn test_login_without_cookie_fails() {
    let server = MockServer::start().await;
    mount_form(&server).await;
    Mock::given(method("POST"))
        .and(path("/Account/Login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>Salah</body></html>"))
        .mount(&server)
        .await;

    let err = session(&server).login("a@b.id", "salah").await.unwrap_err();
    assert!(matches!(err, HarvestError::Login(_)));
}

#[tokio::test]
async fn test_banned_account_is_rejected() {
    let server = MockServer::start().await;
    mount_form(&server).await;
    Mock::given(method("POST"))
        .and(path("/Account/Login"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("set-cookie", ".AspNet.ApplicationCookie=session-value; path=/")
                .insert_header("location", "/Account/Banned"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Account/Banned"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>Diblokir</body></html>"))
        .mount(&server)
        .await;

    match session(&server).login("a@b.id", "rahasia").await {
        Err(HarvestError::Login(message)) => assert!(message.contains("banned")),
        other => panic!("expected a login error, got {:?}", other),
    }
}
