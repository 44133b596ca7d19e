//! Site login and the cookie-carrying client used by harvest runs

use crate::crawler::fetcher::site_url;
use crate::crawler::headers::HeaderPool;
use crate::{HarvestError, Result};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{redirect::Policy, Client};
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Cookie the site sets once a login succeeds
pub const SESSION_COOKIE: &str = ".AspNet.ApplicationCookie";

const TOKEN_FIELD: &str = "__RequestVerificationToken";

/// An HTTP client whose cookie jar holds the site session
pub struct Session {
    client: Client,
    jar: Arc<Jar>,
    base_url: Url,
}

impl Session {
    /// Builds an anonymous session; call [`Session::login`] to authenticate it
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .redirect(Policy::limited(10))
            .cookie_provider(jar.clone())
            .default_headers(HeaderPool::fixed().pick())
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            jar,
            base_url,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// True once the jar holds the session cookie for the site
    pub fn is_logged_in(&self) -> bool {
        session_cookie(&self.jar, &self.base_url).is_some()
    }

    /// Logs in with the site's form: fetch the anti-forgery token, post the credentials
    ///
    /// Fails when the token is missing, the session cookie is not set, or the
    /// site redirects to its banned-account page.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let login_url = site_url(&self.base_url, &["Account", "Login"]);
        let banned_url = site_url(&self.base_url, &["Account", "Banned"]);

        let form = self.client.get(login_url.clone()).send().await?;
        if !form.status().is_success() {
            return Err(HarvestError::Login(format!(
                "login page returned HTTP {}",
                form.status()
            )));
        }
        let token = verification_token(&form.text().await?)
            .ok_or_else(|| HarvestError::Login("could not find CSRF token".to_string()))?;

        let response = self
            .client
            .post(login_url)
            .form(&[
                (TOKEN_FIELD, token.as_str()),
                ("Posel", email),
                ("KataSandi", password),
                ("IngatSaya", "false"),
            ])
            .send()
            .await?;

        let landed_on = response.url().clone();
        tracing::debug!("Login landed on {} ({})", landed_on, response.status());

        if !self.is_logged_in() {
            return Err(HarvestError::Login(
                "could not find login cookie".to_string(),
            ));
        }
        if landed_on.path() == banned_url.path() {
            return Err(HarvestError::Login("account is banned".to_string()));
        }

        tracing::info!("Successfully logged in as {}", email);
        Ok(())
    }
}

/// Value of the anti-forgery token field of the login form
fn verification_token(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    let selector = Selector::parse(&format!("form input[name='{}']", TOKEN_FIELD)).ok()?;
    document
        .select(&selector)
        .filter_map(|input| input.value().attr("value"))
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn session_cookie(jar: &Jar, url: &Url) -> Option<String> {
    let header = jar.cookies(url)?;
    let cookies = header.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_token() {
        let body = r#"<html><body>
            <form action="/Account/Login" method="post">
                <input name="__RequestVerificationToken" type="hidden" value="tok-123" />
                <input name="Posel" type="text" />
            </form></body></html>"#;
        assert_eq!(verification_token(body), Some("tok-123".to_string()));
        assert_eq!(verification_token("<html><body><p>maintenance</p></body></html>"), None);
    }

    #[test]
    fn test_session_cookie_lookup() {
        let url = Url::parse("https://kbbi.kemdikbud.go.id/").unwrap();
        let jar = Jar::default();
        assert!(session_cookie(&jar, &url).is_none());

        jar.add_cookie_str("ASP.NET_SessionId=abc; Path=/", &url);
        assert!(session_cookie(&jar, &url).is_none());

        jar.add_cookie_str(".AspNet.ApplicationCookie=secret; Path=/", &url);
        assert_eq!(session_cookie(&jar, &url), Some("secret".to_string()));
    }

    #[test]
    fn test_new_session_is_anonymous() {
        let base = Url::parse("https://kbbi.kemdikbud.go.id").unwrap();
        let session = Session::new(base, Duration::from_secs(30)).unwrap();
        assert!(!session.is_logged_in());
    }
}
