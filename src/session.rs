//! Login state machine for the portal.
//!
//! The session itself lives in the transport's cookie store. Whether it is
//! still valid is only ever found out by asking the portal.

use log::{debug, error, info};
use reqwest::Url;

use crate::{
    config::Credentials,
    error::PortalError,
    form,
    requests::{Page, Transport},
};

const LOGOUT_MARKERS: [&str; 2] = ["Abmelden", "Logout"];
/// Matched against the lowercased body.
const FAILURE_MARKERS: [&str; 3] = ["fehler", "falsch", "nicht erfolgreich"];
const ERROR_QUERY_KEYS: [&str; 2] = ["err", "error"];

pub fn shows_logout(body: &str) -> bool {
    LOGOUT_MARKERS.iter().any(|marker| body.contains(marker))
}

pub fn shows_failure(body: &str) -> bool {
    let body = body.to_lowercase();
    FAILURE_MARKERS.iter().any(|marker| body.contains(marker))
}

pub fn is_error_redirect(url: &str) -> bool {
    match Url::parse(url) {
        Ok(url) => url
            .query_pairs()
            .any(|(key, _)| ERROR_QUERY_KEYS.iter().any(|k| key == *k)),
        Err(_) => ERROR_QUERY_KEYS
            .iter()
            .any(|key| url.contains(&format!("{key}="))),
    }
}

/// What a login response told us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginVerdict {
    LoggedIn,
    Rejected,
    /// Neither marker seen; the start page has to be asked.
    Unclear,
}

/// Checks a login response in fixed order: logout marker, error text, error
/// redirect.
pub fn judge_login_response(page: &Page) -> LoginVerdict {
    if shows_logout(&page.body) {
        LoginVerdict::LoggedIn
    } else if shows_failure(&page.body) || is_error_redirect(&page.url) {
        LoginVerdict::Rejected
    } else {
        LoginVerdict::Unclear
    }
}

pub struct Session<T> {
    transport: T,
    credentials: Credentials,
}

impl<T: Transport> Session<T> {
    pub fn new(credentials: Credentials, transport: T) -> Self {
        Self {
            transport,
            credentials,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn fetch(&self, url: &str) -> Result<Page, PortalError> {
        self.transport
            .get(url)
            .await
            .map_err(PortalError::Communication)
    }

    /// Logs in with a freshly discovered login form.
    ///
    /// `Ok(false)` means the portal refused the credentials.
    pub async fn authenticate(&mut self) -> Result<bool, PortalError> {
        let start_url = self.credentials.login_page_url();
        debug!("Fetching login page: {start_url}");
        let page = self.fetch(&start_url).await?;

        let login = form::discover(&page.body, &start_url, &self.credentials).inspect_err(|e| {
            error!("{e}");
        })?;
        debug!(
            "Submitting login form to {} (fields: {:?})",
            login.action,
            login.field_names()
        );

        let response = self
            .transport
            .post_form(&login.action, &login.fields, &start_url)
            .await
            .map_err(PortalError::Communication)?;

        match judge_login_response(&response) {
            LoginVerdict::LoggedIn => {
                info!("Login successful (found logout link)");
                Ok(true)
            }
            LoginVerdict::Rejected => {
                error!("Login failed: portal rejected credentials (at {})", response.url);
                Ok(false)
            }
            LoginVerdict::Unclear => self.is_logged_in().await,
        }
    }

    /// Asks the start page. Only a logout link counts; a page without any
    /// error text is still treated as logged out.
    pub async fn is_logged_in(&mut self) -> Result<bool, PortalError> {
        let page = self.fetch(&self.credentials.login_page_url()).await?;
        let logged_in = shows_logout(&page.body);
        debug!("Login status: {logged_in}");
        Ok(logged_in)
    }
}
