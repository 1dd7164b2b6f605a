use log::{debug, info};

use crate::{
    config::{Credentials, TransportConfig},
    error::{PortalError, SetupError},
    extract,
    portal_data::FetchResult,
    requests::{RequestClient, Transport},
    session::Session,
};

/// One portal account with its own cookie session.
///
/// All operations take `&mut self`, so a client never has two requests in
/// flight at once.
pub struct InfoPointClient<T = RequestClient> {
    session: Session<T>,
}

impl InfoPointClient<RequestClient> {
    pub fn connect(credentials: Credentials, config: &TransportConfig) -> anyhow::Result<Self> {
        let transport = RequestClient::new(config)?;
        Ok(Self::new(credentials, transport))
    }
}

impl<T: Transport> InfoPointClient<T> {
    pub fn new(credentials: Credentials, transport: T) -> Self {
        Self {
            session: Session::new(credentials, transport),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        self.session.credentials()
    }

    pub fn transport(&self) -> &T {
        self.session.transport()
    }

    pub async fn authenticate(&mut self) -> Result<bool, PortalError> {
        self.session.authenticate().await
    }

    pub async fn is_logged_in(&mut self) -> Result<bool, PortalError> {
        self.session.is_logged_in().await
    }

    /// Logs in again if the session expired, then scrapes the data page.
    pub async fn get_data(&mut self) -> Result<FetchResult, PortalError> {
        if !self.session.is_logged_in().await? {
            info!("Session expired, logging in again");
            if !self.session.authenticate().await? {
                return Err(PortalError::AuthenticationFailed);
            }
        }

        let url = self.session.credentials().data_page_url();
        debug!("Fetching data page: {url}");
        let page = self.session.fetch(&url).await?;
        let result = extract::extract(&page.body);
        debug!(
            "Extracted {} grades, last update {:?}",
            result.grades.len(),
            result.last_update
        );
        Ok(result)
    }
}

/// One-shot check of user-supplied credentials.
///
/// Returns the title to store the account under.
pub async fn validate_credentials<T: Transport>(
    credentials: Credentials,
    transport: T,
) -> Result<String, SetupError> {
    let mut client = InfoPointClient::new(credentials, transport);
    match client.authenticate().await {
        Ok(true) => Ok(client.credentials().username().to_string()),
        Ok(false) => Err(SetupError::InvalidAuth),
        Err(e) => Err(SetupError::Unknown(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        portal_data::Absences,
        testing::{BASE, DATA_PAGE, DATA_URL, FakePortal, HOME_PAGE, LOGIN_PAGE, LOGIN_URL},
    };

    const POST_URL: &str = "https://school.example/hip/default.php?action=login";

    fn client(portal: FakePortal) -> InfoPointClient<FakePortal> {
        InfoPointClient::new(Credentials::new(BASE, "anna", "s3cret"), portal)
    }

    #[tokio::test]
    async fn live_session_skips_login() {
        let portal = FakePortal::new()
            .reply(LOGIN_URL, HOME_PAGE)
            .reply(DATA_URL, DATA_PAGE);
        let mut client = client(portal);

        let result = client.get_data().await.unwrap();
        assert_eq!(result.last_update, "14.03.2024");
        assert_eq!(result.absences.days, 5);
        assert_eq!(result.grades.len(), 4);
        assert_eq!(client.transport().count("POST", POST_URL), 0);
    }

    #[tokio::test]
    async fn expired_session_logs_in_again() {
        let portal = FakePortal::new()
            .reply(LOGIN_URL, LOGIN_PAGE)
            .reply(LOGIN_URL, LOGIN_PAGE)
            .reply(POST_URL, HOME_PAGE)
            .reply(DATA_URL, DATA_PAGE);
        let mut client = client(portal);

        let result = client.get_data().await.unwrap();
        assert_eq!(result.grades[0].subject, "Mathematik");

        let order: Vec<_> = client
            .transport()
            .requests()
            .into_iter()
            .map(|r| (r.method, r.url))
            .collect();
        assert_eq!(
            order,
            vec![
                ("GET", LOGIN_URL.to_string()),
                ("GET", LOGIN_URL.to_string()),
                ("POST", POST_URL.to_string()),
                ("GET", DATA_URL.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn rejected_login_fails_fetch() {
        let portal = FakePortal::new()
            .reply(LOGIN_URL, LOGIN_PAGE)
            .reply(POST_URL, "Anmeldung fehlgeschlagen: Passwort falsch");
        let mut client = client(portal);

        let err = client.get_data().await.unwrap_err();
        assert!(matches!(err, PortalError::AuthenticationFailed));
        assert_eq!(client.transport().count("GET", DATA_URL), 0);
    }

    #[tokio::test]
    async fn data_page_fault_is_communication_error() {
        let portal = FakePortal::new()
            .reply(LOGIN_URL, HOME_PAGE)
            .fail(DATA_URL, "operation timed out");
        let mut client = client(portal);

        let err = client.get_data().await.unwrap_err();
        assert!(matches!(err, PortalError::Communication(_)));
        assert!(err.to_string().contains("operation timed out"));
    }

    #[tokio::test]
    async fn unreadable_page_still_yields_defaults() {
        let portal = FakePortal::new()
            .reply(LOGIN_URL, HOME_PAGE)
            .reply(DATA_URL, "<html><body>Abmelden</body></html>");
        let mut client = client(portal);

        let result = client.get_data().await.unwrap();
        assert_eq!(result.last_update, "Connected");
        assert_eq!(result.absences, Absences::default());
        assert!(result.grades.is_empty());
    }

    #[tokio::test]
    async fn handshake_outcomes() {
        let ok = FakePortal::new()
            .reply(LOGIN_URL, LOGIN_PAGE)
            .reply(POST_URL, HOME_PAGE);
        let creds = Credentials::new(BASE, "anna", "s3cret");
        assert_eq!(
            validate_credentials(creds.clone(), ok).await.unwrap(),
            "anna"
        );

        let wrong = FakePortal::new()
            .reply(LOGIN_URL, LOGIN_PAGE)
            .reply(POST_URL, "Benutzername oder Passwort falsch");
        let err = validate_credentials(creds.clone(), wrong).await.unwrap_err();
        assert_eq!(err.form_error_key(), "invalid_auth");

        let down = FakePortal::new().fail(LOGIN_URL, "connection refused");
        let err = validate_credentials(creds.clone(), down).await.unwrap_err();
        assert_eq!(err.form_error_key(), "unknown");

        let no_form = FakePortal::new().reply(LOGIN_URL, "<p>Seite nicht gefunden</p>");
        let err = validate_credentials(creds, no_form).await.unwrap_err();
        assert_eq!(err.form_error_key(), "unknown");
    }
}
