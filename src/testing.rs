//! In-memory portal used by the tests in place of a real HTTP session.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::requests::{Page, Transport};

pub const BASE: &str = "https://school.example/hip/";
pub const LOGIN_URL: &str = "https://school.example/hip/default.php";
pub const DATA_URL: &str = "https://school.example/hip/getdata.php";

pub const LOGIN_PAGE: &str = r#"
    <html><body>
      <form method="post" action="default.php?action=login">
        <input type="hidden" name="token" value="t0k3n">
        <input type="text" name="username">
        <input type="password" name="password">
        <input type="submit" name="login" value="Anmelden">
      </form>
    </body></html>"#;

pub const HOME_PAGE: &str = r#"<html><body><a href="?logout">Abmelden</a></body></html>"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub method: &'static str,
    pub url: String,
    pub fields: Vec<(String, String)>,
    pub referer: Option<String>,
}

type Reply = Result<Page, String>;

/// Serves queued replies per URL. The last reply for a URL repeats once the
/// queue is drained; URLs without replies fail like an unreachable host.
#[derive(Default)]
pub struct FakePortal {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<Recorded>>,
}

impl FakePortal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, url: &str, body: &str) -> Self {
        self.reply_from(url, url, body)
    }

    /// Reply as if the request had been redirected to `final_url`.
    pub fn reply_from(self, url: &str, final_url: &str, body: &str) -> Self {
        self.push(
            url,
            Ok(Page {
                url: final_url.to_string(),
                body: body.to_string(),
            }),
        )
    }

    pub fn fail(self, url: &str, message: &str) -> Self {
        self.push(url, Err(message.to_string()))
    }

    fn push(self, url: &str, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str, url: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    fn answer(&self, record: Recorded) -> anyhow::Result<Page> {
        let url = record.url.clone();
        self.requests.lock().unwrap().push(record);
        let mut replies = self.replies.lock().unwrap();
        let queue = replies.get_mut(&url);
        let reply = match queue {
            Some(q) if q.len() > 1 => q.pop_front(),
            Some(q) => q.front().cloned(),
            None => None,
        };
        match reply {
            Some(Ok(page)) => Ok(page),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!("no route to {url}")),
        }
    }
}

#[async_trait]
impl Transport for FakePortal {
    async fn get(&self, url: &str) -> anyhow::Result<Page> {
        self.answer(Recorded {
            method: "GET",
            url: url.to_string(),
            fields: Vec::new(),
            referer: None,
        })
    }

    async fn post_form(
        &self,
        url: &str,
        fields: &[(String, String)],
        referer: &str,
    ) -> anyhow::Result<Page> {
        self.answer(Recorded {
            method: "POST",
            url: url.to_string(),
            fields: fields.to_vec(),
            referer: Some(referer.to_string()),
        })
    }
}

/// A logged-in data page as the portal renders it.
pub const DATA_PAGE: &str = r#"
<html>
<head><title>Home.InfoPoint</title></head>
<body>
  <div id="header">
    <a href="default.php?action=logout">Abmelden</a>
    <p>Daten aktualisiert am 14.03.2024 um 17:45 Uhr</p>
  </div>
  <h3>Fehlzeiten</h3>
  <table class="fehlzeiten">
    <tr><td>Fehltage</td><td> 5 </td></tr>
    <tr><td>Unentschuldigte Fehltage</td><td>2</td></tr>
    <tr><td>Fehlstunden</td><td>10</td></tr>
    <tr><td>Unentschuldigte Fehlstunden</td><td>3</td></tr>
  </table>
  <h3>Mathematik</h3>
  <table class="noten">
    <tr><th>Datum</th><th>Zensur</th><th>Bemerkung</th></tr>
    <tr><td>01.02.2024</td><td>2</td><td>gut</td></tr>
    <tr><td>15.01.2024</td><td> </td><td>Test angekündigt</td></tr>
    <tr><td>10.01.2024</td><td>3,5</td><td></td></tr>
  </table>
  <h3>Deutsch</h3>
  <table class="noten">
    <tr><th>Datum</th><th>Zensur</th><th>Bemerkung</th></tr>
    <tr><td>05.02.2024</td><td>1-</td><td>Referat</td></tr>
    <tr><td>20.01.2024</td><td>2</td><td>Diktat</td></tr>
  </table>
  <b>Notenspiegel</b>
  <table>
    <tr><th>Note</th><th>Anzahl</th></tr>
    <tr><td>1</td><td>4</td><td>Schüler</td></tr>
  </table>
  <h3>Legende</h3>
  <p>Zensuren ohne Datum sind vorläufig.</p>
</body>
</html>"#;
