//! Finds the login form on the portal's start page and fills it in.
//!
//! Field roles are decided by an ordered rule table over the field's name and
//! type, so the heuristics can be tested without a live page.

use std::sync::LazyLock;

use reqwest::Url;
use log::debug;
use scraper::{ElementRef, Html, Selector};

use crate::{config::Credentials, error::PortalError};

static SEL_FORM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("form").unwrap());

/// Parents that make the tree builder close a `<form>` straight away.
const TABLE_PARTS: [&str; 5] = ["table", "tbody", "thead", "tfoot", "tr"];

const FALLBACK_USERNAME_FIELD: &str = "username";
const FALLBACK_PASSWORD_FIELD: &str = "password";
const FALLBACK_SUBMIT_FIELD: &str = "login";
const FALLBACK_SUBMIT_VALUE: &str = "Anmelden";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// Submit button, posted with its own value.
    Submit,
    Password,
    Username,
    /// Anything else (hidden tokens etc.), posted unmodified.
    Opaque,
}

/// An `<input>` as declared in the markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputField {
    pub name: String,
    /// Lowercased `type` attribute, empty when absent.
    pub kind: String,
    pub value: String,
}

struct Rule {
    applies: fn(&InputField) -> bool,
    role: FieldRole,
}

fn is_submit(field: &InputField) -> bool {
    field.kind == "submit"
}

fn names_password(field: &InputField) -> bool {
    field.name.to_lowercase().contains("pass")
}

fn names_user(field: &InputField) -> bool {
    let name = field.name.to_lowercase();
    name.contains("user") || name.contains("login")
}

/// First match wins.
const RULES: &[Rule] = &[
    Rule {
        applies: is_submit,
        role: FieldRole::Submit,
    },
    Rule {
        applies: names_password,
        role: FieldRole::Password,
    },
    Rule {
        applies: names_user,
        role: FieldRole::Username,
    },
];

pub fn classify(field: &InputField) -> FieldRole {
    RULES
        .iter()
        .find(|rule| (rule.applies)(field))
        .map_or(FieldRole::Opaque, |rule| rule.role)
}

/// A filled-in login form, rebuilt for every login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    /// Absolute URL the form posts to.
    pub action: String,
    /// Field names and values in document order.
    pub fields: Vec<(String, String)>,
}

impl LoginForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Later assignments to the same name replace earlier ones.
    fn set(&mut self, name: &str, value: &str) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.fields.push((name.to_string(), value.to_string())),
        }
    }

    fn set_if_absent(&mut self, name: &str, value: &str) {
        if self.field(name).is_none() {
            self.fields.push((name.to_string(), value.to_string()));
        }
    }
}

/// Resolves where the form posts to.
///
/// No action means the page posts back to itself, and so does an absolute
/// action that is not http(s), such as `javascript:`. http(s) actions are
/// used as-is; anything else is relative to the portal's base URL.
pub fn resolve_action(action: Option<&str>, page_url: &str, base_url: &str) -> String {
    let action = match action.map(str::trim) {
        None | Some("") => return page_url.to_string(),
        Some(action) => action,
    };
    match Url::parse(action) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => return action.to_string(),
        Ok(url) => {
            debug!("Ignoring {} form action, posting back to the page", url.scheme());
            return page_url.to_string();
        }
        Err(_) => {}
    }
    Url::parse(base_url)
        .and_then(|base| base.join(action))
        .map(String::from)
        .unwrap_or_else(|_| format!("{base_url}{action}"))
}

/// Inputs belonging to `form`, in document order.
///
/// A `<form>` opened directly inside a table ends up empty, with its inputs
/// following it in the table cells. For such a form everything up to the next
/// form or the end of the table is taken.
fn form_inputs(form: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let in_table = form
        .parent()
        .and_then(ElementRef::wrap)
        .is_some_and(|parent| TABLE_PARTS.contains(&parent.value().name()));
    let scope = if in_table {
        form.ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "table")
            .unwrap_or(form)
    } else {
        form
    };
    scope
        .descendants()
        .skip_while(|node| node.id() != form.id())
        .skip(1)
        .filter_map(ElementRef::wrap)
        .take_while(|el| el.value().name() != "form")
        .filter(|el| el.value().name() == "input")
        .collect()
}

/// Locates the first form on the login page and fills it with `credentials`.
pub fn discover(
    html: &str,
    page_url: &str,
    credentials: &Credentials,
) -> Result<LoginForm, PortalError> {
    let document = Html::parse_document(html);
    let Some(form) = document.select(&SEL_FORM).next() else {
        return Err(PortalError::NoFormFound {
            url: page_url.to_string(),
        });
    };

    let action = resolve_action(form.attr("action"), page_url, credentials.base_url());
    let mut login = LoginForm {
        action,
        fields: Vec::new(),
    };

    let mut has_username = false;
    let mut has_password = false;
    for input in form_inputs(form) {
        let Some(name) = input.attr("name").filter(|n| !n.is_empty()) else {
            continue;
        };
        let field = InputField {
            name: name.to_string(),
            kind: input.attr("type").unwrap_or_default().to_lowercase(),
            value: input.attr("value").unwrap_or_default().to_string(),
        };
        match classify(&field) {
            FieldRole::Password => {
                has_password = true;
                login.set(&field.name, credentials.password());
            }
            FieldRole::Username => {
                has_username = true;
                login.set(&field.name, credentials.username());
            }
            FieldRole::Submit | FieldRole::Opaque => login.set(&field.name, &field.value),
        }
    }

    if !has_username || !has_password {
        if !has_username {
            login.set_if_absent(FALLBACK_USERNAME_FIELD, credentials.username());
        }
        if !has_password {
            login.set_if_absent(FALLBACK_PASSWORD_FIELD, credentials.password());
        }
        login.set_if_absent(FALLBACK_SUBMIT_FIELD, FALLBACK_SUBMIT_VALUE);
    }

    Ok(login)
}
