//! Fixture book the gateway answers from.
//!
//! A fixture book is a JSON document with four sections:
//!
//! ```json
//! {
//!   "accounts": [{ "username": "analyst", "password": "secret" }],
//!   "allow_anonymous": true,
//!   "subjects": ["BHP", "NAB", "WOW"],
//!   "retrievals": [
//!     {
//!       "query": { "subjects": ["BHP"], "data_types": ["CLOSE PRICE"], "date_range": "01/01/2018" },
//!       "values": [["", "CLOSE PRICE"], ["BHP", "29.57"]]
//!     }
//!   ]
//! }
//! ```
//!
//! Retrievals are replayed only on an exact query match; the gateway never
//! derives a grid it was not given. Subjects named in retrieval queries are
//! known subjects even when the `subjects` list omits them.
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crms_common::{
    Credentials, GatewayError, Result, RetrieveObservations2DCommand,
    RetrieveObservations2DResponse, ValueGrid,
};
use serde::{Deserialize, Serialize};

/// Login accepted by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Account name.
    pub username: String,
    /// Account secret.
    pub password: String,
}

/// Canned answer for one retrieval query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalFixture {
    /// Query that must match exactly.
    pub query: RetrieveObservations2DCommand,
    /// Header-annotated grid returned for it.
    pub values: ValueGrid,
}

#[derive(Debug, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    accounts: Vec<Account>,
    #[serde(default = "default_allow_anonymous")]
    allow_anonymous: bool,
    #[serde(default)]
    subjects: Vec<String>,
    #[serde(default)]
    retrievals: Vec<RetrievalFixture>,
}

fn default_allow_anonymous() -> bool {
    true
}

/// Validated, read-only fixture data.
#[derive(Debug, Clone, Default)]
pub struct FixtureBook {
    accounts: HashMap<String, String>,
    allow_anonymous: bool,
    subjects: HashSet<String>,
    retrievals: Vec<RetrievalFixture>,
}

impl FixtureBook {
    /// Parse and validate a fixture book from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let file: FixtureFile = serde_json::from_str(text)
            .map_err(|e| GatewayError::Fixture(format!("invalid fixture JSON: {}", e)))?;
        Self::from_parts(file)
    }

    /// Read a fixture book from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            GatewayError::Fixture(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    fn from_parts(file: FixtureFile) -> Result<Self> {
        let mut subjects: HashSet<String> = file.subjects.into_iter().collect();

        for (index, fixture) in file.retrievals.iter().enumerate() {
            fixture.query.validate().map_err(|e| {
                GatewayError::Fixture(format!("retrieval #{}: {}", index, e))
            })?;
            let response = RetrieveObservations2DResponse::available(fixture.values.clone());
            if !response.matches_axes(&fixture.query) {
                return Err(GatewayError::Fixture(format!(
                    "retrieval #{}: grid headers do not match the query axes",
                    index
                )));
            }
            subjects.extend(fixture.query.subjects.iter().cloned());
        }

        let mut accounts = HashMap::new();
        for account in file.accounts {
            if accounts
                .insert(account.username.clone(), account.password)
                .is_some()
            {
                return Err(GatewayError::Fixture(format!(
                    "account '{}' is listed twice",
                    account.username
                )));
            }
        }

        Ok(Self {
            accounts,
            allow_anonymous: file.allow_anonymous,
            subjects,
            retrievals: file.retrievals,
        })
    }

    /// Resolve the caller identity.
    ///
    /// Returns the account name (`None` for anonymous) or the reason access is denied.
    pub fn authorize(
        &self,
        credentials: Option<&Credentials>,
    ) -> std::result::Result<Option<String>, String> {
        match credentials {
            None if self.allow_anonymous => Ok(None),
            None => Err(String::from("anonymous access is disabled")),
            Some(credentials) => match self.accounts.get(&credentials.username) {
                Some(password) if *password == credentials.password => {
                    Ok(Some(credentials.username.clone()))
                }
                _ => Err(format!(
                    "invalid credentials for user '{}'",
                    credentials.username
                )),
            },
        }
    }

    /// `true` when `subject` is held by the gateway.
    pub fn is_known_subject(&self, subject: &str) -> bool {
        self.subjects.contains(subject)
    }

    /// Canned grid for an exactly matching query.
    pub fn find_retrieval(&self, query: &RetrieveObservations2DCommand) -> Option<&ValueGrid> {
        self.retrievals
            .iter()
            .find(|fixture| fixture.query == *query)
            .map(|fixture| &fixture.values)
    }

    /// Number of known subjects.
    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    /// Number of canned retrievals.
    pub fn retrieval_count(&self) -> usize {
        self.retrievals.len()
    }
}
