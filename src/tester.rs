use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::{Client, Result, TesterRepository};

/// Profile fields of a tester, keyed by the field name as it appears in Prefinery.
///
/// Keys are sent as XML element names, so adding or updating a tester whose profile has a key
/// such as `"first name"` fails with [`Error::InvalidArgument`](crate::Error::InvalidArgument).
pub type Profile = BTreeMap<String, String>;

/// Status of a tester within a beta.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TesterStatus {
    /// Status was not reported or not recognized.
    #[default]
    Unknown,
    /// Imported in bulk by the beta owner.
    Imported,
    /// Applied through the sign-up form and waiting for an invitation.
    Applied,
    /// Invited but not yet active.
    Invited,
    /// Has accepted the invitation.
    Active,
    /// Application was declined.
    Rejected,
}

impl TesterStatus {
    /// Lowercase form used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            TesterStatus::Unknown => "unknown",
            TesterStatus::Imported => "imported",
            TesterStatus::Applied => "applied",
            TesterStatus::Invited => "invited",
            TesterStatus::Active => "active",
            TesterStatus::Rejected => "rejected",
        }
    }

    /// Parse a status as reported by Prefinery.
    ///
    /// Matching is case-insensitive. Only statuses the server reports for existing testers are
    /// recognized; anything else (including `rejected`) maps to [`TesterStatus::Unknown`].
    pub fn from_wire(value: &str) -> TesterStatus {
        let value = value.trim();
        [
            TesterStatus::Imported,
            TesterStatus::Applied,
            TesterStatus::Invited,
            TesterStatus::Active,
        ]
        .into_iter()
        .find(|status| status.as_str().eq_ignore_ascii_case(value))
        .unwrap_or(TesterStatus::Unknown)
    }

    /// Applied and imported testers cannot have their status pushed back to Prefinery.
    pub(crate) fn is_server_managed(&self) -> bool {
        matches!(self, TesterStatus::Applied | TesterStatus::Imported)
    }
}

impl std::fmt::Display for TesterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A participant in a beta.
///
/// Testers are created locally with [`Tester::new`] and get their `id` and timestamps once
/// added through a [`TesterRepository`]. Testers returned by the client remember the id of the
/// beta they belong to, which is used to route [`Tester::update`], [`Tester::delete`] and friends
/// back to the right beta.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tester {
    pub(crate) id: Option<u64>,
    /// E-mail address of the tester.
    pub email: String,
    /// Invite code used by the tester.
    pub invite_code: Option<String>,
    /// Current status.
    pub status: TesterStatus,
    pub(crate) created: Option<DateTime<FixedOffset>>,
    pub(crate) updated: Option<DateTime<FixedOffset>>,
    /// Free-form profile fields.
    pub profile: Profile,
    pub(crate) beta_id: Option<u64>,
}

impl Tester {
    /// Create a tester that has not been added to any beta yet.
    ///
    /// ```
    /// # use prefinery::{Tester, TesterStatus};
    /// let tester = Tester::new("someone@example.com")
    ///     .with_status(TesterStatus::Invited)
    ///     .with_profile_field("first-name", "Someone");
    /// assert_eq!(tester.id(), None);
    /// ```
    pub fn new(email: impl Into<String>) -> Tester {
        Tester {
            email: email.into(),
            ..Tester::default()
        }
    }

    /// Set the invite code.
    pub fn with_invite_code(mut self, invite_code: impl Into<String>) -> Self {
        self.invite_code = Some(invite_code.into());
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: TesterStatus) -> Self {
        self.status = status;
        self
    }

    /// Set a single profile field, replacing any previous value.
    pub fn with_profile_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.profile.insert(key.into(), value.into());
        self
    }

    /// Server-assigned identifier. `None` until the tester has been added.
    pub fn id(&self) -> Option<u64> {
        self.id
    }

    /// Time at which the tester registered with Prefinery.
    ///
    /// `None` if the server did not report it or reported an unparsable timestamp.
    pub fn created(&self) -> Option<DateTime<FixedOffset>> {
        self.created
    }

    /// Time at which the tester was last updated on Prefinery.
    pub fn updated(&self) -> Option<DateTime<FixedOffset>> {
        self.updated
    }

    /// Id of the beta the tester belongs to.
    pub fn beta_id(&self) -> Option<u64> {
        self.beta_id
    }

    /// Copy server-assigned state from `server` into `self`.
    ///
    /// Profile entries are merged: fields reported by the server overwrite local ones, local
    /// fields the server did not report are kept.
    pub(crate) fn apply_server_state(&mut self, server: Tester) {
        self.id = server.id;
        self.invite_code = server.invite_code;
        self.status = server.status;
        self.email = server.email;
        self.created = server.created.or(self.created);
        self.updated = server.updated.or(self.updated);
        self.profile.extend(server.profile);
    }

    /// Submit local changes to Prefinery.
    pub fn update(&mut self, client: &Client) -> Result<()> {
        client.beta_of(self)?.update_tester(self)
    }

    /// Remove the tester from its beta. On success the tester loses its id.
    pub fn delete(&mut self, client: &Client) -> Result<()> {
        client.beta_of(self)?.delete_tester(self)
    }

    /// Ask Prefinery whether `invite_code` is valid for this tester.
    pub fn validate_code(&self, client: &Client, invite_code: &str) -> Result<bool> {
        client.beta_of(self)?.validate_code(self, invite_code)
    }

    /// Tell Prefinery that the tester has logged in.
    pub fn checkin(&self, client: &Client) -> Result<()> {
        client.beta_of(self)?.checkin_tester(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_from_wire_is_case_insensitive() {
        assert_eq!(TesterStatus::from_wire("Active"), TesterStatus::Active);
        assert_eq!(TesterStatus::from_wire("IMPORTED"), TesterStatus::Imported);
        assert_eq!(TesterStatus::from_wire(" invited "), TesterStatus::Invited);
    }

    #[test]
    fn unrecognized_status_is_unknown() {
        assert_eq!(TesterStatus::from_wire(""), TesterStatus::Unknown);
        assert_eq!(TesterStatus::from_wire("banned"), TesterStatus::Unknown);
        assert_eq!(TesterStatus::from_wire("rejected"), TesterStatus::Unknown);
    }

    #[test]
    fn apply_server_state_merges_profile() {
        let mut tester = Tester::new("a@example.com")
            .with_profile_field("first-name", "Ann")
            .with_profile_field("city", "Oslo");
        let server = Tester {
            id: Some(7),
            email: "a@example.com".to_owned(),
            invite_code: Some("ABC".to_owned()),
            status: TesterStatus::Applied,
            profile: [("city".to_owned(), "Bergen".to_owned())].into(),
            ..Tester::default()
        };

        tester.apply_server_state(server);

        assert_eq!(tester.id(), Some(7));
        assert_eq!(tester.invite_code.as_deref(), Some("ABC"));
        assert_eq!(tester.status, TesterStatus::Applied);
        assert_eq!(tester.profile["first-name"], "Ann");
        assert_eq!(tester.profile["city"], "Bergen");
    }
}
