use serde::{Deserialize, Serialize};

use crate::{config::BetaSettings, invite_code, response::Testers, Client, Error, Result, Tester};

/// A beta whose testers are managed by Prefinery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beta {
    id: u64,
    name: Option<String>,
    decode_key: String,
}

impl Beta {
    /// Create a beta with the id Prefinery uses for it and its invite code decode key.
    pub fn new(id: u64, decode_key: impl Into<String>) -> Beta {
        Beta {
            id,
            name: None,
            decode_key: decode_key.into(),
        }
    }

    /// Set a local label for the beta. This is *not* the name Prefinery knows the beta by.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Identifier of the beta.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Local label of the beta.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The invite code Prefinery hands out to `email` for this beta.
    ///
    /// ```
    /// # use prefinery::Beta;
    /// let beta = Beta::new(1, "decode-key");
    /// let code = beta.invite_code_for("Someone@Example.com");
    /// assert!(beta.is_valid_invite_code("someone@example.com", &code).unwrap());
    /// ```
    pub fn invite_code_for(&self, email: &str) -> String {
        invite_code::derive(&self.decode_key, email)
    }

    /// Check an invite code locally, without asking Prefinery.
    ///
    /// E-mail case is ignored, the code itself is compared exactly. Fails with
    /// [`Error::InvalidArgument`] if either argument is empty.
    pub fn is_valid_invite_code(&self, email: &str, invite_code: &str) -> Result<bool> {
        invite_code::is_valid(&self.decode_key, email, invite_code)
    }
}

impl From<BetaSettings> for Beta {
    fn from(settings: BetaSettings) -> Beta {
        Beta {
            id: settings.id,
            name: settings.name,
            decode_key: settings.decode_key,
        }
    }
}

/// Operations on the testers of a beta.
///
/// Operations that take a `&mut Tester` update it in place with the state reported by the
/// server. Precondition failures are reported before any request is sent, as
/// [`Error::InvalidOperation`] or [`Error::InvalidArgument`].
pub trait TesterRepository {
    /// Find a tester by id.
    fn get_tester(&self, id: u64) -> Result<Tester>;

    /// Find a tester by e-mail address.
    fn get_tester_by_email(&self, email: &str) -> Result<Tester>;

    /// List all testers. Testers are parsed lazily as the returned iterator is consumed.
    fn get_testers(&self) -> Result<Testers>;

    /// Register a new tester.
    ///
    /// The tester must not have an id yet, must have an e-mail address and must not start out
    /// as [`TesterStatus::Rejected`](crate::TesterStatus::Rejected).
    fn add_tester(&self, tester: &mut Tester) -> Result<()>;

    /// Submit changes of a previously added tester.
    fn update_tester(&self, tester: &mut Tester) -> Result<()>;

    /// Remove a tester. On success the tester loses its id and beta association.
    fn delete_tester(&self, tester: &mut Tester) -> Result<()>;

    /// Ask Prefinery whether `invite_code` is valid for `tester`.
    fn validate_code(&self, tester: &Tester, invite_code: &str) -> Result<bool>;

    /// Record that the tester has logged in. Works with either an id or an e-mail address.
    fn checkin_tester(&self, tester: &Tester) -> Result<()>;
}

/// A [`Beta`] bound to the [`Client`] that manages it.
///
/// Obtained through [`Client::beta`], [`Client::beta_by_name`] or [`Client::betas`].
#[derive(Clone, Copy)]
pub struct BetaRef<'c> {
    client: &'c Client<'c>,
    beta: &'c Beta,
}

impl<'c> BetaRef<'c> {
    pub(crate) fn new(client: &'c Client<'c>, beta: &'c Beta) -> BetaRef<'c> {
        BetaRef { client, beta }
    }

    /// The underlying beta.
    pub fn beta(&self) -> &'c Beta {
        self.beta
    }

    /// See [`Beta::is_valid_invite_code`].
    pub fn is_valid_invite_code(&self, email: &str, invite_code: &str) -> Result<bool> {
        self.beta.is_valid_invite_code(email, invite_code)
    }

    /// Id of an added tester of this beta.
    fn owned_tester_id(&self, tester: &Tester, missing: &'static str) -> Result<u64> {
        let id = tester.id.ok_or(Error::InvalidOperation(missing))?;
        match tester.beta_id {
            Some(beta_id) if beta_id != self.beta.id => Err(Error::InvalidOperation(
                "tester belongs to a different beta",
            )),
            _ => Ok(id),
        }
    }
}

impl std::ops::Deref for BetaRef<'_> {
    type Target = Beta;

    fn deref(&self) -> &Beta {
        self.beta
    }
}

impl std::fmt::Debug for BetaRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BetaRef").field(&self.beta.id).finish()
    }
}

impl TesterRepository for BetaRef<'_> {
    fn get_tester(&self, id: u64) -> Result<Tester> {
        self.client.fetch_tester(self.beta.id, id)
    }

    fn get_tester_by_email(&self, email: &str) -> Result<Tester> {
        self.client.fetch_tester_by_email(self.beta.id, email)
    }

    fn get_testers(&self) -> Result<Testers> {
        self.client.fetch_testers(self.beta.id)
    }

    fn add_tester(&self, tester: &mut Tester) -> Result<()> {
        if tester.id.is_some() {
            return Err(Error::InvalidOperation("tester has an id and was already added"));
        }
        if tester.email.is_empty() {
            return Err(Error::InvalidArgument {
                name: "tester",
                reason: "needs an e-mail address before it can be added",
            });
        }
        if tester.status == crate::TesterStatus::Rejected {
            return Err(Error::InvalidArgument {
                name: "tester",
                reason: "must be added before it can be rejected",
            });
        }

        let created = self.client.create_tester(self.beta.id, tester)?;
        tester.apply_server_state(created);
        tester.beta_id = Some(self.beta.id);
        Ok(())
    }

    fn update_tester(&self, tester: &mut Tester) -> Result<()> {
        let id = self.owned_tester_id(tester, "add tester before updating it")?;
        let updated = self.client.modify_tester(self.beta.id, id, tester)?;
        tester.apply_server_state(updated);
        Ok(())
    }

    fn delete_tester(&self, tester: &mut Tester) -> Result<()> {
        let id = self.owned_tester_id(tester, "tester needs to be added before being deleted")?;
        self.client.remove_tester(self.beta.id, id)?;
        tester.id = None;
        tester.beta_id = None;
        Ok(())
    }

    fn validate_code(&self, tester: &Tester, invite_code: &str) -> Result<bool> {
        let id = self.owned_tester_id(tester, "tester needs an id before invite codes can be validated")?;
        if invite_code.is_empty() {
            return Err(Error::InvalidArgument {
                name: "invite_code",
                reason: "must not be empty",
            });
        }
        self.client.verify_code(self.beta.id, id, invite_code)
    }

    fn checkin_tester(&self, tester: &Tester) -> Result<()> {
        if tester.id.is_some() {
            let id = self.owned_tester_id(tester, "tester needs an id")?;
            self.client.checkin_by_id(self.beta.id, id)
        } else if !tester.email.is_empty() {
            self.client.checkin_by_email(self.beta.id, &tester.email)
        } else {
            Err(Error::InvalidArgument {
                name: "tester",
                reason: "needs either an id or an e-mail address to be checked in",
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beta_from_settings() {
        let beta = Beta::from(BetaSettings {
            id: 9,
            name: Some("launch".to_owned()),
            decode_key: "key".to_owned(),
        });
        assert_eq!(beta.id(), 9);
        assert_eq!(beta.name(), Some("launch"));
        assert_eq!(beta.invite_code_for("a@example.com"), invite_code::derive("key", "a@example.com"));
    }

    #[test]
    fn local_invite_code_check() {
        let beta = Beta::new(1, "decode");
        let code = beta.invite_code_for("tester@example.com");
        assert!(beta.is_valid_invite_code("TESTER@example.com", &code).unwrap());
        assert!(!beta.is_valid_invite_code("other@example.com", &code).unwrap());
        assert!(beta.is_valid_invite_code("tester@example.com", "").is_err());
    }
}
