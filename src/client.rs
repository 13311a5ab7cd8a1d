use crate::{
    beta::BetaRef,
    request::Endpoints,
    response::{self, Testers},
    transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport},
    Beta, ClientConfig, Error, Result, Tester,
};

/// A client for the Prefinery API.
///
/// In order to create a client instance, first create [`ClientConfig`]. Tester operations are
/// reached through the betas registered with the client:
///
/// ```no_run
/// # use prefinery::{Beta, ClientConfig, Tester, TesterRepository};
/// # fn main() -> prefinery::Result<()> {
/// let client = ClientConfig::new("acme", "api-key")
///     .beta(Beta::new(1234, "decode-key"))
///     .to_client();
///
/// let beta = client.beta(1234).expect("beta is registered");
/// let mut tester = Tester::new("someone@example.com");
/// beta.add_tester(&mut tester)?;
/// # Ok(())
/// # }
/// ```
///
/// Every operation issues exactly one blocking HTTP request.
pub struct Client<'a> {
    config: ClientConfig<'a>,
    transport: Box<dyn Transport + Send + Sync + 'a>,
    base_url: String,
}

impl<'a> Client<'a> {
    /// Create a new `Client` using the specified configuration.
    pub fn new(mut config: ClientConfig<'a>) -> Self {
        let base_url = config.effective_base_url();
        let transport: Box<dyn Transport + Send + Sync + 'a> = match config.transport.take() {
            Some(transport) => transport,
            None => Box::new(ReqwestTransport::new()),
        };
        Client {
            config,
            transport,
            base_url,
        }
    }

    /// Account name used as API subdomain.
    pub fn account_name(&self) -> &str {
        &self.config.account_name
    }

    /// Find a beta by id.
    pub fn beta(&self, id: u64) -> Option<BetaRef<'_>> {
        self.config
            .betas
            .iter()
            .find(|beta| beta.id() == id)
            .map(|beta| BetaRef::new(self, beta))
    }

    /// Find a beta by its local name.
    pub fn beta_by_name(&self, name: &str) -> Option<BetaRef<'_>> {
        self.config
            .betas
            .iter()
            .find(|beta| beta.name() == Some(name))
            .map(|beta| BetaRef::new(self, beta))
    }

    /// All betas managed by the client.
    pub fn betas(&self) -> impl Iterator<Item = BetaRef<'_>> {
        let client = self.reborrow();
        client
            .config
            .betas
            .iter()
            .map(move |beta| BetaRef::new(client, beta))
    }

    /// Shorten `'a` to the borrow of `self` so returned iterators don't capture it.
    fn reborrow(&self) -> &Client<'_> {
        self
    }

    /// Start managing `beta`. A beta already registered under the same id is replaced.
    pub fn add_beta(&mut self, beta: Beta) {
        match self.config.betas.iter_mut().find(|b| b.id() == beta.id()) {
            Some(existing) => *existing = beta,
            None => self.config.betas.push(beta),
        }
    }

    /// The beta `tester` belongs to.
    pub fn beta_of(&self, tester: &Tester) -> Result<BetaRef<'_>> {
        let beta_id = tester.beta_id().ok_or(Error::InvalidOperation(
            "tester is not associated with a beta",
        ))?;
        self.beta(beta_id).ok_or(Error::UnknownBeta(beta_id))
    }

    fn endpoints(&self) -> Endpoints<'_> {
        Endpoints {
            base_url: &self.base_url,
            api_key: &self.config.api_key,
        }
    }

    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method.clone();
        let response = self.transport.execute(request).inspect_err(|err| {
            log::warn!(target: "prefinery", method = method.as_str(); "request failed: {:?}", err);
        })?;
        log::trace!(target: "prefinery",
                    method = method.as_str(),
                    status = response.status.as_u16();
                    "received response");
        Ok(response)
    }

    pub(crate) fn fetch_tester(&self, beta_id: u64, tester_id: u64) -> Result<Tester> {
        log::debug!(target: "prefinery", beta_id, tester_id; "fetching tester");
        let response = self.execute(self.endpoints().get_tester(beta_id, tester_id)?)?;
        let tester = response::first_tester(response, beta_id)?;
        log::debug!(target: "prefinery", beta_id, tester_id; "fetched tester");
        Ok(tester)
    }

    pub(crate) fn fetch_tester_by_email(&self, beta_id: u64, email: &str) -> Result<Tester> {
        log::debug!(target: "prefinery", beta_id; "fetching tester by e-mail");
        let response = self.execute(self.endpoints().get_tester_by_email(beta_id, email)?)?;
        let tester = response::first_tester(response, beta_id)?;
        log::debug!(target: "prefinery", beta_id, tester_id = tester.id().unwrap_or_default(); "fetched tester by e-mail");
        Ok(tester)
    }

    pub(crate) fn fetch_testers(&self, beta_id: u64) -> Result<Testers> {
        log::debug!(target: "prefinery", beta_id; "fetching testers");
        let response = self.execute(self.endpoints().get_testers(beta_id)?)?;
        let testers = response::testers(response, beta_id)?;
        log::debug!(target: "prefinery", beta_id; "fetched testers");
        Ok(testers)
    }

    /// Returns the tester as stored by Prefinery.
    pub(crate) fn create_tester(&self, beta_id: u64, tester: &Tester) -> Result<Tester> {
        log::debug!(target: "prefinery", beta_id; "adding tester");
        let response = self.execute(self.endpoints().add_tester(beta_id, tester)?)?;
        let created = response::first_tester(response, beta_id)?;
        log::debug!(target: "prefinery", beta_id, tester_id = created.id().unwrap_or_default(); "added tester");
        Ok(created)
    }

    /// Returns the tester as stored by Prefinery.
    pub(crate) fn modify_tester(&self, beta_id: u64, tester_id: u64, tester: &Tester) -> Result<Tester> {
        log::debug!(target: "prefinery", beta_id, tester_id; "updating tester");
        let response = self.execute(self.endpoints().update_tester(beta_id, tester_id, tester)?)?;
        let updated = response::first_tester(response, beta_id)?;
        log::debug!(target: "prefinery", beta_id, tester_id; "updated tester");
        Ok(updated)
    }

    pub(crate) fn remove_tester(&self, beta_id: u64, tester_id: u64) -> Result<()> {
        log::debug!(target: "prefinery", beta_id, tester_id; "deleting tester");
        let response = self.execute(self.endpoints().delete_tester(beta_id, tester_id)?)?;
        response::expect_ok(response)?;
        log::debug!(target: "prefinery", beta_id, tester_id; "deleted tester");
        Ok(())
    }

    pub(crate) fn verify_code(&self, beta_id: u64, tester_id: u64, invite_code: &str) -> Result<bool> {
        log::debug!(target: "prefinery", beta_id, tester_id; "verifying invite code");
        let response = self.execute(self.endpoints().verify_code(beta_id, tester_id, invite_code)?)?;
        let valid = response::verification(response)?;
        log::debug!(target: "prefinery", beta_id, tester_id, valid; "verified invite code");
        Ok(valid)
    }

    pub(crate) fn checkin_by_id(&self, beta_id: u64, tester_id: u64) -> Result<()> {
        log::debug!(target: "prefinery", beta_id, tester_id; "checking in tester");
        let response = self.execute(self.endpoints().checkin_by_id(beta_id, tester_id)?)?;
        response::expect_ok(response)?;
        log::debug!(target: "prefinery", beta_id, tester_id; "checked in tester");
        Ok(())
    }

    pub(crate) fn checkin_by_email(&self, beta_id: u64, email: &str) -> Result<()> {
        log::debug!(target: "prefinery", beta_id; "checking in tester by e-mail");
        let response = self.execute(self.endpoints().checkin_by_email(beta_id, email)?)?;
        response::expect_ok(response)?;
        log::debug!(target: "prefinery", beta_id; "checked in tester by e-mail");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use reqwest::StatusCode;

    use super::*;
    use crate::TesterRepository;

    #[derive(Clone, Default)]
    struct Recorder {
        requests: Arc<Mutex<Vec<HttpRequest>>>,
    }

    impl Transport for Recorder {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push(request);
            Ok(HttpResponse::new(StatusCode::OK, "<tester><id>1</id></tester>"))
        }
    }

    fn client(recorder: &Recorder) -> Client<'static> {
        ClientConfig::new("acme", "key")
            .beta(Beta::new(1, "one").with_name("first"))
            .beta(Beta::new(2, "two"))
            .transport(recorder.clone())
            .to_client()
    }

    #[test]
    fn finds_betas_by_id_and_name() {
        let client = client(&Recorder::default());

        assert_eq!(client.beta(2).map(|b| b.id()), Some(2));
        assert_eq!(client.beta_by_name("first").map(|b| b.id()), Some(1));
        assert!(client.beta(3).is_none());
        assert!(client.beta_by_name("missing").is_none());
        assert_eq!(client.betas().count(), 2);
    }

    #[test]
    fn add_beta_replaces_same_id() {
        let mut client = client(&Recorder::default());

        client.add_beta(Beta::new(2, "new").with_name("second"));
        client.add_beta(Beta::new(3, "three"));

        assert_eq!(client.betas().count(), 3);
        assert_eq!(client.beta_by_name("second").map(|b| b.id()), Some(2));
    }

    #[test]
    fn beta_of_requires_association() {
        let client = client(&Recorder::default());

        let tester = Tester::new("a@example.com");
        assert!(matches!(
            client.beta_of(&tester),
            Err(Error::InvalidOperation(_))
        ));

        let tester = Tester {
            beta_id: Some(99),
            ..Tester::default()
        };
        assert!(matches!(client.beta_of(&tester), Err(Error::UnknownBeta(99))));
    }

    #[test]
    fn requests_go_to_account_subdomain() {
        let recorder = Recorder::default();
        let client = client(&recorder);

        client.beta(1).unwrap().get_tester(5).unwrap();

        let requests = recorder.requests.lock().unwrap();
        assert_eq!(
            requests[0].url.as_str(),
            "https://acme.prefinery.com/api/v1/betas/1/testers/5.xml?api_key=key"
        );
    }
}
