//! Request construction: endpoint URLs and XML request bodies.
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use reqwest::{Method, Url};

use crate::{transport::HttpRequest, Error, Result, Tester, TesterStatus};

/// Endpoint layout of the v1 API for one account.
pub(crate) struct Endpoints<'a> {
    pub base_url: &'a str,
    pub api_key: &'a str,
}

impl Endpoints<'_> {
    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut query = vec![("api_key", self.api_key)];
        query.extend_from_slice(params);
        Url::parse_with_params(
            &format!("{}/{}", self.base_url.trim_end_matches('/'), path),
            &query,
        )
        .map_err(Error::InvalidBaseUrl)
    }

    pub fn get_tester(&self, beta_id: u64, tester_id: u64) -> Result<HttpRequest> {
        Ok(HttpRequest {
            method: Method::GET,
            url: self.url(&format!("betas/{beta_id}/testers/{tester_id}.xml"), &[])?,
            body: None,
        })
    }

    pub fn get_tester_by_email(&self, beta_id: u64, email: &str) -> Result<HttpRequest> {
        Ok(HttpRequest {
            method: Method::GET,
            url: self.url(&format!("betas/{beta_id}/testers.xml"), &[("email", email)])?,
            body: None,
        })
    }

    pub fn get_testers(&self, beta_id: u64) -> Result<HttpRequest> {
        Ok(HttpRequest {
            method: Method::GET,
            url: self.url(&format!("betas/{beta_id}/testers.xml"), &[])?,
            body: None,
        })
    }

    pub fn add_tester(&self, beta_id: u64, tester: &Tester) -> Result<HttpRequest> {
        Ok(HttpRequest {
            method: Method::POST,
            url: self.url(&format!("betas/{beta_id}/testers.xml"), &[])?,
            body: Some(tester_body(tester, BodyKind::Create)?),
        })
    }

    pub fn update_tester(&self, beta_id: u64, tester_id: u64, tester: &Tester) -> Result<HttpRequest> {
        Ok(HttpRequest {
            method: Method::PUT,
            url: self.url(&format!("betas/{beta_id}/testers/{tester_id}.xml"), &[])?,
            body: Some(tester_body(tester, BodyKind::Update)?),
        })
    }

    pub fn delete_tester(&self, beta_id: u64, tester_id: u64) -> Result<HttpRequest> {
        Ok(HttpRequest {
            method: Method::DELETE,
            url: self.url(&format!("betas/{beta_id}/testers/{tester_id}.xml"), &[])?,
            body: None,
        })
    }

    pub fn verify_code(&self, beta_id: u64, tester_id: u64, invite_code: &str) -> Result<HttpRequest> {
        Ok(HttpRequest {
            method: Method::GET,
            url: self.url(
                &format!("betas/{beta_id}/testers/{tester_id}/verify.xml"),
                &[("invite_code", invite_code)],
            )?,
            body: None,
        })
    }

    pub fn checkin_by_id(&self, beta_id: u64, tester_id: u64) -> Result<HttpRequest> {
        Ok(HttpRequest {
            method: Method::POST,
            url: self.url(&format!("betas/{beta_id}/testers/{tester_id}/checkin.xml"), &[])?,
            body: None,
        })
    }

    pub fn checkin_by_email(&self, beta_id: u64, email: &str) -> Result<HttpRequest> {
        Ok(HttpRequest {
            method: Method::GET,
            url: self.url(&format!("betas/{beta_id}/checkin.xml"), &[])?,
            body: Some(checkin_body(email)?),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Create,
    Update,
}

/// Serialize `tester` as a `<tester>` document.
///
/// Creation always sends the e-mail; updates send it only when set. Unknown status is never
/// sent, and updates leave out the status of applied/imported testers.
fn tester_body(tester: &Tester, kind: BodyKind) -> Result<String> {
    let mut writer = XmlBody::new()?;
    writer.start("tester")?;

    if kind == BodyKind::Create || !tester.email.is_empty() {
        writer.text_element("email", &tester.email)?;
    }

    if kind == BodyKind::Create {
        if let Some(invite_code) = tester.invite_code.as_deref().filter(|c| !c.is_empty()) {
            writer.text_element("invitation-code", invite_code)?;
        }
    }

    let send_status = match kind {
        BodyKind::Create => tester.status != TesterStatus::Unknown,
        BodyKind::Update => {
            tester.status != TesterStatus::Unknown && !tester.status.is_server_managed()
        }
    };
    if send_status {
        writer.text_element("status", tester.status.as_str())?;
    }

    if !tester.profile.is_empty() {
        if !tester.profile.keys().all(|key| is_element_name(key)) {
            return Err(Error::InvalidArgument {
                name: "profile",
                reason: "profile keys must be valid XML element names",
            });
        }
        writer.start("profile")?;
        for (key, value) in &tester.profile {
            writer.text_element(key, value)?;
        }
        writer.end("profile")?;
    }

    writer.end("tester")?;
    writer.finish()
}

/// Unprefixed XML name: a letter or `_`, then letters, digits, `-`, `_` or `.`.
fn is_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
        }
        _ => false,
    }
}

fn checkin_body(email: &str) -> Result<String> {
    let mut writer = XmlBody::new()?;
    writer.start("checkin")?;
    writer.text_element("email", email)?;
    writer.end("checkin")?;
    writer.finish()
}

/// Thin wrapper over `quick_xml::Writer` that emits the UTF-8 declaration and maps write
/// errors into [`Error::Parse`].
struct XmlBody {
    writer: Writer<Vec<u8>>,
}

impl XmlBody {
    fn new() -> Result<XmlBody> {
        let mut body = XmlBody {
            writer: Writer::new(Vec::new()),
        };
        body.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(body)
    }

    fn write(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|err| Error::Parse(format!("failed to write request body: {err}")))
    }

    fn start(&mut self, name: &str) -> Result<()> {
        self.write(Event::Start(BytesStart::new(name)))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<()> {
        self.start(name)?;
        self.write(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn finish(self) -> Result<String> {
        String::from_utf8(self.writer.into_inner())
            .map_err(|err| Error::Parse(format!("request body is not UTF-8: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENDPOINTS: Endpoints<'static> = Endpoints {
        base_url: "https://acme.prefinery.com/api/v1",
        api_key: "secret",
    };

    #[test]
    fn get_tester_url() {
        let request = ENDPOINTS.get_tester(12, 34).unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(
            request.url.as_str(),
            "https://acme.prefinery.com/api/v1/betas/12/testers/34.xml?api_key=secret"
        );
        assert_eq!(request.body, None);
    }

    #[test]
    fn email_is_query_encoded() {
        let request = ENDPOINTS.get_tester_by_email(12, "a+b@example.com").unwrap();
        assert_eq!(
            request.url.as_str(),
            "https://acme.prefinery.com/api/v1/betas/12/testers.xml?api_key=secret&email=a%2Bb%40example.com"
        );
    }

    #[test]
    fn verify_url_carries_invite_code() {
        let request = ENDPOINTS.verify_code(1, 2, "ABC123").unwrap();
        assert_eq!(
            request.url.as_str(),
            "https://acme.prefinery.com/api/v1/betas/1/testers/2/verify.xml?api_key=secret&invite_code=ABC123"
        );
    }

    #[test]
    fn create_body_contains_all_fields() {
        let tester = Tester::new("ann@example.com")
            .with_invite_code("CODE")
            .with_status(TesterStatus::Invited)
            .with_profile_field("first-name", "Ann");

        let body = tester_body(&tester, BodyKind::Create).unwrap();

        assert_eq!(
            body,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <tester><email>ann@example.com</email>\
             <invitation-code>CODE</invitation-code>\
             <status>invited</status>\
             <profile><first-name>Ann</first-name></profile></tester>"
        );
    }

    #[test]
    fn create_body_skips_unknown_status_and_empty_profile() {
        let body = tester_body(&Tester::new("ann@example.com"), BodyKind::Create).unwrap();
        assert!(!body.contains("<status>"));
        assert!(!body.contains("<profile>"));
        assert!(!body.contains("<invitation-code>"));
    }

    #[test]
    fn update_body_omits_server_managed_status() {
        for status in [TesterStatus::Applied, TesterStatus::Imported] {
            let tester = Tester::new("ann@example.com").with_status(status);
            let body = tester_body(&tester, BodyKind::Update).unwrap();
            assert!(!body.contains("<status>"), "{status} leaked into {body}");
        }

        let tester = Tester::new("ann@example.com")
            .with_status(TesterStatus::Rejected)
            .with_invite_code("CODE");
        let body = tester_body(&tester, BodyKind::Update).unwrap();
        assert!(body.contains("<status>rejected</status>"));
        assert!(!body.contains("<invitation-code>"));
    }

    #[test]
    fn body_values_are_escaped() {
        let tester = Tester::new("a&b@example.com").with_profile_field("company", "<Acme>");
        let body = tester_body(&tester, BodyKind::Create).unwrap();
        assert!(body.contains("<email>a&amp;b@example.com</email>"));
        assert!(body.contains("<company>&lt;Acme&gt;</company>"));
    }

    #[test]
    fn profile_keys_must_be_element_names() {
        for key in ["first name", "", "1st", "<b>", "a:b"] {
            let tester = Tester::new("ann@example.com").with_profile_field(key, "x");
            for kind in [BodyKind::Create, BodyKind::Update] {
                let err = tester_body(&tester, kind).unwrap_err();
                assert!(
                    matches!(err, Error::InvalidArgument { name: "profile", .. }),
                    "{key:?} was accepted"
                );
            }
        }

        let tester = Tester::new("ann@example.com")
            .with_profile_field("_nick", "x")
            .with_profile_field("Straße.2", "y");
        assert!(tester_body(&tester, BodyKind::Create).is_ok());
    }

    #[test]
    fn checkin_by_email_sends_body() {
        let request = ENDPOINTS.checkin_by_email(5, "ann@example.com").unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(
            request.url.as_str(),
            "https://acme.prefinery.com/api/v1/betas/5/checkin.xml?api_key=secret"
        );
        assert_eq!(
            request.body.as_deref(),
            Some("<?xml version=\"1.0\" encoding=\"UTF-8\"?><checkin><email>ann@example.com</email></checkin>")
        );
    }
}
