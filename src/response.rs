//! Response handling: status classification and streaming tester parsing.
use std::io::{BufRead, Cursor};

use chrono::{DateTime, FixedOffset};
use quick_xml::{events::Event, Reader};
use reqwest::StatusCode;

use crate::{transport::HttpResponse, Error, Result, Tester, TesterStatus};

const UNSPECIFIED_ERROR: &str = "unspecified error";

/// Classify a response to a tester-returning request.
///
/// 200 and 201 yield a lazy iterator over every `<tester>` in the body. Any other status is
/// turned into [`Error::Service`] carrying the text of the first `<error>` element.
pub(crate) fn testers(response: HttpResponse, beta_id: u64) -> Result<Testers> {
    match response.status {
        StatusCode::OK | StatusCode::CREATED => Ok(Testers::new(response.body, beta_id)),
        status => {
            let message = error_message(&response.body);
            log::warn!(target: "prefinery", status = status.as_u16(); "request failed: {}", message);
            Err(Error::service(message, status))
        }
    }
}

/// Expect exactly the first tester of a successful response.
pub(crate) fn first_tester(response: HttpResponse, beta_id: u64) -> Result<Tester> {
    let status = response.status;
    testers(response, beta_id)?
        .next()
        .unwrap_or_else(|| Err(Error::service("response did not contain a tester", status)))
}

/// Succeed on 200 only, otherwise fail with the status reason phrase.
pub(crate) fn expect_ok(response: HttpResponse) -> Result<()> {
    if response.status == StatusCode::OK {
        Ok(())
    } else {
        log::warn!(target: "prefinery", status = response.status.as_u16(); "unexpected response status");
        Err(Error::service(response.reason, response.status))
    }
}

/// 200 is `true`, server errors are errors, everything else is `false`.
pub(crate) fn verification(response: HttpResponse) -> Result<bool> {
    match response.status {
        StatusCode::OK => Ok(true),
        status if status.is_server_error() => Err(Error::service(response.reason, status)),
        _ => Ok(false),
    }
}

/// Text of the first `<error>` element, or a generic message if there is none. Malformed bodies
/// (e.g. HTML error pages) also produce the generic message.
fn error_message(body: &[u8]) -> String {
    let mut reader = xml_reader(body.to_vec());
    let mut buf = Vec::new();
    loop {
        match next_node(&mut reader, &mut buf) {
            Ok(Node::Start(name)) if name.eq_ignore_ascii_case("error") => {
                return read_text(&mut reader, &mut buf)
                    .unwrap_or_else(|_| UNSPECIFIED_ERROR.to_owned());
            }
            Ok(Node::Eof) | Err(_) => return UNSPECIFIED_ERROR.to_owned(),
            Ok(_) => {}
        }
    }
}

/// Text nodes are kept verbatim. Whitespace between elements only reaches arms that ignore it.
fn xml_reader(body: Vec<u8>) -> Reader<Cursor<Vec<u8>>> {
    Reader::from_reader(Cursor::new(body))
}

/// Owned view of the XML events the parser cares about.
#[derive(Debug, PartialEq, Eq)]
enum Node {
    Start(String),
    Empty(String),
    End(String),
    Text(String),
    Eof,
    Other,
}

fn next_node<R: BufRead>(reader: &mut Reader<R>, buf: &mut Vec<u8>) -> Result<Node> {
    buf.clear();
    let node = match reader.read_event_into(buf)? {
        Event::Start(e) => Node::Start(element_name(e.name().as_ref())),
        Event::Empty(e) => Node::Empty(element_name(e.name().as_ref())),
        Event::End(e) => Node::End(element_name(e.name().as_ref())),
        Event::Text(e) => Node::Text(e.unescape()?.into_owned()),
        Event::CData(e) => Node::Text(String::from_utf8_lossy(&e).into_owned()),
        Event::Eof => Node::Eof,
        _ => Node::Other,
    };
    Ok(node)
}

fn element_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Lazy sequence of testers found in a response body.
///
/// Each `<tester>` element in document order produces one item. The sequence ends at the end of
/// the document or after the first error, and cannot be restarted.
pub struct Testers {
    reader: Reader<Cursor<Vec<u8>>>,
    buf: Vec<u8>,
    beta_id: u64,
    done: bool,
}

impl Testers {
    fn new(body: Vec<u8>, beta_id: u64) -> Testers {
        Testers {
            reader: xml_reader(body),
            buf: Vec::new(),
            beta_id,
            done: false,
        }
    }

    fn next_tester(&mut self) -> Result<Option<Tester>> {
        loop {
            let mut tester = match next_node(&mut self.reader, &mut self.buf)? {
                Node::Start(name) if name.eq_ignore_ascii_case("tester") => {
                    parse_tester(&mut self.reader, &mut self.buf)?
                }
                Node::Empty(name) if name.eq_ignore_ascii_case("tester") => Tester::default(),
                Node::Eof => return Ok(None),
                _ => continue,
            };
            tester.beta_id = Some(self.beta_id);
            return Ok(Some(tester));
        }
    }
}

impl Iterator for Testers {
    type Item = Result<Tester>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let next = self.next_tester().transpose();
        if !matches!(next, Some(Ok(_))) {
            self.done = true;
        }
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    InTester,
    InProfile,
}

/// Parse the body of a `<tester>` element. The reader must be positioned right after its start
/// tag; on success it is left right after the matching end tag.
fn parse_tester<R: BufRead>(reader: &mut Reader<R>, buf: &mut Vec<u8>) -> Result<Tester> {
    let mut state = State::InTester;
    let mut tester = Tester::default();

    loop {
        match (state, next_node(reader, buf)?) {
            (State::InTester, Node::End(name)) if name.eq_ignore_ascii_case("tester") => {
                return Ok(tester);
            }
            (State::InTester, Node::Start(name)) if name.eq_ignore_ascii_case("profile") => {
                state = State::InProfile;
            }
            (State::InTester, Node::Start(name)) => {
                let value = read_text(reader, buf)?;
                assign_field(&mut tester, &name, value);
            }
            (State::InTester, Node::Empty(name)) => assign_field(&mut tester, &name, String::new()),
            (State::InProfile, Node::End(name)) if name.eq_ignore_ascii_case("profile") => {
                state = State::InTester;
            }
            (State::InProfile, Node::Start(field)) => {
                let value = read_text(reader, buf)?;
                tester.profile.insert(field, value);
            }
            (State::InProfile, Node::Empty(field)) => {
                tester.profile.insert(field, String::new());
            }
            (_, Node::Eof) => {
                return Err(Error::Parse(
                    "unexpected end of document inside <tester>".to_owned(),
                ));
            }
            _ => {}
        }
    }
}

/// Known tester fields. Matching is case-insensitive, unknown fields are ignored.
fn assign_field(tester: &mut Tester, name: &str, value: String) {
    match name.to_ascii_lowercase().as_str() {
        "email" => tester.email = value,
        // Unparsable ids are kept as 0 rather than rejected.
        "id" => tester.id = Some(value.trim().parse().unwrap_or_default()),
        "invitation-code" => tester.invite_code = Some(value),
        "status" => tester.status = TesterStatus::from_wire(&value),
        "created-at" => tester.created = parse_timestamp(&value),
        "updated-at" => tester.updated = parse_timestamp(&value),
        _ => {}
    }
}

/// Lenient timestamp parsing: RFC 3339 first, then the `2009-05-12 10:21:15 -0700` form.
/// Anything else is silently treated as absent.
fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S %z"))
        .ok()
}

/// Read the text content of the element whose start tag was just consumed, up to and including
/// its end tag. Text of nested elements is concatenated.
fn read_text<R: BufRead>(reader: &mut Reader<R>, buf: &mut Vec<u8>) -> Result<String> {
    let mut text = String::new();
    let mut depth = 0usize;
    loop {
        match next_node(reader, buf)? {
            Node::Text(chunk) => text.push_str(&chunk),
            Node::Start(_) => depth += 1,
            Node::End(_) if depth == 0 => return Ok(text),
            Node::End(_) => depth -= 1,
            Node::Eof => {
                return Err(Error::Parse(
                    "unexpected end of document inside element".to_owned(),
                ))
            }
            Node::Empty(_) | Node::Other => {}
        }
    }
}
