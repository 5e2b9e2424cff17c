//! Callback-driven XML reading on top of `quick-xml`.
//!
//! [`drive`] turns the pull events of a `quick_xml::Reader` into calls on a
//! [`SaxHandler`]. Every callback returns `true` to keep going; `false` stops
//! the read immediately.
//!
//! Problems are reported at three levels:
//!
//! - **warning**: the document is readable but something was dropped or kept
//!   verbatim (an unknown entity, say)
//! - **error**: a well-formedness problem the reader can step over, such as a
//!   malformed or repeated attribute
//! - **fatal error**: the reader cannot continue (syntax error, mismatched
//!   end tag, document ending inside an open element)

use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;
use std::fmt;
use std::io::BufRead;

/// A problem found while reading, with the byte offset it was found at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlIssue {
    pub position: u64,
    pub message: String,
}

impl fmt::Display for XmlIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "byte {}: {}", self.position, self.message)
    }
}

/// Attributes of a start tag, decoded and unescaped, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    /// Value of the attribute with qualified name `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Receiver of document events.
///
/// Element names are passed exactly as written, prefix included
/// (`atom:link`), so handlers that only know unprefixed names ignore
/// namespaced extensions for free.
pub trait SaxHandler {
    fn start_document(&mut self) -> bool {
        true
    }

    fn start_element(&mut self, name: &str, attributes: &Attributes) -> bool;

    /// Character data. May arrive in several pieces for one text node
    /// (text, then CDATA, then text again).
    fn characters(&mut self, text: &str) -> bool;

    fn end_element(&mut self, name: &str) -> bool;

    fn end_document(&mut self) -> bool {
        true
    }

    fn warning(&mut self, issue: &XmlIssue) -> bool {
        tracing::warn!(%issue, "XML warning");
        true
    }

    fn error(&mut self, issue: &XmlIssue) -> bool;

    fn fatal_error(&mut self, issue: &XmlIssue) -> bool;
}

/// Reads `input` to the end, feeding `handler`.
///
/// Returns `true` only if the whole document was read and every callback
/// asked to continue.
pub fn drive<R: BufRead, H: SaxHandler>(input: R, handler: &mut H) -> bool {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut open: Vec<String> = Vec::new();

    if !handler.start_document() {
        return false;
    }

    loop {
        let position = reader.buffer_position() as u64;
        let keep_going = match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = element_name(&e);
                let attributes = match collect_attributes(&e, reader.decoder(), position, handler) {
                    Some(attributes) => attributes,
                    None => return false,
                };
                let keep_going = handler.start_element(&name, &attributes);
                open.push(name);
                keep_going
            }
            Ok(Event::Empty(e)) => {
                let name = element_name(&e);
                let attributes = match collect_attributes(&e, reader.decoder(), position, handler) {
                    Some(attributes) => attributes,
                    None => return false,
                };
                handler.start_element(&name, &attributes) && handler.end_element(&name)
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                open.pop();
                handler.end_element(&name)
            }
            Ok(Event::Text(e)) => {
                let text = match e.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(err) => {
                        let issue = XmlIssue {
                            position,
                            message: format!("{err}; keeping text verbatim"),
                        };
                        if !handler.warning(&issue) {
                            return false;
                        }
                        decode_lossy(reader.decoder(), &e)
                    }
                };
                text.is_empty() || handler.characters(&text)
            }
            Ok(Event::CData(e)) => {
                let text = decode_lossy(reader.decoder(), &e);
                text.is_empty() || handler.characters(&text)
            }
            Ok(Event::Eof) => {
                if let Some(name) = open.last() {
                    let issue = XmlIssue {
                        position: reader.buffer_position() as u64,
                        message: format!("document ended inside <{name}>"),
                    };
                    handler.fatal_error(&issue);
                    return false;
                }
                return handler.end_document();
            }
            // Declarations, comments, processing instructions and doctypes
            // carry nothing the handlers use.
            Ok(_) => true,
            Err(err) => {
                let issue = XmlIssue {
                    position: reader.buffer_position() as u64,
                    message: err.to_string(),
                };
                handler.fatal_error(&issue);
                return false;
            }
        };

        if !keep_going {
            return false;
        }
        buf.clear();
    }
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

/// Decodes attributes, reporting problems through the handler.
///
/// Returns `None` when the handler asked to stop.
fn collect_attributes<H: SaxHandler>(
    e: &BytesStart<'_>,
    decoder: Decoder,
    position: u64,
    handler: &mut H,
) -> Option<Attributes> {
    let mut attributes = Vec::new();
    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(err) => {
                let issue = XmlIssue {
                    position,
                    message: format!("malformed attribute: {err}"),
                };
                if !handler.error(&issue) {
                    return None;
                }
                continue;
            }
        };
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = match attr.decode_and_unescape_value(decoder) {
            Ok(value) => value.into_owned(),
            Err(err) => {
                let issue = XmlIssue {
                    position,
                    message: format!("attribute {key}: {err}; keeping value verbatim"),
                };
                if !handler.warning(&issue) {
                    return None;
                }
                decode_lossy(decoder, &attr.value)
            }
        };
        attributes.push((key, value));
    }
    Some(Attributes(attributes))
}

fn decode_lossy(decoder: Decoder, bytes: &[u8]) -> String {
    decoder
        .decode(bytes)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned())
}
