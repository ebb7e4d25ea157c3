//! Gateway response decoding and classification

use crate::error::{GENERIC_FAILURE_MESSAGE, PaymentError, PaymentResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::Serialize;
use std::collections::BTreeMap;

/// Child elements of one XML node, by local tag name.
pub type XmlFields = BTreeMap<String, XmlValue>;

/// Decoded XML element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum XmlValue {
    Text(String),
    Node(XmlFields),
    /// Repeated sibling tags.
    List(Vec<XmlValue>),
}

impl XmlValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            XmlValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

struct Frame {
    name: String,
    text: String,
    children: XmlFields,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            text: String::new(),
            children: XmlFields::new(),
        }
    }

    fn into_value(self) -> (String, XmlValue) {
        let value = if self.children.is_empty() {
            XmlValue::Text(self.text)
        } else {
            XmlValue::Node(self.children)
        };
        (self.name, value)
    }
}

fn insert(fields: &mut XmlFields, name: String, value: XmlValue) {
    match fields.remove(&name) {
        None => {
            fields.insert(name, value);
        }
        Some(XmlValue::List(mut items)) => {
            items.push(value);
            fields.insert(name, XmlValue::List(items));
        }
        Some(existing) => {
            fields.insert(name, XmlValue::List(vec![existing, value]));
        }
    }
}

fn element_name(element: &BytesStart<'_>) -> PaymentResult<String> {
    let local = element.local_name();
    std::str::from_utf8(local.as_ref())
        .map(str::to_string)
        .map_err(|e| PaymentError::MalformedResponse(e.to_string()))
}

/// Parse an XML document into the fields below its root element.
/// Namespace prefixes are dropped, empty elements decode to `""` and leaf
/// text is kept exactly as sent.
pub fn parse_fields(xml: &str) -> PaymentResult<XmlFields> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<XmlFields> = None;

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                if root.is_some() && stack.is_empty() {
                    return Err(PaymentError::MalformedResponse(
                        "multiple root elements".into(),
                    ));
                }
                stack.push(Frame::new(element_name(&element)?));
            }
            Event::Empty(element) => {
                let name = element_name(&element)?;
                match stack.last_mut() {
                    Some(parent) => insert(&mut parent.children, name, XmlValue::Text(String::new())),
                    None if root.is_none() => root = Some(XmlFields::new()),
                    None => {
                        return Err(PaymentError::MalformedResponse(
                            "multiple root elements".into(),
                        ));
                    }
                }
            }
            Event::Text(text) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::End(_) => {
                let frame = stack.pop().ok_or_else(|| {
                    PaymentError::MalformedResponse("unexpected closing tag".into())
                })?;
                let (name, value) = frame.into_value();
                match stack.last_mut() {
                    Some(parent) => insert(&mut parent.children, name, value),
                    None => {
                        root = Some(match value {
                            XmlValue::Node(fields) => fields,
                            _ => XmlFields::new(),
                        })
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(PaymentError::MalformedResponse(format!(
            "unclosed element <{}>",
            open.name
        )));
    }

    root.ok_or_else(|| PaymentError::MalformedResponse("empty response body".into()))
}

/// Typed view of a `ProcessCreditCard` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayResponse {
    /// `0` is approval; anything else is a decline code.
    pub result: i64,
    pub resp_msg: Option<String>,
    pub message: Option<String>,
    pub auth_code: Option<String>,
    pub pn_ref: Option<String>,
    pub host_code: Option<String>,
    pub avs_result: Option<String>,
    pub avs_result_text: Option<String>,
    pub street_match_text: Option<String>,
    pub zip_match_text: Option<String>,
    pub cv_result: Option<String>,
    pub cv_result_text: Option<String>,
    /// Every field as received.
    pub raw: XmlFields,
}

impl GatewayResponse {
    pub fn parse(xml: &str) -> PaymentResult<Self> {
        Self::from_fields(parse_fields(xml)?)
    }

    pub fn from_fields(raw: XmlFields) -> PaymentResult<Self> {
        let result = match raw.get("Result") {
            Some(XmlValue::Text(code)) => code.trim().parse::<i64>().map_err(|_| {
                PaymentError::MalformedResponse(format!("non-numeric Result: {:?}", code))
            })?,
            Some(_) => {
                return Err(PaymentError::MalformedResponse(
                    "Result is not a text element".into(),
                ));
            }
            None => {
                return Err(PaymentError::MalformedResponse(
                    "Result missing from response".into(),
                ));
            }
        };

        // Blank counts as absent; anything else passes through untouched.
        let text = |key: &str| {
            raw.get(key)
                .and_then(XmlValue::as_text)
                .filter(|value| !value.trim().is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            result,
            resp_msg: text("RespMSG"),
            message: text("Message"),
            auth_code: text("AuthCode"),
            pn_ref: text("PNRef"),
            host_code: text("HostCode"),
            avs_result: text("GetAVSResult"),
            avs_result_text: text("GetAVSResultTXT"),
            street_match_text: text("GetStreetMatchTXT"),
            zip_match_text: text("GetZipMatchTXT"),
            cv_result: text("GetCVResult"),
            cv_result_text: text("GetCVResultTXT"),
            raw,
        })
    }

    pub fn is_approved(&self) -> bool {
        self.result == 0
    }

    /// Raw fields as JSON, for the payment's audit data.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.raw).unwrap_or(serde_json::Value::Null)
    }
}

/// Approved authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
    pub pn_ref: String,
    pub auth_code: Option<String>,
    pub response: GatewayResponse,
}

/// Classified gateway outcome. Transport failures never get this far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    Approved(Approval),
    Declined { code: i64, message: String },
    AvsFailed { avs_result: Option<String>, message: String },
}

impl GatewayOutcome {
    /// Approval, or the error the caller should see.
    pub fn into_approval(self) -> PaymentResult<Approval> {
        match self {
            GatewayOutcome::Approved(approval) => Ok(approval),
            GatewayOutcome::Declined { code, message } => {
                Err(PaymentError::Declined { code, message })
            }
            GatewayOutcome::AvsFailed { message, .. } => Err(PaymentError::AvsFailed(message)),
        }
    }
}

/// Classify a decoded response. With `avs_check` on, an approval whose
/// AVS result is anything but `Y` is rejected.
pub fn interpret(response: GatewayResponse, avs_check: bool) -> PaymentResult<GatewayOutcome> {
    if !response.is_approved() {
        let message = response
            .resp_msg
            .clone()
            .or_else(|| response.message.clone())
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
        return Ok(GatewayOutcome::Declined {
            code: response.result,
            message,
        });
    }

    if avs_check && response.avs_result.as_deref() != Some("Y") {
        return Ok(GatewayOutcome::AvsFailed {
            avs_result: response.avs_result.clone(),
            message: response.avs_result_text.clone().unwrap_or_default(),
        });
    }

    let pn_ref = response.pn_ref.clone().ok_or_else(|| {
        PaymentError::MalformedResponse("approved response carries no PNRef".into())
    })?;

    Ok(GatewayOutcome::Approved(Approval {
        pn_ref,
        auth_code: response.auth_code.clone(),
        response,
    }))
}
