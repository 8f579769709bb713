// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Minimal XML-RPC codec.
//!
//! Only what the services daemon needs: method calls whose parameters are all
//! strings, and responses carrying either a single string or a fault.
//!
//! ```text
//! <methodCall>
//!   <methodName>atheme.command</methodName>
//!   <params><param><value><string>...</string></value></param>...</params>
//! </methodCall>
//! ```

use crate::error::RpcError;
use roxmltree::{Document, Node};

/// Decoded `methodResponse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Successful call with a string result.
    Value(String),
    /// `<fault>` with its code and message.
    Fault { code: i32, message: String },
}

/// Encode a `methodCall` with string parameters.
pub fn encode_call<'a>(method: &str, params: impl IntoIterator<Item = &'a str>) -> String {
    let mut body = String::from("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
    body.push_str(&escape(method));
    body.push_str("</methodName><params>");
    for param in params {
        body.push_str("<param><value><string>");
        body.push_str(&escape(param));
        body.push_str("</string></value></param>");
    }
    body.push_str("</params></methodCall>\n");
    body
}

/// Decode a `methodResponse` document.
pub fn decode_response(xml: &str) -> Result<Response, RpcError> {
    let doc = Document::parse(xml)
        .map_err(|e| RpcError::Malformed(format!("invalid XML: {}", e)))?;

    let root = doc.root_element();
    if root.tag_name().name() != "methodResponse" {
        return Err(RpcError::Malformed(format!(
            "unexpected root element <{}>",
            root.tag_name().name()
        )));
    }

    if let Some(fault) = child(root, "fault") {
        return decode_fault(fault);
    }

    let value = child(root, "params")
        .and_then(|params| child(params, "param"))
        .and_then(|param| child(param, "value"))
        .ok_or_else(|| RpcError::Malformed("response has no value".into()))?;

    decode_string(value).map(Response::Value)
}

fn decode_fault(fault: Node<'_, '_>) -> Result<Response, RpcError> {
    let fields = child(fault, "value")
        .and_then(|value| child(value, "struct"))
        .ok_or_else(|| RpcError::Malformed("fault without struct".into()))?;

    let mut code = 0;
    let mut message = String::new();

    for member in fields.children().filter(|n| n.has_tag_name("member")) {
        let name = child(member, "name").map(text_of).unwrap_or_default();
        let Some(value) = child(member, "value") else {
            continue;
        };
        match name.as_str() {
            "faultCode" => code = scalar_text(value).trim().parse().unwrap_or_default(),
            "faultString" => message = scalar_text(value),
            _ => {}
        }
    }

    Ok(Response::Fault { code, message })
}

/// String content of a `<value>`: either `<string>` or untyped text.
fn decode_string(value: Node<'_, '_>) -> Result<String, RpcError> {
    match value.children().find(|n| n.is_element()) {
        None => Ok(text_of(value)),
        Some(typed) if typed.has_tag_name("string") => Ok(text_of(typed)),
        Some(other) => Err(RpcError::Malformed(format!(
            "expected string result, got <{}>",
            other.tag_name().name()
        ))),
    }
}

/// Text of a scalar `<value>`, whatever its type element.
fn scalar_text(value: Node<'_, '_>) -> String {
    match value.children().find(|n| n.is_element()) {
        Some(typed) => text_of(typed),
        None => text_of(value),
    }
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn text_of(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_call_escapes_params() {
        let xml = encode_call("atheme.login", ["stats", "p<a&ss>"]);
        assert!(xml.contains("<methodName>atheme.login</methodName>"));
        assert!(xml.contains("<param><value><string>stats</string></value></param>"));
        assert!(xml.contains("<string>p&lt;a&amp;ss&gt;</string>"));
    }

    #[test]
    fn test_encoded_call_is_well_formed() {
        let xml = encode_call("atheme.command", ["cookie", "stats", "*", "ALIS", "LIST"]);
        let doc = Document::parse(&xml).unwrap();
        let params: Vec<String> = doc
            .descendants()
            .filter(|n| n.has_tag_name("string"))
            .map(text_of)
            .collect();
        assert_eq!(params, vec!["cookie", "stats", "*", "ALIS", "LIST"]);
    }

    #[test]
    fn test_decode_string_value() {
        let xml = "<?xml version=\"1.0\"?>\n<methodResponse><params><param>\
                   <value><string>Registered accounts: 120\nUsers currently online: 12</string></value>\
                   </param></params></methodResponse>";
        assert_eq!(
            decode_response(xml).unwrap(),
            Response::Value("Registered accounts: 120\nUsers currently online: 12".into())
        );
    }

    #[test]
    fn test_decode_untyped_value_and_entities() {
        let xml = "<methodResponse><params><param><value>a &amp; b &lt;3</value></param></params></methodResponse>";
        assert_eq!(
            decode_response(xml).unwrap(),
            Response::Value("a & b <3".into())
        );
    }

    #[test]
    fn test_decode_fault() {
        let xml = "<?xml version=\"1.0\"?>
<methodResponse>
<fault>
 <value>
  <struct>
   <member><name>faultCode</name><value><int>4</int></value></member>
   <member><name>faultString</name><value><string>ghost is not registered.</string></value></member>
  </struct>
 </value>
</fault>
</methodResponse>";
        assert_eq!(
            decode_response(xml).unwrap(),
            Response::Fault {
                code: 4,
                message: "ghost is not registered.".into(),
            }
        );
    }

    #[test]
    fn test_decode_rejects_non_string_and_garbage() {
        let xml = "<methodResponse><params><param><value><int>1</int></value></param></params></methodResponse>";
        assert!(matches!(decode_response(xml), Err(RpcError::Malformed(_))));

        assert!(matches!(
            decode_response("<html>502 Bad Gateway</html>"),
            Err(RpcError::Malformed(_))
        ));
        assert!(matches!(
            decode_response("not xml at all"),
            Err(RpcError::Malformed(_))
        ));
    }
}
