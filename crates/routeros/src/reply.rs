//! Reply sentences received from the router.
//!
//! Every reply sentence starts with one of four marker words: `!re` for a
//! data row, `!done` when a command finishes, `!trap` for a command error
//! and `!fatal` when the router is about to drop the connection. The
//! remaining words are attributes of the form `=name=value`.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// One parsed reply sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A data row (`!re`) with its attributes.
    Row(HashMap<String, String>),
    /// Command completion (`!done`), with any trailing attributes such as
    /// the `ret` challenge older routers send after `/login`.
    Done(HashMap<String, String>),
    /// A command error (`!trap`).
    Trap {
        /// Optional trap category.
        category: Option<String>,
        /// Human-readable error message.
        message: String,
    },
    /// A connection-fatal error (`!fatal`); the router closes after this.
    Fatal(String),
}

/// All rows and the final `!done` attributes of one command exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Attribute maps of every `!re` sentence, in arrival order.
    pub rows: Vec<HashMap<String, String>>,
    /// Attributes of the closing `!done` sentence.
    pub done: HashMap<String, String>,
}

impl Response {
    /// The `ret` value of the `!done` sentence, if the router sent one.
    ///
    /// Routers older than 6.43 answer `/login` with `=ret=<challenge>`
    /// instead of accepting plaintext credentials.
    #[must_use]
    pub fn ret(&self) -> Option<&str> {
        self.done.get("ret").map(String::as_str)
    }
}

/// Parse one reply sentence.
///
/// Attribute words that are not `=name=value` shaped (for example `.tag`
/// words from tagged commands) are skipped rather than rejected.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the sentence is empty or does not start
/// with a known marker word.
pub fn parse_reply(words: &[String]) -> Result<Reply> {
    let Some(marker) = words.first() else {
        return Err(Error::protocol("empty reply sentence"));
    };
    let rest = &words[1..];

    match marker.as_str() {
        "!re" => Ok(Reply::Row(parse_attributes(rest))),
        "!done" => Ok(Reply::Done(parse_attributes(rest))),
        "!trap" => {
            let mut attrs = parse_attributes(rest);
            let message = attrs
                .remove("message")
                .unwrap_or_else(|| "unknown error".to_string());
            Ok(Reply::Trap {
                category: attrs.remove("category"),
                message,
            })
        }
        "!fatal" => Ok(Reply::Fatal(rest.join(" "))),
        other => Err(Error::protocol(format!(
            "unexpected reply word '{other}'"
        ))),
    }
}

/// Collect `=name=value` words into a map.
fn parse_attributes(words: &[String]) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    for word in words {
        let Some(body) = word.strip_prefix('=') else {
            tracing::trace!(word, "skipping non-attribute reply word");
            continue;
        };
        match body.split_once('=') {
            Some((name, value)) => {
                attrs.insert(name.to_string(), value.to_string());
            }
            None => {
                attrs.insert(body.to_string(), String::new());
            }
        }
    }
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_row() {
        let reply = parse_reply(&words(&[
            "!re",
            "=.id=*9C",
            "=time=10:02:33",
            "=topics=system,error,critical",
            "=message=login failure for user admin from 192.0.2.7 via api",
        ]))
        .unwrap();

        let Reply::Row(attrs) = reply else {
            panic!("expected a row");
        };
        assert_eq!(attrs.get(".id").map(String::as_str), Some("*9C"));
        assert_eq!(attrs.get("time").map(String::as_str), Some("10:02:33"));
        assert!(attrs["message"].contains("login failure"));
    }

    #[test]
    fn test_parse_done_plain() {
        let reply = parse_reply(&words(&["!done"])).unwrap();
        assert_eq!(reply, Reply::Done(HashMap::new()));
    }

    #[test]
    fn test_parse_done_with_challenge() {
        let reply = parse_reply(&words(&["!done", "=ret=00ff00ff"])).unwrap();
        let Reply::Done(attrs) = reply else {
            panic!("expected done");
        };
        let response = Response {
            rows: Vec::new(),
            done: attrs,
        };
        assert_eq!(response.ret(), Some("00ff00ff"));
    }

    #[test]
    fn test_parse_trap() {
        let reply = parse_reply(&words(&[
            "!trap",
            "=category=4",
            "=message=invalid user name or password (6)",
        ]))
        .unwrap();
        assert_eq!(
            reply,
            Reply::Trap {
                category: Some("4".to_string()),
                message: "invalid user name or password (6)".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_trap_without_message() {
        let reply = parse_reply(&words(&["!trap"])).unwrap();
        let Reply::Trap { message, category } = reply else {
            panic!("expected trap");
        };
        assert_eq!(message, "unknown error");
        assert_eq!(category, None);
    }

    #[test]
    fn test_parse_fatal() {
        let reply = parse_reply(&words(&["!fatal", "session terminated"])).unwrap();
        assert_eq!(reply, Reply::Fatal("session terminated".to_string()));
    }

    #[test]
    fn test_parse_rejects_unknown_marker() {
        let err = parse_reply(&words(&["!bogus"])).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert!(err.to_string().contains("!bogus"));
    }

    #[test]
    fn test_parse_rejects_empty_sentence() {
        let err = parse_reply(&[]).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn test_attribute_value_containing_equals() {
        let reply = parse_reply(&words(&["!re", "=message=a=b=c"])).unwrap();
        let Reply::Row(attrs) = reply else {
            panic!("expected row");
        };
        assert_eq!(attrs.get("message").map(String::as_str), Some("a=b=c"));
    }

    #[test]
    fn test_tag_words_are_skipped() {
        let reply = parse_reply(&words(&["!done", ".tag=7"])).unwrap();
        assert_eq!(reply, Reply::Done(HashMap::new()));
    }

    #[test]
    fn test_attribute_without_value() {
        let reply = parse_reply(&words(&["!re", "=disabled"])).unwrap();
        let Reply::Row(attrs) = reply else {
            panic!("expected row");
        };
        assert_eq!(attrs.get("disabled").map(String::as_str), Some(""));
    }
}
