use tracing::{error, warn};

use crate::catalog::Catalog;
use crate::codec;
use crate::error::{Error, Result};
use crate::mqtt::MqttPublisher;
use crate::reader::RegisterReader;
use crate::render;

pub const MAX_TOPIC_LEN: usize = 40;

/// One configured `0xNN <topic>` mapping from register address to broker
/// topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRule {
    pub address: u16,
    pub topic: String,
}

impl PublishRule {
    /// Accepts exactly `0x` + two hex digits + whitespace + one topic
    /// token of at most 40 characters. Anything else is a parse error.
    pub fn parse(line: &str) -> Result<Self> {
        let parse_err = || Error::ParseRule {
            line: line.to_owned(),
        };

        let rest = line.strip_prefix("0x").ok_or_else(parse_err)?;
        let bytes = rest.as_bytes();
        if bytes.len() < 3 || !bytes[0].is_ascii_hexdigit() || !bytes[1].is_ascii_hexdigit() {
            return Err(parse_err());
        }
        let address =
            u16::from_str_radix(&rest[..2], 16).map_err(|_| parse_err())?;

        let tail = &rest[2..];
        if !tail.starts_with(char::is_whitespace) {
            return Err(parse_err());
        }
        let topic = tail.trim();
        if topic.is_empty()
            || topic.len() > MAX_TOPIC_LEN
            || topic.chars().any(char::is_whitespace)
        {
            return Err(parse_err());
        }

        Ok(Self {
            address,
            topic: topic.to_owned(),
        })
    }
}

/// Work through the configured rules in order. Each value goes to the
/// broker, or to stdout when no publisher is configured. The first parse
/// or transport error aborts the remaining batch; addresses missing from
/// the catalog are skipped.
pub fn publish_all(
    rules: &[String],
    catalog: &Catalog,
    reader: &mut RegisterReader,
    mut publisher: Option<&mut MqttPublisher>,
) -> Result<()> {
    for line in rules {
        let rule = PublishRule::parse(line)?;
        let Some(register) = catalog.lookup(rule.address) else {
            warn!(address = rule.address, topic = %rule.topic, "publish rule has no catalog entry");
            continue;
        };
        let words = reader.read_one(register).inspect_err(|err| {
            error!(address = rule.address, "could not read register: {err}");
        })?;
        let value = codec::decode(words[0], words[1]);
        match publisher.as_deref_mut() {
            Some(publisher) => publisher.publish(&rule.topic, &format!("{value:.6}"))?,
            None => match render::render(register, value) {
                Ok(rendered) => println!("{rendered}"),
                Err(err) => error!(address = rule.address, "{err}"),
            },
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{PublishRule, publish_all};
    use crate::catalog::{Catalog, Register, RegisterKind};
    use crate::error::Error;
    use crate::reader::RegisterReader;
    use crate::transport::mock::MockTransport;

    #[test]
    fn parses_well_formed_rule() {
        let rule = PublishRule::parse("0x34 power").expect("rule should parse");
        assert_eq!(rule.address, 0x34);
        assert_eq!(rule.topic, "power");
    }

    #[test]
    fn rejects_missing_hex_prefix() {
        let err = PublishRule::parse("34 power").expect_err("rule should fail");
        assert!(matches!(err, Error::ParseRule { .. }));
    }

    #[test]
    fn rejects_overlong_topic() {
        let line = format!("0x34 {}", "t".repeat(41));
        PublishRule::parse(&line).expect_err("41-char topic should fail");
        let line = format!("0x34 {}", "t".repeat(40));
        PublishRule::parse(&line).expect("40-char topic should parse");
    }

    #[test]
    fn rejects_malformed_addresses_and_extra_tokens() {
        for line in ["0x3 power", "0x3g power", "0x+4 power", "0x34", "0x34  a b", "0x34power"] {
            PublishRule::parse(line).expect_err(line);
        }
    }

    const TABLE: &[Register] = &[Register {
        address: 0x34,
        description: "Total system power",
        unit: Some("W"),
        kind: RegisterKind::Input,
    }];

    #[test]
    fn batch_stops_at_first_malformed_rule() {
        let catalog = Catalog::new(TABLE);
        let mut transport = MockTransport::default().with_value(0x34, [0x3F80, 0]);
        let rules = vec!["0x34 power".to_owned(), "bogus".to_owned(), "0x34 again".to_owned()];

        let err = {
            let mut reader = RegisterReader::new(Some(&mut transport));
            publish_all(&rules, &catalog, &mut reader, None)
                .expect_err("batch should stop at the malformed rule")
        };
        assert!(matches!(err, Error::ParseRule { ref line } if line == "bogus"));
        assert_eq!(transport.reads, vec![0x34]);
    }

    #[test]
    fn batch_stops_at_first_transport_error() {
        let catalog = Catalog::new(TABLE);
        let mut transport = MockTransport {
            fail: true,
            ..MockTransport::default()
        };
        let mut reader = RegisterReader::new(Some(&mut transport));
        let rules = vec!["0x34 power".to_owned()];
        let err = publish_all(&rules, &catalog, &mut reader, None)
            .expect_err("batch should surface the wire failure");
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn unknown_address_is_skipped() {
        let catalog = Catalog::new(TABLE);
        let mut transport = MockTransport::default();
        let rules = vec!["0x99 nothere".to_owned()];
        {
            let mut reader = RegisterReader::new(Some(&mut transport));
            publish_all(&rules, &catalog, &mut reader, None)
                .expect("unknown addresses are not an error");
        }
        assert!(transport.reads.is_empty());
    }
}
