//! Canned examples an operator can load into the session.

use once_cell::sync::Lazy;
use simlab_events::LogCategory;
use simlab_protocol::{StkBuilderParams, StkType, TopicBrief, View};

use crate::error::SessionError;
use crate::session::Session;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExampleKind {
    /// Loads a PDU into the decode input.
    Decode { pdu: &'static str },
    /// Selects an STK environment and merges builder fields.
    Builder {
        stk_type: StkType,
        params: StkBuilderParams,
    },
    /// Shows static briefing text.
    Info { body: &'static str },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Example {
    pub id: &'static str,
    pub title: &'static str,
    pub kind: ExampleKind,
}

impl Example {
    pub fn view(&self) -> View {
        match self.kind {
            ExampleKind::Decode { .. } => View::Analyzer,
            ExampleKind::Builder { .. } => View::Builder,
            ExampleKind::Info { .. } => View::Research,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            ExampleKind::Decode { .. } => "decode",
            ExampleKind::Builder { .. } => "builder",
            ExampleKind::Info { .. } => "info",
        }
    }
}

static CATALOG: Lazy<Vec<Example>> = Lazy::new(|| {
    vec![
        Example {
            id: "silent-sms",
            title: "Silent SMS (Type-0)",
            kind: ExampleKind::Decode {
                pdu: "079144775810065011000A81100000000040",
            },
        },
        Example {
            id: "ota-envelope",
            title: "Binary OTA Envelope",
            kind: ExampleKind::Decode {
                pdu: "0791447758100650400B914477582100F17FF6000000000000000C027000000A0D00000000D001",
            },
        },
        Example {
            id: "simjacker-location",
            title: "Simjacker Location",
            kind: ExampleKind::Builder {
                stk_type: StkType::SatBrowser,
                params: StkBuilderParams::default().with_command_type("PROVIDE LOCAL INFO"),
            },
        },
        Example {
            id: "wibattack-sms",
            title: "WIBattack Premium SMS",
            kind: ExampleKind::Builder {
                stk_type: StkType::Wib,
                params: StkBuilderParams::default()
                    .with_command_type("SEND SHORT MESSAGE")
                    .with_target_number("+15550100"),
            },
        },
        Example {
            id: "browser-launch",
            title: "Proactive Browser Launch",
            kind: ExampleKind::Builder {
                stk_type: StkType::ProactiveSim,
                params: StkBuilderParams::default()
                    .with_command_type("LAUNCH BROWSER")
                    .with_url_or_data("http://lab.invalid/landing"),
            },
        },
        Example {
            id: "ota-overview",
            title: "SIM OTA Overview",
            kind: ExampleKind::Info {
                body: "Over-the-air (OTA) management lets an operator push binary SMS to the \
                       SIM. Messages with PID 0x7F and DCS 0xF6 are delivered to the card rather \
                       than the handset, where a toolkit application may act on them without \
                       user interaction.",
            },
        },
        Example {
            id: "stk-primer",
            title: "SIM Toolkit Primer",
            kind: ExampleKind::Info {
                body: "Proactive commands let the SIM drive the handset: display text, send a \
                       short message, set up a call or report location. Browser environments \
                       such as S@T and WIB interpret byte-code pushed to the card.",
            },
        },
    ]
});

pub fn catalog() -> &'static [Example] {
    &CATALOG
}

pub fn find(id: &str) -> Option<&'static Example> {
    let id = id.trim();
    CATALOG
        .iter()
        .find(|ex| ex.id.eq_ignore_ascii_case(id) || ex.title.eq_ignore_ascii_case(id))
}

impl Session {
    /// Applies an example to the session state and logs one line.
    pub fn apply_example(&self, example: &Example) {
        let mut shared = self.shared();
        let state = &mut shared.state;
        state.view = example.view();
        match &example.kind {
            ExampleKind::Decode { pdu } => {
                state.pdu_input = pdu.to_string();
            }
            ExampleKind::Builder { stk_type, params } => {
                state.stk_type = *stk_type;
                state.builder.merge(params);
            }
            ExampleKind::Info { body } => {
                state.info = Some(TopicBrief {
                    topic: example.title.to_string(),
                    body: body.to_string(),
                });
            }
        }
        self.inner.log.append(
            format!("Loaded {} example: {}", example.kind_label(), example.title),
            LogCategory::SystemNotice,
        );
    }

    /// Looks an example up by id or title and applies it.
    pub fn apply_example_by_id(&self, id: &str) -> Result<&'static Example, SessionError> {
        let example = find(id).ok_or_else(|| SessionError::UnknownExample(id.trim().to_string()))?;
        self.apply_example(example);
        Ok(example)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_ids_are_unique_and_cover_every_kind() {
        let ids: HashSet<_> = catalog().iter().map(|ex| ex.id).collect();
        assert_eq!(ids.len(), catalog().len());
        for label in ["decode", "builder", "info"] {
            assert!(catalog().iter().any(|ex| ex.kind_label() == label));
        }
    }

    #[test]
    fn decode_examples_are_even_length_hex() {
        for ex in catalog() {
            if let ExampleKind::Decode { pdu } = ex.kind {
                assert_eq!(pdu.len() % 2, 0, "{}", ex.id);
                assert!(pdu.chars().all(|c| c.is_ascii_hexdigit()), "{}", ex.id);
            }
        }
    }

    #[test]
    fn lookup_accepts_title() {
        assert_eq!(
            find("simjacker location").map(|ex| ex.id),
            Some("simjacker-location")
        );
        assert!(find("nope").is_none());
    }
}
