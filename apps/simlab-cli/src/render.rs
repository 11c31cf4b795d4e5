use simlab_core::{presets::Example, SessionState};
use simlab_events::LogEntry;
use simlab_protocol::{AnalysisResult, DecodedPdu, StkCommand};

pub fn entry_line(entry: &LogEntry) -> String {
    format!(
        "{} [{}] {}",
        entry.timestamp.format("%H:%M:%S%.3f"),
        entry.category.tag(),
        entry.text
    )
}

pub fn analysis(result: &AnalysisResult) -> String {
    let mut out = format!(
        "Risk: {}  silent: {}  stk: {}\n",
        result.risk_level.as_str(),
        if result.is_silent { "yes" } else { "no" },
        match result.is_stk_command {
            Some(true) => "yes",
            Some(false) => "no",
            None => "unknown",
        }
    );
    if let Some(target) = &result.target_app {
        out.push_str(&format!("Target: {target}\n"));
    }
    out.push_str(&format!("{}\nMitigation: {}", result.explanation, result.mitigation));
    out
}

pub fn decoded(pdu: &DecodedPdu) -> String {
    if pdu.is_empty() {
        return "(no fields decoded)".to_string();
    }
    let width = pdu
        .components
        .iter()
        .map(|c| c.name.len())
        .max()
        .unwrap_or(0);
    pdu.components
        .iter()
        .map(|c| {
            let flag = if c.is_vulnerable == Some(true) { "!" } else { " " };
            format!("{flag} {:<width$}  {:<16}  {}", c.name, c.value, c.description)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn command(cmd: &StkCommand) -> String {
    format!(
        "{} [{}]\n{}\nPayload: {}\nImpact: {}",
        cmd.name,
        cmd.stk_type.display_label(),
        cmd.description,
        cmd.payload,
        cmd.impact
    )
}

pub fn state(state: &SessionState) -> String {
    let mut lines = vec![
        format!("view: {}", state.view.as_str()),
        format!("environment: {}", state.stk_type.display_label()),
        format!(
            "in flight: {}  scripted run: {}",
            state.in_flight, state.scripted_run_active
        ),
    ];
    if !state.pdu_input.is_empty() {
        lines.push(format!("pdu input: {}", state.pdu_input));
    }
    for (key, value) in state.builder.populated() {
        lines.push(format!("builder.{key}: {value}"));
    }
    if let Some(a) = &state.analysis {
        lines.push(analysis(a));
    }
    if let Some(d) = &state.decoded {
        lines.push(decoded(d));
    }
    if let Some(c) = &state.command {
        lines.push(command(c));
    }
    if let Some(info) = &state.info {
        lines.push(format!("# {}\n{}", info.topic, info.body));
    }
    lines.join("\n")
}

pub fn example_row(example: &Example) -> String {
    format!(
        "{:<20} {:<8} {}",
        example.id,
        example.kind_label(),
        example.title
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use simlab_protocol::PduComponent;

    #[test]
    fn decoded_table_flags_vulnerable_fields() {
        let pdu = DecodedPdu {
            components: vec![
                PduComponent {
                    name: "PID".into(),
                    value: "7F".into(),
                    description: "SIM data download".into(),
                    is_vulnerable: Some(true),
                },
                PduComponent {
                    name: "DCS".into(),
                    value: "F6".into(),
                    description: "8-bit class 2".into(),
                    is_vulnerable: None,
                },
            ],
        };
        let table = decoded(&pdu);
        let rows: Vec<_> = table.lines().collect();
        assert!(rows[0].starts_with("! PID"));
        assert!(rows[1].starts_with("  DCS"));
    }

    #[test]
    fn fallback_analysis_renders_unknown_stk() {
        let text = analysis(&AnalysisResult::parse_failure());
        assert!(text.contains("Risk: Low"));
        assert!(text.contains("stk: unknown"));
    }
}
