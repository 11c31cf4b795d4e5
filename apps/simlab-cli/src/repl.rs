use simlab_protocol::{StkBuilderParams, StkType, View};

pub const HELP: &str = "\
commands:
  analyze <hex>            decode and analyze a PDU
  import <hex>             import builder parameters from a PDU
  exec <command>           generate an STK command for the current environment
  form key=value; ...      submit the builder form (command, text, number, url, pin)
  env <type>               SAT_BROWSER | PROACTIVE_SIM | WIB
  view <name>              analyzer | builder | simulation | research
  sim                      start or stop the scripted run
  topic <text>             fetch research notes
  examples                 list canned examples
  example <id>             load an example
  dismiss analysis|command clear the current result
  state                    print the session state
  reset                    reset the session
  help                     this text
  quit                     leave the console";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplCommand {
    Analyze(String),
    Import(String),
    Exec(String),
    Form(StkBuilderParams),
    Env(StkType),
    View(View),
    ToggleSimulation,
    Topic(String),
    Examples,
    Example(String),
    DismissAnalysis,
    DismissCommand,
    State,
    Reset,
    Help,
    Quit,
}

fn required<'a>(rest: &'a str, what: &str) -> Result<&'a str, String> {
    let rest = rest.trim();
    if rest.is_empty() {
        Err(format!("missing {what}"))
    } else {
        Ok(rest)
    }
}

fn parse_form(rest: &str) -> Result<StkBuilderParams, String> {
    let mut params = StkBuilderParams::default();
    for pair in rest.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got {pair:?}"))?;
        let value = value.trim();
        params = match key.trim().to_ascii_lowercase().as_str() {
            "command" | "commandtype" => params.with_command_type(value),
            "text" | "displaytext" => params.with_display_text(value),
            "number" | "targetnumber" => params.with_target_number(value),
            "url" | "data" | "urlordata" => params.with_url_or_data(value),
            "pin" | "password" | "pinorpassword" => params.with_pin_or_password(value),
            other => return Err(format!("unknown form field {other:?}")),
        };
    }
    Ok(params)
}

pub fn parse_line(line: &str) -> Result<Option<ReplCommand>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let cmd = match head.to_ascii_lowercase().as_str() {
        "analyze" | "a" => ReplCommand::Analyze(required(rest, "PDU hex")?.to_string()),
        "import" => ReplCommand::Import(required(rest, "PDU hex")?.to_string()),
        "exec" | "x" => ReplCommand::Exec(required(rest, "command name")?.to_string()),
        "form" => ReplCommand::Form(parse_form(rest)?),
        "env" => {
            let raw = required(rest, "environment")?;
            ReplCommand::Env(
                StkType::from_slug(raw).ok_or_else(|| format!("unknown environment {raw:?}"))?,
            )
        }
        "view" => {
            let raw = required(rest, "view")?;
            ReplCommand::View(View::from_slug(raw).ok_or_else(|| format!("unknown view {raw:?}"))?)
        }
        "sim" | "simulate" => ReplCommand::ToggleSimulation,
        "topic" => ReplCommand::Topic(required(rest, "topic")?.to_string()),
        "examples" => ReplCommand::Examples,
        "example" => ReplCommand::Example(required(rest, "example id")?.to_string()),
        "dismiss" => match rest.trim().to_ascii_lowercase().as_str() {
            "analysis" => ReplCommand::DismissAnalysis,
            "command" => ReplCommand::DismissCommand,
            other => return Err(format!("cannot dismiss {other:?}")),
        },
        "state" => ReplCommand::State,
        "reset" => ReplCommand::Reset,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" | "q" => ReplCommand::Quit,
        other => return Err(format!("unknown command {other:?}; try `help`")),
    };
    Ok(Some(cmd))
}
