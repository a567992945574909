//! Console command parsing.

use std::path::PathBuf;

use thiserror::Error;

use gala_engine::{NonEmptyString, ParticipantId, Quota};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum ParseError {
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("`{0}` is not a positive number")]
    NotANumber(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Help,
    Prizes,
    Next,
    Prev,
    /// 1-based prize number.
    Select(usize),
    Start(Option<usize>),
    Stop,
    Close,
    Toggle,
    Status,
    Winners,
    Batch(usize),
    AddPrize {
        name: NonEmptyString,
        quota: Quota,
        include_winners: bool,
        temporary: bool,
    },
    Reset(usize),
    ResetAll,
    Import(PathBuf),
    Export(PathBuf),
    Quit,
    Rig(RigCommand),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RigCommand {
    Add { prize: usize, participant: ParticipantId },
    Remove { prize: usize, participant: ParticipantId },
    List,
    Activate(bool),
    Clear(Option<usize>),
}

pub(crate) const HELP: &str = "\
Commands:
  prizes                 list prizes with progress
  next | prev            move the prize cursor
  select <n>             select prize number n
  start [count]          start rolling for the selected prize
  stop                   stop and reveal after the suspense delay
  close                  dismiss the winners and return to idle
  space                  start / stop / close in one key
  status                 show the draw state
  winners                list all winners by prize
  batch <n>              set the default draw count (remembered)
  add-prize [--include-winners] [--temporary] <quota> <name>
  reset <n>              clear the winners of prize n
  reset-all              clear every recorded win
  import <file>          replace roster and prizes from a JSON export
  export <file>          write roster and prizes to a JSON file
  quit";

fn number(raw: &str) -> Result<usize, ParseError> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ParseError::NotANumber(raw.to_string())),
    }
}

impl Command {
    /// `Ok(None)` for a blank line.
    pub(crate) fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("help" | "?", _) => Command::Help,
            ("prizes" | "ls", []) => Command::Prizes,
            ("next" | "n", []) => Command::Next,
            ("prev" | "p", []) => Command::Prev,
            ("select", [n]) => Command::Select(number(n)?),
            ("select", _) => return Err(ParseError::Usage("select <n>")),
            ("start", []) => Command::Start(None),
            ("start", [n]) => Command::Start(Some(number(n)?)),
            ("start", _) => return Err(ParseError::Usage("start [count]")),
            ("stop", []) => Command::Stop,
            ("close", []) => Command::Close,
            ("space" | "go", []) => Command::Toggle,
            ("status", []) => Command::Status,
            ("winners", []) => Command::Winners,
            ("batch", [n]) => Command::Batch(number(n)?),
            ("batch", _) => return Err(ParseError::Usage("batch <n>")),
            ("add-prize", rest) => parse_add_prize(rest)?,
            ("reset", [n]) => Command::Reset(number(n)?),
            ("reset", _) => return Err(ParseError::Usage("reset <n>")),
            ("reset-all", []) => Command::ResetAll,
            ("import", [path]) => Command::Import(PathBuf::from(*path)),
            ("import", _) => return Err(ParseError::Usage("import <file>")),
            ("export", [path]) => Command::Export(PathBuf::from(*path)),
            ("export", _) => return Err(ParseError::Usage("export <file>")),
            ("quit" | "exit" | "q", []) => Command::Quit,
            ("rig", rest) => Command::Rig(parse_rig(rest)?),
            _ => return Err(ParseError::Unknown(verb.to_string())),
        };
        Ok(Some(command))
    }
}

fn parse_add_prize(args: &[&str]) -> Result<Command, ParseError> {
    const USAGE: &str = "add-prize [--include-winners] [--temporary] <quota> <name>";
    let mut include_winners = false;
    let mut temporary = false;
    let mut rest = args;
    while let Some((first, tail)) = rest.split_first() {
        match *first {
            "--include-winners" => include_winners = true,
            "--temporary" => temporary = true,
            _ => break,
        }
        rest = tail;
    }

    let Some((quota, name)) = rest.split_first() else {
        return Err(ParseError::Usage(USAGE));
    };
    let quota = u32::try_from(number(quota)?)
        .ok()
        .and_then(|q| Quota::new(q).ok())
        .ok_or_else(|| ParseError::NotANumber((*quota).to_string()))?;
    let name = NonEmptyString::new(name.join(" ")).map_err(|_| ParseError::Usage(USAGE))?;
    Ok(Command::AddPrize {
        name,
        quota,
        include_winners,
        temporary,
    })
}

fn parse_rig(args: &[&str]) -> Result<RigCommand, ParseError> {
    const USAGE: &str = "rig add|rm <prize> <id> | list | on | off | clear [prize]";
    match args {
        ["add", prize, id] => Ok(RigCommand::Add {
            prize: number(prize)?,
            participant: ParticipantId::new(*id),
        }),
        ["rm", prize, id] => Ok(RigCommand::Remove {
            prize: number(prize)?,
            participant: ParticipantId::new(*id),
        }),
        ["list"] | [] => Ok(RigCommand::List),
        ["on"] => Ok(RigCommand::Activate(true)),
        ["off"] => Ok(RigCommand::Activate(false)),
        ["clear"] => Ok(RigCommand::Clear(None)),
        ["clear", prize] => Ok(RigCommand::Clear(Some(number(prize)?))),
        _ => Err(ParseError::Usage(USAGE)),
    }
}
