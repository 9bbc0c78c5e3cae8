use anyhow::{anyhow, Result};
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{char, multispace1},
    combinator::{all_consuming, eof, map, rest, value},
    error::{Error, ParseError},
    sequence::{preceded, separated_pair},
    IResult, Parser,
};

use crate::{message::UserCommand, session::PodKey};

fn word<'a, E: ParseError<&'a str>>(s: &'a str) -> IResult<&'a str, &'a str, E> {
    is_not(" \t\r\n").parse(s)
}

/// `<namespace>/<pod>`
fn pod_key<'a, E: ParseError<&'a str>>(s: &'a str) -> IResult<&'a str, PodKey, E> {
    map(
        separated_pair(is_not("/ \t\r\n"), char('/'), word),
        |(namespace, name): (&str, &str)| PodKey::new(namespace, name),
    )
    .parse(s)
}

fn use_context<'a, E: ParseError<&'a str>>(s: &'a str) -> IResult<&'a str, UserCommand, E> {
    map(
        preceded((alt((tag("use"), tag("ctx"))), multispace1), word),
        |context: &str| UserCommand::UseContext(context.to_string()),
    )
    .parse(s)
}

fn namespace<'a, E: ParseError<&'a str>>(s: &'a str) -> IResult<&'a str, UserCommand, E> {
    map(
        preceded((alt((tag("namespace"), tag("ns"))), multispace1), word),
        |namespace: &str| UserCommand::Namespace(namespace.to_string()),
    )
    .parse(s)
}

fn select<'a, E: ParseError<&'a str>>(s: &'a str) -> IResult<&'a str, UserCommand, E> {
    map(
        preceded((alt((tag("select"), tag("sel"))), multispace1), pod_key),
        UserCommand::Select,
    )
    .parse(s)
}

fn describe<'a, E: ParseError<&'a str>>(s: &'a str) -> IResult<&'a str, UserCommand, E> {
    map(
        preceded((alt((tag("describe"), tag("desc"))), multispace1), pod_key),
        UserCommand::Describe,
    )
    .parse(s)
}

fn no_arg<'a, E: ParseError<&'a str>>(s: &'a str) -> IResult<&'a str, UserCommand, E> {
    alt((
        value(UserCommand::Contexts, alt((tag("contexts"), tag("ctx")))),
        value(UserCommand::Pods, alt((tag("pods"), tag("po")))),
        value(UserCommand::Refresh, alt((tag("refresh"), tag("r")))),
        value(UserCommand::Namespaces, alt((tag("namespaces"), tag("ns")))),
        value(UserCommand::Deselect, tag("deselect")),
        value(UserCommand::Start, tag("start")),
        value(UserCommand::Stop, tag("stop")),
        value(UserCommand::Logs, tag("logs")),
        value(UserCommand::Clear, tag("clear")),
        value(UserCommand::Copy, tag("copy")),
        value(UserCommand::Status, tag("status")),
        value(UserCommand::Help, alt((tag("help"), tag("?")))),
        value(UserCommand::Quit, alt((tag("quit"), tag("exit"), tag("q")))),
    ))
    .parse(s)
}

/// `search <term>` or `/<term>`. The term is taken verbatim, surrounding
/// whitespace included; a bare `search` clears it.
fn search<'a, E: ParseError<&'a str>>(s: &'a str) -> IResult<&'a str, UserCommand, E> {
    let verbose = preceded(
        tag("search"),
        alt((preceded(char(' '), rest), value("", eof))),
    );
    let short = preceded(char('/'), rest);

    map(alt((verbose, short)), |term: &str| {
        UserCommand::Search(term.to_string())
    })
    .parse(s)
}

fn command<'a, E: ParseError<&'a str>>(s: &'a str) -> IResult<&'a str, UserCommand, E> {
    all_consuming(alt((use_context, namespace, select, describe, no_arg))).parse(s)
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<UserCommand>> {
    let line = line.trim_end_matches(['\r', '\n']).trim_start();

    if line.trim().is_empty() {
        return Ok(None);
    }

    if let Ok((_, cmd)) = all_consuming(search::<Error<_>>).parse(line) {
        return Ok(Some(cmd));
    }

    command::<Error<_>>(line.trim_end())
        .map(|(_, cmd)| Some(cmd))
        .map_err(|_| anyhow!("Unknown command: {} (type 'help')", line.trim_end()))
}
