//! Winnow parsers for the five directive line grammars.
//!
//! Each directive claims a whole line: arbitrary leading/trailing whitespace
//! is tolerated and no other content is permitted. A line matching none of
//! the grammars is plain text. Type and pragma tokens are validated later by
//! the scanner, which knows the offending line number.

use winnow::{
    Parser,
    ascii::{space0, space1},
    combinator::{alt, opt, preceded},
    error::{ContextError, ErrMode},
    token::take_while,
};

type IResult<O> = Result<O, ErrMode<ContextError>>;

/// A recognized directive line, borrowing from the source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Directive<'s> {
    Include { path: &'s str },
    Key { name: &'s str },
    Arg {
        name: &'s str,
        type_token: Option<&'s str>,
    },
    Return { type_token: &'s str },
    Pragma { token: &'s str },
}

/// Match a line against the directive grammars, first match wins.
pub(crate) fn parse_directive(line: &str) -> Option<Directive<'_>> {
    alt((include, key, arg, return_directive, pragma))
        .parse(line)
        .ok()
}

fn identifier<'s>(input: &mut &'s str) -> IResult<&'s str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input)
}

/// Include paths allow path separators and dots; backslashes are normalized
/// away by the resolver.
fn include_path<'s>(input: &mut &'s str) -> IResult<&'s str> {
    take_while(1.., |c: char| {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/' | '\\' | '.')
    })
    .parse_next(input)
}

fn include<'s>(input: &mut &'s str) -> IResult<Directive<'s>> {
    let _ = (space0, "%include", space1, '"').parse_next(input)?;
    let path = include_path(input)?;
    let _ = ('"', space0).parse_next(input)?;

    Ok(Directive::Include { path })
}

fn key<'s>(input: &mut &'s str) -> IResult<Directive<'s>> {
    let _ = (space0, "%key", space1).parse_next(input)?;
    let name = identifier(input)?;
    let _ = space0.parse_next(input)?;

    Ok(Directive::Key { name })
}

fn arg<'s>(input: &mut &'s str) -> IResult<Directive<'s>> {
    let _ = (space0, "%arg", space1).parse_next(input)?;
    let name = identifier(input)?;
    let type_token = opt(preceded(space1, identifier)).parse_next(input)?;
    let _ = space0.parse_next(input)?;

    Ok(Directive::Arg { name, type_token })
}

fn return_directive<'s>(input: &mut &'s str) -> IResult<Directive<'s>> {
    let _ = (space0, "%return", space1).parse_next(input)?;
    let type_token = identifier(input)?;
    let _ = space0.parse_next(input)?;

    Ok(Directive::Return { type_token })
}

fn pragma<'s>(input: &mut &'s str) -> IResult<Directive<'s>> {
    let _ = (space0, "%pragma", space1).parse_next(input)?;
    let token = identifier(input)?;
    let _ = space0.parse_next(input)?;

    Ok(Directive::Pragma { token })
}
