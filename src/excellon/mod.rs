//! Excellon (NC-drill) reader: line lexing, dialect inference, and the
//! tool/hit interpreter, assembled into one [`parse`] entry point.

pub mod dialect;
pub mod interpreter;
pub mod lexer;

pub use interpreter::{ExcellonOutput, PlatingType, Tool, ToolDictionary, ToolId};

use crate::error::CamError;

/// Lex, infer the coordinate format for, and interpret an Excellon file.
pub fn parse(input: &str) -> Result<(ExcellonOutput, dialect::DialectResult), CamError> {
    let lines = lexer::lex(input);
    let dialect = dialect::detect(&lines)?;
    let output = interpreter::interpret(&lines, dialect.format)?;
    Ok((output, dialect))
}
