//! RS-274X (Gerber) reader: lexing, statement grammar, and the stateful
//! graphics interpreter, assembled into one [`parse`] entry point.

pub mod attribute;
pub mod command;
pub mod interpreter;
pub mod lexer;

use crate::error::CamError;
use crate::macro_eval::{MacroDefinition, MacroStatement};
use command::Statement;
use lexer::DataBlock;

/// One lexed block, resolved to either a normal [`Statement`] or a
/// fully-accumulated `AM` macro definition. Keeping `AM` bodies out of
/// [`Statement`] means `command.rs` never has to know about lexer groups.
#[derive(Debug, Clone, PartialEq)]
pub enum GerberUnit<'a> {
    Statement(Statement<'a>),
    MacroDefine(MacroDefinition),
}

/// Group lexed blocks into [`GerberUnit`]s, folding each `AM<name>` block
/// and the same-group blocks that follow it into one `MacroDefine` unit.
///
/// `AM` bodies use the macro-statement grammar ([`crate::macro_eval`]),
/// which is incompatible with the general statement grammar, so they must
/// be peeled off before the rest of the blocks reach [`command::parse_parameter`].
pub fn group_units<'a>(blocks: &[DataBlock<'a>]) -> Result<Vec<GerberUnit<'a>>, CamError> {
    let mut units = Vec::new();
    let mut i = 0usize;
    while i < blocks.len() {
        let block = &blocks[i];
        if block.in_parameter && block.text.starts_with("AM") {
            let name = block.text["AM".len()..].to_string();
            let group = block.group;
            let mut body = Vec::new();
            i += 1;
            while i < blocks.len() && blocks[i].in_parameter && blocks[i].group == group {
                let statement: MacroStatement = crate::macro_eval::parse_statement(blocks[i].text)?;
                body.push(statement);
                i += 1;
            }
            units.push(GerberUnit::MacroDefine(MacroDefinition { name, body }));
            continue;
        }
        let statement = if block.in_parameter {
            command::parse_parameter(block.text)
        } else {
            command::parse_word(block.text)
        };
        units.push(GerberUnit::Statement(statement));
        i += 1;
    }
    Ok(units)
}

/// Lex and group `input` into an ordered unit list, ready for
/// [`interpreter::interpret`].
pub fn parse(input: &str) -> Result<Vec<GerberUnit<'_>>, CamError> {
    let blocks = lexer::lex(input)?;
    group_units(&blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_body_is_folded_into_one_unit() {
        let units = parse("%AMDonut*1,1,$1,$2,$3*$4=$1x0.75*1,0,$4,$2,$3*%\n%ADD10Donut,0.5X0X0*%\n").unwrap();
        assert_eq!(units.len(), 2);
        match &units[0] {
            GerberUnit::MacroDefine(def) => {
                assert_eq!(def.name, "Donut");
                assert_eq!(def.body.len(), 3);
            }
            other => panic!("expected MacroDefine, got {other:?}"),
        }
        assert!(matches!(
            units[1],
            GerberUnit::Statement(Statement::ApertureDefine { .. })
        ));
    }

    #[test]
    fn ordinary_blocks_pass_through_as_statements() {
        let units = parse("G01*\nX0Y0D02*\nX100Y0D01*\nM02*\n").unwrap();
        assert_eq!(units.len(), 4);
        assert!(units
            .iter()
            .all(|u| matches!(u, GerberUnit::Statement(_))));
    }
}
