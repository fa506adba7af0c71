//! Attribute names for `TF` (file), `TA` (aperture) and `TO` (object)
//! statements. Attributes carry no geometric effect — they're recorded on
//! the file or attached to the next emitted primitive (spec.md §4.5).

use nom::bytes::complete::tag;
use nom::combinator::value;
use nom::{branch::alt, combinator::map};

use crate::data::{system_name, user_name};
use crate::IResult;

#[derive(Clone, PartialEq, Debug)]
pub enum FileAttributeName<'a> {
    Part,
    FileFunction,
    FilePolarity,
    SameCoordinates,
    CreationDate,
    GenerationSoftware,
    ProjectId,
    MD5,
    UnknownStandardName(&'a str),
    UserDefinedName(&'a str),
}

impl<'a> FileAttributeName<'a> {
    pub(crate) fn parse(input: &'a str) -> IResult<Self> {
        alt((
            value(Self::Part, tag(".Part")),
            value(Self::FileFunction, tag(".FileFunction")),
            value(Self::FilePolarity, tag(".FilePolarity")),
            value(Self::SameCoordinates, tag(".SameCoordinates")),
            value(Self::CreationDate, tag(".CreationDate")),
            value(Self::GenerationSoftware, tag(".GenerationSoftware")),
            value(Self::ProjectId, tag(".ProjectId")),
            value(Self::MD5, tag(".MD5")),
            map(system_name, Self::UnknownStandardName),
            map(user_name, Self::UserDefinedName),
        ))(input)
    }
}

impl<'a> std::fmt::Display for FileAttributeName<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Part => write!(f, ".Part"),
            Self::FileFunction => write!(f, ".FileFunction"),
            Self::FilePolarity => write!(f, ".FilePolarity"),
            Self::SameCoordinates => write!(f, ".SameCoordinates"),
            Self::CreationDate => write!(f, ".CreationDate"),
            Self::GenerationSoftware => write!(f, ".GenerationSoftware"),
            Self::ProjectId => write!(f, ".ProjectId"),
            Self::MD5 => write!(f, ".MD5"),
            Self::UnknownStandardName(n) | Self::UserDefinedName(n) => write!(f, "{n}"),
        }
    }
}

/// `TA`/`TO` accept the same two name shapes as `TF` (a `.`-prefixed
/// standard name or a user-defined name) but don't have a closed set of
/// standard names worth enumerating here, so just capture the raw name.
pub(crate) fn attribute_name(input: &str) -> IResult<&str> {
    alt((system_name, user_name))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_file_attribute() {
        assert_eq!(
            FileAttributeName::parse(".FileFunction"),
            Ok(("", FileAttributeName::FileFunction))
        );
    }

    #[test]
    fn parses_user_defined_file_attribute() {
        assert_eq!(
            FileAttributeName::parse("MyAttr"),
            Ok(("", FileAttributeName::UserDefinedName("MyAttr")))
        );
    }

    #[test]
    fn attribute_name_accepts_both_shapes() {
        assert_eq!(attribute_name(".AperFunction"), Ok(("", ".AperFunction")));
        assert_eq!(attribute_name("CustomName"), Ok(("", "CustomName")));
    }
}
