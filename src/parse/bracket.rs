//! Parser for the contents of a bracket atom: `[isotope symbol chirality hcount charge class]`.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1, one_of, satisfy},
    combinator::{all_consuming, map, map_opt, map_res, opt, recognize, value},
    sequence::{pair, preceded, tuple},
    IResult,
};

use crate::{Atom, Chirality, Element, SmilesError};

type Res<'a, T> = IResult<&'a str, T>;

fn isotope(input: &str) -> Res<Option<u16>> {
    opt(map_res(digit1, str::parse::<u16>))(input)
}

/// Element symbol and aromaticity. Two-letter symbols are tried first, so
/// `Cl` wins over `C` followed by garbage.
fn symbol(input: &str) -> Res<(Element, bool)> {
    alt((
        map_opt(alt((tag("se"), tag("as"), tag("te"))), |s: &str| {
            aromatic_element(s)
        }),
        map_opt(
            recognize(pair(
                satisfy(|c| c.is_ascii_uppercase()),
                satisfy(|c| c.is_ascii_lowercase()),
            )),
            |s: &str| Element::from_symbol(s).map(|element| (element, false)),
        ),
        map_opt(recognize(satisfy(|c| c.is_ascii_uppercase())), |s: &str| {
            Element::from_symbol(s).map(|element| (element, false))
        }),
        map_opt(recognize(one_of("bcnops")), aromatic_element),
        value((Element::WILDCARD, false), char('*')),
    ))(input)
}

fn aromatic_element(symbol: &str) -> Option<(Element, bool)> {
    let mut capitalized = symbol.to_string();
    capitalized[..1].make_ascii_uppercase();
    Element::from_symbol(&capitalized)
        .filter(|element| element.can_be_aromatic())
        .map(|element| (element, true))
}

fn chirality(input: &str) -> Res<Option<Chirality>> {
    opt(alt((
        map(
            recognize(tuple((
                char('@'),
                alt((tag("TH"), tag("AL"), tag("SP"), tag("TB"), tag("OH"))),
                digit1,
            ))),
            |class: &str| match class {
                "@TH1" => Chirality::Anticlockwise,
                "@TH2" => Chirality::Clockwise,
                other => Chirality::Other(other.to_string()),
            },
        ),
        value(Chirality::Clockwise, tag("@@")),
        value(Chirality::Anticlockwise, char('@')),
    )))(input)
}

fn hydrogens(input: &str) -> Res<u8> {
    map(
        opt(preceded(char('H'), opt(map_res(digit1, str::parse::<u8>)))),
        |count| match count {
            None => 0,
            Some(count) => count.unwrap_or(1),
        },
    )(input)
}

fn charge(input: &str) -> Res<i8> {
    map(
        opt(alt((
            value(2, tag("++")),
            value(-2, tag("--")),
            map(
                pair(one_of("+-"), opt(map_res(digit1, str::parse::<i8>))),
                |(sign, magnitude)| {
                    let magnitude = magnitude.unwrap_or(1);
                    if sign == '-' {
                        -magnitude
                    } else {
                        magnitude
                    }
                },
            ),
        ))),
        |charge| charge.unwrap_or(0),
    )(input)
}

fn class(input: &str) -> Res<Option<u32>> {
    opt(preceded(char(':'), map_res(digit1, str::parse::<u32>)))(input)
}

/// Parses the text between `[` and `]` into an [`Atom`].
pub fn parse_bracket_atom(content: &str) -> Result<Atom, SmilesError> {
    let parsed = all_consuming(tuple((isotope, symbol, chirality, hydrogens, charge, class)))(
        content,
    );
    match parsed {
        Ok((_, (isotope, (element, aromatic), chirality, hydrogens, charge, class))) => Ok(Atom {
            element,
            aromatic,
            isotope,
            chirality,
            hydrogens: Some(hydrogens),
            charge,
            class,
        }),
        Err(_) => Err(SmilesError::InvalidBracketAtom(content.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_bracket() {
        let atom = parse_bracket_atom("CH3").unwrap();
        assert_eq!(atom.element, Element::C);
        assert_eq!(atom.hydrogens, Some(3));
        assert!(!atom.aromatic);
        assert_eq!(atom.charge, 0);
    }

    #[test]
    fn test_full_bracket() {
        let atom = parse_bracket_atom("13C@@H:7").unwrap();
        assert_eq!(atom.isotope, Some(13));
        assert_eq!(atom.chirality, Some(Chirality::Clockwise));
        assert_eq!(atom.hydrogens, Some(1));
        assert_eq!(atom.class, Some(7));
    }

    #[test]
    fn test_charges() {
        assert_eq!(parse_bracket_atom("O-").unwrap().charge, -1);
        assert_eq!(parse_bracket_atom("O-2").unwrap().charge, -2);
        assert_eq!(parse_bracket_atom("Fe++").unwrap().charge, 2);
        assert_eq!(parse_bracket_atom("NH4+").unwrap().charge, 1);
        assert_eq!(parse_bracket_atom("Fe+3").unwrap().charge, 3);
    }

    #[test]
    fn test_two_letter_and_aromatic_symbols() {
        assert_eq!(parse_bracket_atom("Cl-").unwrap().element, Element::CL);
        let nh = parse_bracket_atom("nH").unwrap();
        assert_eq!(nh.element, Element::N);
        assert!(nh.aromatic);
        let se = parse_bracket_atom("se").unwrap();
        assert_eq!(se.element, Element::SE);
        assert!(se.aromatic);
        assert_eq!(parse_bracket_atom("*").unwrap().element, Element::WILDCARD);
    }

    #[test]
    fn test_extended_chirality() {
        assert_eq!(
            parse_bracket_atom("C@TH2").unwrap().chirality,
            Some(Chirality::Clockwise)
        );
        assert_eq!(
            parse_bracket_atom("Co@OH19").unwrap().chirality,
            Some(Chirality::Other("@OH19".to_string()))
        );
    }

    #[test]
    fn test_invalid_bracket() {
        assert!(parse_bracket_atom("").is_err());
        assert!(parse_bracket_atom("Xx").is_err());
        assert!(parse_bracket_atom("C+-").is_err());
        assert!(parse_bracket_atom("fe").is_err());
    }
}
