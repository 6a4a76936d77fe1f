//! Textual type syntax used for item signatures: `_`, `()`, primitives,
//! `&T`, `&mut T`, tuples, `[T; N]` and (optionally absolute) paths with
//! `<...>` arguments.

use crate::language::{
    ast::{Path, PathBinding, PathNode},
    errors::SyntaxError,
    span::Span,
    types::{BorrowKind, TypeRef},
};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0, multispace1},
    combinator::{all_consuming, map, map_res, opt, recognize},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};

pub fn parse_type(source: &str) -> Result<TypeRef, SyntaxError> {
    match all_consuming(delimited(multispace0, type_ref, multispace0))(source) {
        Ok((_, ty)) => Ok(ty),
        Err(err) => {
            let offset = match &err {
                nom::Err::Error(inner) | nom::Err::Failure(inner) => {
                    source.len() - inner.input.len()
                }
                nom::Err::Incomplete(_) => source.len(),
            };
            Err(SyntaxError::new(
                format!("invalid type `{}`", source.trim()),
                Span::new(offset, source.len()),
            )
            .with_label("unexpected input")
            .with_help("types look like `&mut Name<T>`, `(A, B)`, `[u8; 4]` or `_`"))
        }
    }
}

fn type_ref(input: &str) -> IResult<&str, TypeRef> {
    alt((borrow_type, tuple_type, array_type, path_type))(input)
}

fn borrow_type(input: &str) -> IResult<&str, TypeRef> {
    let (input, _) = char('&')(input)?;
    let (input, _) = multispace0(input)?;
    let (input, unique) = opt(terminated(tag("mut"), multispace1))(input)?;
    let (input, inner) = type_ref(input)?;
    let kind = if unique.is_some() {
        BorrowKind::Unique
    } else {
        BorrowKind::Shared
    };
    Ok((input, TypeRef::borrow(kind, inner)))
}

fn tuple_type(input: &str) -> IResult<&str, TypeRef> {
    let (input, _) = char('(')(input)?;
    let (input, items) = separated_list0(ws(char(',')), ws(type_ref))(input)?;
    let (input, trailing) = opt(ws(char(',')))(input)?;
    let (input, _) = char(')')(input)?;
    let ty = match items.len() {
        0 => TypeRef::Unit,
        1 if trailing.is_none() => items.into_iter().next().unwrap_or(TypeRef::Unit),
        _ => TypeRef::Tuple(items),
    };
    Ok((input, ty))
}

fn array_type(input: &str) -> IResult<&str, TypeRef> {
    let (input, _) = char('[')(input)?;
    let (input, inner) = ws(type_ref)(input)?;
    let (input, size) = opt(preceded(
        ws(char(';')),
        ws(map_res(digit1, |digits: &str| digits.parse::<u64>())),
    ))(input)?;
    let (input, _) = char(']')(input)?;
    Ok((
        input,
        TypeRef::Array {
            inner: Box::new(inner),
            size,
        },
    ))
}

fn path_type(input: &str) -> IResult<&str, TypeRef> {
    let (input, leading) = opt(tag("::"))(input)?;
    let (input, nodes) = separated_list1(tag("::"), path_node)(input)?;
    let absolute = leading.is_some();
    if !absolute && nodes.len() == 1 && nodes[0].args.is_empty() {
        let name = nodes[0].name.as_str();
        if name == "_" {
            return Ok((input, TypeRef::Wildcard));
        }
        if let Some(primitive) = TypeRef::primitive(name) {
            return Ok((input, primitive));
        }
    }
    Ok((
        input,
        TypeRef::Path(Path {
            absolute,
            nodes,
            binding: PathBinding::Unbound,
        }),
    ))
}

fn path_node(input: &str) -> IResult<&str, PathNode> {
    let (input, name) = identifier(input)?;
    let (input, args) = opt(delimited(
        ws(char('<')),
        separated_list0(ws(char(',')), ws(type_ref)),
        char('>'),
    ))(input)?;
    Ok((input, PathNode::with_args(name, args.unwrap_or_default())))
}

fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_")))),
        )),
        str::to_string,
    )(input)
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::types::CoreType;

    #[test]
    fn parses_nested_references() {
        let ty = parse_type("&&mut Foo").expect("type");
        let TypeRef::Borrow { kind, inner } = ty else {
            panic!("expected borrow");
        };
        assert_eq!(kind, BorrowKind::Shared);
        assert!(matches!(
            *inner,
            TypeRef::Borrow {
                kind: BorrowKind::Unique,
                ..
            }
        ));
    }

    #[test]
    fn parses_absolute_generic_paths() {
        let ty = parse_type("::shapes::Pair<u8, _>").expect("type");
        let TypeRef::Path(path) = ty else {
            panic!("expected path");
        };
        assert!(path.is_absolute());
        assert_eq!(path.key(), "::shapes::Pair");
        assert_eq!(
            path.last().map(|node| node.args.clone()),
            Some(vec![TypeRef::Primitive(CoreType::U8), TypeRef::Wildcard])
        );
    }

    #[test]
    fn parses_tuples_units_and_arrays() {
        assert_eq!(parse_type("()").expect("unit"), TypeRef::Unit);
        assert_eq!(parse_type("(bool)").expect("paren"), TypeRef::Primitive(CoreType::Bool));
        assert_eq!(
            parse_type("(i32,)").expect("one tuple"),
            TypeRef::Tuple(vec![TypeRef::Primitive(CoreType::I32)])
        );
        assert_eq!(
            parse_type("[u8; 4]").expect("array"),
            TypeRef::Array {
                inner: Box::new(TypeRef::Primitive(CoreType::U8)),
                size: Some(4),
            }
        );
    }

    #[test]
    fn rejects_trailing_garbage() {
        let err = parse_type("i32 >").expect_err("garbage");
        assert_eq!(err.span.start, 4);
        assert!(err.message.contains("invalid type"));
    }
}
