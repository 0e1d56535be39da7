use std::sync::Arc;

use nom::{
    IResult, Parser,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::char,
    combinator::{all_consuming, opt, recognize},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair},
};

use crate::{
    error::{Error, Result},
    runtime::{Class, ClassRegistry, JType, PrimitiveType},
};

/// Selects a method, constructor or field of every class assignable to `upper_bound_type`.
/// Methods match by name and parameter types, constructors by parameter types, fields by name.
#[derive(Debug, Clone)]
pub struct MemberSelector {
    pub(crate) upper_bound_type: Arc<Class>,
    pub(crate) member: SelectedMember,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum SelectedMember {
    Method { name: Arc<str>, parameters: Vec<JType> },
    Constructor { parameters: Vec<JType> },
    Field { name: Arc<str> },
}

struct ParsedSelector<'a> {
    path: Vec<&'a str>,
    parameters: Option<Vec<(Vec<&'a str>, usize)>>,
}

impl MemberSelector {
    pub fn upper_bound_type(&self) -> &Arc<Class> {
        &self.upper_bound_type
    }

    /// Parses `com.example.Foo.bar(int, java.lang.String[])`, `com.example.Foo.baz` (a field) or
    /// `com.example.Foo.Foo(int)` (a constructor). Parameter types are fully qualified except
    /// for primitives; varargs are written as arrays.
    pub fn parse(selector: &str, registry: &ClassRegistry) -> Result<MemberSelector> {
        let malformed = |reason: &str| Error::MalformedMemberSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        };
        if ["<", ">", "...", ";"].iter().any(|s| selector.contains(s)) {
            return Err(malformed(r#"shouldn't contain "<", ">", "...", or ";""#));
        }
        let cleaned: String = selector.split_whitespace().collect();
        let (_, parsed) = all_consuming(parse_selector)
            .parse(&cleaned)
            .map_err(|_| malformed("expected a qualified member name, optionally followed by a parameter list"))?;
        let Some((member_name, class_path)) = parsed.path.split_last() else {
            return Err(malformed("missing member name"));
        };
        if class_path.is_empty() {
            return Err(malformed("missing dot"));
        }
        let upper_bound_type = registry.resolve(&class_path.join("."))?;

        let member = match parsed.parameters {
            None => {
                let field = upper_bound_type
                    .public_fields()
                    .into_iter()
                    .find(|f| f.name() == *member_name)
                    .ok_or_else(|| Error::NoSuchMember(cleaned.clone()))?;
                SelectedMember::Field {
                    name: Arc::clone(&field.name),
                }
            }
            Some(parameters) => {
                let parameters = parameters
                    .into_iter()
                    .map(|(path, dimensions)| resolve_parameter(&path, dimensions, registry))
                    .collect::<Result<Vec<_>>>()?;
                if *member_name == upper_bound_type.simple_name() {
                    upper_bound_type
                        .public_constructors()
                        .iter()
                        .find(|c| c.parameters == parameters)
                        .ok_or_else(|| Error::NoSuchMember(cleaned.clone()))?;
                    SelectedMember::Constructor { parameters }
                } else {
                    let method = upper_bound_type
                        .public_methods()
                        .into_iter()
                        .find(|m| m.name() == *member_name && m.parameters == parameters)
                        .ok_or_else(|| Error::NoSuchMember(cleaned.clone()))?;
                    SelectedMember::Method {
                        name: Arc::clone(&method.name),
                        parameters,
                    }
                }
            }
        };
        Ok(MemberSelector {
            upper_bound_type,
            member,
        })
    }

    /// Parses every non-ignored line. With `ignore_missing`, selectors referring to unknown
    /// classes or members are skipped.
    pub fn parse_all<'a>(
        lines: impl IntoIterator<Item = &'a str>,
        ignore_missing: bool,
        registry: &ClassRegistry,
    ) -> Result<Vec<MemberSelector>> {
        let mut result = vec![];
        for line in lines {
            if is_ignored_line(line) {
                continue;
            }
            match MemberSelector::parse(line, registry) {
                Ok(selector) => result.push(selector),
                Err(Error::ClassNotFound(_) | Error::NoSuchMember(_)) if ignore_missing => {}
                Err(e) => return Err(e),
            }
        }
        Ok(result)
    }
}

/// Blank lines and `#` or `//` comments.
pub fn is_ignored_line(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#') || line.starts_with("//")
}

fn resolve_parameter(path: &[&str], dimensions: usize, registry: &ClassRegistry) -> Result<JType> {
    let name = path.join(".");
    let mut parameter = match primitive(&name) {
        Some(primitive) => JType::Primitive(primitive),
        None => JType::Class(registry.resolve(&name)?),
    };
    for _ in 0..dimensions {
        parameter = JType::array_of(parameter);
    }
    Ok(parameter)
}

fn primitive(name: &str) -> Option<PrimitiveType> {
    Some(match name {
        "boolean" => PrimitiveType::Boolean,
        "char" => PrimitiveType::Char,
        "byte" => PrimitiveType::Byte,
        "short" => PrimitiveType::Short,
        "int" => PrimitiveType::Int,
        "long" => PrimitiveType::Long,
        "float" => PrimitiveType::Float,
        "double" => PrimitiveType::Double,
        _ => return None,
    })
}

fn parse_selector(input: &str) -> IResult<&str, ParsedSelector<'_>> {
    let (input, path) = parse_qualified_name(input)?;
    let (input, parameters) = opt(delimited(
        char('('),
        separated_list0(char(','), parse_parameter),
        char(')'),
    ))
    .parse(input)?;
    Ok((input, ParsedSelector { path, parameters }))
}

fn parse_parameter(input: &str) -> IResult<&str, (Vec<&str>, usize)> {
    let (input, path) = parse_qualified_name(input)?;
    let (input, dimensions) = many0(tag("[]")).parse(input)?;
    Ok((input, (path, dimensions.len())))
}

fn parse_qualified_name(input: &str) -> IResult<&str, Vec<&str>> {
    separated_list1(char('.'), parse_identifier).parse(input)
}

fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_' || c == '$'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '$'),
    ))
    .parse(input)
}
