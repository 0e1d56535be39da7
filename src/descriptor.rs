use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::take_until,
    character::complete::{char, one_of},
    combinator::{all_consuming, map, value},
    multi::many0,
    sequence::delimited,
};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor(pub(crate) FieldType);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub(crate) parameters: Vec<FieldType>,
    pub(crate) return_type: ReturnType,
}

pub type ReturnType = Option<FieldType>;

/// Type names inside `Object` use the dotted binary form, `java.lang.String`.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum FieldType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Object(String),
    Short,
    Boolean,
    Array(Box<FieldType>),
}

impl FieldType {
    pub fn to_descriptor(&self) -> String {
        match self {
            FieldType::Byte => "B".to_string(),
            FieldType::Char => "C".to_string(),
            FieldType::Double => "D".to_string(),
            FieldType::Float => "F".to_string(),
            FieldType::Int => "I".to_string(),
            FieldType::Long => "J".to_string(),
            FieldType::Short => "S".to_string(),
            FieldType::Boolean => "Z".to_string(),
            FieldType::Object(name) => format!("L{};", name.replace('.', "/")),
            FieldType::Array(element) => format!("[{}", element.to_descriptor()),
        }
    }
}

pub fn parse_field_descriptor(input: &str) -> Result<FieldDescriptor> {
    let (_, field_type) = all_consuming(parse_field_type)
        .parse(input)
        .map_err(|_| Error::MalformedDescriptor(input.to_string()))?;
    Ok(FieldDescriptor(field_type))
}

pub fn parse_method_descriptor(input: &str) -> Result<MethodDescriptor> {
    let (_, (parameters, return_type)) = all_consuming((
        delimited(char('('), many0(parse_field_type), char(')')),
        parse_return_type_descriptor,
    ))
    .parse(input)
    .map_err(|_| Error::MalformedDescriptor(input.to_string()))?;
    Ok(MethodDescriptor {
        parameters,
        return_type,
    })
}

/// Constructors take only the parameter list, `(II)`; a trailing `V` is tolerated.
pub fn parse_constructor_descriptor(input: &str) -> Result<Vec<FieldType>> {
    let (_, (parameters, _)) = all_consuming((
        delimited(char('('), many0(parse_field_type), char(')')),
        many0(char('V')),
    ))
    .parse(input)
    .map_err(|_| Error::MalformedDescriptor(input.to_string()))?;
    Ok(parameters)
}

fn parse_return_type_descriptor(input: &str) -> IResult<&str, ReturnType> {
    alt((map(parse_field_type, Some), value(None, char('V')))).parse(input)
}

fn parse_field_type(input: &str) -> IResult<&str, FieldType> {
    alt((parse_base_type, parse_object_type, parse_array_type)).parse(input)
}

fn parse_base_type(input: &str) -> IResult<&str, FieldType> {
    map(one_of("BCDFIJSZ"), |ch| match ch {
        'B' => FieldType::Byte,
        'C' => FieldType::Char,
        'D' => FieldType::Double,
        'F' => FieldType::Float,
        'I' => FieldType::Int,
        'J' => FieldType::Long,
        'S' => FieldType::Short,
        _ => FieldType::Boolean,
    })
    .parse(input)
}

fn parse_object_type(input: &str) -> IResult<&str, FieldType> {
    let (input, class_name) = delimited(char('L'), take_until(";"), char(';')).parse(input)?;
    Ok((input, FieldType::Object(class_name.replace('/', "."))))
}

fn parse_array_type(input: &str) -> IResult<&str, FieldType> {
    let (input, _) = char('[').parse(input)?;
    let (input, field_type) = parse_field_type(input)?;
    Ok((input, FieldType::Array(Box::new(field_type))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_method_descriptor() {
        let descriptor = parse_method_descriptor("(I[Ljava/lang/String;)Ljava/util/List;").unwrap();
        assert_eq!(
            descriptor.parameters,
            vec![
                FieldType::Int,
                FieldType::Array(Box::new(FieldType::Object("java.lang.String".to_string()))),
            ]
        );
        assert_eq!(
            descriptor.return_type,
            Some(FieldType::Object("java.util.List".to_string()))
        );
    }

    #[test]
    fn parses_void_return() {
        let descriptor = parse_method_descriptor("()V").unwrap();
        assert!(descriptor.parameters.is_empty());
        assert_eq!(descriptor.return_type, None);
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse_method_descriptor("(I)VX").is_err());
        assert!(parse_field_descriptor("Ljava/lang/String").is_err());
    }

    #[test]
    fn constructor_descriptor_accepts_optional_void() {
        assert_eq!(
            parse_constructor_descriptor("(II)").unwrap(),
            vec![FieldType::Int, FieldType::Int]
        );
        assert_eq!(
            parse_constructor_descriptor("(J)V").unwrap(),
            vec![FieldType::Long]
        );
    }

    #[test]
    fn descriptor_round_trips_through_text() {
        let FieldDescriptor(field_type) = parse_field_descriptor("[[Ljava/util/Map;").unwrap();
        assert_eq!(field_type.to_descriptor(), "[[Ljava/util/Map;");
    }
}
