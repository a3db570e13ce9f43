use std::num::{ParseFloatError, ParseIntError};

use dc_core::{ArgValue, ParamKind, ParamSpec};
use thiserror::Error;

use crate::scene::SceneLookup;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("\"{token}\" is not a valid boolean and does not match the parameter name \"{param}\"")]
    Boolean { token: String, param: String },
    #[error(transparent)]
    Integer(#[from] ParseIntError),
    #[error(transparent)]
    Number(#[from] ParseFloatError),
}

/// Converts one token for one parameter position.
pub type Converter =
    Box<dyn Fn(&str, &dyn SceneLookup) -> Result<ArgValue, ConversionError> + Send + Sync>;

pub fn build_converters(params: &[ParamSpec]) -> Vec<Converter> {
    params.iter().map(build_converter).collect()
}

pub fn build_converter(param: &ParamSpec) -> Converter {
    match param.kind {
        ParamKind::String => Box::new(
            |token: &str, _scene: &dyn SceneLookup| -> Result<ArgValue, ConversionError> {
                Ok(ArgValue::String(token.to_string()))
            },
        ),
        ParamKind::Node => Box::new(
            |token: &str, scene: &dyn SceneLookup| -> Result<ArgValue, ConversionError> {
                Ok(ArgValue::Node(scene.find_node(token)))
            },
        ),
        ParamKind::Boolean => {
            let param_name = param.name.clone();
            Box::new(
                move |token: &str, _scene: &dyn SceneLookup| -> Result<ArgValue, ConversionError> {
                    parse_boolean(token, &param_name).map(ArgValue::Boolean)
                },
            )
        }
        ParamKind::Integer => Box::new(
            |token: &str, _scene: &dyn SceneLookup| -> Result<ArgValue, ConversionError> {
                Ok(ArgValue::Integer(token.trim().parse::<i64>()?))
            },
        ),
        ParamKind::Number => Box::new(
            |token: &str, _scene: &dyn SceneLookup| -> Result<ArgValue, ConversionError> {
                Ok(ArgValue::Number(token.trim().parse::<f64>()?))
            },
        ),
    }
}

fn parse_boolean(token: &str, param_name: &str) -> Result<bool, ConversionError> {
    if token.to_lowercase() == param_name.to_lowercase() {
        return Ok(true);
    }
    let trimmed = token.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        return Ok(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Ok(false);
    }
    Err(ConversionError::Boolean {
        token: token.to_string(),
        param: param_name.to_string(),
    })
}
