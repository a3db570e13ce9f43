use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared type of one command parameter; selects the converter built for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParamKind {
    String,
    Boolean,
    Integer,
    Number,
    Node,
}

impl ParamKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "bool",
            Self::Integer => "int",
            Self::Number => "float",
            Self::Node => "Node",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub optional: bool,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: false,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReturnShape {
    FireAndForget,
    AsyncCompletion,
    Invalid,
}

/// Parameters and return shape a command handler declares at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSignature {
    pub params: Vec<ParamSpec>,
    pub returns: ReturnShape,
}

impl CommandSignature {
    pub fn sync() -> Self {
        Self::with_returns(ReturnShape::FireAndForget)
    }

    pub fn asynchronous() -> Self {
        Self::with_returns(ReturnShape::AsyncCompletion)
    }

    pub fn with_returns(returns: ReturnShape) -> Self {
        Self {
            params: Vec::new(),
            returns,
        }
    }

    pub fn required(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.params.push(ParamSpec::required(name, kind));
        self
    }

    pub fn optional(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.params.push(ParamSpec::optional(name, kind));
        self
    }

    pub fn required_count(&self) -> usize {
        self.params.iter().filter(|param| !param.optional).count()
    }

    pub fn total_count(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DispatchStatus {
    SucceededSync,
    SucceededAsync,
    InvalidParameterCount,
    CommandUnknown,
    NoTargetFound,
    TargetMissingComponent,
}

impl DispatchStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::SucceededSync | Self::SucceededAsync)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SucceededSync => "SucceededSync",
            Self::SucceededAsync => "SucceededAsync",
            Self::InvalidParameterCount => "InvalidParameterCount",
            Self::CommandUnknown => "CommandUnknown",
            Self::NoTargetFound => "NoTargetFound",
            Self::TargetMissingComponent => "TargetMissingComponent",
        }
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
