//! Filename templates
//!
//! A template is literal text interleaved with variables:
//!
//! ```text
//! {{topic}}/{{timestamp:unit=yyyy}}/{{partition}}-{{start_offset:padding=true}}.jsonl
//! ```
//!
//! Variables are resolved against [`Bindings`], a map from variable name to a
//! [`Binding`]. Bindings are a closed set of value kinds so everything a key
//! depends on is captured by value when the bindings are built.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::TemplateError;
use crate::timestamp::TimestampUnit;

const PADDED_OFFSET_WIDTH: usize = 20;

/// Variables understood by the topic/partition grouper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateVariable {
    Topic,
    Partition,
    StartOffset,
    Timestamp,
}

impl TemplateVariable {
    pub const ALL: [TemplateVariable; 4] = [
        TemplateVariable::Topic,
        TemplateVariable::Partition,
        TemplateVariable::StartOffset,
        TemplateVariable::Timestamp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TemplateVariable::Topic => "topic",
            TemplateVariable::Partition => "partition",
            TemplateVariable::StartOffset => "start_offset",
            TemplateVariable::Timestamp => "timestamp",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.name() == name)
    }
}

impl fmt::Display for TemplateVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A `name=value` parameter attached to a variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

impl Parameter {
    pub fn as_bool(&self) -> Option<bool> {
        match self.value.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }
}

/// A variable slot in a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariablePart {
    pub name: String,
    pub parameter: Option<Parameter>,
}

impl VariablePart {
    fn invalid_parameter(&self, parameter: &Parameter) -> TemplateError {
        TemplateError::invalid_parameter(&self.name, &parameter.name, &parameter.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Text(String),
    Variable(VariablePart),
}

/// The value bound to a template variable
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Rendered verbatim; takes no parameters
    Literal(String),
    /// An offset, honouring an optional `padding=true|false` parameter
    Offset(i64),
    /// An instant, formatted by the required `unit=` parameter
    Timestamp(DateTime<Tz>),
}

impl Binding {
    fn evaluate(&self, variable: &VariablePart) -> Result<String, TemplateError> {
        match self {
            Binding::Literal(value) => match &variable.parameter {
                None => Ok(value.clone()),
                Some(parameter) => Err(variable.invalid_parameter(parameter)),
            },
            Binding::Offset(offset) => {
                let padded = match &variable.parameter {
                    None => false,
                    Some(parameter) if parameter.name == "padding" => parameter
                        .as_bool()
                        .ok_or_else(|| variable.invalid_parameter(parameter))?,
                    Some(parameter) => return Err(variable.invalid_parameter(parameter)),
                };
                if padded {
                    Ok(format!("{:0width$}", offset, width = PADDED_OFFSET_WIDTH))
                } else {
                    Ok(offset.to_string())
                }
            }
            Binding::Timestamp(instant) => {
                let parameter =
                    variable
                        .parameter
                        .as_ref()
                        .ok_or_else(|| TemplateError::MissingParameter {
                            variable: variable.name.clone(),
                            parameter: "unit".to_string(),
                        })?;
                if parameter.name != "unit" {
                    return Err(variable.invalid_parameter(parameter));
                }
                let unit = TimestampUnit::parse(&parameter.value)
                    .ok_or_else(|| variable.invalid_parameter(parameter))?;
                Ok(unit.format(instant))
            }
        }
    }
}

/// Variable bindings for one render
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: HashMap<String, Binding>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, name: impl Into<String>, binding: Binding) -> Self {
        self.values.insert(name.into(), binding);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.values.get(name)
    }
}

/// A parsed filename template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    parts: Vec<TemplatePart>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut parts = Vec::new();
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                parts.push(TemplatePart::Text(rest[..open].to_string()));
            }
            let after_open = &rest[open + 2..];
            let close = after_open
                .find("}}")
                .ok_or_else(|| TemplateError::malformed(source, "unterminated '{{'"))?;
            parts.push(TemplatePart::Variable(parse_variable(
                source,
                &after_open[..close],
            )?));
            rest = &after_open[close + 2..];
        }

        if !rest.is_empty() {
            parts.push(TemplatePart::Text(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn parts(&self) -> &[TemplatePart] {
        &self.parts
    }

    /// Distinct variable names in order of name
    pub fn variable_names(&self) -> BTreeSet<&str> {
        self.variables().map(|v| v.name.as_str()).collect()
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables().any(|v| v.name == name)
    }

    /// Check that the known variables carry parameters they support.
    ///
    /// Unknown variables are left for render time, where they fail unless
    /// bound.
    pub fn check_parameters(&self) -> Result<(), TemplateError> {
        for variable in self.variables() {
            let Some(known) = TemplateVariable::from_name(&variable.name) else {
                continue;
            };
            let probe = match known {
                TemplateVariable::Topic | TemplateVariable::Partition => {
                    Binding::Literal(String::new())
                }
                TemplateVariable::StartOffset => Binding::Offset(0),
                TemplateVariable::Timestamp => {
                    Binding::Timestamp(DateTime::<Utc>::default().with_timezone(&Tz::UTC))
                }
            };
            probe.evaluate(variable)?;
        }
        Ok(())
    }

    pub fn render(&self, bindings: &Bindings) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len() + 16);
        for part in &self.parts {
            match part {
                TemplatePart::Text(text) => out.push_str(text),
                TemplatePart::Variable(variable) => {
                    let binding = bindings
                        .get(&variable.name)
                        .ok_or_else(|| TemplateError::UnboundVariable(variable.name.clone()))?;
                    out.push_str(&binding.evaluate(variable)?);
                }
            }
        }
        Ok(out)
    }

    fn variables(&self) -> impl Iterator<Item = &VariablePart> {
        self.parts.iter().filter_map(|part| match part {
            TemplatePart::Variable(variable) => Some(variable),
            TemplatePart::Text(_) => None,
        })
    }
}

impl FromStr for Template {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_variable(source: &str, inner: &str) -> Result<VariablePart, TemplateError> {
    let inner = inner.trim();
    let (name, parameter) = match inner.split_once(':') {
        Some((name, parameter)) => (name.trim(), Some(parameter.trim())),
        None => (inner, None),
    };

    if !is_word(name) {
        return Err(TemplateError::malformed(
            source,
            format!("invalid variable name '{}'", name),
        ));
    }

    let parameter = match parameter {
        None => None,
        Some(raw) => {
            let (param_name, value) = raw
                .split_once('=')
                .map(|(n, v)| (n.trim(), v.trim()))
                .filter(|(n, v)| is_word(n) && is_word(v))
                .ok_or_else(|| {
                    TemplateError::malformed(
                        source,
                        format!("invalid parameter '{}' for variable '{}'", raw, name),
                    )
                })?;
            Some(Parameter {
                name: param_name.to_string(),
                value: value.to_string(),
            })
        }
    };

    Ok(VariablePart {
        name: name.to_string(),
        parameter,
    })
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
