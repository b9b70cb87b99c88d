//! Command registry – the closed set of backend commands the bridge may call.
//!
//! Each command has a static [`CommandDescriptor`] (name, argument shape,
//! return shape) used for runtime validation, and a marker type
//! implementing [`Command`] that carries the same contract at the type level.

use crate::types::{OperatingSystemType, Requirements};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Every command known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    GetOperatingSystemType,
    GetRequirements,
    IsSetup,
}

impl CommandName {
    pub const ALL: [CommandName; 3] = [
        CommandName::GetOperatingSystemType,
        CommandName::GetRequirements,
        CommandName::IsSetup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandName::GetOperatingSystemType => "get_operating_system_type",
            CommandName::GetRequirements => "get_requirements",
            CommandName::IsSetup => "is_setup",
        }
    }

    pub fn descriptor(&self) -> &'static CommandDescriptor {
        match self {
            CommandName::GetOperatingSystemType => &GET_OPERATING_SYSTEM_TYPE,
            CommandName::GetRequirements => &GET_REQUIREMENTS,
            CommandName::IsSetup => &IS_SETUP,
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown command: {0}")]
pub struct UnknownCommand(pub String);

impl FromStr for CommandName {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}

/// Static description of one command.
#[derive(Debug)]
pub struct CommandDescriptor {
    pub name: CommandName,
    /// `None` when the command takes no arguments.
    pub args: Option<Shape>,
    pub returns: Shape,
}

/// All descriptors, in registry order.
pub fn descriptors() -> impl Iterator<Item = &'static CommandDescriptor> {
    CommandName::ALL.into_iter().map(|name| name.descriptor())
}

/// The registry as JSON: one `{ name, args, returns }` entry per command,
/// with shapes rendered by [`Shape::describe`].
pub fn describe_registry() -> Value {
    descriptors()
        .map(|d| {
            serde_json::json!({
                "name": d.name.as_str(),
                "args": d.args.as_ref().map(Shape::describe),
                "returns": d.returns.describe(),
            })
        })
        .collect()
}

/// Typed view of a registry entry.
///
/// Commands without arguments use `()` as their `Args`; the bridge only
/// offers the no-argument entry points for those.
pub trait Command {
    const NAME: CommandName;
    type Args: Serialize;
    type Output: DeserializeOwned;

    fn descriptor() -> &'static CommandDescriptor {
        Self::NAME.descriptor()
    }
}

pub struct GetOperatingSystemType;

impl Command for GetOperatingSystemType {
    const NAME: CommandName = CommandName::GetOperatingSystemType;
    type Args = ();
    type Output = OperatingSystemType;
}

pub struct GetRequirements;

impl Command for GetRequirements {
    const NAME: CommandName = CommandName::GetRequirements;
    type Args = ();
    type Output = Requirements;
}

pub struct IsSetup;

impl Command for IsSetup {
    const NAME: CommandName = CommandName::IsSetup;
    type Args = ();
    type Output = bool;
}

// ---------------------------------------------------------------------------
// Shapes
// ---------------------------------------------------------------------------

/// Structural schema of a JSON value.
#[derive(Debug)]
pub enum Shape {
    Void,
    Boolean,
    String,
    /// Exactly one of the listed strings.
    Literal(&'static [&'static str]),
    Nullable(&'static Shape),
    /// Object with exactly these fields. Extra fields are tolerated.
    Record(&'static [(&'static str, Shape)]),
    /// First alternative that validates wins.
    Union(&'static [Shape]),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("at {path}: expected {expected}, found {found}")]
pub struct ShapeError {
    pub path: String,
    pub expected: String,
    pub found: String,
}

impl Shape {
    /// Check `value` against this shape.
    pub fn validate(&self, value: &Value) -> Result<(), ShapeError> {
        self.validate_at("$", value)
    }

    fn validate_at(&self, path: &str, value: &Value) -> Result<(), ShapeError> {
        let ok = match (self, value) {
            (Shape::Void, Value::Null) => true,
            (Shape::Boolean, Value::Bool(_)) => true,
            (Shape::String, Value::String(_)) => true,
            (Shape::Literal(options), Value::String(s)) => options.contains(&s.as_str()),
            (Shape::Nullable(_), Value::Null) => true,
            (Shape::Nullable(inner), other) => return inner.validate_at(path, other),
            (Shape::Record(fields), Value::Object(map)) => {
                for (name, shape) in fields.iter() {
                    let field_path = format!("{}.{}", path, name);
                    match map.get(*name) {
                        Some(v) => shape.validate_at(&field_path, v)?,
                        None if matches!(shape, Shape::Nullable(_)) => {}
                        None => {
                            return Err(ShapeError {
                                path: field_path,
                                expected: shape.describe(),
                                found: "nothing".into(),
                            })
                        }
                    }
                }
                true
            }
            (Shape::Union(options), v) => options.iter().any(|s| s.validate_at(path, v).is_ok()),
            _ => false,
        };

        if ok {
            Ok(())
        } else {
            Err(ShapeError {
                path: path.to_string(),
                expected: self.describe(),
                found: describe_value(value),
            })
        }
    }

    /// Short human description, used in errors and `launcherctl list`.
    pub fn describe(&self) -> String {
        match self {
            Shape::Void => "void".into(),
            Shape::Boolean => "boolean".into(),
            Shape::String => "string".into(),
            Shape::Literal(options) => options
                .iter()
                .map(|o| format!("{:?}", o))
                .collect::<Vec<_>>()
                .join(" | "),
            Shape::Nullable(inner) => format!("{} | null", inner.describe()),
            Shape::Record(fields) => {
                let inner = fields
                    .iter()
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{ {} }}", inner)
            }
            Shape::Union(options) => options
                .iter()
                .map(Shape::describe)
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(b) => format!("boolean {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => format!("string {:?}", s),
        Value::Array(_) => "array".into(),
        Value::Object(_) => "object".into(),
    }
}

// ---------------------------------------------------------------------------
// Registry table
// ---------------------------------------------------------------------------

const REQUIREMENT_FIELD: Shape = Shape::Union(&[
    Shape::Literal(&["Met"]),
    Shape::Record(&[("NotMet", Shape::Record(&[("message", Shape::String)]))]),
]);

const NULLABLE_PATH: Shape = Shape::Nullable(&Shape::String);

static GET_OPERATING_SYSTEM_TYPE: CommandDescriptor = CommandDescriptor {
    name: CommandName::GetOperatingSystemType,
    args: None,
    returns: Shape::Literal(&["Linux", "MacOS", "Windows"]),
};

static GET_REQUIREMENTS: CommandDescriptor = CommandDescriptor {
    name: CommandName::GetRequirements,
    args: None,
    returns: Shape::Record(&[
        ("all_met", Shape::Boolean),
        ("operating_system", REQUIREMENT_FIELD),
        ("architecture", REQUIREMENT_FIELD),
        ("steam", REQUIREMENT_FIELD),
        ("mw3_path", NULLABLE_PATH),
        ("bo2_path", NULLABLE_PATH),
        ("bo2_mp_path", NULLABLE_PATH),
        ("bo1_path", NULLABLE_PATH),
        ("bo1_mp_path", NULLABLE_PATH),
        ("waw_path", NULLABLE_PATH),
    ]),
};

static IS_SETUP: CommandDescriptor = CommandDescriptor {
    name: CommandName::IsSetup,
    args: None,
    returns: Shape::Boolean,
};

// ===========================================================================
// Tests
// ===========================================================================
