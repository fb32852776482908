//! The closed field schema rule expressions are checked against.
//!
//! | Target | Fields |
//! |---|---|
//! | node | `id`, `fqname`, `name`, `kind`, `language`, `layer`, `container`, `context`, `file`, `attr.<key>` |
//! | dependency | `dep_type` (alias `type`), `src.<node field>`, `dst.<node field>` |
//!
//! Names are resolved once, at compile time, into a [`Field`]. Reading a
//! field that is optional and unset yields [`Value::Absent`].

use std::fmt;

use thiserror::Error;

use super::types::RuleTarget;
use crate::ir::{AttrValue, CanonicalId, DepType, EdgeKey, IREdge, IRNode, Language, SymbolKind};

/// Names of the plain node fields, for help output.
pub const NODE_FIELDS: &[&str] = &[
    "id",
    "fqname",
    "name",
    "kind",
    "language",
    "layer",
    "container",
    "context",
    "file",
    "attr.<key>",
];

/// A field of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeField {
    /// Canonical id.
    Id,
    /// Fully-qualified name.
    Fqname,
    /// Last segment of the fully-qualified name.
    Name,
    /// Symbol kind.
    Kind,
    /// Language.
    Language,
    /// Resolved layer.
    Layer,
    /// Resolved container.
    Container,
    /// Resolved context.
    Context,
    /// Definition file.
    File,
    /// Extension attribute.
    Attr(String),
}

impl NodeField {
    /// Parses a node field name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "id" => Self::Id,
            "fqname" => Self::Fqname,
            "name" => Self::Name,
            "kind" => Self::Kind,
            "language" => Self::Language,
            "layer" => Self::Layer,
            "container" => Self::Container,
            "context" => Self::Context,
            "file" => Self::File,
            _ => {
                let key = name.strip_prefix("attr.")?;
                if key.is_empty() {
                    return None;
                }
                Self::Attr(key.to_string())
            }
        })
    }

    /// Reads the field off a node.
    #[must_use]
    pub fn read<'a>(&self, node: &'a IRNode) -> Value<'a> {
        match self {
            Self::Id => Value::Str(node.id.as_str()),
            Self::Fqname => Value::Str(&node.fqname),
            Self::Name => Value::Str(node.name()),
            Self::Kind => Value::Str(node.kind.as_str()),
            Self::Language => Value::Str(node.language.as_str()),
            Self::Layer => Value::from_opt(node.layer.as_deref()),
            Self::Container => Value::from_opt(node.container.as_deref()),
            Self::Context => Value::from_opt(node.context.as_deref()),
            Self::File => Value::from_opt(node.file()),
            Self::Attr(key) => node.attributes.get(key).map_or(Value::Absent, Value::from),
        }
    }

    fn is_string(&self) -> bool {
        !matches!(self, Self::Attr(_))
    }

    fn canonical_literal(&self, literal: &str) -> String {
        match self {
            Self::Kind => SymbolKind::from(literal).as_str().to_string(),
            Self::Language => Language::from(literal).as_str().to_string(),
            _ => literal.to_string(),
        }
    }
}

impl fmt::Display for NodeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id => f.write_str("id"),
            Self::Fqname => f.write_str("fqname"),
            Self::Name => f.write_str("name"),
            Self::Kind => f.write_str("kind"),
            Self::Language => f.write_str("language"),
            Self::Layer => f.write_str("layer"),
            Self::Container => f.write_str("container"),
            Self::Context => f.write_str("context"),
            Self::File => f.write_str("file"),
            Self::Attr(key) => write!(f, "attr.{key}"),
        }
    }
}

/// Which end of a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// The depending node.
    Src,
    /// The depended-upon node.
    Dst,
}

/// A resolved field reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    /// A field of the node under test.
    Node(NodeField),
    /// The dependency type of the edge under test.
    DepType,
    /// A field of one endpoint of the edge under test.
    Endpoint(Endpoint, NodeField),
}

/// A field name that does not resolve for a target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// Not a field at all.
    #[error("unknown field `{name}` for {target} rules")]
    Unknown {
        /// Name as written.
        name: String,
        /// Rule target.
        target: RuleTarget,
    },
    /// A field of the other target kind.
    #[error("field `{name}` cannot be used in {target} rules; {hint}")]
    WrongTarget {
        /// Name as written.
        name: String,
        /// Rule target.
        target: RuleTarget,
        /// What to write instead.
        hint: &'static str,
    },
}

impl Field {
    /// Resolves a field name for the given target.
    ///
    /// # Errors
    ///
    /// Fails for names outside the schema and for fields that belong to the
    /// other target kind.
    pub fn resolve(name: &str, target: RuleTarget) -> Result<Self, FieldError> {
        let unknown = || FieldError::Unknown {
            name: name.to_string(),
            target,
        };
        let wrong = |hint: &'static str| FieldError::WrongTarget {
            name: name.to_string(),
            target,
            hint,
        };

        if name == "dep_type" || name == "type" {
            return match target {
                RuleTarget::Dependency => Ok(Self::DepType),
                RuleTarget::Node => Err(wrong("node rules have no dependency type")),
            };
        }

        let endpoint = if let Some(rest) = name.strip_prefix("src.") {
            Some((Endpoint::Src, rest))
        } else {
            name.strip_prefix("dst.").map(|rest| (Endpoint::Dst, rest))
        };

        if let Some((endpoint, rest)) = endpoint {
            let field = NodeField::parse(rest).ok_or_else(unknown)?;
            return match target {
                RuleTarget::Dependency => Ok(Self::Endpoint(endpoint, field)),
                RuleTarget::Node => Err(wrong("use the plain node field instead")),
            };
        }

        let field = NodeField::parse(name).ok_or_else(unknown)?;
        match target {
            RuleTarget::Node => Ok(Self::Node(field)),
            RuleTarget::Dependency => Err(wrong("use `src.<field>` or `dst.<field>`")),
        }
    }

    /// Returns true if the field always holds a string (or is absent).
    #[must_use]
    pub fn is_string(&self) -> bool {
        match self {
            Self::Node(f) | Self::Endpoint(_, f) => f.is_string(),
            Self::DepType => true,
        }
    }

    /// Canonical spelling of a string literal compared against this field.
    ///
    /// Kind, language and dependency type values are lowercase, so a literal
    /// like `"Class"` is folded to `"class"`.
    #[must_use]
    pub fn canonical_literal(&self, literal: &str) -> String {
        match self {
            Self::Node(f) | Self::Endpoint(_, f) => f.canonical_literal(literal),
            Self::DepType => DepType::from(literal).as_str().to_string(),
        }
    }

    /// Reads the field off a target.
    ///
    /// # Errors
    ///
    /// Returns [`EvalFault::TargetMismatch`] when the field does not belong
    /// to the target kind, which the compiler rules out.
    pub fn read<'a>(&self, target: &EvalTarget<'a>) -> Result<Value<'a>, EvalFault> {
        match (self, *target) {
            (Self::Node(field), EvalTarget::Node(node)) => Ok(field.read(node)),
            (Self::DepType, EvalTarget::Dependency { edge, .. }) => {
                Ok(Value::Str(edge.dep_type.as_str()))
            }
            (Self::Endpoint(Endpoint::Src, field), EvalTarget::Dependency { src, .. }) => {
                Ok(field.read(src))
            }
            (Self::Endpoint(Endpoint::Dst, field), EvalTarget::Dependency { dst, .. }) => {
                Ok(field.read(dst))
            }
            _ => Err(EvalFault::TargetMismatch {
                field: self.to_string(),
                target: target.kind(),
            }),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(field) => write!(f, "{field}"),
            Self::DepType => f.write_str("dep_type"),
            Self::Endpoint(Endpoint::Src, field) => write!(f, "src.{field}"),
            Self::Endpoint(Endpoint::Dst, field) => write!(f, "dst.{field}"),
        }
    }
}

/// A field value read at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value<'a> {
    /// String value.
    Str(&'a str),
    /// Integer value.
    Int(i64),
    /// Boolean value.
    Bool(bool),
    /// The field is optional and unset.
    Absent,
}

impl<'a> Value<'a> {
    fn from_opt(s: Option<&'a str>) -> Self {
        s.map_or(Self::Absent, Self::Str)
    }

    /// Returns true for [`Value::Absent`].
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Text used by the pattern operators. `None` when absent.
    #[must_use]
    pub fn text(&self) -> Option<std::borrow::Cow<'a, str>> {
        match *self {
            Self::Str(s) => Some(std::borrow::Cow::Borrowed(s)),
            Self::Int(i) => Some(std::borrow::Cow::Owned(i.to_string())),
            Self::Bool(b) => Some(std::borrow::Cow::Owned(b.to_string())),
            Self::Absent => None,
        }
    }
}

impl<'a> From<&'a AttrValue> for Value<'a> {
    fn from(v: &'a AttrValue) -> Self {
        match v {
            AttrValue::Str(s) => Self::Str(s),
            AttrValue::Int(i) => Self::Int(*i),
            AttrValue::Bool(b) => Self::Bool(*b),
        }
    }
}

/// What a predicate is evaluated against.
#[derive(Debug, Clone, Copy)]
pub enum EvalTarget<'a> {
    /// A node.
    Node(&'a IRNode),
    /// An edge with both endpoints resolved.
    Dependency {
        /// The edge.
        edge: &'a IREdge,
        /// Source node.
        src: &'a IRNode,
        /// Destination node.
        dst: &'a IRNode,
    },
}

impl EvalTarget<'_> {
    /// Kind of target.
    #[must_use]
    pub fn kind(&self) -> RuleTarget {
        match self {
            Self::Node(_) => RuleTarget::Node,
            Self::Dependency { .. } => RuleTarget::Dependency,
        }
    }
}

/// Internal inconsistency found while evaluating a rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalFault {
    /// A field was read off the wrong kind of target.
    #[error("field `{field}` read from a {target} target")]
    TargetMismatch {
        /// Field.
        field: String,
        /// Actual target kind.
        target: RuleTarget,
    },
    /// An edge endpoint is not in the index.
    #[error("dependency {edge} references unknown node `{missing}`")]
    MissingEndpoint {
        /// Edge.
        edge: EdgeKey,
        /// The endpoint that could not be resolved.
        missing: CanonicalId,
    },
}
