//! Property schema
//!
//! Classes bind a Dn pattern to a set of property definitions. Commit
//! validation resolves the class of the target object and checks the
//! property name, access and value against the class definition.
//!
//! Schema files are TOML:
//!
//! ```toml
//! [[classes]]
//! name = "l1PhysIf"
//! dn = "sys/intf/phys-*"
//!
//! [classes.properties.admin_state]
//! type = "enum"
//! values = ["up", "down"]
//!
//! [classes.properties.mtu]
//! type = "integer"
//! min = 576
//! max = 9216
//! ```


use std::collections::BTreeMap;
use std::path::Path;

use config::Config;
use config::File;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::Dn;
use crate::DnPattern;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    String,
    Integer,
    Bool,
    Enum,
}

/// Definition of a single property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDef {
    #[serde(rename = "type")]
    pub kind: PropertyKind,

    /// Maximum length for `string` properties
    #[serde(default)]
    pub max_len: Option<usize>,

    /// Inclusive bounds for `integer` properties
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,

    /// Allowed values for `enum` properties
    #[serde(default)]
    pub values: Vec<String>,

    /// Operational state, not writable through a commit
    #[serde(default)]
    pub read_only: bool,
}

impl PropertyDef {
    pub fn string() -> Self {
        Self::of(PropertyKind::String)
    }

    pub fn integer(
        min: Option<i64>,
        max: Option<i64>,
    ) -> Self {
        Self {
            min,
            max,
            ..Self::of(PropertyKind::Integer)
        }
    }

    pub fn boolean() -> Self {
        Self::of(PropertyKind::Bool)
    }

    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            ..Self::of(PropertyKind::Enum)
        }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    fn of(kind: PropertyKind) -> Self {
        Self {
            kind,
            max_len: None,
            min: None,
            max: None,
            values: Vec::new(),
            read_only: false,
        }
    }

    /// Check a candidate value; the error is a human readable reason
    pub fn check(
        &self,
        value: &str,
    ) -> std::result::Result<(), String> {
        match self.kind {
            PropertyKind::String => match self.max_len {
                Some(max_len) if value.chars().count() > max_len => {
                    Err(format!("longer than {max_len} characters"))
                }
                _ => Ok(()),
            },
            PropertyKind::Integer => {
                let n: i64 = value.trim().parse().map_err(|_| format!("{value:?} is not an integer"))?;
                if let Some(min) = self.min {
                    if n < min {
                        return Err(format!("{n} is below minimum {min}"));
                    }
                }
                if let Some(max) = self.max {
                    if n > max {
                        return Err(format!("{n} is above maximum {max}"));
                    }
                }
                Ok(())
            }
            PropertyKind::Bool => match value {
                "true" | "false" | "yes" | "no" => Ok(()),
                other => Err(format!("{other:?} is not a boolean")),
            },
            PropertyKind::Enum => {
                if self.values.iter().any(|v| v == value) {
                    Ok(())
                } else {
                    Err(format!("{value:?} is not one of {:?}", self.values))
                }
            }
        }
    }
}

/// A class of managed objects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,

    /// Absolute Dn pattern selecting the objects of this class
    pub dn: String,

    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDef>,
}

impl ClassDef {
    pub fn new(
        name: impl Into<String>,
        dn: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            dn: dn.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(
        mut self,
        name: impl Into<String>,
        def: PropertyDef,
    ) -> Self {
        self.properties.insert(name.into(), def);
        self
    }

    pub fn property(
        &self,
        name: &str,
    ) -> Option<&PropertyDef> {
        self.properties.get(name)
    }
}

#[derive(Debug, Default, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    classes: Vec<ClassDef>,
}

/// Result of resolving a property against the schema
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum PropertyCheck {
    Accepted,
    UnknownProperty,
    InvalidValue(String),
}

/// Ordered set of classes; the first class whose pattern matches wins
#[derive(Debug, Clone, Default)]
pub struct Schema {
    classes: Vec<(ClassDef, DnPattern)>,
    strict: bool,
}

impl Schema {
    pub fn new(classes: Vec<ClassDef>) -> Result<Self> {
        let mut compiled = Vec::with_capacity(classes.len());
        for class in classes {
            let pattern = DnPattern::parse(&class.dn)?;
            compiled.push((class, pattern));
        }
        Ok(Self {
            classes: compiled,
            strict: false,
        })
    }

    /// Load classes from a TOML schema file
    pub fn load(path: &Path) -> Result<Self> {
        let file: SchemaFile = Config::builder()
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()?;
        debug!(path = %path.display(), classes = file.classes.len(), "Schema loaded");
        Self::new(file.classes)
    }

    /// In strict mode objects without a class accept no properties
    pub fn strict(
        mut self,
        strict: bool,
    ) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Class governing `dn`, if any
    pub fn class_for(
        &self,
        dn: &Dn,
    ) -> Option<&ClassDef> {
        self.classes
            .iter()
            .find(|(_, pattern)| pattern.matches(dn))
            .map(|(class, _)| class)
    }

    pub fn class(
        &self,
        name: &str,
    ) -> Option<&ClassDef> {
        self.classes.iter().map(|(class, _)| class).find(|c| c.name == name)
    }

    /// Validate a write of `value` to `property` on an object of `class`
    pub(crate) fn check_write(
        &self,
        class: Option<&str>,
        property: &str,
        value: &str,
    ) -> PropertyCheck {
        match class.and_then(|name| self.class(name)) {
            Some(class) => match class.property(property) {
                None => PropertyCheck::UnknownProperty,
                Some(def) if def.read_only => PropertyCheck::UnknownProperty,
                Some(def) => match def.check(value) {
                    Ok(()) => PropertyCheck::Accepted,
                    Err(detail) => PropertyCheck::InvalidValue(detail),
                },
            },
            None if self.strict => PropertyCheck::UnknownProperty,
            None => PropertyCheck::Accepted,
        }
    }
}
