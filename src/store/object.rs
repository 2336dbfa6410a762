use std::collections::BTreeMap;

use serde::Serialize;

use crate::Dn;

/// A managed object: a Dn plus its property map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedObject {
    dn: Dn,
    #[serde(skip_serializing_if = "Option::is_none")]
    class: Option<String>,
    properties: BTreeMap<String, String>,
    /// Unique per creation, tells a re-created Dn apart from its predecessor
    #[serde(skip)]
    instance: u64,
}

impl ManagedObject {
    pub(crate) fn new(
        dn: Dn,
        class: Option<String>,
        instance: u64,
    ) -> Self {
        Self {
            dn,
            class,
            properties: BTreeMap::new(),
            instance,
        }
    }

    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    /// Schema class the object was created under
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn property(
        &self,
        name: &str,
    ) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub(crate) fn instance(&self) -> u64 {
        self.instance
    }

    pub(crate) fn set_property(
        &mut self,
        name: &str,
        value: &str,
    ) {
        self.properties.insert(name.to_string(), value.to_string());
    }
}
