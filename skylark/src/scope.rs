//! Scoped activity blocks.
//!
//! A [`Scope`] carries an activity handle and a named-data bundle into
//! a user-supplied callback, replacing the source DSL's implicit block
//! receivers with an explicit value.

use indexmap::IndexMap;
use serde_json::Value;

use crate::activity::Activity;

/// An activity plus the bindings made available alongside it.
pub struct Scope {
    activity: Activity,
    bindings: IndexMap<String, Value>,
}

impl Scope {
    pub(crate) fn new(activity: Activity, bindings: IndexMap<String, Value>) -> Self {
        Self { activity, bindings }
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    /// One named binding, if present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn bindings(&self) -> &IndexMap<String, Value> {
        &self.bindings
    }

    /// Split the scope into its parts.
    pub fn into_parts(self) -> (Activity, IndexMap<String, Value>) {
        (self.activity, self.bindings)
    }
}
