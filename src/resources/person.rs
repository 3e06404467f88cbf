//! Person resource.

use serde::{Deserialize, Serialize};

use crate::resources::{validate_common, Field, Resource, ResourceKind, Setter, Violation};
use crate::store::Record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Person {
    pub id: String,
    pub kind: ResourceKind,
    pub name: String,
    pub age: u32,
    pub description: Option<String>,
    pub deleted: bool,
    pub cloned: bool,
    pub cloned_from_ref: Option<String>,
}

impl Default for Person {
    fn default() -> Self {
        Self {
            id: String::new(),
            kind: ResourceKind::Person,
            name: String::new(),
            age: 0,
            description: None,
            deleted: false,
            cloned: false,
            cloned_from_ref: None,
        }
    }
}

fn set_name(p: &mut Person, name: String) {
    p.name = name;
}

fn set_description(p: &mut Person, description: String) {
    p.description = Some(description);
}

fn set_age(p: &mut Person, age: u32) {
    p.age = age;
}

const PERSON_FIELDS: &[Field<Person>] = &[
    Field { name: "name", setter: Setter::Text(set_name) },
    Field { name: "description", setter: Setter::Text(set_description) },
    Field { name: "age", setter: Setter::Count(set_age) },
];

impl Record for Person {
    const TABLE: &'static str = "person";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Resource for Person {
    const KIND: ResourceKind = ResourceKind::Person;

    fn fields() -> &'static [Field<Self>] {
        PERSON_FIELDS
    }

    fn prepare_new(&mut self, id: String) {
        self.id = id;
        self.deleted = false;
        self.cloned = false;
        self.cloned_from_ref = None;
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), Vec<Violation>> {
        validate_common(Self::KIND, &self.id, self.kind, &self.name)
    }

    fn duplicate(&self, new_id: String) -> Self {
        Self {
            id: new_id,
            kind: self.kind,
            name: self.name.clone(),
            age: self.age,
            description: self.description.clone(),
            deleted: false,
            cloned: true,
            cloned_from_ref: Some(self.id.clone()),
        }
    }
}
