//! Animal resource.

use serde::{Deserialize, Serialize};

use crate::resources::{validate_common, Field, Resource, ResourceKind, Setter, Violation};
use crate::store::Record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Animal {
    pub id: String,
    pub kind: ResourceKind,
    pub name: String,
    pub age: u32,
    pub description: Option<String>,
    pub deleted: bool,
    pub cloned: bool,
    pub cloned_from_ref: Option<String>,
}

impl Default for Animal {
    fn default() -> Self {
        Self {
            id: String::new(),
            kind: ResourceKind::Animal,
            name: String::new(),
            age: 0,
            description: None,
            deleted: false,
            cloned: false,
            cloned_from_ref: None,
        }
    }
}

fn set_name(a: &mut Animal, name: String) {
    a.name = name;
}

fn set_description(a: &mut Animal, description: String) {
    a.description = Some(description);
}

fn set_age(a: &mut Animal, age: u32) {
    a.age = age;
}

const ANIMAL_FIELDS: &[Field<Animal>] = &[
    Field { name: "name", setter: Setter::Text(set_name) },
    Field { name: "description", setter: Setter::Text(set_description) },
    Field { name: "age", setter: Setter::Count(set_age) },
];

impl Record for Animal {
    const TABLE: &'static str = "animal";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Resource for Animal {
    const KIND: ResourceKind = ResourceKind::Animal;

    fn fields() -> &'static [Field<Self>] {
        ANIMAL_FIELDS
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
