//! Typed field tables for partial updates.
//!
//! Each kind publishes a static slice of `Field`s. A PATCH body is applied by
//! looking every key up in that slice; a key with no entry is rejected before
//! anything is written.

use serde_json::{Map, Value};

use crate::resources::Violation;

/// A typed setter for one editable field.
pub enum Setter<R> {
    Text(fn(&mut R, String)),
    Count(fn(&mut R, u32)),
}

/// An editable field of `R`.
pub struct Field<R> {
    pub name: &'static str,
    pub setter: Setter<R>,
}

impl<R> Field<R> {
    /// Coerce `value` to the field's type and assign it.
    pub fn apply(&self, target: &mut R, value: &Value) -> Result<(), Violation> {
        match &self.setter {
            Setter::Text(set) => match value {
                Value::String(s) => {
                    set(target, s.clone());
                    Ok(())
                }
                _ => Err(Violation::invalid_value(format!("{} must be a string", self.name))),
            },
            Setter::Count(set) => {
                let count = value
                    .as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| {
                        Violation::invalid_value(format!("{} must be a non-negative integer", self.name))
                    })?;
                set(target, count);
                Ok(())
            }
        }
    }
}

/// Apply every entry of `patch` through `table`. Nothing is assigned unless
/// every key is known and every value has the right type.
pub fn apply_patch<R: Clone>(
    table: &[Field<R>],
    target: &mut R,
    patch: &Map<String, Value>,
) -> Result<(), Vec<Violation>> {
    let mut staged = target.clone();
    let mut violations = Vec::new();

    for (key, value) in patch {
        match table.iter().find(|f| f.name == key) {
            Some(field) => {
                if let Err(v) = field.apply(&mut staged, value) {
                    violations.push(v);
                }
            }
            None => violations.push(Violation::unknown_field(key)),
        }
    }

    if violations.is_empty() {
        *target = staged;
        Ok(())
    } else {
        Err(violations)
    }
}
