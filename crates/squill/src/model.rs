//! Entity metadata.
//!
//! [`Entity`] is implemented by the derive macro and carries the static
//! description of a mappable struct. [`Model`] is the resolved form the
//! registry hands out: table name, ordered fields and lookup maps.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::value::Value;

/// Tag key selecting the table name on a struct-level `#[orm(...)]` tag.
const TAG_KEY_TABLE: &str = "table";
/// Tag key selecting the column name on a field-level `#[orm(...)]` tag.
const TAG_KEY_COLUMN: &str = "column";

/// Static description of one struct field, generated by the derive macro.
///
/// The safe accessors go through `dyn Any` downcasts. The unsafe pair reads
/// and writes through a base pointer plus `offset`; callers must have checked
/// that the pointee really is the entity type the accessors were generated
/// for.
pub struct FieldSpec {
    pub name: &'static str,
    pub tag: &'static str,
    pub offset: usize,
    pub get: fn(&dyn Any) -> Option<Value>,
    pub set: fn(&mut dyn Any, Value) -> Result<()>,
    pub read: unsafe fn(*const u8) -> Value,
    pub write: unsafe fn(*mut u8, Value) -> Result<()>,
}

impl std::fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("offset", &self.offset)
            .finish()
    }
}

/// A struct that can be mapped to and from rows.
///
/// Implemented with `#[derive(Entity)]`. Field types must be `Clone`,
/// `Into<Value>` and [`crate::FromValue`].
pub trait Entity: Any + Send + Sized {
    /// The struct identifier, used to derive the default table name.
    const TYPE_NAME: &'static str;
    /// Raw struct-level `#[orm(...)]` tag, empty when absent.
    const TAG: &'static str;

    fn fields() -> &'static [FieldSpec];
}

/// A resolved field: its struct name, its column name and its accessors.
#[derive(Debug)]
pub struct Field {
    pub name: &'static str,
    pub column: String,
    pub spec: &'static FieldSpec,
}

/// Resolved metadata for one entity type.
#[derive(Debug)]
pub struct Model {
    table_name: String,
    type_id: TypeId,
    type_name: &'static str,
    fields: Vec<Field>,
    field_index: HashMap<&'static str, usize>,
    column_index: HashMap<String, usize>,
}

impl Model {
    /// Builds the metadata for `T` from its derive output: table name from
    /// the struct tag or the snake-cased type name, column names from field
    /// tags or the snake-cased field names.
    pub fn of<T: Entity>() -> Result<Model> {
        let struct_tags = parse_tag(T::TAG)?;
        let table_name = match struct_tags.get(TAG_KEY_TABLE) {
            Some(name) if !name.is_empty() => (*name).to_string(),
            _ => underscore_name(T::TYPE_NAME),
        };

        let specs = T::fields();
        let mut fields = Vec::with_capacity(specs.len());
        let mut field_index = HashMap::with_capacity(specs.len());
        let mut column_index = HashMap::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            let tags = parse_tag(spec.tag)?;
            let column = match tags.get(TAG_KEY_COLUMN) {
                Some(col) if !col.is_empty() => (*col).to_string(),
                _ => underscore_name(spec.name),
            };
            field_index.insert(spec.name, i);
            column_index.insert(column.clone(), i);
            fields.push(Field {
                name: spec.name,
                column,
                spec,
            });
        }

        Ok(Model {
            table_name,
            type_id: TypeId::of::<T>(),
            type_name: T::TYPE_NAME,
            fields,
            field_index,
            column_index,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Looks a field up by its struct name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.field_index.get(name).map(|&i| &self.fields[i])
    }

    /// Looks a field up by its column name.
    pub fn column(&self, name: &str) -> Option<&Field> {
        self.column_index.get(name).map(|&i| &self.fields[i])
    }

    /// True when `instance` is a value of the type this model describes.
    pub fn is_instance(&self, instance: &dyn Any) -> bool {
        instance.type_id() == self.type_id
    }

    pub(crate) fn set_table_name(&mut self, name: String) {
        self.table_name = name;
    }

    pub(crate) fn set_column_name(&mut self, field: &str, column: String) -> Result<()> {
        let &i = self
            .field_index
            .get(field)
            .ok_or_else(|| Error::unknown_field(field))?;
        self.column_index.remove(&self.fields[i].column);
        self.column_index.insert(column.clone(), i);
        self.fields[i].column = column;
        Ok(())
    }
}

/// Derives the default SQL name from a Rust identifier: an underscore is
/// inserted before every uppercase letter except a leading one, and the
/// result is lowercased. `"TestModel"` becomes `"test_model"`, `"ID"`
/// becomes `"i_d"`.
pub(crate) fn underscore_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            for low in ch.to_lowercase() {
                out.push(low);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Splits a raw tag string into key/value pairs. Pairs are comma separated
/// and each pair must contain exactly one `=`.
fn parse_tag(tag: &str) -> Result<HashMap<&str, &str>> {
    let mut out = HashMap::new();
    if tag.is_empty() {
        return Ok(out);
    }
    for pair in tag.split(',') {
        let kv: Vec<&str> = pair.split('=').collect();
        if kv.len() != 2 {
            return Err(Error::invalid_tag(pair));
        }
        out.insert(kv[0].trim(), kv[1].trim());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underscore_name_cases() {
        let cases = [
            ("TestModel", "test_model"),
            ("ID", "i_d"),
            ("Table1Name", "table1_name"),
            ("table1name", "table1name"),
            ("already_snake", "already_snake"),
        ];
        for (input, want) in cases {
            assert_eq!(underscore_name(input), want, "input {input:?}");
        }
    }

    #[test]
    fn parse_tag_pairs() {
        let tags = parse_tag("table=custom_t, column=c").unwrap();
        assert_eq!(tags.get("table"), Some(&"custom_t"));
        assert_eq!(tags.get("column"), Some(&"c"));
    }

    #[test]
    fn parse_tag_rejects_malformed_pairs() {
        for bad in ["table", "a=b=c", "table=x,oops"] {
            let err = parse_tag(bad).unwrap_err();
            assert!(
                matches!(err, Error::InvalidTagContent(_)),
                "input {bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn empty_tag_is_empty_map() {
        assert!(parse_tag("").unwrap().is_empty());
    }
}
