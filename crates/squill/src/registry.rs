//! Model registry.
//!
//! Resolving metadata walks the derive output and parses tags, so the result
//! is cached per entity type. The registry is cheap to clone and safe to
//! share across threads.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::Result;
use crate::model::{Entity, Model};

/// A registration option, applied to the freshly parsed model.
pub type ModelOpt = Box<dyn FnOnce(&mut Model) -> Result<()> + Send>;

/// Overrides the table name.
pub fn with_table_name(name: impl Into<String>) -> ModelOpt {
    let name = name.into();
    Box::new(move |m| {
        m.set_table_name(name);
        Ok(())
    })
}

/// Overrides the column name of one field, addressed by its struct name.
pub fn with_column_name(field: impl Into<String>, column: impl Into<String>) -> ModelOpt {
    let field = field.into();
    let column = column.into();
    Box::new(move |m| m.set_column_name(&field, column))
}

/// Shared cache of resolved models, keyed by entity type.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    models: Arc<RwLock<HashMap<TypeId, Arc<Model>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Returns the cached model for `T`, resolving and caching it on first
    /// use.
    pub fn get<T: Entity>(&self) -> Result<Arc<Model>> {
        {
            let models = self.models.read().expect("registry lock poisoned");
            if let Some(model) = models.get(&TypeId::of::<T>()) {
                return Ok(Arc::clone(model));
            }
        }
        self.register::<T>(Vec::new())
    }

    /// Resolves `T`, applies `opts` and caches the result, replacing any
    /// earlier registration.
    pub fn register<T: Entity>(&self, opts: Vec<ModelOpt>) -> Result<Arc<Model>> {
        let mut model = Model::of::<T>()?;
        for opt in opts {
            opt(&mut model)?;
        }
        let model = Arc::new(model);
        self.models
            .write()
            .expect("registry lock poisoned")
            .insert(TypeId::of::<T>(), Arc::clone(&model));
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use squill_derive::Entity;

    use super::*;
    use crate::error::Error;
    use crate::testutil::TestModel;

    #[test]
    fn derives_snake_case_table_name() {
        let registry = Registry::new();
        let model = registry.get::<TestModel>().unwrap();
        assert_eq!(model.table_name(), "test_model");
        assert_eq!(model.fields().len(), 4);
        assert_eq!(model.field("first_name").unwrap().column, "first_name");
    }

    #[test]
    fn get_returns_the_cached_model() {
        let registry = Registry::new();
        let first = registry.get::<TestModel>().unwrap();
        let second = registry.get::<TestModel>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn register_applies_options() {
        let registry = Registry::new();
        let model = registry
            .register::<TestModel>(vec![
                with_table_name("test_model_t"),
                with_column_name("first_name", "name"),
            ])
            .unwrap();
        assert_eq!(model.table_name(), "test_model_t");
        assert_eq!(model.field("first_name").unwrap().column, "name");
        assert!(model.column("name").is_some());
        assert!(model.column("first_name").is_none());
        // Later lookups see the replaced registration.
        let cached = registry.get::<TestModel>().unwrap();
        assert!(Arc::ptr_eq(&model, &cached));
    }

    #[test]
    fn column_option_rejects_unknown_field() {
        let registry = Registry::new();
        let err = registry
            .register::<TestModel>(vec![with_column_name("nope", "x")])
            .unwrap_err();
        assert!(matches!(err, Error::UnknownField(name) if name == "nope"));
    }

    #[test]
    fn tags_override_names() {
        #[derive(Entity, Debug, Default, Clone)]
        #[orm("table=people")]
        struct Person {
            id: i64,
            #[orm("column=given_name")]
            first_name: String,
        }

        let registry = Registry::new();
        let model = registry.get::<Person>().unwrap();
        assert_eq!(model.table_name(), "people");
        assert_eq!(model.field("id").unwrap().column, "id");
        assert_eq!(model.field("first_name").unwrap().column, "given_name");
    }

    #[test]
    fn malformed_tag_fails_resolution() {
        #[derive(Entity, Debug, Default, Clone)]
        struct Broken {
            #[orm("first_name")]
            first_name: String,
        }

        let registry = Registry::new();
        let err = registry.get::<Broken>().unwrap_err();
        assert!(matches!(err, Error::InvalidTagContent(pair) if pair == "first_name"));
    }

    #[test]
    fn concurrent_gets_agree() {
        let registry = Registry::new();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.get::<TestModel>().unwrap().table_name().to_string())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "test_model");
        }
    }
}
