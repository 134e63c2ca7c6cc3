//! Field access over live entity values.
//!
//! A [`Valuer`] wraps one entity instance together with its model and moves
//! values across the struct boundary in both directions: extracting fields
//! as statement arguments and scanning result rows back into fields.
//!
//! Two interchangeable strategies exist. [`SafeValuer`] goes through the
//! generated `dyn Any` accessors. [`FastValuer`] reads and writes through
//! the instance's base pointer plus the per-field offsets recorded at derive
//! time. Both must produce identical results; the fast path exists purely to
//! skip the downcast on hot scan loops.

use std::any::Any;

use crate::error::{Error, Result};
use crate::model::Model;
use crate::row::Row;
use crate::value::Value;

pub trait Valuer {
    /// Extracts the named field's current value.
    fn field(&self, name: &str) -> Result<Value>;

    /// Writes one result row into the wrapped instance, matching columns to
    /// fields by name.
    fn scan_row(&mut self, row: &Row) -> Result<()>;
}

/// Constructs a valuer over an instance and its model.
///
/// The instance must be a value of the model's entity type; both strategies
/// check this on creation and panic otherwise, since it can only arise from
/// a caller-side type mix-up.
pub type Creator = for<'a> fn(&'a mut dyn Any, &'a Model) -> Box<dyn Valuer + 'a>;

/// Which valuer implementation a database hands to its statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Downcast-based access.
    #[default]
    Safe,
    /// Pointer-offset access.
    Fast,
}

impl Strategy {
    pub(crate) fn creator(self) -> Creator {
        match self {
            Strategy::Safe => SafeValuer::create,
            Strategy::Fast => FastValuer::create,
        }
    }
}

fn check_columns(model: &Model, row: &Row) -> Result<()> {
    if row.columns().len() > model.fields().len() {
        return Err(Error::TooManyReturnedColumns);
    }
    Ok(())
}

/// Valuer backed by the generated downcasting accessors.
pub struct SafeValuer<'a> {
    target: &'a mut dyn Any,
    model: &'a Model,
}

impl SafeValuer<'_> {
    pub fn create<'a>(target: &'a mut dyn Any, model: &'a Model) -> Box<dyn Valuer + 'a> {
        assert!(
            model.is_instance(&*target),
            "valuer target is not a {} instance",
            model.type_name()
        );
        Box::new(SafeValuer { target, model })
    }
}

impl Valuer for SafeValuer<'_> {
    fn field(&self, name: &str) -> Result<Value> {
        let field = self
            .model
            .field(name)
            .ok_or_else(|| Error::unknown_field(name))?;
        Ok((field.spec.get)(&*self.target).expect("instance type checked on creation"))
    }

    fn scan_row(&mut self, row: &Row) -> Result<()> {
        check_columns(self.model, row)?;
        for (i, column) in row.columns().iter().enumerate() {
            let field = self
                .model
                .column(column)
                .ok_or_else(|| Error::unknown_column(column))?;
            let value = row.values()[i].clone();
            (field.spec.set)(self.target, value).map_err(|e| e.at_column(column))?;
        }
        Ok(())
    }
}

/// Valuer that addresses fields through the instance's base address and the
/// offsets recorded in its field specs.
pub struct FastValuer<'a> {
    base: *mut u8,
    model: &'a Model,
}

impl FastValuer<'_> {
    pub fn create<'a>(target: &'a mut dyn Any, model: &'a Model) -> Box<dyn Valuer + 'a> {
        assert!(
            model.is_instance(&*target),
            "valuer target is not a {} instance",
            model.type_name()
        );
        let base = target as *mut dyn Any as *mut u8;
        Box::new(FastValuer { base, model })
    }
}

impl Valuer for FastValuer<'_> {
    fn field(&self, name: &str) -> Result<Value> {
        let field = self
            .model
            .field(name)
            .ok_or_else(|| Error::unknown_field(name))?;
        // Type checked on creation; the offset was generated for this type.
        Ok(unsafe { (field.spec.read)(self.base) })
    }

    fn scan_row(&mut self, row: &Row) -> Result<()> {
        check_columns(self.model, row)?;
        for (i, column) in row.columns().iter().enumerate() {
            let field = self
                .model
                .column(column)
                .ok_or_else(|| Error::unknown_column(column))?;
            let value = row.values()[i].clone();
            unsafe { (field.spec.write)(self.base, value) }.map_err(|e| e.at_column(column))?;
        }
        Ok(())
    }
}
