//! Decoded data paired with its type

use shift_dynamic::{DynamicOps, EncodeError};

use crate::data::Data;
use crate::error::{ConversionResult, FieldNotFound};
use crate::optic::TypedOptic;
use crate::types::Type;

/// A [`Type`] together with data of that type
#[derive(Debug, Clone, PartialEq)]
pub struct Typed {
    ty: Type,
    data: Data,
}

impl Typed {
    /// Pair a type with its data
    #[inline]
    #[must_use]
    pub fn new(ty: Type, data: Data) -> Self {
        Self { ty, data }
    }

    /// The type
    #[inline]
    #[must_use]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// The data
    #[inline]
    #[must_use]
    pub fn data(&self) -> &Data {
        &self.data
    }

    /// Take the data
    #[inline]
    #[must_use]
    pub fn into_data(self) -> Data {
        self.data
    }

    /// Every focus of `optic`
    pub fn get(&self, optic: &TypedOptic) -> ConversionResult<Vec<Data>> {
        optic.collect(&self.data)
    }

    /// Value of field `name`, `None` if it lives in an absent branch
    pub fn get_field(&self, name: &str) -> ConversionResult<Option<Data>> {
        let optic = self.field_optic(name)?;
        Ok(optic.collect(&self.data)?.into_iter().next())
    }

    /// Replace the value of field `name`; the field type is unchanged
    pub fn set_field(self, name: &str, value: Data) -> ConversionResult<Typed> {
        self.update_field(name, |_| Ok(value.clone()))
    }

    /// Transform the value of field `name`; the field type is unchanged
    pub fn update_field(
        self,
        name: &str,
        f: impl FnMut(Data) -> ConversionResult<Data>,
    ) -> ConversionResult<Typed> {
        let optic = self.field_optic(name)?;
        let data = optic.modify(self.data, f)?;
        Ok(Typed { ty: self.ty, data })
    }

    /// Rename field `from` to `to`
    ///
    /// Only the type changes: field names leave no trace in the data.
    pub fn rename_field(self, from: &str, to: &str) -> ConversionResult<Typed> {
        let ty = self
            .ty
            .rename_field(from, to)
            .ok_or_else(|| FieldNotFound::NotFound(format!("field '{from}'")))?;
        Ok(Typed { ty, data: self.data })
    }

    /// Encode through `ops`
    pub fn write<T, O>(&self, ops: &O) -> Result<T, EncodeError>
    where
        O: DynamicOps<T> + ?Sized,
    {
        self.ty.write(ops, ops.empty(), &self.data)
    }

    fn field_optic(&self, name: &str) -> Result<TypedOptic, FieldNotFound> {
        self.ty
            .find_field(name)
            .into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Primitive;
    use crate::error::ConversionError;
    use crate::types::ReadOptions;
    use pretty_assertions::assert_eq;
    use shift_dynamic::{Value, ValueOps};

    fn player() -> Type {
        Type::named(
            "Player",
            Type::product(
                Type::field("name", Type::primitive(Primitive::String)),
                Type::product(Type::field("score", Type::primitive(Primitive::Int)), Type::remainder()),
            ),
        )
    }

    fn read(value: Value) -> Typed {
        player()
            .read_typed(&ValueOps, value, &ReadOptions::default())
            .ok()
            .unwrap()
            .1
    }

    #[test]
    fn get_and_set_fields() {
        let typed = read(Value::map([("name", Value::from("ann")), ("score", Value::from(3))]));
        assert_eq!(typed.get_field("score").unwrap(), Some(Data::Int(3)));
        let typed = typed.set_field("score", Data::Int(9)).unwrap();
        let out: Value = typed.write(&ValueOps).unwrap();
        assert_eq!(out.get("score"), Some(&Value::from(9)));
    }

    #[test]
    fn unknown_field_is_an_error() {
        let typed = read(Value::map([("name", Value::from("ann")), ("score", Value::from(3))]));
        assert!(matches!(
            typed.get_field("level"),
            Err(ConversionError::Field(FieldNotFound::NotFound(_)))
        ));
    }

    #[test]
    fn rename_changes_written_key_and_keeps_extras() {
        let typed = read(Value::map([
            ("name", Value::from("ann")),
            ("score", Value::from(3)),
            ("extra", Value::from(true)),
        ]));
        let out: Value = typed.rename_field("name", "nick").unwrap().write(&ValueOps).unwrap();
        assert_eq!(
            out,
            Value::map([
                ("nick", Value::from("ann")),
                ("score", Value::from(3)),
                ("extra", Value::from(true)),
            ])
        );
    }
}
