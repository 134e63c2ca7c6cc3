use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Error, Fields, LitStr, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "#[derive(Entity)] does not support generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            other => {
                return Err(Error::new_spanned(
                    &input.ident,
                    format!(
                        "#[derive(Entity)] requires named fields, found {}",
                        match other {
                            Fields::Unit => "a unit struct",
                            _ => "tuple fields",
                        }
                    ),
                ));
            }
        },
        _ => {
            return Err(Error::new_spanned(
                &input.ident,
                "#[derive(Entity)] only supports structs",
            ));
        }
    };

    let ident = &input.ident;
    let type_name = ident.to_string();
    let struct_tag = orm_tag(&input.attrs)?.unwrap_or_default();

    let mut specs = Vec::with_capacity(fields.len());
    for field in fields {
        let field_ident = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new_spanned(field, "expected a named field"))?;
        let field_ty = &field.ty;
        let field_name = field_ident.to_string();
        let tag = orm_tag(&field.attrs)?.unwrap_or_default();

        specs.push(quote! {
            ::squill::FieldSpec {
                name: #field_name,
                tag: #tag,
                offset: ::core::mem::offset_of!(#ident, #field_ident),
                get: {
                    fn get(
                        instance: &dyn ::core::any::Any,
                    ) -> ::core::option::Option<::squill::Value> {
                        instance
                            .downcast_ref::<#ident>()
                            .map(|v| ::squill::Value::from(v.#field_ident.clone()))
                    }
                    get
                },
                set: {
                    fn set(
                        instance: &mut dyn ::core::any::Any,
                        value: ::squill::Value,
                    ) -> ::squill::Result<()> {
                        match instance.downcast_mut::<#ident>() {
                            ::core::option::Option::Some(v) => {
                                v.#field_ident =
                                    <#field_ty as ::squill::FromValue>::from_value(value)?;
                                ::core::result::Result::Ok(())
                            }
                            ::core::option::Option::None => ::core::result::Result::Err(
                                ::squill::Error::decode(#field_name, "mismatched entity type"),
                            ),
                        }
                    }
                    set
                },
                read: {
                    unsafe fn read(base: *const u8) -> ::squill::Value {
                        let ptr = unsafe {
                            base.add(::core::mem::offset_of!(#ident, #field_ident))
                        } as *const #field_ty;
                        ::squill::Value::from(unsafe { (*ptr).clone() })
                    }
                    read
                },
                write: {
                    unsafe fn write(base: *mut u8, value: ::squill::Value) -> ::squill::Result<()> {
                        let decoded = <#field_ty as ::squill::FromValue>::from_value(value)?;
                        let ptr = unsafe {
                            base.add(::core::mem::offset_of!(#ident, #field_ident))
                        } as *mut #field_ty;
                        unsafe {
                            *ptr = decoded;
                        }
                        ::core::result::Result::Ok(())
                    }
                    write
                },
            }
        });
    }

    Ok(quote! {
        #[automatically_derived]
        impl ::squill::Entity for #ident {
            const TYPE_NAME: &'static str = #type_name;
            const TAG: &'static str = #struct_tag;

            fn fields() -> &'static [::squill::FieldSpec] {
                static FIELDS: &[::squill::FieldSpec] = &[#(#specs),*];
                FIELDS
            }
        }
    })
}

/// Extracts the string literal from an `#[orm("...")]` attribute. Multiple
/// attributes are joined with commas.
fn orm_tag(attrs: &[Attribute]) -> Result<Option<String>> {
    let mut parts = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let lit: LitStr = attr.parse_args()?;
        parts.push(lit.value());
    }
    if parts.is_empty() {
        Ok(None)
    } else {
        Ok(Some(parts.join(",")))
    }
}
