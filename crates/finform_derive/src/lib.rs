use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use proc_macro_crate::{FoundCrate, crate_name};
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, LitStr, parse_macro_input};

/// Derives `finform::form::FormModel` for a struct with named fields.
///
/// Each field maps to one entry of the form's value map, keyed by the field
/// name or by `#[form(rename = "monto.cantidad")]`.
#[proc_macro_derive(FormModel, attributes(form))]
pub fn derive_form_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.ident,
            "FormModel derive currently supports only non-generic structs",
        ));
    }

    let model_ident = input.ident;
    let named_fields = match input.data {
        Data::Struct(data) => match data.fields {
            Fields::Named(fields) => fields.named,
            _ => {
                return Err(syn::Error::new(
                    Span::call_site(),
                    "FormModel derive requires a struct with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                Span::call_site(),
                "FormModel derive is only supported on structs",
            ));
        }
    };

    let finform = finform_path();
    let mut inserts = Vec::new();
    let mut reads = Vec::new();

    for field in &named_fields {
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };
        let field_ty = &field.ty;
        let key = field_key(field)?.unwrap_or_else(|| field_ident.to_string());

        inserts.push(quote! {
            values.insert(
                #finform::form::FieldKey::new(#key),
                #finform::form::FieldValue::from(::core::clone::Clone::clone(&self.#field_ident)),
            );
        });

        reads.push(quote! {
            #field_ident: {
                let raw = values
                    .get(#key)
                    .ok_or_else(|| #finform::form::FormError::MissingField(
                        #finform::form::FieldKey::new(#key),
                    ))?;
                <#field_ty as #finform::form::FromFieldValue>::from_field_value(raw)
                    .ok_or_else(|| #finform::form::FormError::FieldType(
                        #finform::form::FieldKey::new(#key),
                    ))?
            },
        });
    }

    Ok(quote! {
        impl #finform::form::FormModel for #model_ident {
            fn to_values(&self) -> #finform::form::FieldValues {
                let mut values = #finform::form::FieldValues::new();
                #(#inserts)*
                values
            }

            fn from_values(
                values: &#finform::form::FieldValues,
            ) -> #finform::form::FormResult<Self> {
                ::core::result::Result::Ok(Self {
                    #(#reads)*
                })
            }
        }
    })
}

fn field_key(field: &Field) -> syn::Result<Option<String>> {
    let mut rename = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("form") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(meta.error("form field key must not be empty"));
                }
                rename = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported form attribute, expected `rename`"))
            }
        })?;
    }
    Ok(rename)
}

fn finform_path() -> TokenStream2 {
    match crate_name("finform") {
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Ok(FoundCrate::Itself) => quote!(crate),
        Err(_) => quote!(::finform),
    }
}
