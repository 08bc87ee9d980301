extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::parse_quote;

#[proc_macro_derive(TryEncode, attributes(map))]
pub fn encode_derive(input: TokenStream) -> TokenStream {
    let ast = syn::parse(input).unwrap();

    impl_encode(&ast).unwrap_or_else(syn::Error::into_compile_error).into()
}

/// Reads the key of a named field, honoring `#[map(rename = "...")]`.
fn field_key(field: &syn::Field) -> syn::Result<String> {
    let mut key = field.ident.as_ref().map(|ident| ident.to_string()).unwrap_or_default();
    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("map")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: syn::LitStr = meta.value()?.parse()?;
                key = lit.value();
                Ok(())
            } else {
                Err(meta.error("unsupported `map` attribute"))
            }
        })?;
    }
    Ok(key)
}

/// Pairs each named field with its key, rejecting two fields that share a key.
fn named_keys(
    named: &syn::punctuated::Punctuated<syn::Field, syn::token::Comma>,
) -> syn::Result<Vec<(&syn::Ident, String)>> {
    let mut keys: Vec<(&syn::Ident, String)> = Vec::with_capacity(named.len());
    for field in named.iter() {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
        let key = field_key(field)?;
        if let Some((other, _)) = keys.iter().find(|(_, seen)| *seen == key) {
            return Err(syn::Error::new_spanned(
                ident,
                format!("field `{}` has the same key \"{}\" as field `{}`", ident, key, other),
            ));
        }
        keys.push((ident, key));
    }
    Ok(keys)
}

fn impl_encode(ast: &syn::DeriveInput) -> syn::Result<TokenStream2> {
    let try_encode_trait = quote! { ::cartograph::conv::TryEncode };
    let fields_trait = quote! { ::cartograph::aggregate::Fields };
    let field_type = quote! { ::cartograph::aggregate::Field };
    let encode_result_type = quote! { ::cartograph::conv::EncodeResult };
    let map_type = quote! { ::cartograph::Map };

    let name = &ast.ident;
    let fields = match &ast.data {
        syn::Data::Struct(syn::DataStruct { fields, .. }) => fields,
        syn::Data::Enum(_) => {
            return Err(syn::Error::new_spanned(name, "Derive macro `TryEncode` not implemented for enums"))
        }
        syn::Data::Union(_) => {
            return Err(syn::Error::new_spanned(name, "Derive macro `TryEncode` not implemented for unions"))
        }
    };

    let mut generics = ast.generics.clone();
    if !generics.params.is_empty() {
        let where_clause = generics.make_where_clause();
        for field in fields.iter() {
            let ty = &field.ty;
            where_clause.predicates.push(parse_quote! { #ty: #try_encode_trait + 'static });
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let entries: Vec<TokenStream2> = match fields {
        syn::Fields::Unit => Vec::new(),
        syn::Fields::Unnamed(syn::FieldsUnnamed { unnamed, .. }) => unnamed
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let index = syn::Index::from(i);
                let key = i.to_string();
                quote! { #field_type::new(#key, &self.#index) }
            })
            .collect(),
        syn::Fields::Named(syn::FieldsNamed { named, .. }) => named_keys(named)?
            .into_iter()
            .map(|(ident, key)| quote! { #field_type::new(#key, &self.#ident) })
            .collect(),
    };

    Ok(quote! {
        impl #impl_generics #fields_trait for #name #ty_generics #where_clause {
            fn fields(&self) -> ::std::vec::Vec<#field_type<'_>> {
                ::std::vec![ #( #entries ),* ]
            }
        }

        impl #impl_generics #try_encode_trait for #name #ty_generics #where_clause {
            fn try_encode(&self) -> #encode_result_type<#map_type> {
                ::cartograph::aggregate::encode_aggregate(self)
            }
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn renamed_keys_collide() {
        let ast: syn::DeriveInput = parse_quote! {
            struct Clash {
                #[map(rename = "id")]
                first: i64,
                id: i64,
            }
        };
        let err = impl_encode(&ast).unwrap_err();
        assert_eq!(err.to_string(), "field `id` has the same key \"id\" as field `first`");
    }

    #[test]
    fn distinct_keys_accepted() {
        let ast: syn::DeriveInput = parse_quote! {
            struct Fine {
                #[map(rename = "a")]
                b: i64,
                #[map(rename = "b")]
                a: i64,
            }
        };
        assert!(impl_encode(&ast).is_ok());
    }

    #[test]
    fn enums_rejected() {
        let ast: syn::DeriveInput = parse_quote! {
            enum Choice { A, B }
        };
        assert!(impl_encode(&ast).is_err());
    }
}
