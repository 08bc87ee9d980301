extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::parse_quote;

#[proc_macro_derive(Decode, attributes(map))]
pub fn decode_derive(input: TokenStream) -> TokenStream {
    let ast = syn::parse(input).unwrap();

    impl_decode(&ast).unwrap_or_else(syn::Error::into_compile_error).into()
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

fn impl_decode(ast: &syn::DeriveInput) -> syn::Result<TokenStream2> {
    let decode_trait = quote! { ::cartograph::conv::Decode };
    let construct_trait = quote! { ::cartograph::aggregate::Construct };
    let descriptor_type = quote! { ::cartograph::aggregate::FieldDescriptor };
    let source_type = quote! { ::cartograph::aggregate::FieldSource };
    let decode_result_type = quote! { ::cartograph::conv::DecodeResult };
    let map_type = quote! { ::cartograph::Map };

    let name = &ast.ident;
    let fields = match &ast.data {
        syn::Data::Struct(syn::DataStruct { fields, .. }) => fields,
        syn::Data::Enum(_) => {
            return Err(syn::Error::new_spanned(name, "Derive macro `Decode` not implemented for enums"))
        }
        syn::Data::Union(_) => {
            return Err(syn::Error::new_spanned(name, "Derive macro `Decode` not implemented for unions"))
        }
    };

    let mut generics = ast.generics.clone();
    if !generics.params.is_empty() {
        let where_clause = generics.make_where_clause();
        for field in fields.iter() {
            let ty = &field.ty;
            where_clause.predicates.push(parse_quote! { #ty: #decode_trait + 'static });
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let named = match fields {
        syn::Fields::Named(syn::FieldsNamed { named, .. }) => named_keys(named)?,
        _ => Vec::new(),
    };
    let keys: Vec<String> = match fields {
        syn::Fields::Named(_) => named.iter().map(|(_, key)| key.clone()).collect(),
        _ => (0..fields.len()).map(|i| i.to_string()).collect(),
    };
    let ty: Vec<&syn::Type> = fields.iter().map(|field| &field.ty).collect();

    let supplied = keys.iter().zip(ty.iter()).map(|(key, ty)| {
        quote! { source.supply::<#ty>(&#descriptor_type::new::<#ty>(#key))? }
    });

    let body = match fields {
        syn::Fields::Unit => quote! {
            let _ = source;
            Ok(Self)
        },
        syn::Fields::Unnamed(_) => quote! {
            Ok(Self( #( #supplied ),* ))
        },
        syn::Fields::Named(_) => {
            let fname = named.iter().map(|(ident, _)| ident);
            quote! {
                Ok(Self { #( #fname: #supplied ),* })
            }
        }
    };

    Ok(quote! {
        impl #impl_generics #construct_trait for #name #ty_generics #where_clause {
            fn descriptors() -> ::std::vec::Vec<#descriptor_type> {
                ::std::vec![ #( #descriptor_type::new::<#ty>(#keys) ),* ]
            }

            fn construct(source: &#source_type<'_>) -> #decode_result_type<Self> {
                #body
            }
        }

        impl #impl_generics #decode_trait for #name #ty_generics #where_clause {
            fn decode(map: &#map_type) -> #decode_result_type<Self> {
                ::cartograph::aggregate::decode_aggregate(map)
            }
        }
    })
}
