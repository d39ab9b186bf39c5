//! Expansion of the message derives.

use proc_macro2::TokenStream;
use quote::quote;
use syn::DeriveInput;

use crate::parse::{MessageField, MessageStruct};

/// Expands `#[derive(HttpRequest)]`.
pub fn expand_http_request(input: TokenStream) -> syn::Result<TokenStream> {
    let input: DeriveInput = syn::parse2(input)?;
    let message = MessageStruct::parse(input, "request decoder target type")?;

    let ident = &message.ident;
    let (impl_generics, ty_generics, where_clause) = message.generics.split_for_impl();
    let fields = message.fields.iter().map(request_field);

    Ok(quote! {
        impl #impl_generics ::bindery_codec::HttpRequest for #ident #ty_generics #where_clause {
            fn fields() -> ::std::vec::Vec<::bindery_codec::FieldDef<Self>> {
                ::std::vec![#(#fields),*]
            }
        }
    })
}

/// Expands `#[derive(HttpResponse)]`.
pub fn expand_http_response(input: TokenStream) -> syn::Result<TokenStream> {
    let input: DeriveInput = syn::parse2(input)?;
    let message = MessageStruct::parse(input, "response encoder source type")?;

    let ident = &message.ident;
    let (impl_generics, ty_generics, where_clause) = message.generics.split_for_impl();
    let fields = message.fields.iter().map(|field| {
        let name = field.name();
        let tag = optional_tag(field);
        quote! { ::bindery_codec::FieldTag::new(#name, #tag) }
    });

    Ok(quote! {
        impl #impl_generics ::bindery_codec::HttpResponse for #ident #ty_generics #where_clause {
            fn fields() -> ::std::vec::Vec<::bindery_codec::FieldTag> {
                ::std::vec![#(#fields),*]
            }
        }
    })
}

fn optional_tag(field: &MessageField) -> TokenStream {
    match &field.tag {
        Some(tag) => quote! { ::std::option::Option::Some(#tag) },
        None => quote! { ::std::option::Option::None },
    }
}

/// Generates the `FieldDef` entry of one request field.
fn request_field(field: &MessageField) -> TokenStream {
    let name = field.name();
    if field.tag.is_none() {
        return quote! { ::bindery_codec::FieldDef::unbound(#name) };
    }

    let member = &field.ident;
    let ty = &field.ty;
    let tag = optional_tag(field);
    let field_tag = quote! { ::bindery_codec::FieldTag::new(#name, #tag) };

    if field.is_body() {
        quote! {
            ::bindery_codec::FieldDef::json(
                #field_tag,
                ::std::any::type_name::<#ty>(),
                |target: &mut Self, bytes: &[u8]| {
                    target.#member = ::bindery_codec::json::read_json::<#ty>(bytes)?;
                    ::std::result::Result::Ok(())
                },
            )
        }
    } else {
        quote! {
            ::bindery_codec::FieldDef::value(
                #field_tag,
                <#ty as ::bindery_codec::FieldType>::shape(),
                |target: &mut Self, values: ::std::option::Option<&[&str]>| {
                    target.#member = <#ty as ::bindery_codec::FieldType>::inject(values)?;
                    ::std::result::Result::Ok(())
                },
            )
        }
    }
}
