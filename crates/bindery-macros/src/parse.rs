//! Parsing for message derive input.

use syn::ext::IdentExt;
use syn::{Attribute, Data, DeriveInput, Fields, Generics, Ident, LitStr, Type};

/// A named struct field with its optional `#[http("...")]` descriptor.
pub struct MessageField {
    /// Field identifier
    pub ident: Ident,
    /// Declared field type
    pub ty: Type,
    /// Raw descriptor literal
    pub tag: Option<LitStr>,
}

impl MessageField {
    /// Returns the field name as reported in errors (raw prefix removed).
    pub fn name(&self) -> String {
        self.ident.unraw().to_string()
    }

    /// Returns true if the descriptor claims the JSON body.
    ///
    /// Only the first token is looked at; the full grammar is checked when
    /// the codec is compiled.
    pub fn is_body(&self) -> bool {
        self.tag.as_ref().is_some_and(|tag| {
            tag.value()
                .split(',')
                .next()
                .is_some_and(|token| token.trim() == "body")
        })
    }
}

/// A struct deriving one of the message traits.
pub struct MessageStruct {
    /// Struct identifier
    pub ident: Ident,
    /// Struct generics
    pub generics: Generics,
    /// Named fields in declaration order
    pub fields: Vec<MessageField>,
}

impl MessageStruct {
    /// Parses derive input, requiring a struct with named fields.
    ///
    /// `role` names what the struct is used for in the error message.
    pub fn parse(input: DeriveInput, role: &str) -> syn::Result<Self> {
        let not_a_struct = || {
            syn::Error::new(
                input.ident.span(),
                format!("expected struct with named fields for {role}"),
            )
        };

        let Data::Struct(data) = &input.data else {
            return Err(not_a_struct());
        };
        let Fields::Named(named) = &data.fields else {
            return Err(not_a_struct());
        };

        let fields = named
            .named
            .iter()
            .map(|field| {
                Ok(MessageField {
                    ident: field.ident.clone().ok_or_else(not_a_struct)?,
                    ty: field.ty.clone(),
                    tag: http_attr(&field.attrs)?,
                })
            })
            .collect::<syn::Result<Vec<_>>>()?;

        Ok(Self {
            ident: input.ident.clone(),
            generics: input.generics.clone(),
            fields,
        })
    }
}

/// Reads the single `#[http("...")]` attribute of a field.
fn http_attr(attrs: &[Attribute]) -> syn::Result<Option<LitStr>> {
    let mut found = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("http")) {
        if found.is_some() {
            return Err(syn::Error::new_spanned(attr, "duplicate `http` attribute"));
        }
        found = Some(attr.parse_args::<LitStr>()?);
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_parse_named_struct() {
        let input: DeriveInput = parse_quote! {
            struct GetUser {
                #[http("path,id")]
                user_id: u64,
                #[http(" body ")]
                payload: Payload,
                r#type: String,
            }
        };
        let message = MessageStruct::parse(input, "request decoder target type").unwrap();

        assert_eq!(message.ident, "GetUser");
        assert_eq!(message.fields.len(), 3);
        assert_eq!(message.fields[0].name(), "user_id");
        assert_eq!(
            message.fields[0].tag.as_ref().map(LitStr::value).as_deref(),
            Some("path,id")
        );
        assert!(!message.fields[0].is_body());
        assert!(message.fields[1].is_body());
        assert_eq!(message.fields[2].name(), "type");
        assert!(message.fields[2].tag.is_none());
    }

    #[test]
    fn test_body_with_name_still_routes_to_json_slot() {
        let input: DeriveInput = parse_quote! {
            struct Req {
                #[http("body,payload")]
                payload: Payload,
            }
        };
        let message = MessageStruct::parse(input, "request decoder target type").unwrap();
        assert!(message.fields[0].is_body());
    }

    #[test]
    fn test_rejects_tuple_struct_and_enum() {
        let input: DeriveInput = parse_quote! { struct Req(u64); };
        let err = MessageStruct::parse(input, "request decoder target type")
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "expected struct with named fields for request decoder target type"
        );

        let input: DeriveInput = parse_quote! { enum Res { A } };
        let err = MessageStruct::parse(input, "response encoder source type")
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "expected struct with named fields for response encoder source type"
        );
    }

    #[test]
    fn test_rejects_duplicate_attribute() {
        let input: DeriveInput = parse_quote! {
            struct Req {
                #[http("query")]
                #[http("header")]
                limit: u32,
            }
        };
        let err = MessageStruct::parse(input, "request decoder target type")
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "duplicate `http` attribute");
    }

    #[test]
    fn test_rejects_non_string_attribute() {
        let input: DeriveInput = parse_quote! {
            struct Req {
                #[http(query)]
                limit: u32,
            }
        };
        assert!(MessageStruct::parse(input, "request decoder target type").is_err());
    }
}
