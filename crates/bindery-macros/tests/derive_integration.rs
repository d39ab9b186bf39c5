//! Integration tests for the message derives.
//!
//! These tests verify that derived implementations compile against
//! `bindery-codec` and decode/encode real requests.

use bindery_codec::{
    CompileError, HttpRequest, JsonFormat, RequestCodec, RequestParts, ResponseCodec, Shape,
    Source,
};
use bindery_macros::{HttpRequest, HttpResponse};
use http::{StatusCode, Uri};
use proptest::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, PartialEq, Deserialize)]
struct Address {
    city: String,
    #[serde(default)]
    zip: Option<String>,
}

#[allow(non_snake_case)]
#[derive(Debug, Default, HttpRequest)]
struct UpdateUser {
    #[http("path,id")]
    user_id: u64,
    #[http("query")]
    Notify: bool,
    #[http("query,tag")]
    tags: Vec<String>,
    #[http("query")]
    note: Option<String>,
    #[http("header,x-request-priority")]
    priority: Option<u8>,
    #[http("header,x-route")]
    routes: Vec<i32>,
    #[http("cookie")]
    session: Option<String>,
    #[http("body")]
    address: Address,
}

#[derive(Debug, Default, HttpRequest)]
struct Untagged {
    #[http("query")]
    limit: u32,
    offset: u32,
}

#[derive(Debug, Default, HttpRequest)]
struct RepeatedPath {
    #[http("path")]
    ids: Vec<u64>,
}

#[derive(Debug, Default, HttpRequest)]
struct BadTag {
    #[http("query,a,b")]
    limit: u32,
}

#[derive(Debug, Default, HttpRequest)]
struct Tags {
    #[http("query,t")]
    values: Vec<String>,
    #[http("header,x-t")]
    headers: Vec<String>,
}

#[derive(Debug, Serialize, HttpResponse)]
struct UpdateUserResponse {
    #[http("body")]
    #[serde(rename = "P")]
    p: String,
}

#[derive(Debug, Serialize, HttpResponse)]
struct UntaggedResponse {
    p: String,
}

fn update_parts() -> RequestParts {
    RequestParts::builder()
        .uri(Uri::from_static(
            "/users/9?notify=true&tag=x&tag=y&note=&tag=x",
        ))
        .path_param("id", "9")
        .header("x-request-priority", "0x0a")
        .header("x-route", "3")
        .header("x-route", "-1")
        .header("cookie", "session=s-1")
        .header("content-type", "application/json")
        .body(r#"{"city":"Haifa"}"#)
        .build()
}

#[test]
fn test_derived_request_decodes_all_sources() {
    let codec = RequestCodec::<UpdateUser>::compile().unwrap();
    let request = codec.decode(&update_parts()).unwrap();

    assert_eq!(request.user_id, 9);
    assert!(request.Notify);
    assert_eq!(request.tags, vec!["x", "y", "x"]);
    assert_eq!(request.note, Some(String::new()));
    assert_eq!(request.priority, Some(10));
    assert_eq!(request.routes, vec![3, -1]);
    assert_eq!(request.session.as_deref(), Some("s-1"));
    assert_eq!(
        request.address,
        Address {
            city: "Haifa".into(),
            zip: None
        }
    );
}

#[test]
fn test_derived_field_metadata() {
    let fields = UpdateUser::fields();
    assert_eq!(fields.len(), 8);
    assert_eq!(fields[0].tag.ident, "user_id");
    assert_eq!(fields[0].tag.tag, Some("path,id"));

    let codec = RequestCodec::<UpdateUser>::compile().unwrap();
    assert_eq!(
        codec.bindings()[1].source(),
        Some(&Source::Query("notify".into()))
    );
    assert!(matches!(codec.bindings()[2].shape(), Some(Shape::Repeated(_))));
    assert!(codec.bindings()[7].is_body());
}

#[test]
fn test_empty_body_leaves_zero_value() {
    let codec = RequestCodec::<UpdateUser>::compile().unwrap();
    let parts = RequestParts::builder()
        .path_param("id", "1")
        .header("content-type", "application/json")
        .build();
    let request = codec.decode(&parts).unwrap();

    assert_eq!(request.address, Address::default());
    assert!(!request.Notify);
    assert!(request.tags.is_empty());
    assert_eq!(request.note, None);
    assert_eq!(request.session, None);
}

#[test]
fn test_other_content_type_is_unsupported() {
    let codec = RequestCodec::<UpdateUser>::compile().unwrap();
    let parts = RequestParts::builder()
        .path_param("id", "1")
        .header("content-type", "text/plain")
        .body("Haifa")
        .build();
    let err = codec.decode(&parts).unwrap_err();

    assert_eq!(
        err.to_string(),
        "failed parsing request: 415: 'text/plain' is not supported"
    );
    assert_eq!(err.status(), Some(StatusCode::UNSUPPORTED_MEDIA_TYPE));
}

#[test]
fn test_missing_path_parameter() {
    let codec = RequestCodec::<UpdateUser>::compile().unwrap();
    let parts = RequestParts::builder()
        .header("content-type", "application/json")
        .build();
    let err = codec.decode(&parts).unwrap_err();

    assert_eq!(
        err.to_string(),
        "failed parsing request: empty value for path parameter 'id', required for field 'user_id'"
    );
}

#[test]
fn test_bad_scalar_names_the_field() {
    let codec = RequestCodec::<UpdateUser>::compile().unwrap();
    let parts = RequestParts::builder()
        .uri(Uri::from_static("/users/1?notify=maybe"))
        .path_param("id", "1")
        .build();
    let err = codec.decode(&parts).unwrap_err();

    assert_eq!(
        err.to_string(),
        "failed parsing request: invalid query parameter 'notify' for field 'Notify': \
         parsing 'maybe' as bool: invalid syntax"
    );
}

#[test]
fn test_untagged_field_fails_compile() {
    let err = RequestCodec::<Untagged>::compile().unwrap_err();
    assert_eq!(err.to_string(), "missing 'http' tag for field 'offset'");

    let err = ResponseCodec::<UntaggedResponse>::compile().unwrap_err();
    assert_eq!(err.to_string(), "missing 'http' tag for field 'p'");
}

#[test]
fn test_invalid_tags_fail_compile() {
    let err = RequestCodec::<BadTag>::compile().unwrap_err();
    assert_eq!(
        err.to_string(),
        "illegal 'http' tag for field 'limit': query,a,b"
    );

    let err = RequestCodec::<RepeatedPath>::compile().unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedShape { .. }));
}

#[test]
fn test_derived_response_encodes() {
    let codec = ResponseCodec::<UpdateUserResponse>::compile().unwrap();
    let response = UpdateUserResponse { p: "v".into() };

    let body = codec
        .encode(Some(&response), Some("application/json"), JsonFormat::Pretty)
        .unwrap()
        .unwrap();
    assert_eq!(&body[..], b"{\n  \"P\": \"v\"\n}\n");
}

fn tag_value() -> impl Strategy<Value = String> {
    "[a-z0-9]{0,6}"
}

proptest! {
    #[test]
    fn proptest_repeated_query_preserves_order(values in prop::collection::vec(tag_value(), 0..8)) {
        let query = values
            .iter()
            .map(|v| format!("t={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let uri: Uri = format!("/tags?{query}").parse().unwrap();
        let parts = RequestParts::builder().uri(uri).build();

        let codec = RequestCodec::<Tags>::compile().unwrap();
        let request = codec.decode(&parts).unwrap();
        prop_assert_eq!(request.values, values);
    }

    #[test]
    fn proptest_repeated_header_preserves_order(values in prop::collection::vec(tag_value(), 0..8)) {
        let mut builder = RequestParts::builder();
        for value in &values {
            builder = builder.header("x-t", value);
        }
        let parts = builder.build();

        let codec = RequestCodec::<Tags>::compile().unwrap();
        let request = codec.decode(&parts).unwrap();
        prop_assert_eq!(request.headers, values);
    }
}
