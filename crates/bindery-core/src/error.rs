//! Error types for method registration and invocation.

use bindery_codec::CompileError;
use thiserror::Error;

/// Error returned when a method cannot be added to a [`Service`](crate::Service).
///
/// Registration errors are programmer errors: the request or response type
/// carries a missing or malformed `http` descriptor. Applications should
/// propagate them out of `main` rather than continue without the method.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The request type has no valid decoder.
    #[error("failed creating request decoder for '{type_name}'")]
    RequestCodec {
        /// Short name of the request type
        type_name: String,
        /// Underlying compile failure
        #[source]
        source: CompileError,
    },

    /// The response type has no valid encoder.
    #[error("failed creating response encoder for '{type_name}'")]
    ResponseCodec {
        /// Short name of the response type
        type_name: String,
        /// Underlying compile failure
        #[source]
        source: CompileError,
    },

    /// The method name is empty.
    #[error("method name must not be empty")]
    EmptyName,
}

/// Error raised when a type-erased method receives a value of the wrong type.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// The request payload is not the method's request type.
    #[error("expected request of type '{expected}', got '{found}'")]
    RequestType {
        /// Declared request type
        expected: &'static str,
        /// Type actually passed in
        found: &'static str,
    },

    /// The response payload is not the encoder's response type.
    #[error("expected response of type '{expected}', got '{found}'")]
    ResponseType {
        /// Declared response type
        expected: &'static str,
        /// Type actually produced
        found: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_registration_error_keeps_cause() {
        let err = RegistrationError::RequestCodec {
            type_name: "GetUser".to_string(),
            source: CompileError::MissingTag {
                field: "id".to_string(),
            },
        };

        assert_eq!(err.to_string(), "failed creating request decoder for 'GetUser'");
        assert_eq!(
            err.source().map(ToString::to_string).as_deref(),
            Some("missing 'http' tag for field 'id'")
        );
    }

    #[test]
    fn test_invocation_error_display() {
        let err = InvocationError::RequestType {
            expected: "GetUser",
            found: "alloc::string::String",
        };
        assert_eq!(
            err.to_string(),
            "expected request of type 'GetUser', got 'alloc::string::String'"
        );
    }
}
