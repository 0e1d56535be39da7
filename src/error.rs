use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Exception raised by host code behind a registered method, constructor or field getter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{exception_class}: {message}")]
pub struct HostError {
    pub exception_class: String,
    pub message: String,
}

impl HostError {
    pub fn new(exception_class: impl Into<String>, message: impl Into<String>) -> Self {
        HostError {
            exception_class: exception_class.into(),
            message: message.into(),
        }
    }

    pub fn illegal_argument(message: impl Into<String>) -> Self {
        HostError::new("java.lang.IllegalArgumentException", message)
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        HostError::new("java.lang.IllegalStateException", message)
    }
}

pub type HostResult<T> = std::result::Result<T, HostError>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed descriptor: {0:?}")]
    MalformedDescriptor(String),

    #[error("malformed member selector {selector:?}: {reason}")]
    MalformedMemberSelector { selector: String, reason: String },

    #[error("class not found: {0}")]
    ClassNotFound(String),

    #[error("no such member: {0}")]
    NoSuchMember(String),

    #[error("invalid class definition for {class}: {reason}")]
    InvalidClassDefinition { class: String, reason: String },

    #[error("no such key: {key:?} in {class}")]
    InvalidProperty { key: String, class: String },

    #[error("{key:?} of {class} is not a method")]
    NotAMethod { key: String, class: String },

    #[error("{0}")]
    NoCompatibleOverload(String),

    #[error("{0}")]
    AmbiguousOverload(String),

    #[error("{member} takes {expectation}{expected} argument(s), but {given} was given")]
    ArgumentCount {
        member: String,
        expectation: &'static str,
        expected: usize,
        given: usize,
    },

    #[error(
        "{member} couldn't be called: can't convert argument #{position} to {target}; the type of the actual value was: {actual}"
    )]
    ArgumentTypeMismatch {
        member: String,
        position: usize,
        target: String,
        actual: String,
    },

    #[error(
        "{member} couldn't be called: argument #{position} was null, but the parameter type ({target}) is primitive"
    )]
    NullToPrimitive {
        member: String,
        position: usize,
        target: String,
    },

    #[error("failed to convert sequence to {target}: item at index {index} ({item_type}) is not convertible to {component}")]
    SequenceItemType {
        target: String,
        component: String,
        index: usize,
        item_type: String,
    },

    #[error("can't unwrap {model_type} to {target}")]
    CannotUnwrap { model_type: String, target: String },

    #[error("method {member} threw an exception when invoked on {receiver}")]
    Invocation {
        receiver: String,
        member: String,
        #[source]
        source: HostError,
    },

    #[error("error while creating new instance of {class} using {constructor}")]
    Construction {
        class: String,
        constructor: String,
        #[source]
        source: HostError,
    },

    #[error("reading {member} of {receiver} failed")]
    FieldRead {
        receiver: String,
        member: String,
        #[source]
        source: HostError,
    },

    #[error("class {0} has no public constructors")]
    NoPublicConstructor(String),

    #[error(
        "it's not allowed to clear the whole cache of a shared class introspector; use remove(class) instead"
    )]
    ClearSharedCache,

    #[error("{0}")]
    Model(String),
}
