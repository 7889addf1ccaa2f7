use std::fmt;

/// Route registration error
///
/// Returned synchronously from every registration call. Callers typically abort startup on
/// any of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// Nothing is left of the pattern once method and domain are stripped.
    EmptyUri {
        /// The pattern as given
        pattern: String,
    },
    /// The URI part does not start with `/`.
    MissingLeadingSlash {
        /// The pattern as given
        pattern: String,
    },
    /// The `METHOD:` prefix is not one of the nine supported verbs or `ALL`.
    InvalidMethod {
        /// The method text as given
        method: String,
    },
    /// A `*name` segment appears somewhere other than the end of the URI.
    MisplacedWildcard {
        /// The URI containing the wildcard
        uri: String,
    },
    /// A `{name}` capture is missing its closing brace, or a `}` has no opening brace.
    UnterminatedCapture {
        /// The offending segment
        segment: String,
    },
    /// A `{}` capture has no name, or its name contains characters outside `[A-Za-z0-9_.-]`.
    InvalidCaptureName {
        /// The offending segment
        segment: String,
    },
    /// The hook stage name is not one of the six known stages.
    UnknownHookStage {
        /// The stage name as given
        stage: String,
    },
    /// Registration or start attempted while the router is running.
    RouterRunning {
        /// The pattern that was being registered, or the operation attempted
        pattern: String,
    },
    /// A serve handler is already registered for the same domain, method and URI.
    DuplicateRoute {
        /// The normalized `METHOD:uri@domain` of the existing route
        route: String,
    },
    /// A controller has no action with the requested name.
    UnknownAction {
        /// Type name of the controller
        controller: String,
        /// The action name as given
        action: String,
    },
    /// The generated regular expression failed to compile.
    InvalidRegex {
        /// The URI being compiled
        uri: String,
        /// Error reported by the regex engine
        message: String,
    },
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::EmptyUri { pattern } => {
                write!(f, "invalid pattern '{pattern}': URI should not be empty")
            }
            RegistrationError::MissingLeadingSlash { pattern } => {
                write!(f, "invalid pattern '{pattern}': URI should lead with '/'")
            }
            RegistrationError::InvalidMethod { method } => {
                write!(
                    f,
                    "invalid method '{method}': expected ALL or one of GET, PUT, POST, DELETE, \
                    PATCH, HEAD, CONNECT, OPTIONS, TRACE"
                )
            }
            RegistrationError::MisplacedWildcard { uri } => {
                write!(f, "invalid URI '{uri}': a '*' segment must be the last segment")
            }
            RegistrationError::UnterminatedCapture { segment } => {
                write!(f, "invalid segment '{segment}': unbalanced '{{' / '}}'")
            }
            RegistrationError::InvalidCaptureName { segment } => {
                write!(
                    f,
                    "invalid segment '{segment}': capture names must be non-empty [A-Za-z0-9_.-]"
                )
            }
            RegistrationError::UnknownHookStage { stage } => {
                write!(
                    f,
                    "unknown hook stage '{stage}': expected BeforeServe, AfterServe, \
                    BeforeOutput, AfterOutput, BeforeClose or AfterClose"
                )
            }
            RegistrationError::RouterRunning { pattern } => {
                write!(f, "cannot register '{pattern}' while the router is running")
            }
            RegistrationError::DuplicateRoute { route } => {
                write!(f, "duplicated route registry '{route}'")
            }
            RegistrationError::UnknownAction { controller, action } => {
                write!(f, "controller '{controller}' has no action '{action}'")
            }
            RegistrationError::InvalidRegex { uri, message } => {
                write!(f, "invalid URI '{uri}': {message}")
            }
        }
    }
}

impl std::error::Error for RegistrationError {}
