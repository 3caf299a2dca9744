//! The execution collaborator interface and call-time binding.
//!
//! Moonweave never executes the flattened program itself. An external
//! [`ScriptExecutor`] receives the program text plus the ordered key and
//! argument value lists and either returns a raw result value or fails with
//! an opaque message. [`Call`] maps caller-supplied named values onto the
//! positional slots a fragment tree declares, encodes them per declared
//! type, and feeds collaborator failures through the diagnostic mapper.

use std::sync::Arc;

use log::{debug, info};
use serde_json::Value;
use thiserror::Error;

use moonweave_core::value::{decode_return, encode_argument, encode_key};
use moonweave_core::Fragment;

use crate::diagnostics::ScriptError;
use crate::error::MoonweaveError;
use crate::render::render;

/// The external collaborator that runs flattened programs.
///
/// `keys` and `args` arrive pre-encoded in slot order. A failure carries the
/// collaborator's message in one of its known diagnostic formats; the
/// diagnostic mapper only depends on being able to pattern-match it.
pub trait ScriptExecutor {
    fn execute(
        &mut self,
        program: &str,
        keys: &[String],
        args: &[String],
    ) -> Result<Value, ExecutionError>;
}

/// A failure reported by the execution collaborator.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The collaborator ran the program and it failed.
    #[error("{0}")]
    Response(String),

    /// The collaborator could not be reached at all.
    #[error("executor transport failure: {0}")]
    Transport(String),
}

/// A pending invocation: named values bound onto positional slots.
///
/// Build with [`Call::new`], bind every declared key and argument by name,
/// then [`Call::invoke`]. Binding encodes argument values against their
/// declared types immediately, so type errors surface at bind time.
#[derive(Debug)]
pub struct Call {
    fragment: Arc<Fragment>,
    keys: Vec<Option<String>>,
    args: Vec<Option<String>>,
}

impl Call {
    pub fn new(fragment: Arc<Fragment>) -> Self {
        let keys = vec![None; fragment.keys().len()];
        let args = vec![None; fragment.args().len()];

        Self {
            fragment,
            keys,
            args,
        }
    }

    /// Bind a named key or argument value.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::UnknownName`] when the fragment declares no slot
    /// with this name, or a marshalling error when the value does not fit
    /// the declared argument type.
    pub fn bind(mut self, name: &str, value: &Value) -> Result<Self, CallError> {
        if let Some(position) = self.fragment.keys().iter().position(|key| key == name) {
            self.keys[position] = Some(encode_key(value));
            return Ok(self);
        }

        if let Some(position) = self
            .fragment
            .args()
            .iter()
            .position(|arg| arg.name == name)
        {
            let value_type = self.fragment.args()[position].value_type;
            self.args[position] = Some(encode_argument(value_type, value)?);
            return Ok(self);
        }

        Err(CallError::UnknownName {
            name: name.to_string(),
        })
    }

    /// Render the program, run it on the executor, and decode the result.
    ///
    /// # Errors
    ///
    /// Fails when bindings are missing, when the executor fails (a message
    /// matching a known diagnostic format becomes a [`ScriptError`] with a
    /// traceback; anything else passes through), or when the returned value
    /// does not decode against the declared return type.
    pub fn invoke<E: ScriptExecutor>(self, executor: &mut E) -> Result<Value, MoonweaveError> {
        self.check_missing()?;

        let keys: Vec<String> = self.keys.into_iter().flatten().collect();
        let args: Vec<String> = self.args.into_iter().flatten().collect();
        let program = render(&self.fragment);

        info!(
            fragment = self.fragment.name(),
            keys = keys.len(),
            args = args.len();
            "Invoking fragment"
        );

        match executor.execute(&program, &keys, &args) {
            Ok(value) => {
                debug!(fragment = self.fragment.name(); "Execution succeeded");
                Ok(decode_return(self.fragment.return_type(), value)?)
            }
            Err(ExecutionError::Response(message)) => {
                match ScriptError::from_execution_message(&self.fragment, &message) {
                    Some(script_error) => Err(script_error.into()),
                    None => Err(ExecutionError::Response(message).into()),
                }
            }
            Err(other) => Err(other.into()),
        }
    }

    fn check_missing(&self) -> Result<(), CallError> {
        let missing_keys: Vec<String> = self
            .fragment
            .keys()
            .iter()
            .zip(&self.keys)
            .filter(|(_, bound)| bound.is_none())
            .map(|(name, _)| name.clone())
            .collect();

        if !missing_keys.is_empty() {
            return Err(CallError::MissingKeys {
                names: missing_keys,
            });
        }

        let missing_args: Vec<String> = self
            .fragment
            .args()
            .iter()
            .zip(&self.args)
            .filter(|(_, bound)| bound.is_none())
            .map(|(arg, _)| arg.name.clone())
            .collect();

        if !missing_args.is_empty() {
            return Err(CallError::MissingArgs {
                names: missing_args,
            });
        }

        Ok(())
    }
}

/// A named value could not be mapped onto the fragment's slots.
#[derive(Debug, Error)]
pub enum CallError {
    /// The fragment declares no key or argument with this name.
    #[error("unknown key or argument `{name}`")]
    UnknownName { name: String },

    /// Declared keys were left unbound at invoke time.
    #[error("missing key(s) {}", .names.join(", "))]
    MissingKeys { names: Vec<String> },

    /// Declared arguments were left unbound at invoke time.
    #[error("missing argument(s) {}", .names.join(", "))]
    MissingArgs { names: Vec<String> },

    /// A bound value did not fit the declared argument type.
    #[error(transparent)]
    Marshal(#[from] moonweave_core::MarshalError),
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use moonweave_parser::{FragmentCache, MemorySource, parse};

    use super::*;

    /// Records the call it receives and returns a canned response.
    struct RecordingExecutor {
        program: Option<String>,
        keys: Vec<String>,
        args: Vec<String>,
        response: Result<Value, String>,
    }

    impl RecordingExecutor {
        fn returning(value: Value) -> Self {
            Self {
                program: None,
                keys: Vec::new(),
                args: Vec::new(),
                response: Ok(value),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                program: None,
                keys: Vec::new(),
                args: Vec::new(),
                response: Err(message.to_string()),
            }
        }
    }

    impl ScriptExecutor for RecordingExecutor {
        fn execute(
            &mut self,
            program: &str,
            keys: &[String],
            args: &[String],
        ) -> Result<Value, ExecutionError> {
            self.program = Some(program.to_string());
            self.keys = keys.to_vec();
            self.args = args.to_vec();
            self.response
                .clone()
                .map_err(ExecutionError::Response)
        }
    }

    fn fragment_from(content: &str) -> Arc<Fragment> {
        let source = MemorySource::new();
        let mut cache = FragmentCache::new();
        parse("foo", content, &source, &mut cache).unwrap()
    }

    #[test]
    fn test_call_binds_keys_and_typed_args() {
        let fragment = fragment_from(
            "%key key1\n%arg arg1\nbody\n%key key2\n%arg arg2 integer\n%arg arg3 bool\n%arg arg4 list\n%arg arg5 dict",
        );
        let mut executor = RecordingExecutor::returning(json!("result"));

        let result = Call::new(fragment)
            .bind("arg1", &json!("ARG"))
            .unwrap()
            .bind("arg2", &json!(2))
            .unwrap()
            .bind("arg3", &json!(false))
            .unwrap()
            .bind("arg4", &json!([1, 2.5, null, "a"]))
            .unwrap()
            .bind("arg5", &json!({"b": null}))
            .unwrap()
            .bind("key1", &json!("KEY"))
            .unwrap()
            .bind("key2", &json!("KEY 2"))
            .unwrap()
            .invoke(&mut executor)
            .unwrap();

        assert_eq!(result, json!("result"));
        assert_eq!(executor.keys, ["KEY", "KEY 2"]);
        assert_eq!(
            executor.args,
            ["ARG", "2", "0", "[1,2.5,null,\"a\"]", "{\"b\":null}"]
        );
        assert!(executor.program.unwrap().contains("local key1 = KEYS[1]"));
    }

    #[test]
    fn test_call_decodes_declared_return_type() {
        let fragment = fragment_from("%return integer\nreturn 42");
        let mut executor = RecordingExecutor::returning(json!("42"));

        let result = Call::new(fragment).invoke(&mut executor).unwrap();

        assert_eq!(result, json!(42));
    }

    #[test]
    fn test_call_passes_raw_value_without_return_type() {
        let fragment = fragment_from("return 42");
        let mut executor = RecordingExecutor::returning(json!(42));

        let result = Call::new(fragment).invoke(&mut executor).unwrap();

        assert_eq!(result, json!(42));
    }

    #[test]
    fn test_call_missing_key() {
        let fragment = fragment_from("%key key1\n%arg arg1");
        let mut executor = RecordingExecutor::returning(json!(null));

        let err = Call::new(fragment)
            .bind("arg1", &json!("ARG"))
            .unwrap()
            .invoke(&mut executor)
            .unwrap_err();

        assert!(matches!(
            err,
            MoonweaveError::Call(CallError::MissingKeys { .. })
        ));
    }

    #[test]
    fn test_call_missing_arg() {
        let fragment = fragment_from("%key key1\n%arg arg1");
        let mut executor = RecordingExecutor::returning(json!(null));

        let err = Call::new(fragment)
            .bind("key1", &json!("KEY"))
            .unwrap()
            .invoke(&mut executor)
            .unwrap_err();

        assert!(matches!(
            err,
            MoonweaveError::Call(CallError::MissingArgs { .. })
        ));
    }

    #[test]
    fn test_call_unknown_name() {
        let fragment = fragment_from("%key key1");

        let err = Call::new(fragment)
            .bind("unknown", &json!("x"))
            .unwrap_err();

        assert!(matches!(err, CallError::UnknownName { .. }));
    }

    #[test]
    fn test_invoke_wraps_matching_execution_error() {
        let content: String = (1..=12).map(|i| format!("local l{i} = {i};\n")).collect();
        let fragment = fragment_from(&content);
        let mut executor =
            RecordingExecutor::failing("ERR something is wrong: f_1234abc:11: my lua error");

        let err = Call::new(fragment).invoke(&mut executor).unwrap_err();

        match err {
            MoonweaveError::Script(script_error) => {
                assert_eq!(script_error.line(), 11);
                assert_eq!(script_error.kind(), "something is wrong");
                assert_eq!(script_error.message(), "my lua error");
            }
            other => panic!("expected Script error, got {other:?}"),
        }
    }

    #[test]
    fn test_invoke_passes_through_unknown_execution_error() {
        let fragment = fragment_from("return 1");
        let mut executor = RecordingExecutor::failing("ERR Unknown error");

        let err = Call::new(fragment).invoke(&mut executor).unwrap_err();

        match err {
            MoonweaveError::Execution(ExecutionError::Response(message)) => {
                assert_eq!(message, "ERR Unknown error");
            }
            other => panic!("expected Execution error, got {other:?}"),
        }
    }
}
