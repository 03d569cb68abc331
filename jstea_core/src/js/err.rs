//! Javascript exception reports.

#[derive(Debug, Clone)]
/// A caught V8 exception, flattened for logging and error propagation.
pub struct JsError {
  pub message: String,
  pub stack: Option<String>,
}

impl JsError {
  /// Extracts message and stack from a caught exception value.
  pub fn from_v8_exception(
    scope: &mut v8::HandleScope,
    exception: v8::Local<v8::Value>,
    prefix: Option<&str>,
  ) -> Self {
    let message = v8::Exception::create_message(scope, exception)
      .get(scope)
      .to_rust_string_lossy(scope);
    let message = match prefix {
      Some(prefix) => format!("{prefix}{message}"),
      None => message,
    };

    let stack = exception.to_object(scope).and_then(|obj| {
      let key = v8::String::new(scope, "stack").unwrap();
      let stack = obj.get(scope, key.into())?;
      if stack.is_string() {
        Some(stack.to_rust_string_lossy(scope))
      } else {
        None
      }
    });

    JsError { message, stack }
  }
}

impl std::fmt::Display for JsError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match &self.stack {
      Some(stack) => write!(f, "{}\n{}", self.message, stack),
      None => write!(f, "{}", self.message),
    }
  }
}

impl std::error::Error for JsError {}
