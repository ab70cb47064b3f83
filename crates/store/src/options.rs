use crate::StoreMap;
use crate::error::StoreError;
use crate::persistence::json_kind;
use estore_bridge::{DEFAULT_STORE_NAME, WindowHandle};
use serde_json::Value;

pub const DEFAULT_FILE_EXTENSION: &str = "json";

/// Creation options of an authoritative store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreOptions {
    pub store_name: String,
    pub file_extension: String,
    /// Seed for a missing or corrupt file and target of `reset`.
    pub defaults: StoreMap,
    /// Windows that receive the full store after every mutation.
    pub observers: Vec<WindowHandle>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            store_name: DEFAULT_STORE_NAME.to_owned(),
            file_extension: DEFAULT_FILE_EXTENSION.to_owned(),
            defaults: StoreMap::new(),
            observers: Vec::new(),
        }
    }
}

impl StoreOptions {
    #[must_use]
    pub fn builder() -> StoreOptionsBuilder {
        StoreOptionsBuilder::default()
    }

    /// `<store_name>.<file_extension>`
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.store_name, self.file_extension)
    }

    /// Checks that the name and extension form a single plain file name.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidOptions`] describing the first offending field.
    pub fn validate(&self) -> Result<(), StoreError> {
        check_segment("store_name", &self.store_name)?;
        check_segment("file_extension", &self.file_extension)?;
        if self.file_extension.starts_with('.') {
            return Err(invalid("file_extension", "must not start with '.'"));
        }
        Ok(())
    }
}

fn check_segment(field: &'static str, value: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    if value == "." || value == ".." {
        return Err(invalid(field, "must not be a relative path marker"));
    }
    if value.chars().any(|c| matches!(c, '/' | '\\' | '\0')) {
        return Err(invalid(field, "must not contain path separators"));
    }
    Ok(())
}

fn invalid(field: &'static str, reason: &'static str) -> StoreError {
    StoreError::InvalidOptions { message: reason.into(), context: Some(field.into()) }
}

/// Fluent construction of [`StoreOptions`].
#[derive(Debug, Default)]
pub struct StoreOptionsBuilder {
    options: StoreOptions,
    defaults: Option<Value>,
}

impl StoreOptionsBuilder {
    #[must_use]
    pub fn store_name(mut self, name: impl Into<String>) -> Self {
        self.options.store_name = name.into();
        self
    }

    #[must_use]
    pub fn file_extension(mut self, extension: impl Into<String>) -> Self {
        self.options.file_extension = extension.into();
        self
    }

    /// Replaces the defaults template. Must be a JSON object; checked by `build`.
    #[must_use]
    pub fn defaults(mut self, defaults: Value) -> Self {
        self.defaults = Some(defaults);
        self
    }

    #[must_use]
    pub fn observer(mut self, window: WindowHandle) -> Self {
        if !self.options.observers.contains(&window) {
            self.options.observers.push(window);
        }
        self
    }

    /// # Errors
    /// Returns [`StoreError::InvalidOptions`] for a non-object `defaults` or an invalid name or
    /// extension.
    pub fn build(self) -> Result<StoreOptions, StoreError> {
        let mut options = self.options;
        match self.defaults {
            None => {},
            Some(Value::Object(map)) => options.defaults = map,
            Some(other) => {
                return Err(StoreError::InvalidOptions {
                    message: format!("must be an object, found {}", json_kind(&other)).into(),
                    context: Some("defaults".into()),
                });
            },
        }
        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_match_baseline() {
        let options = StoreOptions::default();

        assert_eq!(options.file_name(), "store.json");
        assert!(options.defaults.is_empty());
        assert!(options.observers.is_empty());
    }

    #[test]
    fn test_builder_sets_fields() {
        let options = StoreOptions::builder()
            .store_name("prefs")
            .file_extension("dat")
            .defaults(json!({"volume": 3}))
            .build()
            .unwrap();

        assert_eq!(options.file_name(), "prefs.dat");
        assert_eq!(options.defaults.get("volume"), Some(&json!(3)));
    }

    #[test]
    fn test_builder_rejects_bad_input() {
        for (name, ext) in [("", "json"), ("a/b", "json"), ("..", "json"), ("s", ""), ("s", ".json"), ("s", "x\\y")] {
            let result = StoreOptions::builder().store_name(name).file_extension(ext).build();
            assert!(matches!(result, Err(StoreError::InvalidOptions { .. })), "{name}.{ext}");
        }

        let result = StoreOptions::builder().defaults(json!([1])).build();
        assert!(matches!(result, Err(StoreError::InvalidOptions { .. })));
    }
}
