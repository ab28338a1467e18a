//! Prompt templating with simple `{{placeholder}}` substitution.
//!
//! Templates are plain instruction text. Every `{{ key }}` occurrence is
//! replaced with the matching input; an unknown key or an unterminated
//! placeholder is an error rather than silently left in the prompt.
use std::collections::HashMap;

use crate::error::{AppError, AppResult};

#[derive(Default)]
pub struct PromptConstructor;

impl PromptConstructor {
    pub fn new() -> Self {
        PromptConstructor
    }

    /// Construct a prompt by substituting placeholders inside `template`
    /// with corresponding values from `inputs`.
    pub fn construct_prompt(&self, template: &str, inputs: &[(&str, &str)]) -> AppResult<String> {
        let inputs: HashMap<&str, &str> = inputs.iter().copied().collect();
        self.validate_inputs(&inputs)?;

        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or_else(|| {
                AppError::Config(format!("Unterminated placeholder in prompt template near: {}", &rest[start..]))
            })?;
            let key = after[..end].trim();
            let replacement = inputs
                .get(key)
                .ok_or_else(|| AppError::Config(format!("Missing input for placeholder: {}", key)))?;
            out.push_str(replacement);
            rest = &after[end + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Values end up verbatim in the instruction text, so they must not open
    /// placeholders of their own.
    fn validate_inputs(&self, inputs: &HashMap<&str, &str>) -> AppResult<()> {
        for (key, value) in inputs {
            if value.contains("{{") || value.contains("}}") {
                return Err(AppError::BadRequest(format!("Input '{}' may not contain template braces", key)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_every_placeholder() {
        let p = PromptConstructor::new()
            .construct_prompt("Change {{ src }} to {{dst}}; keep {{src}} texture.", &[("src", "red"), ("dst", "blue")])
            .unwrap();
        assert_eq!(p, "Change red to blue; keep red texture.");
    }

    #[test]
    fn missing_input_is_an_error() {
        let err = PromptConstructor::new().construct_prompt("Use {{item}}", &[]).unwrap_err();
        assert!(err.to_string().contains("item"));
    }

    #[test]
    fn unterminated_placeholder_is_an_error() {
        assert!(PromptConstructor::new().construct_prompt("Use {{item", &[("item", "x")]).is_err());
    }

    #[test]
    fn braces_in_inputs_are_rejected() {
        let err = PromptConstructor::new().construct_prompt("Use {{item}}", &[("item", "{{other}}")]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
