//! Interactive prompts.
//!
//! The session only talks to the user through [`PromptService`], so the same flow
//! runs against the terminal or against a scripted double in tests.

use crate::error::{RecordError, Result};

/// Checks and normalizes a line of user input, or explains why it is rejected.
pub type Validator = fn(&str) -> std::result::Result<String, &'static str>;

pub trait PromptService {
    /// Asks the user to pick one of `options`; returns the chosen index.
    fn select_one(&self, message: &str, options: &[String]) -> Result<usize>;

    fn confirm(&self, message: &str, default: bool) -> Result<bool>;

    /// Reads text until `validate` accepts it and returns the normalized value.
    fn input_text(&self, message: &str, placeholder: &str, validate: Validator) -> Result<String>;
}

/// Prompts rendered in the terminal by cliclack.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl PromptService for TerminalPrompt {
    fn select_one(&self, message: &str, options: &[String]) -> Result<usize> {
        if options.is_empty() {
            return Err(RecordError::Prompt(format!("nothing to choose for '{message}'")));
        }
        let mut prompt = cliclack::select(message);
        for (i, option) in options.iter().enumerate() {
            prompt = prompt.item(i, option, "");
        }
        prompt.interact().map_err(prompt_error)
    }

    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        cliclack::confirm(message)
            .initial_value(default)
            .interact()
            .map_err(prompt_error)
    }

    fn input_text(&self, message: &str, placeholder: &str, validate: Validator) -> Result<String> {
        // cliclack re-renders the prompt with the error until the input passes.
        let raw: String = cliclack::input(message)
            .placeholder(placeholder)
            .validate(move |input: &String| validate(input).map(|_| ()))
            .interact()
            .map_err(prompt_error)?;
        validate(&raw).map_err(|reason| RecordError::Prompt(reason.to_string()))
    }
}

fn prompt_error(e: std::io::Error) -> RecordError {
    RecordError::Prompt(e.to_string())
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays queued answers. Rejected text answers are skipped, the way a user
    /// would be asked again, and counted in `rejections`.
    #[derive(Default)]
    pub struct ScriptedPrompt {
        selections: RefCell<VecDeque<usize>>,
        confirms: RefCell<VecDeque<bool>>,
        inputs: RefCell<VecDeque<String>>,
        pub rejections: RefCell<Vec<&'static str>>,
        pub asked: RefCell<Vec<String>>,
    }

    impl ScriptedPrompt {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn select(self, index: usize) -> Self {
            self.selections.borrow_mut().push_back(index);
            self
        }

        pub fn answer(self, yes: bool) -> Self {
            self.confirms.borrow_mut().push_back(yes);
            self
        }

        pub fn type_text(self, text: &str) -> Self {
            self.inputs.borrow_mut().push_back(text.to_string());
            self
        }
    }

    impl PromptService for ScriptedPrompt {
        fn select_one(&self, message: &str, options: &[String]) -> Result<usize> {
            self.asked.borrow_mut().push(message.to_string());
            let index = self
                .selections
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| RecordError::Prompt("no scripted selection".to_string()))?;
            if index >= options.len() {
                return Err(RecordError::Prompt(format!("selection {index} out of range")));
            }
            Ok(index)
        }

        fn confirm(&self, message: &str, _default: bool) -> Result<bool> {
            self.asked.borrow_mut().push(message.to_string());
            self.confirms
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| RecordError::Prompt("no scripted confirmation".to_string()))
        }

        fn input_text(&self, message: &str, _placeholder: &str, validate: Validator) -> Result<String> {
            self.asked.borrow_mut().push(message.to_string());
            loop {
                let raw = self
                    .inputs
                    .borrow_mut()
                    .pop_front()
                    .ok_or_else(|| RecordError::Prompt("no scripted input".to_string()))?;
                match validate(&raw) {
                    Ok(value) => return Ok(value),
                    Err(reason) => self.rejections.borrow_mut().push(reason),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedPrompt;
    use super::*;

    fn non_empty(input: &str) -> std::result::Result<String, &'static str> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            Err("empty")
        } else {
            Ok(trimmed.to_string())
        }
    }

    #[test]
    fn test_scripted_input_retries_until_valid() {
        let prompt = ScriptedPrompt::new().type_text("   ").type_text(" ok ");
        let value = prompt.input_text("Name?", "", non_empty).unwrap();
        assert_eq!(value, "ok");
        assert_eq!(*prompt.rejections.borrow(), vec!["empty"]);
    }

    #[test]
    fn test_scripted_select_rejects_out_of_range() {
        let prompt = ScriptedPrompt::new().select(3);
        let options = vec!["a".to_string(), "b".to_string()];
        assert!(prompt.select_one("Pick", &options).is_err());
    }

    #[test]
    fn test_terminal_select_requires_options() {
        assert!(matches!(
            TerminalPrompt.select_one("Pick", &[]),
            Err(RecordError::Prompt(_))
        ));
    }
}
