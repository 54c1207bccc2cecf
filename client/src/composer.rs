//! Composer — local pre-processing of submitted input.
//!
//! Blank input is swallowed without touching the field. A leading `/roll`
//! token turns the submission into a `dice_roll` draft evaluated locally;
//! anything else becomes a `chat` draft with the trimmed text. Drafts are
//! validated before they leave; a rejected draft keeps the field as typed.
//! The field is cleared after every emitted draft.

#[cfg(test)]
#[path = "composer_test.rs"]
mod composer_test;

use frames::{ActionDraft, ValidationError};
use frames::dice;
use rand::Rng;

use crate::context::ClientContext;

#[derive(Clone, Debug)]
pub struct Composer {
    ctx: ClientContext,
    input: String,
}

impl Composer {
    #[must_use]
    pub fn new(ctx: ClientContext) -> Self {
        Self { ctx, input: String::new() }
    }

    #[must_use]
    pub fn context(&self) -> &ClientContext {
        &self.ctx
    }

    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Turn the current input into a draft, rolling dice with the
    /// thread-local generator. `Ok(None)` for blank input.
    ///
    /// # Errors
    ///
    /// The draft's `ValidationError`, e.g. for a blank table id.
    pub fn submit(&mut self) -> Result<Option<ActionDraft>, ValidationError> {
        self.submit_with(&mut rand::rng())
    }

    /// # Errors
    ///
    /// See [`Composer::submit`].
    pub fn submit_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Option<ActionDraft>, ValidationError> {
        let trimmed = self.input.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let draft = match dice::roll_command_expression(trimmed) {
            Some(expr) => {
                let roll = dice::evaluate_with(expr, rng);
                ActionDraft::dice_roll(&self.ctx.user_id, &self.ctx.table_id, roll)
            }
            None => ActionDraft::chat(&self.ctx.user_id, &self.ctx.table_id, trimmed),
        };

        draft.clone().validate()?;
        self.input.clear();
        Ok(Some(draft))
    }
}
