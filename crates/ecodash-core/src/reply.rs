//! Outbound message model.
//!
//! Flows describe what to send as [`Outbound`] values; the transport decides
//! how to render them.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while building a button menu
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MenuError {
    /// Two buttons in one menu share an action-id
    #[error("Duplicate action-id in menu: {0}")]
    DuplicateAction(String),
}

/// One inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    /// Text shown on the button
    pub label: String,
    /// Action-id delivered back when pressed
    pub action: String,
}

/// Ordered inline buttons attached to a message.
///
/// Presses are routed by action-id equality only, so ids are unique within
/// one menu.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonMenu {
    buttons: Vec<Button>,
    columns: usize,
}

impl ButtonMenu {
    /// Empty menu, one button per row.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buttons: Vec::new(),
            columns: 1,
        }
    }

    /// Empty menu laid out `columns` buttons per row.
    #[must_use]
    pub fn with_columns(columns: usize) -> Self {
        Self {
            buttons: Vec::new(),
            columns: columns.max(1),
        }
    }

    /// Append a button.
    ///
    /// # Errors
    ///
    /// Returns `MenuError::DuplicateAction` if the action-id is already used.
    pub fn push(
        &mut self,
        label: impl Into<String>,
        action: impl Into<String>,
    ) -> Result<(), MenuError> {
        let action = action.into();
        if self.buttons.iter().any(|b| b.action == action) {
            return Err(MenuError::DuplicateAction(action));
        }
        self.buttons.push(Button {
            label: label.into(),
            action,
        });
        Ok(())
    }

    /// Builder-style [`push`](Self::push).
    ///
    /// # Errors
    ///
    /// Returns `MenuError::DuplicateAction` if the action-id is already used.
    pub fn button(
        mut self,
        label: impl Into<String>,
        action: impl Into<String>,
    ) -> Result<Self, MenuError> {
        self.push(label, action)?;
        Ok(self)
    }

    /// Buttons in order
    #[must_use]
    pub fn buttons(&self) -> &[Button] {
        &self.buttons
    }

    /// Buttons grouped into rows
    pub fn rows(&self) -> impl Iterator<Item = &[Button]> {
        self.buttons.chunks(self.columns.max(1))
    }

    /// Whether the menu has no buttons
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }

    /// Number of buttons
    #[must_use]
    pub fn len(&self) -> usize {
        self.buttons.len()
    }
}

/// A single outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// HTML text, optionally with buttons
    Text {
        /// HTML body
        text: String,
        /// Inline buttons
        menu: Option<ButtonMenu>,
    },
    /// Local image with an optional HTML caption
    Photo {
        /// Image path
        path: PathBuf,
        /// HTML caption
        caption: Option<String>,
    },
    /// Several local images as one album
    MediaGroup(Vec<PathBuf>),
}

impl Outbound {
    /// Text without buttons
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            menu: None,
        }
    }

    /// Text with buttons; an empty menu is dropped
    #[must_use]
    pub fn text_with_menu(text: impl Into<String>, menu: ButtonMenu) -> Self {
        Self::Text {
            text: text.into(),
            menu: (!menu.is_empty()).then_some(menu),
        }
    }

    /// Photo without caption
    #[must_use]
    pub fn photo(path: impl Into<PathBuf>) -> Self {
        Self::Photo {
            path: path.into(),
            caption: None,
        }
    }

    /// Photo with caption
    #[must_use]
    pub fn photo_with_caption(path: impl Into<PathBuf>, caption: impl Into<String>) -> Self {
        Self::Photo {
            path: path.into(),
            caption: Some(caption.into()),
        }
    }
}

/// One message of a sequence, sent `delay` after the sequence starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Offset from the start of the flow
    pub delay: Duration,
    /// Message to send
    pub message: Outbound,
}

/// Ordered, delayed messages making up one reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sequence {
    steps: Vec<Step>,
}

impl Sequence {
    /// Empty sequence
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence of one message sent right away
    #[must_use]
    pub fn single(message: Outbound) -> Self {
        Self::new().now(message)
    }

    /// Append a message sent right away
    #[must_use]
    pub fn now(self, message: Outbound) -> Self {
        self.after(Duration::ZERO, message)
    }

    /// Append a message sent `delay` after the sequence starts
    #[must_use]
    pub fn after(mut self, delay: Duration, message: Outbound) -> Self {
        self.steps.push(Step { delay, message });
        self
    }

    /// Append a message only if present
    #[must_use]
    pub fn maybe(self, delay: Duration, message: Option<Outbound>) -> Self {
        match message {
            Some(message) => self.after(delay, message),
            None => self,
        }
    }

    /// Steps in send order
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Whether nothing will be sent
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

impl IntoIterator for Sequence {
    type Item = Step;
    type IntoIter = std::vec::IntoIter<Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}
