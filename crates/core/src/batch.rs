//! Atomic command batches
//!
//! A [`Batch`] collects mutating commands that a [`Store`](crate::traits::Store)
//! applies as one indivisible unit, in the order they were staged. Record
//! save and destroy build a single batch each, so index updates and
//! attribute writes for one record are never observed half-applied.

/// A single mutating store command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Set or remove fields of a field-map; `None` removes the field
    HashSetFields {
        /// Target key
        key: String,
        /// Field updates
        fields: Vec<(String, Option<String>)>,
    },
    /// Add members to a set
    SetAdd {
        /// Target key
        key: String,
        /// Members to add
        members: Vec<String>,
    },
    /// Remove members from a set
    SetRemove {
        /// Target key
        key: String,
        /// Members to remove
        members: Vec<String>,
    },
    /// Append values to a list
    ListPush {
        /// Target key
        key: String,
        /// Values, appended in order
        values: Vec<String>,
    },
    /// Delete a key of any structure
    Delete {
        /// Target key
        key: String,
    },
}

impl Command {
    /// Key this command writes to
    pub fn key(&self) -> &str {
        match self {
            Command::HashSetFields { key, .. }
            | Command::SetAdd { key, .. }
            | Command::SetRemove { key, .. }
            | Command::ListPush { key, .. }
            | Command::Delete { key } => key,
        }
    }
}

/// Ordered group of commands applied atomically
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    commands: Vec<Command>,
}

impl Batch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage field-map updates
    pub fn hash_set_fields(
        &mut self,
        key: impl Into<String>,
        fields: Vec<(String, Option<String>)>,
    ) -> &mut Self {
        if !fields.is_empty() {
            self.commands.push(Command::HashSetFields {
                key: key.into(),
                fields,
            });
        }
        self
    }

    /// Stage set additions
    pub fn set_add(&mut self, key: impl Into<String>, members: Vec<String>) -> &mut Self {
        if !members.is_empty() {
            self.commands.push(Command::SetAdd {
                key: key.into(),
                members,
            });
        }
        self
    }

    /// Stage set removals
    pub fn set_remove(&mut self, key: impl Into<String>, members: Vec<String>) -> &mut Self {
        if !members.is_empty() {
            self.commands.push(Command::SetRemove {
                key: key.into(),
                members,
            });
        }
        self
    }

    /// Stage list appends
    pub fn list_push(&mut self, key: impl Into<String>, values: Vec<String>) -> &mut Self {
        if !values.is_empty() {
            self.commands.push(Command::ListPush {
                key: key.into(),
                values,
            });
        }
        self
    }

    /// Stage a key deletion
    pub fn delete(&mut self, key: impl Into<String>) -> &mut Self {
        self.commands.push(Command::Delete { key: key.into() });
        self
    }

    /// Staged commands, in order
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Consume the batch
    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    /// Number of staged commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if nothing was staged
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
