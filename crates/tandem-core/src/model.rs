//! Entity vocabulary: session types, statuses, roles, item kinds.
//!
//! Every enum here is stored as TEXT in SQLite, so each one carries
//! `as_str()` and a `FromStr` impl whose strings are the storage format.
//! The serde representation uses the same snake_case strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error for parsing an unknown vocabulary string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseEnumError {
    /// Which enum rejected the value.
    pub kind: &'static str,
    /// The rejected value.
    pub value: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: '{}'", self.kind, self.value)
    }
}

impl std::error::Error for ParseEnumError {}

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            /// Storage representation (matches the TEXT column value).
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

text_enum! {
    /// Which agent surface a session belongs to.
    SessionType {
        /// Code-generation agent.
        Code => "code",
        /// Terminal agent.
        Terminal => "terminal",
        /// Both surfaces share the session.
        Hybrid => "hybrid",
    }
}

text_enum! {
    /// Session lifecycle status.
    SessionStatus {
        /// Accepting turns.
        Active => "active",
        /// Suspended by the user.
        Paused => "paused",
        /// Finished normally.
        Completed => "completed",
        /// Finished with a fatal error.
        Error => "error",
    }
}

text_enum! {
    /// Message author role within a session transcript.
    MessageRole {
        /// Inbound user message.
        User => "user",
        /// Model-produced message.
        Assistant => "assistant",
        /// Injected system message.
        System => "system",
        /// Tool invocation record.
        Tool => "tool",
    }
}

text_enum! {
    /// Agent role tag for cross-agent visibility.
    AgentRole {
        /// Code-generation agent.
        Code => "code",
        /// Terminal agent.
        Terminal => "terminal",
    }
}

text_enum! {
    /// Kind of a durable context artifact.
    ContextItemType {
        /// File snapshot keyed by path.
        File => "file",
        /// Captured command output keyed by command.
        TerminalOutput => "terminal_output",
        /// Error report.
        Error => "error",
        /// Environment variable.
        EnvVar => "env_var",
        /// Git commit reference.
        GitCommit => "git_commit",
        /// Anything else.
        Custom => "custom",
    }
}

text_enum! {
    /// Job lifecycle status.
    JobStatus {
        /// Created, not yet running.
        Pending => "pending",
        /// In progress.
        Running => "running",
        /// Finished successfully.
        Completed => "completed",
        /// Finished with an error.
        Error => "error",
        /// Cancelled before completion.
        Cancelled => "cancelled",
    }
}

impl JobStatus {
    /// Whether this status is terminal (no further transitions).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Cancelled)
    }

    /// Whether `self → next` is a legal transition.
    ///
    /// `pending → running → {completed | error | cancelled}`, and any
    /// non-terminal state may jump straight to `cancelled`. A running job
    /// may re-report `running` (progress updates).
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (Self::Pending | Self::Running, Self::Running) => true,
            (Self::Running, Self::Completed | Self::Error) => true,
            (_, Self::Cancelled) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_storage_strings() {
        for ty in [
            SessionType::Code,
            SessionType::Terminal,
            SessionType::Hybrid,
        ] {
            assert_eq!(ty.as_str().parse::<SessionType>().unwrap(), ty);
        }
        for st in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Error,
            JobStatus::Cancelled,
        ] {
            assert_eq!(st.as_str().parse::<JobStatus>().unwrap(), st);
        }
    }

    #[test]
    fn unknown_string_rejected() {
        let err = "bogus".parse::<MessageRole>().unwrap_err();
        assert_eq!(err.kind, "MessageRole");
        assert_eq!(err.value, "bogus");
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&ContextItemType::TerminalOutput).unwrap();
        assert_eq!(json, "\"terminal_output\"");
    }

    #[test]
    fn job_transitions() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Cancelled));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Error));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Cancelled));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Running));

        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Running));
        assert!(!JobStatus::Cancelled.can_transition_to(JobStatus::Cancelled));
    }
}
