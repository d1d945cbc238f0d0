//! Observable events
//!
//! Events are explicit and typed; each one carries the severity it is
//! logged at.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Schemas
    /// A schema was defined
    SchemaDefined,
    /// A registry was resolved and frozen
    RegistryResolved,
    /// Schema files were loaded from a directory
    SchemasLoaded,

    // Records
    /// Input validated into a record
    RecordValidated,
    /// Input rejected with issues
    RecordRejected,
    /// Assignment to a record rejected
    AssignmentRejected,

    // Settings and configuration
    /// Settings loaded from the environment
    SettingsLoaded,
    /// CLI configuration loaded
    ConfigLoaded,
    /// CLI command failed
    CommandFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::SchemaDefined => "SCHEMA_DEFINED",
            Event::RegistryResolved => "REGISTRY_RESOLVED",
            Event::SchemasLoaded => "SCHEMAS_LOADED",
            Event::RecordValidated => "RECORD_VALIDATED",
            Event::RecordRejected => "RECORD_REJECTED",
            Event::AssignmentRejected => "ASSIGNMENT_REJECTED",
            Event::SettingsLoaded => "SETTINGS_LOADED",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::CommandFailed => "COMMAND_FAILED",
        }
    }

    /// Severity this event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::SchemaDefined
            | Event::RecordValidated
            | Event::RecordRejected
            | Event::AssignmentRejected => Severity::Trace,
            Event::RegistryResolved
            | Event::SchemasLoaded
            | Event::SettingsLoaded
            | Event::ConfigLoaded => Severity::Info,
            Event::CommandFailed => Severity::Error,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::SchemaDefined,
            Event::RegistryResolved,
            Event::SchemasLoaded,
            Event::RecordValidated,
            Event::RecordRejected,
            Event::AssignmentRejected,
            Event::SettingsLoaded,
            Event::ConfigLoaded,
            Event::CommandFailed,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_per_record_events_are_trace() {
        assert_eq!(Event::RecordValidated.severity(), Severity::Trace);
        assert_eq!(Event::RecordRejected.severity(), Severity::Trace);
        assert_eq!(Event::SchemasLoaded.severity(), Severity::Info);
        assert_eq!(Event::CommandFailed.severity(), Severity::Error);
    }

    #[test]
    fn test_event_display() {
        assert_eq!(format!("{}", Event::SchemaDefined), "SCHEMA_DEFINED");
    }
}
