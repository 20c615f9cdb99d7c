use serde::{Deserialize, Serialize};

/// How long an activity entry is worth keeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Destructive changes; never trimmed.
    Critical,
    #[default]
    Important,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Important => "important",
        }
    }
}

/// Records that show up in the activity log.
pub trait Loggable: Serialize + Send + Sync {
    /// Prefix of the event name, e.g. `"user"` in `"user.deleted"`.
    fn entity_type() -> &'static str;

    fn subject_id(&self) -> i64;

    fn severity(&self) -> Severity {
        Severity::Important
    }

    fn severity_for_action(&self, action: &str) -> Severity {
        match action {
            "deleted" => Severity::Critical,
            "created" | "updated" => self.severity(),
            _ => Severity::Important,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Note {
        id: i64,
    }

    impl Loggable for Note {
        fn entity_type() -> &'static str {
            "note"
        }

        fn subject_id(&self) -> i64 {
            self.id
        }
    }

    #[test]
    fn deletes_are_critical() {
        let note = Note { id: 3 };
        assert_eq!(note.severity_for_action("deleted"), Severity::Critical);
        assert_eq!(note.severity_for_action("updated"), Severity::Important);
    }
}
