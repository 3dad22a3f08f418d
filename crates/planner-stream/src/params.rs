use crate::errors::StreamError;

/// Channel open parameters for one run.
///
/// Supplied once to `RunHandle::start` and immutable for the lifetime of the run.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunParameters {
    profile_id: String,
    subject: String,
    fast_mode: bool,
}

impl RunParameters {
    /// Creates parameters for a thorough (non-fast) plan.
    pub fn new(profile_id: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            profile_id: profile_id.into(),
            subject: subject.into(),
            fast_mode: false,
        }
    }

    /// Prefers a faster, shallower plan.
    pub fn fast_mode(mut self, fast: bool) -> Self {
        self.fast_mode = fast;
        self
    }

    /// Identifier of the profile that owns the plan.
    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    /// Free-text technology the plan targets.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn is_fast(&self) -> bool {
        self.fast_mode
    }

    pub(crate) fn validate(&self) -> Result<(), StreamError> {
        if self.profile_id.trim().is_empty() {
            return Err(StreamError::Validation(
                "profile id must not be empty".into(),
            ));
        }
        if self.subject.trim().is_empty() {
            return Err(StreamError::Validation("subject must not be empty".into()));
        }
        Ok(())
    }

    /// Query parameters sent when opening the channel.
    pub fn query_pairs(&self) -> [(&'static str, String); 3] {
        [
            ("profileId", self.profile_id.clone()),
            ("technology", self.subject.trim().to_string()),
            ("fast", self.fast_mode.to_string()),
        ]
    }
}
