use chrono::{DateTime, FixedOffset, Local};

use crate::error::{EvalError, EvalResult};

const NOW_OVERRIDE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";

/// The ambient flag surface consumed from outside the core: delimiter,
/// encoding, timezone, and the deterministic-clock override used by tests.
/// Constructed once per session and shared read-only across statements.
#[derive(Clone, Debug)]
pub struct Flags {
    pub delimiter: char,
    pub encoding: String,
    pub without_header: bool,
    pub timezone: FixedOffset,
    pub now_override: Option<DateTime<FixedOffset>>,
    pub strict: bool,
    pub quiet: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Flags {
            delimiter: ',',
            encoding: "UTF8".to_string(),
            without_header: false,
            timezone: *Local::now().offset(),
            now_override: None,
            strict: false,
            quiet: false,
        }
    }
}

impl Flags {
    pub fn builder() -> FlagsBuilder {
        FlagsBuilder::default()
    }

    /// The "current" instant for this session: the frozen override if one
    /// was configured, else the real wall clock. Read once per statement by
    /// the evaluator rather than from a global, per the concurrency model.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.now_override
            .unwrap_or_else(|| Local::now().with_timezone(&self.timezone))
    }
}

/// Builds a [`Flags`] value, parsing the `now`-override string format used
/// by deterministic tests (`YYYY-MM-DD HH:MM:SS.fffffffff`).
#[derive(Clone, Debug, Default)]
pub struct FlagsBuilder {
    flags: Flags,
}

impl FlagsBuilder {
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.flags.delimiter = delimiter;
        self
    }

    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.flags.encoding = encoding.into();
        self
    }

    pub fn without_header(mut self, without_header: bool) -> Self {
        self.flags.without_header = without_header;
        self
    }

    pub fn timezone(mut self, timezone: FixedOffset) -> Self {
        self.flags.timezone = timezone;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.flags.strict = strict;
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.flags.quiet = quiet;
        self
    }

    pub fn now_override(mut self, text: &str) -> EvalResult<Self> {
        let naive = chrono::NaiveDateTime::parse_from_str(text, NOW_OVERRIDE_FORMAT)
            .map_err(|e| EvalError::semantic(format!("invalid now-override: {}", e)))?;
        let zoned = naive
            .and_local_timezone(self.flags.timezone)
            .single()
            .ok_or_else(|| EvalError::semantic("now-override is ambiguous in this timezone"))?;
        self.flags.now_override = Some(zoned);
        Ok(self)
    }

    pub fn build(self) -> Flags {
        self.flags
    }
}

/// Per-session configuration threaded through evaluation: the resolved
/// flags plus whether a transaction is currently in abort mode (a
/// statement-level error leaves later statements in this session unrun
/// until `ROLLBACK`/`COMMIT`).
#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
    pub flags: Flags,
    pub in_transaction: bool,
}

impl SessionConfig {
    pub fn new(flags: Flags) -> Self {
        SessionConfig {
            flags,
            in_transaction: false,
        }
    }
}
