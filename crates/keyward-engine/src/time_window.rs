//! Validity bounds from `--start` / `--expiry` specifications.
//!
//! Accepted forms: `0` (no bound), `YYYY-MM-DD` (UTC midnight), RFC 3339,
//! or a relative `<n><unit>` offset from now with unit one of
//! `s m h d w M y`.

use chrono::{DateTime, Months, NaiveDate, TimeDelta, Utc};
use keyward_core::claims::{ClaimBody, Claims};

use crate::error::{ActionError, ActionResult};
use crate::prompt::{PromptError, Prompter};

/// Raw time inputs of one invocation. `None` means "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeParams {
    pub start: Option<String>,
    pub expiry: Option<String>,
}

/// Resolved bounds as unix seconds.
///
/// A bound with its `*_changed` flag set and a `None` value was explicitly
/// cleared with `0`; an unchanged bound leaves the claim alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub not_before: Option<i64>,
    pub expires: Option<i64>,
    pub start_changed: bool,
    pub expiry_changed: bool,
}

impl TimeParams {
    pub fn is_start_changed(&self) -> bool {
        self.start.is_some()
    }

    pub fn is_expiry_changed(&self) -> bool {
        self.expiry.is_some()
    }

    pub fn resolve(&self, now: DateTime<Utc>) -> ActionResult<TimeWindow> {
        let not_before = match &self.start {
            Some(spec) => parse_time_spec(spec, now)?,
            None => None,
        };
        let expires = match &self.expiry {
            Some(spec) => parse_time_spec(spec, now)?,
            None => None,
        };
        let window = TimeWindow {
            not_before: not_before.map(|t| t.timestamp()),
            expires: expires.map(|t| t.timestamp()),
            start_changed: self.is_start_changed(),
            expiry_changed: self.is_expiry_changed(),
        };
        window.check_order(None, None)?;
        Ok(window)
    }

    /// Prompt for both bounds, offering the current values as defaults.
    pub fn edit(&mut self, prompter: &dyn Prompter) -> Result<(), PromptError> {
        let now = Utc::now();
        let check = |value: &str| {
            parse_time_spec(value, now)
                .map(|_| ())
                .map_err(|e| e.to_string())
        };
        let start = prompter.input(
            "valid from ('0' is always, YYYY-MM-DD, RFC 3339 or relative like 1d)",
            self.start.as_deref().unwrap_or("0"),
            &check,
        )?;
        let expiry = prompter.input(
            "valid until ('0' is always, YYYY-MM-DD, RFC 3339 or relative like 2w)",
            self.expiry.as_deref().unwrap_or("0"),
            &check,
        )?;
        self.start = Some(start);
        self.expiry = Some(expiry);
        Ok(())
    }
}

impl TimeWindow {
    /// Fail if the bounds, combined with a claim's current ones, are inverted.
    pub fn check_order(
        &self,
        current_nbf: Option<i64>,
        current_exp: Option<i64>,
    ) -> ActionResult<()> {
        let nbf = if self.start_changed { self.not_before } else { current_nbf };
        let exp = if self.expiry_changed { self.expires } else { current_exp };
        if let (Some(nbf), Some(exp)) = (nbf, exp) {
            if exp < nbf {
                return Err(ActionError::TimeRange(format!(
                    "expiry {} is before start {}",
                    fmt_ts(exp),
                    fmt_ts(nbf)
                )));
            }
        }
        Ok(())
    }

    /// Write the explicitly changed bounds into a claim.
    pub fn apply<B: ClaimBody>(&self, claims: &mut Claims<B>) {
        if self.start_changed {
            claims.nbf = self.not_before;
        }
        if self.expiry_changed {
            claims.exp = self.expires;
        }
    }
}

fn fmt_ts(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

/// Parse one time specification. `Ok(None)` is the explicit "no bound".
pub fn parse_time_spec(spec: &str, now: DateTime<Utc>) -> ActionResult<Option<DateTime<Utc>>> {
    let spec = spec.trim();
    let invalid = |why: &str| ActionError::TimeRange(format!("invalid time {spec:?}: {why}"));
    if spec == "0" {
        return Ok(None);
    }
    if spec.is_empty() {
        return Err(invalid("empty"));
    }
    if let Ok(date) = NaiveDate::parse_from_str(spec, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| invalid("out of range"))?;
        return Ok(Some(midnight.and_utc()));
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(spec) {
        return Ok(Some(t.with_timezone(&Utc)));
    }

    let (digits, unit) = spec.split_at(spec.len() - spec.chars().last().map_or(0, char::len_utf8));
    let n: u32 = digits
        .parse()
        .map_err(|_| invalid("expected 0, a date, RFC 3339, or <n><unit>"))?;
    let at = match unit {
        "M" => now.checked_add_months(Months::new(n)),
        "y" => n
            .checked_mul(12)
            .and_then(|months| now.checked_add_months(Months::new(months))),
        _ => {
            let secs = match unit {
                "s" => 1,
                "m" => 60,
                "h" => 3_600,
                "d" => 86_400,
                "w" => 604_800,
                _ => return Err(invalid("unknown unit, use one of s m h d w M y")),
            };
            TimeDelta::try_seconds(i64::from(n) * secs).and_then(|d| now.checked_add_signed(d))
        }
    };
    at.map(Some).ok_or_else(|| invalid("out of range"))
}
