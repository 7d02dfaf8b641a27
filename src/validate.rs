//! Business validation of a single order record
//!
//! Checks run in a fixed order and the first failure wins, so a record
//! failing several rules always reports the same reason. The in-run
//! duplicate check is the only one with a side effect: the first sight of
//! a key claims it, whatever happens to that record afterwards.

use crate::config::PipelineConfig;
use crate::order::OrderRecord;
use crate::reference::ReferenceStore;
use crate::registry::IdempotencyRegistry;
use chrono::NaiveDate;
use std::collections::HashSet;

pub const DUPLICATE_IN_RUN: &str = "duplicate_in_run";
pub const AMOUNT_INVALID: &str = "amount_invalid";
pub const AMOUNT_FORMAT_INVALID: &str = "amount_format_invalid";
pub const CURRENCY_INVALID: &str = "currency_invalid";
pub const EMAIL_INVALID: &str = "email_invalid";
pub const CUSTOMER_INACTIVE: &str = "customer_inactive";
pub const DATE_FORMAT_INVALID: &str = "date_format_invalid";
pub const DATE_WINDOW_EXCEEDED: &str = "date_window_exceeded";

/// Validation result for one record
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Passed every check; carries the parsed amount for the statistics
    Valid { amount: f64 },
    /// Key was submitted by a previous run; skip without resubmitting
    AlreadyProcessed,
    /// Failed a business rule
    Rejected(&'static str),
}

pub fn validate(
    record: &OrderRecord,
    store: &ReferenceStore,
    config: &PipelineConfig,
    today: NaiveDate,
    seen: &mut HashSet<(String, String)>,
    registry: &IdempotencyRegistry,
) -> Verdict {
    if !seen.insert(record.key()) {
        return Verdict::Rejected(DUPLICATE_IN_RUN);
    }

    if registry.contains(&record.order_id, &record.business_date) {
        return Verdict::AlreadyProcessed;
    }

    let amount = match record.amount.parse::<f64>() {
        Ok(amount) => amount,
        Err(_) => return Verdict::Rejected(AMOUNT_FORMAT_INVALID),
    };
    if !amount.is_finite() || amount <= 0.0 {
        return Verdict::Rejected(AMOUNT_INVALID);
    }

    if !config.allowed_currencies.contains(&record.currency) {
        return Verdict::Rejected(CURRENCY_INVALID);
    }

    let domain = record.email.rsplit('@').next().unwrap_or("");
    if !record.email.contains('@') || !domain.contains('.') {
        return Verdict::Rejected(EMAIL_INVALID);
    }

    if !store.is_active(&record.customer_id) {
        return Verdict::Rejected(CUSTOMER_INACTIVE);
    }

    match NaiveDate::parse_from_str(&record.business_date, "%Y-%m-%d") {
        Ok(date) => {
            let delta = (date - today).num_days().abs();
            if delta > config.business_date_window_days {
                return Verdict::Rejected(DATE_WINDOW_EXCEEDED);
            }
        }
        Err(_) => return Verdict::Rejected(DATE_FORMAT_INVALID),
    }

    Verdict::Valid { amount }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config() -> PipelineConfig {
        PipelineConfig {
            api_host: "127.0.0.1".to_string(),
            api_port: 8080,
            retry_attempts: 2,
            retry_backoff_ms: 100,
            allowed_currencies: vec!["USD".to_string(), "EUR".to_string()],
            business_date_window_days: 7,
            report_decimal_places: 2,
        }
    }

    fn store() -> ReferenceStore {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"CustomerID,Status\nC1,Active\nC2,Inactive\n")
            .unwrap();
        ReferenceStore::load(file.path()).unwrap()
    }

    fn registry() -> (tempfile::TempDir, IdempotencyRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let registry = IdempotencyRegistry::load_or_create(&dir.path().join("reg.json")).unwrap();
        (dir, registry)
    }

    fn record() -> OrderRecord {
        OrderRecord {
            order_id: "A1".to_string(),
            business_date: "2024-06-10".to_string(),
            amount: "10.00".to_string(),
            currency: "USD".to_string(),
            email: "buyer@example.com".to_string(),
            customer_id: "C1".to_string(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn check(record: &OrderRecord) -> Verdict {
        let (_dir, registry) = registry();
        let mut seen = HashSet::new();
        validate(record, &store(), &config(), today(), &mut seen, &registry)
    }

    #[test]
    fn valid_record_passes() {
        assert_eq!(check(&record()), Verdict::Valid { amount: 10.0 });
    }

    #[test]
    fn duplicate_in_run_wins_over_everything() {
        let (_dir, registry) = registry();
        let mut seen = HashSet::new();
        let first = record();
        validate(&first, &store(), &config(), today(), &mut seen, &registry);

        // Second occurrence is a duplicate even though it would also fail
        // the currency check
        let mut second = record();
        second.currency = "XXX".to_string();
        let verdict = validate(&second, &store(), &config(), today(), &mut seen, &registry);
        assert_eq!(verdict, Verdict::Rejected(DUPLICATE_IN_RUN));
    }

    #[test]
    fn duplicate_applies_even_when_first_occurrence_was_rejected() {
        let (_dir, registry) = registry();
        let mut seen = HashSet::new();
        let mut first = record();
        first.amount = "-5".to_string();
        let verdict = validate(&first, &store(), &config(), today(), &mut seen, &registry);
        assert_eq!(verdict, Verdict::Rejected(AMOUNT_INVALID));

        let verdict = validate(&record(), &store(), &config(), today(), &mut seen, &registry);
        assert_eq!(verdict, Verdict::Rejected(DUPLICATE_IN_RUN));
    }

    #[test]
    fn registered_key_is_already_processed() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry =
            IdempotencyRegistry::load_or_create(&dir.path().join("reg.json")).unwrap();
        registry.record("A1", "2024-06-10").unwrap();

        let mut seen = HashSet::new();
        let verdict = validate(&record(), &store(), &config(), today(), &mut seen, &registry);
        assert_eq!(verdict, Verdict::AlreadyProcessed);
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let mut r = record();
        r.amount = "-5".to_string();
        assert_eq!(check(&r), Verdict::Rejected(AMOUNT_INVALID));
        r.amount = "0".to_string();
        assert_eq!(check(&r), Verdict::Rejected(AMOUNT_INVALID));
    }

    #[test]
    fn unparsable_amount_is_a_format_error() {
        let mut r = record();
        r.amount = "ten dollars".to_string();
        assert_eq!(check(&r), Verdict::Rejected(AMOUNT_FORMAT_INVALID));
    }

    #[test]
    fn currency_outside_allowlist_is_rejected() {
        let mut r = record();
        r.currency = "GBP".to_string();
        assert_eq!(check(&r), Verdict::Rejected(CURRENCY_INVALID));
    }

    #[test]
    fn email_requires_at_and_dotted_domain() {
        let mut r = record();
        r.email = "buyer.example.com".to_string();
        assert_eq!(check(&r), Verdict::Rejected(EMAIL_INVALID));
        r.email = "buyer@localhost".to_string();
        assert_eq!(check(&r), Verdict::Rejected(EMAIL_INVALID));
        r.email = "a@b@example.com".to_string();
        assert_eq!(check(&r), Verdict::Valid { amount: 10.0 });
    }

    #[test]
    fn inactive_or_unknown_customer_is_rejected() {
        let mut r = record();
        r.customer_id = "C2".to_string();
        assert_eq!(check(&r), Verdict::Rejected(CUSTOMER_INACTIVE));
        r.customer_id = "C9".to_string();
        assert_eq!(check(&r), Verdict::Rejected(CUSTOMER_INACTIVE));
    }

    #[test]
    fn date_window_boundary_is_inclusive() {
        let mut r = record();
        r.business_date = "2024-06-17".to_string(); // exactly 7 days out
        assert_eq!(check(&r), Verdict::Valid { amount: 10.0 });
        r.business_date = "2024-06-18".to_string();
        assert_eq!(check(&r), Verdict::Rejected(DATE_WINDOW_EXCEEDED));
        r.business_date = "2024-06-03".to_string(); // 7 days in the past
        assert_eq!(check(&r), Verdict::Valid { amount: 10.0 });
    }

    #[test]
    fn malformed_date_is_a_format_error() {
        let mut r = record();
        r.business_date = "10/06/2024".to_string();
        assert_eq!(check(&r), Verdict::Rejected(DATE_FORMAT_INVALID));
    }

    #[test]
    fn first_failing_check_wins() {
        // Invalid currency and invalid email together report the currency,
        // which comes first in the chain
        let mut r = record();
        r.currency = "XXX".to_string();
        r.email = "nope".to_string();
        assert_eq!(check(&r), Verdict::Rejected(CURRENCY_INVALID));
    }
}
