//! # OtpStore — one-time passcode lifecycle
//!
//! Manages the transient proof-of-email-ownership records behind signup
//! verification. Records live in the keyed store under
//! `otp_verification/<normalized email>` and expire five minutes after
//! issuance.
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`issue`](OtpStore::issue) | Generate a uniform 6-digit code and persist it, overwriting any record for the same key. |
//! | [`fetch`](OtpStore::fetch) | Read the record back, `None` if absent. |
//! | [`verify`](OtpStore::verify) | Check a candidate code against the record; see [`VerifyOutcome`]. |
//! | [`consume`](OtpStore::consume) | Delete the record. Idempotent. |
//!
//! `verify` deliberately leaves a valid record in place: the controller only
//! consumes it after the dependent account-creation step succeeds, so a
//! transient provider failure does not destroy the proof. Expired records are
//! deleted lazily when a verify attempt notices them; records from abandoned
//! signups that never see another verify stay in the store (a server-side
//! TTL sweep would be needed to reap them, which a client core cannot do).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use store::{KeyedStore, StoreError};

use crate::clock::Clock;

/// Validity window of an issued code.
pub const OTP_TTL_MS: i64 = 5 * 60 * 1000;

/// Store namespace for passcode records.
const OTP_NAMESPACE: &str = "otp_verification";

/// Persisted passcode record. Field names are the wire format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OtpRecord {
    /// 6-digit numeric code, `"000000"` through `"999999"`.
    pub otp: String,
    /// Issuance time, epoch ms.
    pub timestamp: i64,
    /// The address the code was issued for, unnormalized.
    pub email: String,
    /// `timestamp + OTP_TTL_MS`.
    pub expires: i64,
}

/// Result of checking a candidate code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Code matches and is within the window. The record is left in place
    /// for the caller to consume once its dependent work succeeds.
    Valid,
    /// The window has passed. The record was deleted as a side effect.
    Expired,
    /// Code does not match. The record is retained so the user can retry.
    Mismatch,
    /// No record exists for this email.
    NotFound,
}

/// Build the store key for an email address.
///
/// Characters illegal in store keys (`.` `#` `$` `[` `]`) are replaced with
/// `_`. Two addresses differing only in those characters therefore collide
/// on the same key; the record's `email` field keeps the raw address, so a
/// collision behaves like an overwrite by a second client, not data mixing.
pub fn otp_key(email: &str) -> String {
    let escaped: String = email
        .chars()
        .map(|c| match c {
            '.' | '#' | '$' | '[' | ']' => '_',
            other => other,
        })
        .collect();
    format!("{}/{}", OTP_NAMESPACE, escaped)
}

/// Passcode record lifecycle over a [`KeyedStore`].
pub struct OtpStore<S: KeyedStore, C: Clock> {
    store: S,
    clock: C,
    rng: Mutex<StdRng>,
}

impl<S: KeyedStore, C: Clock> OtpStore<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self::with_rng(store, clock, StdRng::from_entropy())
    }

    /// Construct with a caller-supplied RNG, so tests can seed the codes.
    pub fn with_rng(store: S, clock: C, rng: StdRng) -> Self {
        Self {
            store,
            clock,
            rng: Mutex::new(rng),
        }
    }

    /// Issue a fresh code for `email`, overwriting any existing record at
    /// the same key.
    pub async fn issue(&self, email: &str) -> Result<OtpRecord, StoreError> {
        let code: u32 = self.rng.lock().unwrap().gen_range(0..1_000_000);
        let now = self.clock.now_ms();
        let record = OtpRecord {
            otp: format!("{:06}", code),
            timestamp: now,
            email: email.to_string(),
            expires: now + OTP_TTL_MS,
        };
        self.store
            .write(&otp_key(email), serde_json::to_value(&record)?)
            .await?;
        Ok(record)
    }

    /// Read the record for `email`.
    pub async fn fetch(&self, email: &str) -> Result<Option<OtpRecord>, StoreError> {
        match self.store.read(&otp_key(email)).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Delete the record for `email`. A no-op if it is already gone.
    pub async fn consume(&self, email: &str) -> Result<(), StoreError> {
        self.store.delete(&otp_key(email)).await
    }

    /// Check `candidate` against the stored record.
    ///
    /// Expiry is strict: a code checked at exactly `expires` is still valid.
    pub async fn verify(
        &self,
        email: &str,
        candidate: &str,
    ) -> Result<VerifyOutcome, StoreError> {
        let Some(record) = self.fetch(email).await? else {
            return Ok(VerifyOutcome::NotFound);
        };
        if self.clock.now_ms() > record.expires {
            // Lazy cleanup: an expired record is useless to everyone.
            self.consume(email).await?;
            return Ok(VerifyOutcome::Expired);
        }
        if candidate != record.otp {
            return Ok(VerifyOutcome::Mismatch);
        }
        Ok(VerifyOutcome::Valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;
    use store::MemoryStore;

    /// Clock whose value tests can set directly.
    #[derive(Clone, Default)]
    struct TestClock(Arc<AtomicI64>);

    impl TestClock {
        fn set(&self, ms: i64) {
            self.0.store(ms, Ordering::SeqCst);
        }
    }

    impl Clock for TestClock {
        fn now_ms(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn seeded(store: MemoryStore, clock: TestClock) -> OtpStore<MemoryStore, TestClock> {
        OtpStore::with_rng(store, clock, StdRng::seed_from_u64(42))
    }

    #[test]
    fn test_key_normalization() {
        assert_eq!(otp_key("a@b.com"), "otp_verification/a@b_com");
        assert_eq!(otp_key("x#y$[z]"), "otp_verification/x_y__z_");
        // Documented collision: addresses differing only in escaped
        // characters map to the same key.
        assert_eq!(otp_key("a.b@c.com"), otp_key("a_b@c_com"));
    }

    #[tokio::test]
    async fn test_issue_and_fetch() {
        let clock = TestClock::default();
        clock.set(1_000);
        let otp = seeded(MemoryStore::new(), clock.clone());

        let issued = otp.issue("a@b.com").await.unwrap();
        assert_eq!(issued.otp.len(), 6);
        assert!(issued.otp.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(issued.timestamp, 1_000);
        assert_eq!(issued.expires, 1_000 + OTP_TTL_MS);
        assert_eq!(issued.email, "a@b.com");

        let fetched = otp.fetch("a@b.com").await.unwrap().unwrap();
        assert_eq!(fetched, issued);

        assert!(otp.fetch("other@b.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_issue_overwrites_previous_record() {
        let clock = TestClock::default();
        let otp = seeded(MemoryStore::new(), clock.clone());

        let first = otp.issue("a@b.com").await.unwrap();
        let mut second = otp.issue("a@b.com").await.unwrap();
        while second.otp == first.otp {
            second = otp.issue("a@b.com").await.unwrap();
        }

        // Only the later code verifies.
        assert_eq!(
            otp.verify("a@b.com", &first.otp).await.unwrap(),
            VerifyOutcome::Mismatch
        );
        assert_eq!(
            otp.verify("a@b.com", &second.otp).await.unwrap(),
            VerifyOutcome::Valid
        );
    }

    #[tokio::test]
    async fn test_verify_valid_then_consume_then_not_found() {
        let clock = TestClock::default();
        let otp = seeded(MemoryStore::new(), clock.clone());

        let issued = otp.issue("a@b.com").await.unwrap();
        assert_eq!(
            otp.verify("a@b.com", &issued.otp).await.unwrap(),
            VerifyOutcome::Valid
        );
        // Valid leaves the record in place until the caller consumes it.
        assert!(otp.fetch("a@b.com").await.unwrap().is_some());

        otp.consume("a@b.com").await.unwrap();
        assert_eq!(
            otp.verify("a@b.com", &issued.otp).await.unwrap(),
            VerifyOutcome::NotFound
        );

        // Idempotent: a second consume is a no-op.
        otp.consume("a@b.com").await.unwrap();
    }

    #[tokio::test]
    async fn test_mismatch_retains_record() {
        let clock = TestClock::default();
        let otp = seeded(MemoryStore::new(), clock.clone());

        let issued = otp.issue("a@b.com").await.unwrap();
        assert_eq!(
            otp.verify("a@b.com", "000001").await.unwrap(),
            VerifyOutcome::Mismatch
        );
        // Retry with the right code still works.
        assert_eq!(
            otp.verify("a@b.com", &issued.otp).await.unwrap(),
            VerifyOutcome::Valid
        );
    }

    #[tokio::test]
    async fn test_expiry_boundary() {
        let clock = TestClock::default();
        clock.set(0);
        let otp = seeded(MemoryStore::new(), clock.clone());
        let issued = otp.issue("x@y.com").await.unwrap();

        // At exactly `expires` the code is still valid (strict `>`).
        clock.set(issued.expires);
        assert_eq!(
            otp.verify("x@y.com", &issued.otp).await.unwrap(),
            VerifyOutcome::Valid
        );

        // One millisecond later it is expired and the record is deleted.
        clock.set(issued.expires + 1);
        assert_eq!(
            otp.verify("x@y.com", &issued.otp).await.unwrap(),
            VerifyOutcome::Expired
        );
        assert!(otp.fetch("x@y.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_two_clients_last_write_wins() {
        // Two OtpStores over one backing store simulate two tabs.
        let backing = MemoryStore::new();
        let clock = TestClock::default();
        let tab_a = OtpStore::with_rng(backing.clone(), clock.clone(), StdRng::seed_from_u64(1));
        let tab_b = OtpStore::with_rng(backing, clock, StdRng::seed_from_u64(2));

        let first = tab_a.issue("z@w.com").await.unwrap();
        let mut second = tab_b.issue("z@w.com").await.unwrap();
        while second.otp == first.otp {
            second = tab_b.issue("z@w.com").await.unwrap();
        }

        // Exactly one record survives: the later write.
        assert_eq!(
            tab_a.verify("z@w.com", &first.otp).await.unwrap(),
            VerifyOutcome::Mismatch
        );
        assert_eq!(
            tab_a.verify("z@w.com", &second.otp).await.unwrap(),
            VerifyOutcome::Valid
        );
    }
}
