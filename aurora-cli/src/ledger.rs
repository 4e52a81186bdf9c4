//! Demonstration agent: per-account balances updated by keyed handlers.
//!
//! Deposits and withdrawals read a balance, wait (simulated I/O), then write it
//! back. Without per-account serialization concurrent updates would lose writes.

use aurora_core::{Agent, ConfigError, ExtractionError, Key, KeyBy, ReceiveOptions};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

pub type LedgerAgent = Agent<Value, Value>;

#[derive(Clone, Default)]
pub struct Ledger {
    balances: Arc<Mutex<BTreeMap<String, i64>>>,
    latency: Duration,
}

impl Ledger {
    pub fn new(latency: Duration) -> Self {
        Self {
            balances: Arc::default(),
            latency,
        }
    }

    /// Register the ledger's handlers on `agent`.
    pub fn register(&self, agent: &LedgerAgent) -> Result<(), ConfigError> {
        let ledger = self.clone();
        let _deposit = agent.mutex_receive(
            "account/deposit",
            ReceiveOptions::new()
                .key_by("account")
                .seq_by("seq")
                .priority(1)
                .source("credit an account"),
            move |payload: Value| {
                let ledger = ledger.clone();
                async move { ledger.deposit(payload).await }
            },
        )?;

        let ledger = self.clone();
        let _withdraw = agent.mutex_receive(
            "account/withdraw",
            ReceiveOptions::new()
                .key_by("account")
                .seq_by("seq")
                .priority(1)
                .source("debit an account, refusing overdrafts"),
            move |payload: Value| {
                let ledger = ledger.clone();
                async move { ledger.withdraw(payload).await }
            },
        )?;

        agent.mutex_receive(
            "session/touch",
            ReceiveOptions::new()
                .key_by(KeyBy::try_func(session_device))
                .priority([2, 0])
                .source("mark a device session as active"),
            touch,
        )?;

        Ok(())
    }

    /// Snapshot of every account balance.
    pub fn balances(&self) -> BTreeMap<String, i64> {
        self.lock().clone()
    }

    async fn deposit(&self, payload: Value) -> Result<Value, String> {
        let account = string_field(&payload, "account")?;
        let amount = amount(&payload)?;

        let current = self.balance(&account);
        self.simulate_latency().await;
        let updated = current + amount;
        self.set_balance(&account, updated);

        Ok(json!({ "account": account, "balance": updated }))
    }

    async fn withdraw(&self, payload: Value) -> Result<Value, String> {
        let account = string_field(&payload, "account")?;
        let amount = amount(&payload)?;

        let current = self.balance(&account);
        self.simulate_latency().await;
        if amount > current {
            return Err(format!(
                "insufficient funds in '{}': balance {}, requested {}",
                account, current, amount
            ));
        }
        let updated = current - amount;
        self.set_balance(&account, updated);

        Ok(json!({ "account": account, "balance": updated }))
    }

    fn balance(&self, account: &str) -> i64 {
        self.lock().get(account).copied().unwrap_or(0)
    }

    fn set_balance(&self, account: &str, balance: i64) {
        self.lock().insert(account.to_string(), balance);
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, i64>> {
        self.balances.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn touch(payload: Value) -> Result<Value, String> {
    Ok(json!({
        "session": payload.get("session"),
        "device": payload.get("device"),
        "active": true,
    }))
}

fn session_device(payload: &Value) -> Result<Key, ExtractionError> {
    let field = |name: &str| {
        payload
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ExtractionError::missing_field(name))
    };
    Ok(Key::from((field("session")?, field("device")?)))
}

fn string_field(payload: &Value, name: &str) -> Result<String, String> {
    payload
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("'{}' must be a string", name))
}

fn amount(payload: &Value) -> Result<i64, String> {
    match payload.get("amount").and_then(Value::as_i64) {
        Some(amount) if amount > 0 => Ok(amount),
        _ => Err("'amount' must be a positive integer".to_string()),
    }
}
