use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::marketplace::validation::{formatted, Pattern, ValidationError};

/// Raw wallet fields as entered by the account holder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletDraft {
    pub bsb: String,
    pub account_number: String,
    #[serde(default)]
    pub abn: Option<String>,
    #[serde(default)]
    pub card_number: Option<String>,
    #[serde(default)]
    pub expiry: Option<String>,
    #[serde(default)]
    pub security_code: Option<String>,
}

/// Card credentials; the number, expiry, and security code only exist together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDetails {
    number: String,
    expiry: String,
    security_code: String,
}

impl CardDetails {
    pub fn new(
        number: impl Into<String>,
        expiry: impl Into<String>,
        security_code: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let number = number.into();
        let expiry = expiry.into();
        let security_code = security_code.into();
        formatted("card_number", &number, Pattern::CardNumber)?;
        formatted("expiry", &expiry, Pattern::CardExpiry)?;
        formatted("security_code", &security_code, Pattern::SecurityCode)?;
        Ok(Self {
            number,
            expiry,
            security_code,
        })
    }

    pub fn last_four(&self) -> &str {
        let cut = self.number.len().saturating_sub(4);
        self.number.get(cut..).unwrap_or_default()
    }

    pub fn expiry(&self) -> &str {
        &self.expiry
    }

    /// True once the card's expiry month has fully elapsed.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        let mut parts = self.expiry.split('/');
        let month = parts.next().and_then(|raw| raw.parse::<u32>().ok());
        let year = parts.next().and_then(|raw| raw.parse::<i32>().ok());
        match (month, year) {
            (Some(month), Some(year)) => {
                let year = 2000 + year;
                (today.year(), today.month()) > (year, month)
            }
            _ => true,
        }
    }
}

/// Stored payment credentials used to settle transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wallet {
    bsb: String,
    account_number: String,
    abn: Option<String>,
    card: Option<CardDetails>,
}

impl Wallet {
    pub fn new(draft: WalletDraft) -> Result<Self, ValidationError> {
        let WalletDraft {
            bsb,
            account_number,
            abn,
            card_number,
            expiry,
            security_code,
        } = draft;

        formatted("bsb", &bsb, Pattern::Bsb)?;
        formatted("account_number", &account_number, Pattern::BankAccount)?;
        let abn = normalize_optional(abn);
        if let Some(abn) = &abn {
            formatted("abn", abn, Pattern::Abn)?;
        }

        let card = match (
            normalize_optional(card_number),
            normalize_optional(expiry),
            normalize_optional(security_code),
        ) {
            (None, None, None) => None,
            (Some(number), Some(expiry), Some(code)) => {
                Some(CardDetails::new(number, expiry, code)?)
            }
            _ => {
                return Err(ValidationError::Format {
                    field: "card",
                    rule: "supply card number, expiry, and security code together",
                })
            }
        };

        Ok(Self {
            bsb,
            account_number,
            abn,
            card,
        })
    }

    pub fn bsb(&self) -> &str {
        &self.bsb
    }

    pub fn account_number(&self) -> &str {
        &self.account_number
    }

    pub fn abn(&self) -> Option<&str> {
        self.abn.as_deref()
    }

    pub fn card(&self) -> Option<&CardDetails> {
        self.card.as_ref()
    }

    pub fn set_bsb(&mut self, bsb: impl Into<String>) -> Result<(), ValidationError> {
        let bsb = bsb.into();
        formatted("bsb", &bsb, Pattern::Bsb)?;
        self.bsb = bsb;
        Ok(())
    }

    pub fn set_account_number(&mut self, account: impl Into<String>) -> Result<(), ValidationError> {
        let account = account.into();
        formatted("account_number", &account, Pattern::BankAccount)?;
        self.account_number = account;
        Ok(())
    }

    pub fn set_abn(&mut self, abn: Option<String>) -> Result<(), ValidationError> {
        let abn = normalize_optional(abn);
        if let Some(abn) = &abn {
            formatted("abn", abn, Pattern::Abn)?;
        }
        self.abn = abn;
        Ok(())
    }

    /// Compare a pin against the stored card security code.
    pub fn verify(&self, pin: &str) -> bool {
        self.card
            .as_ref()
            .is_some_and(|card| card.security_code == pin.trim())
    }

    pub fn view(&self) -> WalletView {
        WalletView {
            bsb: self.bsb.clone(),
            account_number_last_digits: last_digits(&self.account_number, 3),
            abn: self.abn.clone(),
            card_last_four: self.card.as_ref().map(|card| card.last_four().to_string()),
            card_expiry: self.card.as_ref().map(|card| card.expiry.clone()),
        }
    }
}

/// Outward wallet representation with account and card numbers masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletView {
    pub bsb: String,
    pub account_number_last_digits: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_last_four: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_expiry: Option<String>,
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.filter(|raw| !raw.trim().is_empty())
}

fn last_digits(value: &str, count: usize) -> String {
    let cut = value.len().saturating_sub(count);
    value.get(cut..).unwrap_or_default().to_string()
}
