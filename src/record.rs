//! The check record extracted from an image, and its fixed field layout.

use std::{fmt, str::FromStr};

use schemars::JsonSchema;

use crate::prelude::*;

/// Information extracted from an image of a bank check.
///
/// Every field is free-form text. Nothing here is parsed or format-checked,
/// including the date and the amounts.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CheckRecord {
    /// The name of the payee on the check.
    pub payee: String,

    /// The amount of the check, written in digits.
    pub amount_numerical: String,

    /// The amount of the check in words. Compute this from the numerical
    /// amount instead of reading it from the image.
    pub amount_words: String,

    /// The date on the check, in dd/mm/yyyy format.
    pub date: String,

    /// The name of the bank.
    pub bank_name: String,

    /// The IFSC code of the bank branch.
    pub ifsc_code: String,

    /// The account number on the check.
    pub account_number: String,

    /// The cheque number, usually printed in the MICR line.
    pub check_number: String,

    /// The name of the person or entity who issued and signed the check.
    pub issuer_name: String,
}

impl CheckRecord {
    /// Get the value of a field.
    pub fn get(&self, field: CheckField) -> &str {
        match field {
            CheckField::Payee => &self.payee,
            CheckField::AmountNumerical => &self.amount_numerical,
            CheckField::AmountWords => &self.amount_words,
            CheckField::Date => &self.date,
            CheckField::BankName => &self.bank_name,
            CheckField::IfscCode => &self.ifsc_code,
            CheckField::AccountNumber => &self.account_number,
            CheckField::CheckNumber => &self.check_number,
            CheckField::IssuerName => &self.issuer_name,
        }
    }

    /// Replace the value of a field.
    pub fn set(&mut self, field: CheckField, value: impl Into<String>) {
        let slot = match field {
            CheckField::Payee => &mut self.payee,
            CheckField::AmountNumerical => &mut self.amount_numerical,
            CheckField::AmountWords => &mut self.amount_words,
            CheckField::Date => &mut self.date,
            CheckField::BankName => &mut self.bank_name,
            CheckField::IfscCode => &mut self.ifsc_code,
            CheckField::AccountNumber => &mut self.account_number,
            CheckField::CheckNumber => &mut self.check_number,
            CheckField::IssuerName => &mut self.issuer_name,
        };
        *slot = value.into();
    }

    /// Serialize as `Label: value` lines, in display order.
    pub fn to_labeled_text(&self) -> String {
        CheckField::ALL
            .iter()
            .map(|&field| format!("{}: {}", field.label(), self.get(field)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One of the fields of a [`CheckRecord`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CheckField {
    Payee,
    AmountNumerical,
    AmountWords,
    Date,
    BankName,
    IfscCode,
    AccountNumber,
    CheckNumber,
    IssuerName,
}

impl CheckField {
    /// All fields, in the order we display and copy them.
    pub const ALL: [CheckField; 9] = [
        CheckField::Payee,
        CheckField::AmountNumerical,
        CheckField::AmountWords,
        CheckField::Date,
        CheckField::BankName,
        CheckField::IfscCode,
        CheckField::AccountNumber,
        CheckField::CheckNumber,
        CheckField::IssuerName,
    ];

    /// The JSON key for this field.
    pub fn key(self) -> &'static str {
        match self {
            CheckField::Payee => "payee",
            CheckField::AmountNumerical => "amountNumerical",
            CheckField::AmountWords => "amountWords",
            CheckField::Date => "date",
            CheckField::BankName => "bankName",
            CheckField::IfscCode => "ifscCode",
            CheckField::AccountNumber => "accountNumber",
            CheckField::CheckNumber => "checkNumber",
            CheckField::IssuerName => "issuerName",
        }
    }

    /// The human-readable label for this field.
    pub fn label(self) -> &'static str {
        match self {
            CheckField::Payee => "Payee",
            CheckField::AmountNumerical => "Amount Numerical",
            CheckField::AmountWords => "Amount Words",
            CheckField::Date => "Date",
            CheckField::BankName => "Bank Name",
            CheckField::IfscCode => "IFSC Code",
            CheckField::AccountNumber => "Account Number",
            CheckField::CheckNumber => "Cheque Number",
            CheckField::IssuerName => "Issuer Name",
        }
    }
}

impl fmt::Display for CheckField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CheckField {
    type Err = anyhow::Error;

    /// Accepts `amountWords`, `amount_words`, or `Amount Words`, ignoring case.
    fn from_str(s: &str) -> Result<Self> {
        let normalize = |s: &str| {
            s.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        };
        let wanted = normalize(s);
        CheckField::ALL
            .iter()
            .copied()
            .find(|field| {
                normalize(field.key()) == wanted || normalize(field.label()) == wanted
            })
            .ok_or_else(|| anyhow!("unknown check field: {:?}", s))
    }
}
