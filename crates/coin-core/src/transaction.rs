use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::error::CoinError;

/// A funding source, identified by the address whose coins may be spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub address: String,
}

/// A payment of `amount` (display scale) to `address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub address: String,
    pub amount: Amount,
}

/// Chain-agnostic description of a desired transfer.
///
/// Built with [`Transaction::builder`]. Fields are only changed afterwards by
/// the pipeline itself (a driver filling in a computed fee during packing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    fee: Option<Amount>,
    change: Option<String>,
}

impl Transaction {
    pub fn builder() -> TransactionBuilder {
        TransactionBuilder::default()
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// The fee in display scale, `None` until supplied by the caller or
    /// computed by a driver.
    pub fn fee(&self) -> Option<&Amount> {
        self.fee.as_ref()
    }

    pub fn change(&self) -> Option<&str> {
        self.change.as_deref()
    }

    /// Records the fee a driver computed while packing.
    pub fn set_fee(&mut self, fee: Amount) {
        self.fee = Some(fee);
    }
}

/// Fluent builder for [`Transaction`].
#[derive(Debug, Default)]
pub struct TransactionBuilder {
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    fee: Option<Amount>,
    change: Option<String>,
}

impl TransactionBuilder {
    /// Adds a funding address. Alias of [`TransactionBuilder::add_input`].
    pub fn from(self, address: impl Into<String>) -> Self {
        self.add_input(address)
    }

    pub fn add_input(mut self, address: impl Into<String>) -> Self {
        self.inputs.push(Input {
            address: address.into(),
        });
        self
    }

    /// Adds a payment. Alias of [`TransactionBuilder::add_output`].
    pub fn to(self, address: impl Into<String>, amount: Amount) -> Self {
        self.add_output(address, amount)
    }

    pub fn add_output(mut self, address: impl Into<String>, amount: Amount) -> Self {
        self.outputs.push(Output {
            address: address.into(),
            amount,
        });
        self
    }

    pub fn fee(mut self, fee: Amount) -> Self {
        self.fee = Some(fee);
        self
    }

    pub fn change(mut self, address: impl Into<String>) -> Self {
        self.change = Some(address.into());
        self
    }

    pub fn build(self) -> Result<Transaction, CoinError> {
        if self.outputs.is_empty() {
            return Err(CoinError::InvalidTransaction(
                "a transaction needs at least one output".into(),
            ));
        }

        Ok(Transaction {
            inputs: self.inputs,
            outputs: self.outputs,
            fee: self.fee,
            change: self.change,
        })
    }
}
