use bitcoin::absolute::LockTime;
use bitcoin::amount::Denomination;
use bitcoin::ecdsa;
use bitcoin::hashes::Hash;
use bitcoin::script::{PushBytesBuf, ScriptBuf};
use bitcoin::secp256k1::{Message, Secp256k1, SecretKey};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{Amount, FeeRate, PublicKey, Sequence, Transaction, TxIn, TxOut, Witness};
use coin_core::Utxo;

use crate::address::parse_address;
use crate::error::BtcError;
use crate::network::BtcNetwork;
use crate::utxo::{self, LockingScript};

/// Change below this many satoshis is left to the miner instead of paid out.
pub const DUST_THRESHOLD_SAT: u64 = 2_730;

/// What to do when change is due but no change address was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangePolicy {
    /// Fail with [`BtcError::MissingChangeAddress`].
    Require,
    /// Leave the change output out. Used for the fee-estimation draft, whose
    /// fee is still unknown.
    Skip,
}

/// An unsigned transaction spending a fixed set of unspent outputs.
#[derive(Debug, Clone)]
pub struct DraftTx {
    /// The bitcoin transaction with empty unlocking scripts.
    pub tx: Transaction,
    /// The outputs being spent, in input order.
    pub prevouts: Vec<TxOut>,
    /// Value of the change output, if one was added.
    pub change_sat: Option<u64>,
    total_in_sat: u64,
}

impl DraftTx {
    pub fn total_input_sat(&self) -> u64 {
        self.total_in_sat
    }

    /// Serialized size once every input carries its unlocking script.
    pub fn estimated_signed_size(&self) -> u64 {
        let script_sigs: u64 = self
            .prevouts
            .iter()
            .map(|p| LockingScript::classify(&p.script_pubkey).script_sig_size_estimate())
            .sum();
        self.tx.total_size() as u64 + script_sigs
    }
}

/// Convert a display-scale BTC amount to satoshis.
pub fn to_sat(amount: &coin_core::Amount) -> Result<u64, BtcError> {
    Amount::from_str_in(amount.as_str(), Denomination::Bitcoin)
        .map(Amount::to_sat)
        .map_err(|e| BtcError::InvalidAmount(format!("{amount} BTC: {e}")))
}

/// Build the draft for `transfer` spending every output in `unspent`.
///
/// This is the single construction routine shared by fee estimation and
/// signing, so both see the same inputs, outputs and size. A change output of
/// `total_in - total_out - fee_sat` is appended when it reaches
/// [`DUST_THRESHOLD_SAT`]; smaller change is absorbed into the fee.
pub fn build_draft(
    transfer: &coin_core::Transaction,
    unspent: &[Utxo],
    fee_sat: u64,
    network: BtcNetwork,
    change_policy: ChangePolicy,
) -> Result<DraftTx, BtcError> {
    let mut outputs = Vec::with_capacity(transfer.outputs().len() + 1);
    let mut total_out: u64 = 0;
    for output in transfer.outputs() {
        let recipient = parse_address(&output.address, network)?;
        let value_sat = to_sat(&output.amount)?;
        total_out = total_out
            .checked_add(value_sat)
            .ok_or_else(|| BtcError::InvalidAmount("output total overflows".into()))?;
        outputs.push(TxOut {
            value: Amount::from_sat(value_sat),
            script_pubkey: recipient.script_pubkey(),
        });
    }

    let total_in = utxo::total_value_sat(unspent)?;
    let required = total_out
        .checked_add(fee_sat)
        .ok_or_else(|| BtcError::InvalidAmount("output total plus fee overflows".into()))?;
    if total_in < required {
        return Err(BtcError::InsufficientFunds {
            available_sat: total_in,
            required_sat: required,
        });
    }

    let change_sat = total_in - required;
    let mut change_out = None;
    if change_sat >= DUST_THRESHOLD_SAT {
        match (transfer.change(), change_policy) {
            (Some(change_address), _) => {
                let change_addr = parse_address(change_address, network)?;
                outputs.push(TxOut {
                    value: Amount::from_sat(change_sat),
                    script_pubkey: change_addr.script_pubkey(),
                });
                change_out = Some(change_sat);
            }
            (None, ChangePolicy::Require) => {
                return Err(BtcError::MissingChangeAddress { change_sat });
            }
            (None, ChangePolicy::Skip) => {}
        }
    }

    let mut inputs = Vec::with_capacity(unspent.len());
    let mut prevouts = Vec::with_capacity(unspent.len());
    for u in unspent {
        inputs.push(TxIn {
            previous_output: utxo::outpoint(u)?,
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::default(),
        });
        prevouts.push(utxo::prevout(u));
    }

    let tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: inputs,
        output: outputs,
    };

    Ok(DraftTx {
        tx,
        prevouts,
        change_sat: change_out,
        total_in_sat: total_in,
    })
}

/// Fee for `draft` at `fee_rate`: rate times the estimated signed size.
pub fn estimate_fee(draft: &DraftTx, fee_rate: FeeRate) -> Result<u64, BtcError> {
    fee_rate
        .fee_vb(draft.estimated_signed_size())
        .map(Amount::to_sat)
        .ok_or_else(|| BtcError::TransactionBuildError("fee computation overflowed".into()))
}

/// Sign every input of `draft` under SIGHASH_ALL.
///
/// `keys[i]` signs input `i`. P2PK inputs get a signature-only unlocking
/// script, P2PKH inputs get signature plus compressed public key; any other
/// locking script fails.
pub fn sign_draft(draft: &DraftTx, keys: &[SecretKey]) -> Result<Transaction, BtcError> {
    if keys.len() != draft.prevouts.len() {
        return Err(BtcError::SigningError(format!(
            "{} keys supplied for {} inputs",
            keys.len(),
            draft.prevouts.len()
        )));
    }

    let secp = Secp256k1::new();
    let cache = SighashCache::new(&draft.tx);
    let mut signed_tx = draft.tx.clone();

    for (index, (prevout, secret_key)) in draft.prevouts.iter().zip(keys).enumerate() {
        let kind = LockingScript::classify(&prevout.script_pubkey);
        if kind == LockingScript::Unsupported {
            return Err(BtcError::UnsupportedScript {
                input: index,
                script: prevout.script_pubkey.to_asm_string(),
            });
        }

        let sighash = cache
            .legacy_signature_hash(index, &prevout.script_pubkey, EcdsaSighashType::All.to_u32())
            .map_err(|e| BtcError::SigningError(format!("sighash computation failed: {e}")))?;
        let msg = Message::from_digest(sighash.to_byte_array());

        let signature = ecdsa::Signature {
            signature: secp.sign_ecdsa(&msg, secret_key),
            sighash_type: EcdsaSighashType::All,
        };
        let sig_push = PushBytesBuf::try_from(signature.to_vec())
            .map_err(|e| BtcError::SigningError(format!("signature push failed: {e}")))?;

        let script_sig = match kind {
            LockingScript::P2pk => ScriptBuf::builder().push_slice(&sig_push).into_script(),
            _ => {
                let public_key = PublicKey::new(secret_key.public_key(&secp));
                ScriptBuf::builder()
                    .push_slice(&sig_push)
                    .push_key(&public_key)
                    .into_script()
            }
        };
        signed_tx.input[index].script_sig = script_sig;
    }

    Ok(signed_tx)
}
