use bitcoin::script::{Script, ScriptBuf};
use bitcoin::{Amount, OutPoint, TxOut, Txid};
use coin_core::Utxo;

use crate::error::BtcError;

/// Expected scriptSig size for a P2PKH spend:
/// push(72-byte DER signature + sighash byte) + push(33-byte compressed key).
const P2PKH_SCRIPT_SIG_BYTES: u64 = 107;

/// Expected scriptSig size for a P2PK spend: push(72-byte signature + sighash byte).
const P2PK_SCRIPT_SIG_BYTES: u64 = 73;

/// Locking-script patterns the signer knows how to satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockingScript {
    /// Pay-to-public-key: unlocked by a signature alone.
    P2pk,
    /// Pay-to-public-key-hash: unlocked by a signature and the public key.
    P2pkh,
    Unsupported,
}

impl LockingScript {
    pub fn classify(script: &Script) -> Self {
        if script.is_p2pk() {
            LockingScript::P2pk
        } else if script.is_p2pkh() {
            LockingScript::P2pkh
        } else {
            LockingScript::Unsupported
        }
    }

    /// Bytes the unlocking script is expected to add once signed.
    ///
    /// Unsupported scripts are sized like P2PKH; signing rejects them anyway.
    pub fn script_sig_size_estimate(self) -> u64 {
        match self {
            LockingScript::P2pk => P2PK_SCRIPT_SIG_BYTES,
            LockingScript::P2pkh | LockingScript::Unsupported => P2PKH_SCRIPT_SIG_BYTES,
        }
    }
}

/// The outpoint an unspent output is referenced by.
pub fn outpoint(utxo: &Utxo) -> Result<OutPoint, BtcError> {
    let txid: Txid = utxo
        .txid
        .parse()
        .map_err(|e| BtcError::TransactionBuildError(format!("invalid txid {}: {e}", utxo.txid)))?;
    Ok(OutPoint::new(txid, utxo.vout))
}

/// Sum of `unspent` values in satoshi.
///
/// Each value must be within the 21M BTC supply and the total must fit in a
/// `u64`; anything else is indexer data that cannot be real.
pub fn total_value_sat(unspent: &[Utxo]) -> Result<u64, BtcError> {
    unspent.iter().try_fold(0u64, |total, u| {
        if u.value_sat > Amount::MAX_MONEY.to_sat() {
            return Err(BtcError::MalformedResponse(format!(
                "{}:{} claims {} sat, above the money supply",
                u.txid, u.vout, u.value_sat
            )));
        }
        total
            .checked_add(u.value_sat)
            .ok_or_else(|| BtcError::MalformedResponse("unspent output values overflow".into()))
    })
}

/// The output being spent, as needed for sighash computation.
pub fn prevout(utxo: &Utxo) -> TxOut {
    TxOut {
        value: Amount::from_sat(utxo.value_sat),
        script_pubkey: ScriptBuf::from(utxo.script_pubkey.to_vec()),
    }
}
