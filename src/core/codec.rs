//! SIP-005 wire encoding of multisig token transfers
//!
//! Transactions move between co-signers as base64 strings of the wire bytes,
//! so the same encoding is used for hand-off and for broadcast.

use super::network::Network;
use super::principal::{validate_contract_name, Principal, StandardPrincipal};
use super::transaction::{
    AnchorMode, AuthSlot, HashMode, Memo, MessageSignature, MultisigSpendingCondition,
    MultisigTransaction, PostConditionMode, StacksPublicKey, TokenTransfer, AUTH_TYPE_STANDARD,
    MEMO_MAX_LENGTH,
};
use crate::core::script::MAX_MULTISIG_KEYS;
use crate::crypto::{sha512_256, PUBLIC_KEY_LENGTH, RECOVERABLE_SIGNATURE_LENGTH};
use crate::error::MultisigError;
use base64::{engine::general_purpose::STANDARD, Engine as _};

// =============================================================================
// Tags
// =============================================================================

const AUTH_TYPE_SPONSORED: u8 = 0x05;

const FIELD_PUBKEY_COMPRESSED: u8 = 0x00;
const FIELD_PUBKEY_UNCOMPRESSED: u8 = 0x01;
const FIELD_SIGNATURE_COMPRESSED: u8 = 0x02;
const FIELD_SIGNATURE_UNCOMPRESSED: u8 = 0x03;

const PAYLOAD_TOKEN_TRANSFER: u8 = 0x00;

const PRINCIPAL_STANDARD: u8 = 0x05;
const PRINCIPAL_CONTRACT: u8 = 0x06;

// =============================================================================
// Writer / Reader
// =============================================================================

struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn new() -> Self {
        Self {
            buf: Vec::with_capacity(256),
        }
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn read_bytes(&mut self, n: usize, what: &str) -> Result<&'a [u8], MultisigError> {
        if self.data.len() - self.pos < n {
            return Err(MultisigError::MalformedInput(format!(
                "truncated at byte {} while reading {}",
                self.pos, what
            )));
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self, what: &str) -> Result<[u8; N], MultisigError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N, what)?);
        Ok(out)
    }

    fn read_u8(&mut self, what: &str) -> Result<u8, MultisigError> {
        Ok(self.read_bytes(1, what)?[0])
    }

    fn read_u16(&mut self, what: &str) -> Result<u16, MultisigError> {
        Ok(u16::from_be_bytes(self.read_array(what)?))
    }

    fn read_u32(&mut self, what: &str) -> Result<u32, MultisigError> {
        Ok(u32::from_be_bytes(self.read_array(what)?))
    }

    fn read_u64(&mut self, what: &str) -> Result<u64, MultisigError> {
        Ok(u64::from_be_bytes(self.read_array(what)?))
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

fn malformed(message: impl Into<String>) -> MultisigError {
    MultisigError::MalformedInput(message.into())
}

// =============================================================================
// Encoding
// =============================================================================

fn write_principal(w: &mut Writer, principal: &Principal) {
    match principal {
        Principal::Standard(address) => {
            w.write_u8(PRINCIPAL_STANDARD);
            w.write_u8(address.version);
            w.write_bytes(&address.hash160);
        }
        Principal::Contract { address, name } => {
            w.write_u8(PRINCIPAL_CONTRACT);
            w.write_u8(address.version);
            w.write_bytes(&address.hash160);
            // contract names are at most 128 bytes
            w.write_u8(name.len() as u8);
            w.write_bytes(name.as_bytes());
        }
    }
}

/// Encode a transaction into its wire bytes
pub fn serialize_bytes(tx: &MultisigTransaction) -> Vec<u8> {
    let mut w = Writer::new();

    w.write_u8(tx.network.transaction_version());
    w.write_u32(tx.network.chain_id());

    let auth = &tx.auth;
    w.write_u8(AUTH_TYPE_STANDARD);
    w.write_u8(auth.hash_mode as u8);
    w.write_bytes(&auth.signer);
    w.write_u64(auth.nonce);
    w.write_u64(auth.fee);
    w.write_u32(auth.slots.len() as u32);
    for slot in &auth.slots {
        match slot {
            AuthSlot::PublicKey(key) => {
                w.write_u8(FIELD_PUBKEY_COMPRESSED);
                w.write_bytes(key.as_bytes());
            }
            AuthSlot::Signature(sig) => {
                w.write_u8(FIELD_SIGNATURE_COMPRESSED);
                w.write_bytes(sig.as_bytes());
            }
        }
    }
    w.write_u16(auth.signatures_required);

    w.write_u8(tx.anchor_mode as u8);
    w.write_u8(tx.post_condition_mode as u8);
    w.write_u32(0);

    w.write_u8(PAYLOAD_TOKEN_TRANSFER);
    write_principal(&mut w, &tx.payload.recipient);
    w.write_u64(tx.payload.amount);
    w.write_bytes(&tx.payload.memo.to_padded());

    w.into_vec()
}

/// Encode a transaction as the base64 transport string
pub fn serialize(tx: &MultisigTransaction) -> String {
    STANDARD.encode(serialize_bytes(tx))
}

/// Transaction ID: SHA-512/256 of the wire bytes, hex encoded
pub fn txid(tx: &MultisigTransaction) -> String {
    hex::encode(sha512_256(&serialize_bytes(tx)))
}

// =============================================================================
// Decoding
// =============================================================================

fn read_slot(r: &mut Reader<'_>, index: usize) -> Result<AuthSlot, MultisigError> {
    match r.read_u8("auth field tag")? {
        FIELD_PUBKEY_COMPRESSED => {
            let bytes = r.read_bytes(PUBLIC_KEY_LENGTH, "public key")?;
            StacksPublicKey::from_slice(bytes)
                .map(AuthSlot::PublicKey)
                .map_err(|e| malformed(format!("auth field {}: {}", index, e)))
        }
        FIELD_SIGNATURE_COMPRESSED => {
            let bytes = r.read_bytes(RECOVERABLE_SIGNATURE_LENGTH, "signature")?;
            MessageSignature::from_slice(bytes).map(AuthSlot::Signature)
        }
        FIELD_PUBKEY_UNCOMPRESSED | FIELD_SIGNATURE_UNCOMPRESSED => Err(malformed(format!(
            "auth field {} uses an uncompressed key encoding",
            index
        ))),
        tag => Err(malformed(format!(
            "auth field {} has unknown tag {:#04x}",
            index, tag
        ))),
    }
}

fn read_spending_condition(r: &mut Reader<'_>) -> Result<MultisigSpendingCondition, MultisigError> {
    let hash_mode_byte = r.read_u8("hash mode")?;
    if HashMode::is_single_sig_byte(hash_mode_byte) {
        return Err(MultisigError::SingleSigNotSupported);
    }
    let hash_mode = HashMode::from_byte(hash_mode_byte)
        .ok_or_else(|| malformed(format!("unsupported hash mode {:#04x}", hash_mode_byte)))?;

    let signer = r.read_array::<20>("signer hash")?;
    let nonce = r.read_u64("nonce")?;
    let fee = r.read_u64("fee")?;

    let field_count = r.read_u32("auth field count")? as usize;
    if field_count == 0 || field_count > MAX_MULTISIG_KEYS {
        return Err(malformed(format!(
            "{} auth fields, expected 1 to {}",
            field_count, MAX_MULTISIG_KEYS
        )));
    }
    let slots = (0..field_count)
        .map(|i| read_slot(r, i))
        .collect::<Result<Vec<_>, _>>()?;

    let signatures_required = r.read_u16("signatures required")?;
    if signatures_required == 0 || signatures_required as usize > field_count {
        return Err(malformed(format!(
            "{} signatures required with {} auth fields",
            signatures_required, field_count
        )));
    }

    Ok(MultisigSpendingCondition {
        hash_mode,
        signer,
        nonce,
        fee,
        slots,
        signatures_required,
    })
}

fn read_principal(r: &mut Reader<'_>) -> Result<Principal, MultisigError> {
    let tag = r.read_u8("principal tag")?;
    let version = r.read_u8("principal version")?;
    if version >= 32 {
        return Err(malformed(format!("principal version {} out of range", version)));
    }
    let address = StandardPrincipal {
        version,
        hash160: r.read_array("principal hash")?,
    };

    match tag {
        PRINCIPAL_STANDARD => Ok(Principal::Standard(address)),
        PRINCIPAL_CONTRACT => {
            let len = r.read_u8("contract name length")? as usize;
            let name = std::str::from_utf8(r.read_bytes(len, "contract name")?)
                .map_err(|_| malformed("contract name is not UTF-8"))?;
            validate_contract_name(name).map_err(|e| malformed(e.to_string()))?;
            Ok(Principal::Contract {
                address,
                name: name.to_string(),
            })
        }
        other => Err(malformed(format!("unknown principal tag {:#04x}", other))),
    }
}

/// Decode wire bytes into a transaction
pub fn deserialize_bytes(bytes: &[u8]) -> Result<MultisigTransaction, MultisigError> {
    let mut r = Reader::new(bytes);

    let version = r.read_u8("version")?;
    let chain_id = r.read_u32("chain id")?;
    let network = Network::from_wire(version, chain_id).ok_or_else(|| {
        malformed(format!(
            "unknown version {:#04x} / chain id {:#010x}",
            version, chain_id
        ))
    })?;

    match r.read_u8("auth type")? {
        AUTH_TYPE_STANDARD => {}
        AUTH_TYPE_SPONSORED => return Err(malformed("sponsored transactions are not supported")),
        other => return Err(malformed(format!("unknown auth type {:#04x}", other))),
    }
    let auth = read_spending_condition(&mut r)?;

    let anchor_byte = r.read_u8("anchor mode")?;
    let anchor_mode = AnchorMode::from_byte(anchor_byte)
        .ok_or_else(|| malformed(format!("unknown anchor mode {:#04x}", anchor_byte)))?;
    let mode_byte = r.read_u8("post-condition mode")?;
    let post_condition_mode = PostConditionMode::from_byte(mode_byte)
        .ok_or_else(|| malformed(format!("unknown post-condition mode {:#04x}", mode_byte)))?;
    let post_conditions = r.read_u32("post-condition count")?;
    if post_conditions != 0 {
        return Err(malformed(format!(
            "{} post conditions present, none are supported",
            post_conditions
        )));
    }

    let payload_type = r.read_u8("payload type")?;
    if payload_type != PAYLOAD_TOKEN_TRANSFER {
        return Err(malformed(format!(
            "payload type {:#04x} is not a token transfer",
            payload_type
        )));
    }
    let recipient = read_principal(&mut r)?;
    let amount = r.read_u64("amount")?;
    let memo = Memo::from_padded(&r.read_array::<MEMO_MAX_LENGTH>("memo")?);

    if r.remaining() != 0 {
        return Err(malformed(format!("{} trailing bytes", r.remaining())));
    }

    Ok(MultisigTransaction {
        network,
        auth,
        anchor_mode,
        post_condition_mode,
        payload: TokenTransfer {
            recipient,
            amount,
            memo,
        },
    })
}

/// Decode a base64 transport string into a transaction
pub fn deserialize(encoded: &str) -> Result<MultisigTransaction, MultisigError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| malformed(format!("invalid base64: {}", e)))?;
    deserialize_bytes(&bytes)
}
