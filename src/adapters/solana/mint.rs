//! Mint Account Parsing
//!
//! Reads authority state and Token-2022 extensions straight out of raw mint
//! account data.
//!
//! Standard mint layout (first 82 bytes):
//! - Offset 0-3:   mint_authority_option (u32: 0=None, 1=Some)
//! - Offset 4-35:  mint_authority (Pubkey) - if option=1
//! - Offset 36-43: supply (u64)
//! - Offset 44:    decimals (u8)
//! - Offset 45:    is_initialized (bool)
//! - Offset 46-49: freeze_authority_option (u32: 0=None, 1=Some)
//! - Offset 50-81: freeze_authority (Pubkey) - if option=1
//!
//! Token-2022 appends an account-type byte at offset 82 and TLV-encoded
//! extensions from offset 165.

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Standard SPL Token program ID
pub const SPL_TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
/// Token-2022 program ID
pub const TOKEN_2022_PROGRAM_ID: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";

/// Base mint account size (standard fields)
pub const MINT_BASE_SIZE: usize = 82;
/// Account type discriminator offset for Token-2022
const ACCOUNT_TYPE_OFFSET: usize = 82;
/// Extensions start offset (after base + account type + padding)
const EXTENSIONS_START_OFFSET: usize = 165;

/// Extension type codes that gate, tax, or revoke transfers:
/// TransferFeeConfig, DefaultAccountState, NonTransferable,
/// PermanentDelegate, TransferHook, Pausable.
const RESTRICTED_EXTENSION_TYPES: [u16; 6] = [1, 6, 9, 12, 14, 26];

#[derive(Debug, Error)]
pub enum MintParseError {
    #[error("mint data too short: expected {expected} bytes, got {actual}")]
    DataTooShort { expected: usize, actual: usize },
}

/// Authority state parsed from a mint account
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MintAuthorities {
    /// Can mint new tokens
    pub mint_authority: Option<Pubkey>,
    /// Can freeze token accounts
    pub freeze_authority: Option<Pubkey>,
}

impl MintAuthorities {
    /// Both authorities renounced: nobody can inflate supply or freeze
    /// holders.
    pub fn renounced(&self) -> bool {
        self.mint_authority.is_none() && self.freeze_authority.is_none()
    }
}

/// Parse mint and freeze authorities out of raw mint data. Works for both
/// SPL Token and Token-2022 mints.
pub fn parse_authorities(mint_data: &[u8]) -> Result<MintAuthorities, MintParseError> {
    if mint_data.len() < MINT_BASE_SIZE {
        return Err(MintParseError::DataTooShort {
            expected: MINT_BASE_SIZE,
            actual: mint_data.len(),
        });
    }

    let read_option_pubkey = |tag_offset: usize| -> Option<Pubkey> {
        let tag = u32::from_le_bytes([
            mint_data[tag_offset],
            mint_data[tag_offset + 1],
            mint_data[tag_offset + 2],
            mint_data[tag_offset + 3],
        ]);
        if tag == 1 {
            Pubkey::try_from(&mint_data[tag_offset + 4..tag_offset + 36]).ok()
        } else {
            None
        }
    };

    Ok(MintAuthorities {
        mint_authority: read_option_pubkey(0),
        freeze_authority: read_option_pubkey(46),
    })
}

/// Whether the owning program is one of the two token programs we
/// understand. Anything else can run arbitrary transfer logic.
pub fn is_known_token_program(owner: &Pubkey) -> bool {
    let owner = owner.to_string();
    owner == SPL_TOKEN_PROGRAM_ID || owner == TOKEN_2022_PROGRAM_ID
}

pub fn is_token_2022(owner: &Pubkey) -> bool {
    owner.to_string() == TOKEN_2022_PROGRAM_ID
}

/// Walk the Token-2022 TLV extension list and report whether any
/// transfer-restricting extension is present. Plain SPL mints (no
/// extension data) never trip this.
pub fn has_restricted_extensions(mint_data: &[u8]) -> bool {
    if mint_data.len() <= ACCOUNT_TYPE_OFFSET {
        return false;
    }

    // Account type must be Mint (1) for the TLV section to apply
    if mint_data[ACCOUNT_TYPE_OFFSET] != 1 {
        return false;
    }

    let mut offset = EXTENSIONS_START_OFFSET;
    while offset + 4 <= mint_data.len() {
        let ext_type = u16::from_le_bytes([mint_data[offset], mint_data[offset + 1]]);
        let ext_length =
            u16::from_le_bytes([mint_data[offset + 2], mint_data[offset + 3]]) as usize;

        if ext_type == 0 || offset + 4 + ext_length > mint_data.len() {
            break;
        }

        if RESTRICTED_EXTENSION_TYPES.contains(&ext_type) {
            return true;
        }

        offset += 4 + ext_length;
        // TLV entries are 8-byte aligned
        let remainder = offset % 8;
        if remainder != 0 {
            offset += 8 - remainder;
        }
    }

    false
}
